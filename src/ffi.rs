//! Python FFI bindings via PyO3.
//!
//! Exposes the inference session and the raw regime detector to Python using
//! plain tuples for inputs, so hosts need no extra Python classes.
//!
//! # Building the Python extension
//!
//! ```bash
//! pip install maturin
//! maturin develop --features python-ffi
//! ```
//!
//! # Usage
//!
//! ```python
//! from cre_core import InferenceSession, detect_regime
//!
//! session = InferenceSession("wallet-a", started_at=now_ms, initial_conditions=("medium", "medium", "low"))
//! periods = [
//!     ("2024", [("w", "work", ["2022", "2023", "2024"])], []),
//! ]
//! reflections = [("r1", now_ms, "Long week at work", None)]
//! view = session.infer(periods, reflections, now_ms)
//! print(view.narrative, view.continuations, view.silence)
//! ```

use std::collections::BTreeMap;

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::model::{
    ClusterAssociation, ConceptualCluster, InitialConditions, Level, PeriodSnapshot, ReflectionEntry,
};
use crate::regime;
use crate::session::{InferenceInput, InferenceSession};
use crate::view::ViewModel;

/// `(id, label, source_periods)`
type PyCluster = (String, String, Vec<String>);
/// `(from_id, to_id, periods)`
type PyAssociation = (String, String, Vec<String>);
/// `(period, clusters, associations)`
type PyPeriod = (String, Vec<PyCluster>, Vec<PyAssociation>);
/// `(id, created_at_ms, plaintext, deleted_at_ms)`
type PyReflection = (String, u64, String, Option<u64>);
/// `(constraint_density, authority_concentration, variability_baseline)`
type PyLevels = (String, String, String);

// ── Conversions ──────────────────────────────────────────────────────────────

fn parse_level(s: &str) -> PyResult<Level> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(Level::Low),
        "medium" => Ok(Level::Medium),
        "high" => Ok(Level::High),
        other => Err(PyValueError::new_err(format!(
            "level must be one of low/medium/high, got {other:?}"
        ))),
    }
}

fn parse_initial(levels: Option<PyLevels>) -> PyResult<Option<InitialConditions>> {
    levels
        .map(|(c, a, v)| Ok(InitialConditions::new(parse_level(&c)?, parse_level(&a)?, parse_level(&v)?)))
        .transpose()
}

fn to_clusters(clusters: Vec<PyCluster>) -> Vec<ConceptualCluster> {
    clusters
        .into_iter()
        .map(|(id, label, periods)| ConceptualCluster::new(id, label, periods))
        .collect()
}

fn to_associations(associations: Vec<PyAssociation>) -> Vec<ClusterAssociation> {
    associations
        .into_iter()
        .map(|(from, to, periods)| ClusterAssociation::new(from, to, periods))
        .collect()
}

fn to_period((period, clusters, associations): PyPeriod) -> PeriodSnapshot {
    PeriodSnapshot::new(period, to_clusters(clusters), to_associations(associations))
}

fn to_reflection((id, created_at, plaintext, deleted_at): PyReflection) -> ReflectionEntry {
    let mut r = ReflectionEntry::new(id, created_at, plaintext);
    r.deleted_at = deleted_at;
    r
}

// ── ViewModel ────────────────────────────────────────────────────────────────

/// Read-only view of one computation.
#[pyclass(name = "ViewModel", frozen)]
pub struct PyViewModel {
    inner: ViewModel,
}

#[pymethods]
impl PyViewModel {
    /// Effective narrative fragment, or None.
    #[getter]
    pub fn narrative(&self) -> Option<String> {
        self.inner.narrative.clone()
    }

    /// Effective continuations as `(id, text)` pairs (at most two).
    #[getter]
    pub fn continuations(&self) -> Vec<(String, String)> {
        self.inner
            .continuations
            .iter()
            .map(|c| (c.id.clone(), c.text.clone()))
            .collect()
    }

    /// Effective position phrase, or None.
    #[getter]
    pub fn position(&self) -> Option<String> {
        self.inner.position.clone()
    }

    /// Effective drift phrase, or None.
    #[getter]
    pub fn drift(&self) -> Option<String> {
        self.inner.drift.clone()
    }

    /// Continuity note, or None.
    #[getter]
    pub fn continuity_note(&self) -> Option<String> {
        self.inner.continuity_note.clone()
    }

    /// Yearly wrap headline, or None when silenced.
    #[getter]
    pub fn headline(&self) -> Option<String> {
        self.inner.wrap.as_ref().map(|w| w.headline.clone())
    }

    /// Yearly wrap summary, or None when silenced.
    #[getter]
    pub fn summary(&self) -> Option<String> {
        self.inner.wrap.as_ref().map(|w| w.summary.clone())
    }

    /// Per-region suppression flags.
    #[getter]
    pub fn silence(&self) -> BTreeMap<&'static str, bool> {
        let s = self.inner.silence;
        BTreeMap::from([
            ("wrap", s.wrap),
            ("narrative", s.narrative),
            ("continuations", s.continuations),
            ("position", s.position),
            ("drift", s.drift),
        ])
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!(
            "ViewModel(narrative={:?}, continuations={}, position={:?})",
            self.inner.narrative,
            self.inner.continuations.len(),
            self.inner.position,
        )
    }
}

// ── InferenceSession ─────────────────────────────────────────────────────────

/// One wallet session; keeps seal, irreversibility and decay across calls.
#[pyclass(name = "InferenceSession")]
pub struct PyInferenceSession {
    inner: InferenceSession,
}

#[pymethods]
impl PyInferenceSession {
    /// Open a session.
    ///
    /// Args:
    ///     wallet_id:          connected wallet
    ///     started_at:         session start, Unix ms
    ///     initial_conditions: optional (constraint, authority, variability) levels
    #[new]
    #[pyo3(signature = (wallet_id, started_at, initial_conditions=None))]
    pub fn new(wallet_id: String, started_at: u64, initial_conditions: Option<PyLevels>) -> PyResult<Self> {
        Ok(Self { inner: InferenceSession::new(wallet_id, parse_initial(initial_conditions)?, started_at) })
    }

    /// Run the pipeline.
    ///
    /// Args:
    ///     periods:     list of (period, clusters, associations), oldest first
    ///     reflections: list of (id, created_at_ms, plaintext, deleted_at_ms or None)
    ///     now:         current time, Unix ms
    pub fn infer(
        &mut self,
        periods: Vec<PyPeriod>,
        reflections: Vec<PyReflection>,
        now: u64,
    ) -> PyViewModel {
        let periods: Vec<PeriodSnapshot> = periods.into_iter().map(to_period).collect();
        let reflections: Vec<ReflectionEntry> = reflections.into_iter().map(to_reflection).collect();
        let out = self.inner.infer(&InferenceInput {
            periods: &periods,
            reflections: &reflections,
            now,
        });
        PyViewModel { inner: ViewModel::from(&out) }
    }

    /// Reset for a different wallet; returns False for the current wallet.
    #[pyo3(signature = (wallet_id, now, initial_conditions=None))]
    pub fn reset_for_wallet(
        &mut self,
        wallet_id: &str,
        now: u64,
        initial_conditions: Option<PyLevels>,
    ) -> PyResult<bool> {
        Ok(self.inner.reset_for_wallet(wallet_id, parse_initial(initial_conditions)?, now))
    }

    /// True once the session's epistemic seal has closed.
    pub fn is_epistemically_closed(&self) -> bool {
        self.inner.is_epistemically_closed()
    }

    /// Python repr string.
    pub fn __repr__(&self) -> String {
        format!("InferenceSession(wallet_id={:?})", self.inner.wallet_id())
    }
}

// ── Functions ────────────────────────────────────────────────────────────────

/// Raw regime of one period: "deterministic", "transitional" or "emergent".
#[pyfunction]
pub fn detect_regime(
    clusters: Vec<PyCluster>,
    associations: Vec<PyAssociation>,
    period: &str,
) -> &'static str {
    regime::detect_regime(&to_clusters(clusters), &to_associations(associations), period).as_str()
}

// ── Module entry point ────────────────────────────────────────────────────────

/// Constraint-relative emergence inference, Python bindings.
#[pymodule]
pub fn cre_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyInferenceSession>()?;
    m.add_class::<PyViewModel>()?;
    m.add_function(wrap_pyfunction!(detect_regime, m)?)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
