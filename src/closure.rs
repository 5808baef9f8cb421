/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Observation closure — decides whether a period is frozen.
//!
//! A closed period stops regime, position and drift inference for itself and
//! every later recomputation that references it, and forces the narrative to
//! null downstream.
//!
//! # Invariants
//!
//! - **CLO-001**: closed requires *all* of: settled regime, no drift, no
//!   multiplicity continuation, no newly formed cluster.
//! - **CLO-002**: `Emergent` is never closed.

use crate::model::ConceptualCluster;
use crate::narrative::{Continuation, TRANSITIONAL_MULTIPLICITY};
use crate::regime::Regime;
use crate::signals::{is_newly_formed, StructuralSignals};

/// Period-level freeze flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ObservationClosure {
    /// Inference may continue to update.
    Open,
    /// The period is frozen.
    Closed,
}

impl ObservationClosure {
    /// True for [`ObservationClosure::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, ObservationClosure::Closed)
    }
}

/// Inputs to [`infer_closure`] for one period.
#[derive(Clone, Copy, Debug)]
pub struct ClosureInputs<'a> {
    /// Stabilized regime.
    pub regime: Regime,
    /// Structural signals of the period.
    pub signals: &'a StructuralSignals,
    /// Clusters of the period.
    pub clusters: &'a [ConceptualCluster],
    /// Raw (pre-feedback) positional drift phrase.
    pub drift: Option<&'a str>,
    /// Candidate continuations.
    pub continuations: &'a [Continuation],
}

/// A transitional period counts as settled when reuse ≥ 0.6 and association
/// concentration ≥ 0.5.
pub fn is_stable_transitional(signals: &StructuralSignals) -> bool {
    signals.structural_reuse >= 0.6 && signals.association_concentration >= 0.5
}

/// Decide whether a period is closed.
pub fn infer_closure(inputs: &ClosureInputs<'_>) -> ObservationClosure {
    let settled = match inputs.regime {
        Regime::Deterministic => true,
        Regime::Transitional => is_stable_transitional(inputs.signals),
        Regime::Emergent => false,
    };
    if !settled || inputs.drift.is_some() {
        return ObservationClosure::Open;
    }
    if inputs.continuations.iter().any(|c| c.id == TRANSITIONAL_MULTIPLICITY) {
        return ObservationClosure::Open;
    }

    let mut tracked: Vec<&String> =
        inputs.clusters.iter().flat_map(|c| c.source_periods.iter()).collect();
    tracked.sort_unstable();
    tracked.dedup();
    if inputs.clusters.iter().any(|c| is_newly_formed(c, &tracked)) {
        return ObservationClosure::Open;
    }

    ObservationClosure::Closed
}
