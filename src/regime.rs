/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Regime classification and cross-period stabilization.
//!
//! - [`detect_regime`]: raw per-period classifier, pure and history-free.
//! - [`RegimeEvidence`]: weighted evidence scores used by the stabilizer.
//! - [`RegimeStabilizer`]: Schmitt trigger hysteresis with a minimum dwell.
//! - [`StabilizerConfig`]: configurable enter/exit thresholds.
//!
//! # Invariants
//!
//! - **REG-001**: `detect_regime` is deterministic and order-independent.
//! - **REG-002**: empty input classifies as `Deterministic`.
//! - **REG-003**: the first stabilized period takes the raw regime verbatim.
//! - **REG-004**: no switch happens before the current regime has been held
//!   `min_dwell` consecutive periods.
//! - **REG-005**: a closed period re-emits the previous stabilized regime.

use crate::closure::ObservationClosure;
use crate::model::{ClusterAssociation, ConceptualCluster};
use crate::signals::{normalized_variance, StructuralSignals};

// ─── Regime ─────────────────────────────────────────────────────────────────

/// How strongly the observed structure departs from historical norms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Regime {
    /// Structure reproduces inherited patterns.
    Deterministic,
    /// Structure is reorganising between patterns.
    Transitional,
    /// Structure departs from inherited patterns.
    Emergent,
}

impl Regime {
    /// Lower-case name, as used in view models.
    pub fn as_str(&self) -> &'static str {
        match self {
            Regime::Deterministic => "deterministic",
            Regime::Transitional => "transitional",
            Regime::Emergent => "emergent",
        }
    }
}

/// Classify one period's structure. First match wins:
///
/// 1. **Emergent** — `dominance > 0.6 ∧ clusters ≤ 3 ∧ reuse < 0.4 ∧ assoc-conc < 0.5`
/// 2. **Transitional** — `variance > 2.0 ∧ new-rate > 0.3 ∧ 0.3 < reuse < 0.7 ∧ assoc-conc > 0.4`
/// 3. **Deterministic** — otherwise, including no clusters.
pub fn detect_regime(
    clusters: &[ConceptualCluster],
    associations: &[ClusterAssociation],
    period: &str,
) -> Regime {
    classify_signals(&StructuralSignals::compute(clusters, associations, period))
}

/// Raw classification from precomputed signals.
pub fn classify_signals(s: &StructuralSignals) -> Regime {
    if s.cluster_count == 0 {
        return Regime::Deterministic;
    }
    if s.dominance > 0.6
        && s.cluster_count <= 3
        && s.structural_reuse < 0.4
        && s.association_concentration < 0.5
    {
        Regime::Emergent
    } else if s.period_variance > 2.0
        && s.new_cluster_rate > 0.3
        && s.structural_reuse > 0.3
        && s.structural_reuse < 0.7
        && s.association_concentration > 0.4
    {
        Regime::Transitional
    } else {
        Regime::Deterministic
    }
}

// ─── Evidence ───────────────────────────────────────────────────────────────

/// Weighted evidence for the two pole regimes, both in [0.0, 1.0].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegimeEvidence {
    /// Evidence that structure is emergent.
    pub emergent: f32,
    /// Evidence that structure is deterministic.
    pub deterministic: f32,
}

impl RegimeEvidence {
    /// Blend signals into evidence scores.
    ///
    /// ```text
    /// emergent      = 0.40·dominance + 0.25·(1−reuse) + 0.20·(1−assoc)
    ///               + 0.10·norm(period_var) + 0.05·(1/clusters)
    /// deterministic = 0.40·reuse + 0.30·assoc
    ///               + 0.20·(1−norm(freq_var)) + 0.10·(1−norm(period_var))
    /// ```
    pub fn from_signals(s: &StructuralSignals) -> Self {
        let inv_count = 1.0 / s.cluster_count.max(1) as f32;
        let emergent = 0.4 * s.dominance
            + 0.25 * (1.0 - s.structural_reuse)
            + 0.2 * (1.0 - s.association_concentration)
            + 0.1 * normalized_variance(s.period_variance)
            + 0.05 * inv_count;
        let deterministic = 0.4 * s.structural_reuse
            + 0.3 * s.association_concentration
            + 0.2 * (1.0 - normalized_variance(s.frequency_variance))
            + 0.1 * (1.0 - normalized_variance(s.period_variance));
        Self {
            emergent: emergent.clamp(0.0, 1.0),
            deterministic: deterministic.clamp(0.0, 1.0),
        }
    }

    fn for_regime(&self, r: Regime) -> Option<f32> {
        match r {
            Regime::Emergent => Some(self.emergent),
            Regime::Deterministic => Some(self.deterministic),
            Regime::Transitional => None,
        }
    }
}

// ─── StabilizerConfig ───────────────────────────────────────────────────────

/// Schmitt trigger thresholds for [`RegimeStabilizer`].
///
/// The *enter* threshold is higher than the *exit* threshold so the stabilized
/// regime does not oscillate when evidence hovers near a boundary.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StabilizerConfig {
    /// Evidence required to switch into a pole regime. Default 0.70.
    pub enter_threshold: f32,
    /// Evidence at or below which a pole regime is left. Default 0.45.
    pub exit_threshold: f32,
    /// Consecutive periods a regime must be held before any switch. Default 2.
    pub min_dwell: u32,
    /// Dominance above which a double crossing resolves to emergent. Default 0.8.
    pub dominance_tiebreak: f32,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            enter_threshold: 0.70,
            exit_threshold: 0.45,
            min_dwell: 2,
            dominance_tiebreak: 0.8,
        }
    }
}

impl StabilizerConfig {
    /// Midpoint between exit and enter; the opposite pole must reach it to
    /// absorb a regime being left.
    pub fn fallback_threshold(&self) -> f32 {
        0.5 * (self.enter_threshold + self.exit_threshold)
    }
}

// ─── RegimeStabilizer ───────────────────────────────────────────────────────

/// Cross-period hysteresis state machine over raw regime evidence.
#[derive(Clone, Debug, Default)]
pub struct RegimeStabilizer {
    config: StabilizerConfig,
    last: Option<Regime>,
    dwell: u32,
}

impl RegimeStabilizer {
    /// Fresh stabilizer with no history.
    pub fn new(config: StabilizerConfig) -> Self {
        Self { config, last: None, dwell: 0 }
    }

    /// Last stabilized regime, if any period has been processed.
    pub fn current(&self) -> Option<Regime> {
        self.last
    }

    /// Consecutive periods the current regime has been held.
    pub fn dwell(&self) -> u32 {
        self.dwell
    }

    /// Force the stabilized regime for a period frozen by an earlier closure.
    pub fn hold(&mut self, regime: Regime) -> Regime {
        tracing::debug!(regime = regime.as_str(), "holding frozen regime");
        self.commit(regime)
    }

    /// Stabilize one period.
    ///
    /// - `signals`: this period's structural signals.
    /// - `closure`: the period's closure, if already known.
    pub fn step(
        &mut self,
        signals: &StructuralSignals,
        closure: Option<ObservationClosure>,
    ) -> Regime {
        let Some(current) = self.last else {
            return self.commit(classify_signals(signals));
        };
        if closure == Some(ObservationClosure::Closed) {
            return self.commit(current);
        }
        if self.dwell < self.config.min_dwell {
            return self.commit(current);
        }

        let ev = RegimeEvidence::from_signals(signals);
        let cfg = &self.config;
        let into_emergent = current != Regime::Emergent && ev.emergent >= cfg.enter_threshold;
        let into_deterministic =
            current != Regime::Deterministic && ev.deterministic >= cfg.enter_threshold;
        let leaving = ev.for_regime(current).map_or(false, |e| e <= cfg.exit_threshold);

        let next = if into_emergent && into_deterministic {
            if signals.dominance > cfg.dominance_tiebreak {
                Regime::Emergent
            } else {
                Regime::Transitional
            }
        } else if into_emergent {
            Regime::Emergent
        } else if into_deterministic {
            Regime::Deterministic
        } else if leaving {
            let (opposite, opposite_ev) = match current {
                Regime::Emergent => (Regime::Deterministic, ev.deterministic),
                _ => (Regime::Emergent, ev.emergent),
            };
            if opposite_ev >= cfg.fallback_threshold() {
                opposite
            } else {
                Regime::Transitional
            }
        } else {
            current
        };

        if next != current {
            tracing::debug!(
                from = current.as_str(),
                to = next.as_str(),
                dwell = self.dwell,
                evidence_emergent = ev.emergent,
                evidence_deterministic = ev.deterministic,
                "regime switch"
            );
        }
        self.commit(next)
    }

    fn commit(&mut self, regime: Regime) -> Regime {
        if self.last == Some(regime) {
            self.dwell = self.dwell.saturating_add(1);
        } else {
            self.last = Some(regime);
            self.dwell = 1;
        }
        regime
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
