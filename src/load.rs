/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Interpretive load regulator — how much simultaneous interpretation may surface.
//!
//! Load is a one-step state machine keyed on the *previous period's* load. It is
//! never recomputed from scratch and never climbs more than one level per period.
//!
//! ```text
//!            constrained-evidence              saturation-evidence
//!  minimal ───────────────────────▶ constrained ──────────────────▶ saturated
//!     ▲                                 │  ▲                            │
//!     └──────── evidence lost ──────────┘  └──── saturation lost ───────┘
//! ```
//!
//! # Invariants
//!
//! - **LOAD-001**: closed ⇒ minimal; collapsed ⇒ minimal, regardless of deviation.
//! - **LOAD-002**: deterministic ⇒ minimal unless persistent with deviation > 0.5.
//! - **LOAD-003**: minimal never jumps straight to saturated.

use crate::closure::ObservationClosure;
use crate::feedback::FeedbackMode;
use crate::persistence::EmergencePersistence;
use crate::regime::Regime;

/// Cap on simultaneous interpretive output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InterpretiveLoad {
    /// No narrative.
    Minimal,
    /// At most two interpretive items.
    Constrained,
    /// Existing output only; nothing new is added.
    Saturated,
}

/// Inputs to [`regulate_load`].
#[derive(Clone, Copy, Debug)]
pub struct LoadInputs {
    /// Load of the previous period, if any.
    pub previous: Option<InterpretiveLoad>,
    /// Current closure.
    pub closure: ObservationClosure,
    /// Current persistence.
    pub persistence: EmergencePersistence,
    /// Current stabilized regime.
    pub regime: Regime,
    /// Current deviation magnitude.
    pub deviation: f32,
    /// Continuity holds.
    pub continuity: bool,
    /// Current feedback mode.
    pub feedback: FeedbackMode,
    /// Cluster count.
    pub clusters: usize,
    /// Association count.
    pub associations: usize,
}

impl LoadInputs {
    fn persistent(&self) -> bool {
        self.persistence == EmergencePersistence::Persistent
    }

    fn enters_constrained(&self) -> bool {
        self.persistent() && self.deviation > 0.4 && self.continuity
    }

    fn holds_constrained(&self) -> bool {
        self.persistent() && self.deviation > 0.3 && self.continuity
    }

    fn saturation_holds(&self) -> bool {
        self.deviation > 0.7
            && self.feedback == FeedbackMode::ObserverDominant
            && self.clusters >= 3
            && self.associations >= 2
    }
}

/// Compute this period's load.
pub fn regulate_load(i: &LoadInputs) -> InterpretiveLoad {
    if i.closure.is_closed() || i.persistence == EmergencePersistence::Collapsed {
        return InterpretiveLoad::Minimal;
    }
    if i.regime == Regime::Deterministic {
        return if i.persistent() && i.deviation > 0.5 {
            InterpretiveLoad::Constrained
        } else {
            InterpretiveLoad::Minimal
        };
    }
    match i.previous {
        None | Some(InterpretiveLoad::Minimal) => {
            if i.enters_constrained() {
                InterpretiveLoad::Constrained
            } else {
                InterpretiveLoad::Minimal
            }
        }
        Some(InterpretiveLoad::Constrained) => {
            if !i.holds_constrained() {
                InterpretiveLoad::Minimal
            } else if i.saturation_holds() {
                InterpretiveLoad::Saturated
            } else {
                InterpretiveLoad::Constrained
            }
        }
        Some(InterpretiveLoad::Saturated) => {
            if i.holds_constrained() && i.saturation_holds() {
                InterpretiveLoad::Saturated
            } else if i.holds_constrained() {
                InterpretiveLoad::Constrained
            } else {
                InterpretiveLoad::Minimal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong(previous: Option<InterpretiveLoad>) -> LoadInputs {
        LoadInputs {
            previous,
            closure: ObservationClosure::Open,
            persistence: EmergencePersistence::Persistent,
            regime: Regime::Emergent,
            deviation: 0.9,
            continuity: true,
            feedback: FeedbackMode::ObserverDominant,
            clusters: 4,
            associations: 3,
        }
    }

    #[test]
    fn test_collapse_resets_to_minimal() {
        for prev in [None, Some(InterpretiveLoad::Constrained), Some(InterpretiveLoad::Saturated)] {
            let mut i = strong(prev);
            i.persistence = EmergencePersistence::Collapsed;
            assert_eq!(regulate_load(&i), InterpretiveLoad::Minimal);
        }
    }

    #[test]
    fn test_closed_is_minimal() {
        let mut i = strong(Some(InterpretiveLoad::Saturated));
        i.closure = ObservationClosure::Closed;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Minimal);
    }

    #[test]
    fn test_one_step_climb() {
        assert_eq!(regulate_load(&strong(None)), InterpretiveLoad::Constrained);
        assert_eq!(
            regulate_load(&strong(Some(InterpretiveLoad::Minimal))),
            InterpretiveLoad::Constrained
        );
        assert_eq!(
            regulate_load(&strong(Some(InterpretiveLoad::Constrained))),
            InterpretiveLoad::Saturated
        );
        assert_eq!(
            regulate_load(&strong(Some(InterpretiveLoad::Saturated))),
            InterpretiveLoad::Saturated
        );
    }

    #[test]
    fn test_saturated_steps_down() {
        let mut i = strong(Some(InterpretiveLoad::Saturated));
        i.associations = 1;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Constrained);
        i.deviation = 0.2;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Minimal);
    }

    #[test]
    fn test_constrained_falls_without_evidence() {
        let mut i = strong(Some(InterpretiveLoad::Constrained));
        i.persistence = EmergencePersistence::Transient;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Minimal);
    }

    #[test]
    fn test_deterministic_bias() {
        let mut i = strong(Some(InterpretiveLoad::Saturated));
        i.regime = Regime::Deterministic;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Constrained);
        i.deviation = 0.45;
        assert_eq!(regulate_load(&i), InterpretiveLoad::Minimal);
    }
}
