/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Observer position and positional drift.
//!
//! Position is a short neutral phrase locating the observer relative to their
//! own structure. It is returned only above a confidence floor; below it the
//! answer is silence (`None`).
//!
//! # Invariants
//!
//! - **POS-001**: every phrase is at most six words.
//! - **POS-002**: drift requires both positions and a meaningful difference.
//! - **POS-003**: drift is suppressed entirely under environment-dominant feedback.

use crate::feedback::FeedbackMode;
use crate::regime::Regime;
use crate::signals::StructuralSignals;

/// Position phrases.
pub mod phrase {
    /// Deterministic with ≥3 stable clusters.
    pub const NEAR_INHERITED_CONSTRAINTS: &str = "Near inherited constraints";
    /// Deterministic otherwise.
    pub const WITHIN_FAMILIAR_STRUCTURE: &str = "Within familiar structure";
    /// Transitional with associations present.
    pub const AT_TRANSITIONAL_BOUNDARY: &str = "At a transitional boundary";
    /// Transitional without associations.
    pub const BETWEEN_PATTERNS: &str = "Between established patterns";
    /// Emergent with strong asymmetry.
    pub const AT_CONSTRAINT_EMERGENCE_EDGE: &str = "At a constraint–emergence edge";
    /// Emergent otherwise.
    pub const NEAR_EMERGING_PATTERN: &str = "Near an emerging pattern";
}

/// Asymmetry at or above which an emergent position reads as an edge.
const STRONG_ASYMMETRY: f32 = 0.5;

/// Inputs to [`infer_position`].
#[derive(Clone, Copy, Debug)]
pub struct PositionInputs<'a> {
    /// Stabilized regime.
    pub regime: Regime,
    /// Structural signals of the period.
    pub signals: &'a StructuralSignals,
    /// Clusters spanning ≥3 periods.
    pub stable_clusters: usize,
    /// Clusters spanning ≥2 periods.
    pub dominant_clusters: usize,
}

/// Locate the observer, or `None` below the confidence floor.
///
/// Floor: ≥2 clusters for deterministic/transitional, ≥1 dominant cluster
/// (spanning ≥2 periods) for emergent.
pub fn infer_position(inputs: &PositionInputs<'_>) -> Option<&'static str> {
    let s = inputs.signals;
    match inputs.regime {
        Regime::Deterministic => {
            if s.cluster_count < 2 {
                return None;
            }
            Some(if inputs.stable_clusters >= 3 {
                phrase::NEAR_INHERITED_CONSTRAINTS
            } else {
                phrase::WITHIN_FAMILIAR_STRUCTURE
            })
        }
        Regime::Transitional => {
            if s.cluster_count < 2 {
                return None;
            }
            Some(if s.association_count > 0 {
                phrase::AT_TRANSITIONAL_BOUNDARY
            } else {
                phrase::BETWEEN_PATTERNS
            })
        }
        Regime::Emergent => {
            if inputs.dominant_clusters < 1 {
                return None;
            }
            Some(if s.asymmetry >= STRONG_ASYMMETRY {
                phrase::AT_CONSTRAINT_EMERGENCE_EDGE
            } else {
                phrase::NEAR_EMERGING_PATTERN
            })
        }
    }
}

/// Raw drift between the prior and current period, before feedback suppression.
///
/// Returns `None` unless both positions exist and differ.
pub fn infer_drift(
    previous: Option<(&str, Regime)>,
    current: Option<(&str, Regime)>,
) -> Option<&'static str> {
    let (prev_pos, prev_regime) = previous?;
    let (cur_pos, cur_regime) = current?;
    if prev_pos == cur_pos {
        return None;
    }
    Some(match (prev_regime, cur_regime) {
        (Regime::Deterministic, Regime::Transitional) => "Loosening from inherited constraints",
        (Regime::Deterministic, Regime::Emergent) => "Departing inherited constraints",
        (Regime::Transitional, Regime::Emergent) => "Moving toward emergent structure",
        (Regime::Emergent, Regime::Transitional) => "Settling back toward a boundary",
        (_, Regime::Deterministic) if prev_regime != Regime::Deterministic => {
            "Returning toward familiar structure"
        }
        _ => "Repositioning within the same structure",
    })
}

/// Apply feedback suppression to a raw drift phrase.
pub fn effective_drift<T>(raw: Option<T>, feedback: FeedbackMode) -> Option<T> {
    match feedback {
        FeedbackMode::EnvironmentDominant => None,
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(regime: Regime, s: &StructuralSignals, stable: usize, dominant: usize) -> PositionInputs<'_> {
        PositionInputs { regime, signals: s, stable_clusters: stable, dominant_clusters: dominant }
    }

    #[test]
    fn test_confidence_floor() {
        let one = StructuralSignals { cluster_count: 1, ..StructuralSignals::default() };
        assert!(infer_position(&inputs(Regime::Deterministic, &one, 1, 1)).is_none());
        assert!(infer_position(&inputs(Regime::Transitional, &one, 1, 1)).is_none());
        assert!(infer_position(&inputs(Regime::Emergent, &one, 0, 0)).is_none());
        assert!(infer_position(&inputs(Regime::Emergent, &one, 0, 1)).is_some());
    }

    #[test]
    fn test_phrases_per_regime() {
        let s = StructuralSignals {
            cluster_count: 3,
            association_count: 1,
            asymmetry: 0.6,
            ..StructuralSignals::default()
        };
        assert_eq!(
            infer_position(&inputs(Regime::Deterministic, &s, 3, 3)),
            Some(phrase::NEAR_INHERITED_CONSTRAINTS)
        );
        assert_eq!(
            infer_position(&inputs(Regime::Transitional, &s, 3, 3)),
            Some(phrase::AT_TRANSITIONAL_BOUNDARY)
        );
        assert_eq!(
            infer_position(&inputs(Regime::Emergent, &s, 0, 1)),
            Some(phrase::AT_CONSTRAINT_EMERGENCE_EDGE)
        );
    }

    #[test]
    fn test_phrases_are_short() {
        for p in [
            phrase::NEAR_INHERITED_CONSTRAINTS,
            phrase::WITHIN_FAMILIAR_STRUCTURE,
            phrase::AT_TRANSITIONAL_BOUNDARY,
            phrase::BETWEEN_PATTERNS,
            phrase::AT_CONSTRAINT_EMERGENCE_EDGE,
            phrase::NEAR_EMERGING_PATTERN,
        ] {
            assert!(p.split_whitespace().count() <= 6, "{p}");
        }
    }

    #[test]
    fn test_drift_requires_both_and_difference() {
        let a = (phrase::NEAR_INHERITED_CONSTRAINTS, Regime::Deterministic);
        let b = (phrase::AT_TRANSITIONAL_BOUNDARY, Regime::Transitional);
        assert!(infer_drift(None, Some(b)).is_none());
        assert!(infer_drift(Some(a), None).is_none());
        assert!(infer_drift(Some(a), Some(a)).is_none());
        assert_eq!(infer_drift(Some(a), Some(b)), Some("Loosening from inherited constraints"));
        assert_eq!(infer_drift(Some(b), Some(a)), Some("Returning toward familiar structure"));
    }

    #[test]
    fn test_environment_dominant_suppresses_drift() {
        let raw = Some("Loosening from inherited constraints");
        assert!(effective_drift(raw, FeedbackMode::EnvironmentDominant).is_none());
        assert_eq!(effective_drift(raw, FeedbackMode::Coupled), raw);
    }
}
