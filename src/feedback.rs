/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Observer–environment feedback attribution.
//!
//! Decides whether recent structure is dominated by the environment (recurring,
//! continuous, low novelty), by the observer's own pattern formation (new
//! clusters, asymmetry, drift), or by both.
//!
//! ```text
//! environment = 0.35·recurrence + 0.25·(1−norm(size_var)) + 0.25·continuity + 0.15·(1−new_rate)
//! observer    = 0.30·new_rate + 0.25·recent_formation + 0.25·asymmetry + 0.20·drift
//! diff        = environment − observer
//! ```
//!
//! # Invariants
//!
//! - **FB-001**: a closed period is always `EnvironmentDominant`.
//! - **FB-002**: both influences are bounded [0.0, 1.0].

use crate::closure::ObservationClosure;
use crate::model::{InitialConditions, Level};
use crate::signals::{normalized_variance, StructuralSignals};

/// Base decision threshold on `|diff|`.
const BASE_THRESHOLD: f32 = 0.15;
/// Threshold under high constraint density.
const HIGH_CONSTRAINT_THRESHOLD: f32 = 0.2;
/// Nudge applied toward the environment by strong baselines.
const BASELINE_NUDGE: f32 = 0.05;
/// Lower bound of the band in which baseline nudges apply.
const NUDGE_FLOOR: f32 = -0.1;

/// Which side dominates recent structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum FeedbackMode {
    /// Environment drives recurring structure.
    EnvironmentDominant,
    /// Environment and observer shape each other.
    Coupled,
    /// Observer's own pattern formation dominates.
    ObserverDominant,
}

impl FeedbackMode {
    /// Upper-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackMode::EnvironmentDominant => "ENVIRONMENT_DOMINANT",
            FeedbackMode::Coupled => "COUPLED",
            FeedbackMode::ObserverDominant => "OBSERVER_DOMINANT",
        }
    }
}

/// The two influence scores behind a feedback decision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Influence {
    /// Environment influence [0.0, 1.0].
    pub environment: f32,
    /// Observer influence [0.0, 1.0].
    pub observer: f32,
}

impl Influence {
    /// Score both influences from the period's signals.
    pub fn compute(signals: &StructuralSignals, continuity: bool, drift: bool) -> Self {
        let environment = 0.35 * signals.recurrence_ratio
            + 0.25 * (1.0 - normalized_variance(signals.frequency_variance))
            + 0.25 * if continuity { 1.0 } else { 0.0 }
            + 0.15 * (1.0 - signals.new_cluster_rate);
        let observer = 0.3 * signals.new_cluster_rate
            + 0.25 * signals.recent_formation_ratio
            + 0.25 * signals.asymmetry
            + 0.2 * if drift { 1.0 } else { 0.0 };
        Self {
            environment: environment.clamp(0.0, 1.0),
            observer: observer.clamp(0.0, 1.0),
        }
    }
}

/// Inputs to [`infer_feedback`].
#[derive(Clone, Copy, Debug)]
pub struct FeedbackInputs<'a> {
    /// Period closure.
    pub closure: ObservationClosure,
    /// Structural signals.
    pub signals: &'a StructuralSignals,
    /// Continuity note present.
    pub continuity: bool,
    /// Raw drift present.
    pub drift: bool,
    /// Session baseline, if known.
    pub initial_conditions: Option<&'a InitialConditions>,
}

/// Attribute the period's structure to environment, observer, or both.
pub fn infer_feedback(inputs: &FeedbackInputs<'_>) -> FeedbackMode {
    if inputs.closure.is_closed() {
        return FeedbackMode::EnvironmentDominant;
    }
    let inf = Influence::compute(inputs.signals, inputs.continuity, inputs.drift);
    decide(inf.environment - inf.observer, inputs.initial_conditions)
}

/// Threshold decision on `diff = environment − observer`, adjusted by baseline.
pub fn decide(diff: f32, initial: Option<&InitialConditions>) -> FeedbackMode {
    let mut diff = diff;
    let mut threshold = BASE_THRESHOLD;
    if let Some(ic) = initial {
        if ic.constraint_density == Level::High {
            threshold = HIGH_CONSTRAINT_THRESHOLD;
            if diff > NUDGE_FLOOR && diff < threshold {
                diff += BASELINE_NUDGE;
            }
        }
        if ic.authority_concentration == Level::High && diff > NUDGE_FLOOR {
            diff += BASELINE_NUDGE;
        }
    }
    if diff > threshold {
        FeedbackMode::EnvironmentDominant
    } else if diff < -threshold {
        FeedbackMode::ObserverDominant
    } else {
        FeedbackMode::Coupled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high_both() -> InitialConditions {
        InitialConditions::new(Level::High, Level::High, Level::Medium)
    }

    #[test]
    fn test_closed_forces_environment() {
        let s = StructuralSignals { new_cluster_rate: 1.0, asymmetry: 1.0, ..StructuralSignals::default() };
        let inputs = FeedbackInputs {
            closure: ObservationClosure::Closed,
            signals: &s,
            continuity: false,
            drift: true,
            initial_conditions: None,
        };
        assert_eq!(infer_feedback(&inputs), FeedbackMode::EnvironmentDominant);
    }

    #[test]
    fn test_base_thresholds() {
        assert_eq!(decide(0.2, None), FeedbackMode::EnvironmentDominant);
        assert_eq!(decide(-0.2, None), FeedbackMode::ObserverDominant);
        assert_eq!(decide(0.1, None), FeedbackMode::Coupled);
        assert_eq!(decide(-0.1, None), FeedbackMode::Coupled);
    }

    #[test]
    fn test_high_constraint_raises_threshold() {
        let ic = InitialConditions::new(Level::High, Level::Low, Level::Low);
        // 0.18 > 0.15 but < 0.2; nudged to 0.23 → environment.
        assert_eq!(decide(0.18, Some(&ic)), FeedbackMode::EnvironmentDominant);
        // 0.1 nudged to 0.15, still under 0.2.
        assert_eq!(decide(0.1, Some(&ic)), FeedbackMode::Coupled);
        // -0.18 lies outside the nudge band and within -0.2.
        assert_eq!(decide(-0.18, Some(&ic)), FeedbackMode::Coupled);
    }

    #[test]
    fn test_authority_nudge() {
        let ic = InitialConditions::new(Level::Medium, Level::High, Level::Low);
        assert_eq!(decide(0.12, Some(&ic)), FeedbackMode::EnvironmentDominant);
        assert_eq!(decide(-0.3, Some(&ic)), FeedbackMode::ObserverDominant);
        // Both nudges stack.
        assert_eq!(decide(0.11, Some(&high_both())), FeedbackMode::EnvironmentDominant);
    }

    #[test]
    fn test_observer_dominant_from_signals() {
        let s = StructuralSignals {
            cluster_count: 2,
            new_cluster_rate: 1.0,
            recent_formation_ratio: 1.0,
            asymmetry: 0.8,
            frequency_variance: 4.0,
            ..StructuralSignals::default()
        };
        let inputs = FeedbackInputs {
            closure: ObservationClosure::Open,
            signals: &s,
            continuity: false,
            drift: true,
            initial_conditions: None,
        };
        let inf = Influence::compute(&s, false, true);
        assert!(inf.observer > inf.environment);
        assert_eq!(infer_feedback(&inputs), FeedbackMode::ObserverDominant);
    }
}
