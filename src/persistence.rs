/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Emergence persistence across periods.
//!
//! # Collapse triggers
//!
//! Any one of these fires a collapse check:
//!
//! - the period is closed
//! - the signal is `None` after a non-none prior signal
//! - the regime is deterministic after an emergent prior regime
//! - deviation falls below 0.2
//! - continuity fragments (prior had continuity, current does not)
//! - period variance spikes to ≥1.5× the historical average
//!
//! With a non-none prior signal a trigger yields `Collapsed`; otherwise `None`.
//!
//! # Invariants
//!
//! - **PER-001**: collapse dominates every other outcome.
//! - **PER-002**: `Persistent` requires a prior non-none signal, deviation ≥0.2,
//!   continuity and non-environment-dominant feedback.

use crate::closure::ObservationClosure;
use crate::emergence::{EmergenceSignal, DEVIATION_FLOOR};
use crate::feedback::FeedbackMode;
use crate::regime::Regime;

/// Multiple of the historical average variance treated as a spike.
const VARIANCE_SPIKE: f32 = 1.5;

/// Whether an emergence signal is a one-off, ongoing, or collapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EmergencePersistence {
    /// Nothing to persist.
    None,
    /// A one-off signal.
    Transient,
    /// A signal sustained across periods.
    Persistent,
    /// A previously present signal has fallen apart.
    Collapsed,
}

/// What the previous period looked like.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorPeriod {
    /// Emergence signal of the prior period.
    pub signal: EmergenceSignal,
    /// Stabilized regime of the prior period.
    pub regime: Regime,
    /// Continuity held in the prior period.
    pub continuity: bool,
}

/// Inputs to [`infer_persistence`].
#[derive(Clone, Copy, Debug)]
pub struct PersistenceInputs<'a> {
    /// Current signal.
    pub signal: EmergenceSignal,
    /// Current closure.
    pub closure: ObservationClosure,
    /// Current stabilized regime.
    pub regime: Regime,
    /// Current feedback mode.
    pub feedback: FeedbackMode,
    /// Current deviation magnitude.
    pub deviation: f32,
    /// Continuity holds now.
    pub continuity: bool,
    /// Current period variance.
    pub period_variance: f32,
    /// Mean period variance over prior periods (0.0 if none).
    pub historical_variance: f32,
    /// Immediately prior period, if supplied.
    pub previous: Option<PriorPeriod>,
    /// Signals of all supplied prior periods, oldest first.
    pub prior_signals: &'a [EmergenceSignal],
}

fn collapse_triggered(i: &PersistenceInputs<'_>) -> bool {
    if i.closure.is_closed() || i.deviation < DEVIATION_FLOOR {
        return true;
    }
    if i.historical_variance > 0.0 && i.period_variance >= VARIANCE_SPIKE * i.historical_variance {
        return true;
    }
    let Some(prev) = i.previous else {
        return false;
    };
    (!i.signal.is_present() && prev.signal.is_present())
        || (i.regime == Regime::Deterministic && prev.regime == Regime::Emergent)
        || (prev.continuity && !i.continuity)
}

/// Classify persistence for one period.
pub fn infer_persistence(i: &PersistenceInputs<'_>) -> EmergencePersistence {
    let prior_present = i.previous.map_or(false, |p| p.signal.is_present());
    if collapse_triggered(i) {
        return if prior_present {
            EmergencePersistence::Collapsed
        } else {
            EmergencePersistence::None
        };
    }
    if !i.signal.is_present() {
        return EmergencePersistence::None;
    }
    let qualifying_prior = i.prior_signals.iter().any(EmergenceSignal::is_present);
    if qualifying_prior
        && i.deviation >= DEVIATION_FLOOR
        && i.continuity
        && i.feedback != FeedbackMode::EnvironmentDominant
    {
        EmergencePersistence::Persistent
    } else {
        EmergencePersistence::Transient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base<'a>(prior_signals: &'a [EmergenceSignal]) -> PersistenceInputs<'a> {
        PersistenceInputs {
            signal: EmergenceSignal::Weak,
            closure: ObservationClosure::Open,
            regime: Regime::Transitional,
            feedback: FeedbackMode::Coupled,
            deviation: 0.5,
            continuity: true,
            period_variance: 1.0,
            historical_variance: 1.0,
            previous: prior_signals.last().map(|&s| PriorPeriod {
                signal: s,
                regime: Regime::Transitional,
                continuity: true,
            }),
            prior_signals,
        }
    }

    #[test]
    fn test_first_signal_is_transient() {
        let i = base(&[]);
        assert_eq!(infer_persistence(&i), EmergencePersistence::Transient);
    }

    #[test]
    fn test_sustained_signal_is_persistent() {
        let prior = [EmergenceSignal::Weak];
        assert_eq!(infer_persistence(&base(&prior)), EmergencePersistence::Persistent);
    }

    #[test]
    fn test_environment_dominant_blocks_persistent() {
        let prior = [EmergenceSignal::Weak];
        let mut i = base(&prior);
        i.feedback = FeedbackMode::EnvironmentDominant;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Transient);
    }

    #[test]
    fn test_signal_loss_collapses() {
        let prior = [EmergenceSignal::Strong];
        let mut i = base(&prior);
        i.signal = EmergenceSignal::None;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);
    }

    #[test]
    fn test_triggers_without_prior_signal_yield_none() {
        let prior = [EmergenceSignal::None];
        let mut i = base(&prior);
        i.closure = ObservationClosure::Closed;
        assert_eq!(infer_persistence(&i), EmergencePersistence::None);
    }

    #[test]
    fn test_each_trigger_collapses() {
        let prior = [EmergenceSignal::Weak];

        let mut i = base(&prior);
        i.closure = ObservationClosure::Closed;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);

        let mut i = base(&prior);
        i.deviation = 0.1;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);

        let mut i = base(&prior);
        i.continuity = false;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);

        let mut i = base(&prior);
        i.period_variance = 1.5;
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);

        let mut i = base(&prior);
        i.regime = Regime::Deterministic;
        i.previous = Some(PriorPeriod {
            signal: EmergenceSignal::Strong,
            regime: Regime::Emergent,
            continuity: true,
        });
        assert_eq!(infer_persistence(&i), EmergencePersistence::Collapsed);
    }

    #[test]
    fn test_no_signal_no_prior_is_none() {
        let mut i = base(&[]);
        i.signal = EmergenceSignal::None;
        assert_eq!(infer_persistence(&i), EmergencePersistence::None);
    }
}
