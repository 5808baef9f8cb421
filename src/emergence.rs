/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Constraint-relative emergence signal.
//!
//! Emergence is structure more improbable than the observer's own constraint
//! baseline predicts, not mere change. The baseline comes from
//! [`InitialConditions`]; the observation is compared to it as relative
//! deviation ratios.
//!
//! # Baseline
//!
//! | Level | expected clusters (by constraint density) | expected association density (by authority) | expected variance (by variability) |
//! |---|---|---|---|
//! | high | 2 | 0.6 | 2.0 |
//! | medium | 3 | 0.3 | 1.0 |
//! | low | 4 | 0.2 | 0.5 |
//!
//! # Invariants
//!
//! - **EMR-001**: silent (`None`) when closed, deterministic, baseline absent or
//!   constraint density low.
//! - **EMR-002**: a single-period anomaly is silent; the deviation must persist
//!   into at least one supplied prior period.
//! - **EMR-003**: silent under environment-dominant feedback.

use crate::closure::ObservationClosure;
use crate::feedback::FeedbackMode;
use crate::model::{InitialConditions, Level};
use crate::regime::Regime;
use crate::signals::StructuralSignals;

/// Deviation ratio a period must exceed to count as anomalous.
pub const DEVIATION_FLOOR: f32 = 0.2;
/// Deviation required for a strong signal.
const STRONG_DEVIATION: f32 = 0.4;
/// Period variance above which, without continuity, the deviation is noise.
const NOISE_VARIANCE: f32 = 2.0;

/// Emergence signal strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EmergenceSignal {
    /// No emergence.
    None,
    /// Weak, transitional emergence.
    Weak,
    /// Strong emergence.
    Strong,
}

impl EmergenceSignal {
    /// True for `Weak` or `Strong`.
    pub fn is_present(&self) -> bool {
        !matches!(self, EmergenceSignal::None)
    }
}

/// Structure the baseline predicts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintBaseline {
    /// Expected number of clusters.
    pub expected_clusters: f32,
    /// Expected association density.
    pub expected_association_density: f32,
    /// Expected period variance.
    pub expected_variance: f32,
}

impl ConstraintBaseline {
    /// Derive expectations from initial conditions.
    pub fn from_initial(ic: &InitialConditions) -> Self {
        let expected_clusters = match ic.constraint_density {
            Level::High => 2.0,
            Level::Medium => 3.0,
            Level::Low => 4.0,
        };
        let expected_association_density = match ic.authority_concentration {
            Level::High => 0.6,
            Level::Medium => 0.3,
            Level::Low => 0.2,
        };
        let expected_variance = match ic.variability_baseline {
            Level::High => 2.0,
            Level::Medium => 1.0,
            Level::Low => 0.5,
        };
        Self { expected_clusters, expected_association_density, expected_variance }
    }
}

/// Relative deviation of observed structure from the baseline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstraintDeviation {
    /// `|observed − expected| / expected` for cluster count.
    pub cluster_count: f32,
    /// Same ratio for association density.
    pub association_density: f32,
    /// Same ratio for period variance.
    pub variance: f32,
}

impl ConstraintDeviation {
    /// Compare signals to a baseline.
    pub fn measure(signals: &StructuralSignals, baseline: &ConstraintBaseline) -> Self {
        let ratio = |observed: f32, expected: f32| {
            if expected <= 0.0 {
                0.0
            } else {
                (observed - expected).abs() / expected
            }
        };
        Self {
            cluster_count: ratio(signals.cluster_count as f32, baseline.expected_clusters),
            association_density: ratio(
                signals.association_density,
                baseline.expected_association_density,
            ),
            variance: ratio(signals.period_variance, baseline.expected_variance),
        }
    }

    /// Largest ratio, clamped to [0.0, 1.0]. This is "the deviation" read by
    /// persistence, load and irreversibility.
    pub fn magnitude(&self) -> f32 {
        self.cluster_count
            .max(self.association_density)
            .max(self.variance)
            .clamp(0.0, 1.0)
    }

    /// True if at least one ratio exceeds [`DEVIATION_FLOOR`].
    pub fn is_anomalous(&self) -> bool {
        self.cluster_count > DEVIATION_FLOOR
            || self.association_density > DEVIATION_FLOOR
            || self.variance > DEVIATION_FLOOR
    }
}

/// Deviation magnitude for a period, or 0.0 without a baseline.
pub fn deviation_magnitude(signals: &StructuralSignals, initial: Option<&InitialConditions>) -> f32 {
    initial.map_or(0.0, |ic| {
        ConstraintDeviation::measure(signals, &ConstraintBaseline::from_initial(ic)).magnitude()
    })
}

/// Inputs to [`infer_emergence`].
#[derive(Clone, Copy, Debug)]
pub struct EmergenceInputs<'a> {
    /// Period closure.
    pub closure: ObservationClosure,
    /// Stabilized regime.
    pub regime: Regime,
    /// Feedback mode.
    pub feedback: FeedbackMode,
    /// Session baseline.
    pub initial_conditions: Option<&'a InitialConditions>,
    /// Structural signals of the period.
    pub signals: &'a StructuralSignals,
    /// Signals of supplied prior periods, oldest first.
    pub prior_signals: &'a [StructuralSignals],
    /// Continuity note present.
    pub continuity: bool,
}

/// Decide the emergence signal for one period.
pub fn infer_emergence(inputs: &EmergenceInputs<'_>) -> EmergenceSignal {
    if inputs.closure.is_closed() || inputs.regime == Regime::Deterministic {
        return EmergenceSignal::None;
    }
    let Some(ic) = inputs.initial_conditions else {
        return EmergenceSignal::None;
    };
    if ic.constraint_density == Level::Low {
        return EmergenceSignal::None;
    }

    let baseline = ConstraintBaseline::from_initial(ic);
    let deviation = ConstraintDeviation::measure(inputs.signals, &baseline);
    if !deviation.is_anomalous() {
        return EmergenceSignal::None;
    }

    let persisted = inputs
        .prior_signals
        .last()
        .map_or(false, |prior| ConstraintDeviation::measure(prior, &baseline).is_anomalous());
    if !persisted {
        return EmergenceSignal::None;
    }

    if inputs.feedback == FeedbackMode::EnvironmentDominant {
        return EmergenceSignal::None;
    }
    if inputs.signals.period_variance > NOISE_VARIANCE && !inputs.continuity {
        return EmergenceSignal::None;
    }

    let magnitude = deviation.magnitude();
    match (inputs.regime, inputs.feedback) {
        (Regime::Emergent, FeedbackMode::ObserverDominant) if magnitude > STRONG_DEVIATION => {
            EmergenceSignal::Strong
        }
        (Regime::Transitional, FeedbackMode::Coupled | FeedbackMode::ObserverDominant)
            if magnitude > DEVIATION_FLOOR =>
        {
            EmergenceSignal::Weak
        }
        _ => EmergenceSignal::None,
    }
}
