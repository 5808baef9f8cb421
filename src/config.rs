/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Aggregate pipeline configuration.
//!
//! Each stage owns its own config struct with `Default` holding the reference
//! constants; [`InferenceConfig`] bundles them for a session.

use crate::decay::DecayConfig;
use crate::error::{InferenceError, Result};
use crate::irreversibility::IrreversibilityConfig;
use crate::regime::StabilizerConfig;
use crate::saturation::SaturationConfig;

/// All tunables for one inference session.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InferenceConfig {
    /// Regime hysteresis.
    pub stabilizer: StabilizerConfig,
    /// Entropic decay.
    pub decay: DecayConfig,
    /// Saturation ceiling.
    pub saturation: SaturationConfig,
    /// Irreversibility history.
    pub irreversibility: IrreversibilityConfig,
}

impl InferenceConfig {
    /// Reject self-contradictory settings.
    pub fn validate(&self) -> Result<()> {
        let s = &self.stabilizer;
        let unit = 0.0..=1.0;
        if !unit.contains(&s.enter_threshold) || !unit.contains(&s.exit_threshold) {
            return Err(InferenceError::InvalidConfig("hysteresis thresholds must lie in [0, 1]"));
        }
        if s.enter_threshold <= s.exit_threshold {
            return Err(InferenceError::InvalidConfig(
                "enter threshold must exceed exit threshold",
            ));
        }
        if s.min_dwell == 0 {
            return Err(InferenceError::InvalidConfig("minimum dwell must be at least 1"));
        }

        let d = &self.decay;
        if d.half_life_ms == 0 {
            return Err(InferenceError::InvalidConfig("decay half-life must be positive"));
        }
        if !unit.contains(&d.decayed_below) {
            return Err(InferenceError::InvalidConfig("decay floor must lie in [0, 1]"));
        }
        let (lo, hi) = d.density_clamp;
        if !(lo > 0.0 && lo <= hi) {
            return Err(InferenceError::InvalidConfig("density clamp must satisfy 0 < lo <= hi"));
        }

        if self.irreversibility.history_window == 0 {
            return Err(InferenceError::InvalidConfig("irreversibility window must be at least 1"));
        }
        Ok(())
    }
}
