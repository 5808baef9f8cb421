/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Interpretive irreversibility — a one-way lock after repeated collapse.
//!
//! # States
//!
//! ```text
//!            1 collapse                 further collapse
//!   open ──────────────▶ hardened ───────────────────────▶ locked
//!     ▲                     │
//!     └─ extreme evidence ──┘   (only once no collapse remains in the window)
//! ```
//!
//! - `Open`: default; output flows through later gates.
//! - `Hardened`: output only under the extreme evidence bundle.
//! - `Locked`: all narrative and continuations suppressed; never relaxes within
//!   a session.
//!
//! A new session always starts `Open`.
//!
//! # Invariants
//!
//! - **IRR-001**: `Locked` is absorbing within a session.
//! - **IRR-002**: ≥2 collapses inside the window plus the current period lock.
//! - **IRR-003**: the function is pure; the session passes the state from
//!   before the current period was first counted, so recomputing a period
//!   never escalates twice.

use crate::feedback::FeedbackMode;
use crate::load::InterpretiveLoad;
use crate::persistence::EmergencePersistence;

/// Lock state on re-surfacing interpretation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum InterpretiveIrreversibility {
    /// No lock.
    #[default]
    Open,
    /// Output requires the extreme evidence bundle.
    Hardened,
    /// All interpretive output suppressed.
    Locked,
}

impl InterpretiveIrreversibility {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpretiveIrreversibility::Open => "open",
            InterpretiveIrreversibility::Hardened => "hardened",
            InterpretiveIrreversibility::Locked => "locked",
        }
    }
}

/// Tuning for [`infer_irreversibility`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IrreversibilityConfig {
    /// Number of prior periods inspected for collapses. Default 4.
    pub history_window: usize,
}

impl Default for IrreversibilityConfig {
    fn default() -> Self {
        Self { history_window: 4 }
    }
}

/// The strongest evidence bundle the pipeline recognises.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EvidenceBundle {
    /// Current persistence.
    pub persistence: EmergencePersistence,
    /// Current deviation magnitude.
    pub deviation: f32,
    /// Continuity holds.
    pub continuity: bool,
    /// Current feedback mode.
    pub feedback: FeedbackMode,
    /// Current load.
    pub load: InterpretiveLoad,
}

impl EvidenceBundle {
    /// `persistent ∧ deviation > 0.6 ∧ continuity ∧ observer-dominant ∧ load ≠ minimal`.
    pub fn is_extreme(&self) -> bool {
        self.persistence == EmergencePersistence::Persistent
            && self.deviation > 0.6
            && self.continuity
            && self.feedback == FeedbackMode::ObserverDominant
            && self.load != InterpretiveLoad::Minimal
    }
}

/// Inputs to [`infer_irreversibility`].
#[derive(Clone, Copy, Debug)]
pub struct IrreversibilityInputs<'a> {
    /// State before the current period was first counted in this session.
    pub previous: InterpretiveIrreversibility,
    /// Persistence of prior periods, oldest first.
    pub history: &'a [EmergencePersistence],
    /// Current persistence.
    pub current: EmergencePersistence,
    /// Current evidence.
    pub evidence: EvidenceBundle,
}

/// Advance the irreversibility state.
pub fn infer_irreversibility(
    inputs: &IrreversibilityInputs<'_>,
    config: &IrreversibilityConfig,
) -> InterpretiveIrreversibility {
    use InterpretiveIrreversibility::*;

    let start = inputs.history.len().saturating_sub(config.history_window);
    let window_collapses = inputs.history[start..]
        .iter()
        .filter(|p| **p == EmergencePersistence::Collapsed)
        .count();
    let current_collapsed = inputs.current == EmergencePersistence::Collapsed;
    let collapses = window_collapses + usize::from(current_collapsed);

    let next = match inputs.previous {
        Locked => Locked,
        _ if collapses >= 2 => Locked,
        Hardened if current_collapsed => Locked,
        Hardened => {
            if window_collapses == 0 && inputs.evidence.is_extreme() {
                Open
            } else {
                Hardened
            }
        }
        Open if collapses == 1 => Hardened,
        Open => Open,
    };
    if next > inputs.previous {
        tracing::info!(
            from = inputs.previous.as_str(),
            to = next.as_str(),
            collapses,
            "interpretive irreversibility escalated"
        );
    }
    next
}

/// True if the state permits interpretive output given the current evidence.
pub fn permits_output(state: InterpretiveIrreversibility, evidence: &EvidenceBundle) -> bool {
    match state {
        InterpretiveIrreversibility::Open => true,
        InterpretiveIrreversibility::Hardened => evidence.is_extreme(),
        InterpretiveIrreversibility::Locked => false,
    }
}
