/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Epistemic boundary seal — the terminal, session-monotonic gate.
//!
//! # Invariants
//!
//! - **SEAL-001**: within a session, once `epistemically_closed` is true, every
//!   later computation returns true with the original reason, for any input.
//! - **SEAL-002**: a new session recomputes from scratch: closed iff the period
//!   is closed or irreversibility is locked.

use crate::closure::ObservationClosure;
use crate::irreversibility::InterpretiveIrreversibility;

/// Why the seal closed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SealReason {
    /// Not sealed.
    #[default]
    None,
    /// Sealed by observation closure.
    Closure,
    /// Sealed by a locked irreversibility state.
    Locked,
}

impl SealReason {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SealReason::None => "none",
            SealReason::Closure => "closure",
            SealReason::Locked => "locked",
        }
    }
}

/// Session-scoped "no further inference" flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EpistemicBoundarySeal {
    /// True once no further interpretation may surface this session.
    pub epistemically_closed: bool,
    /// What closed it.
    pub reason: SealReason,
}

impl EpistemicBoundarySeal {
    /// An open seal.
    pub const OPEN: Self = Self { epistemically_closed: false, reason: SealReason::None };

    fn closed(reason: SealReason) -> Self {
        Self { epistemically_closed: true, reason }
    }
}

/// Compute the seal for the current computation.
///
/// `previous` is the seal last returned in this session; it is ignored when
/// `is_new_session` is set.
pub fn seal(
    previous: Option<&EpistemicBoundarySeal>,
    is_new_session: bool,
    closure: ObservationClosure,
    irreversibility: InterpretiveIrreversibility,
) -> EpistemicBoundarySeal {
    if !is_new_session {
        if let Some(prev) = previous.filter(|p| p.epistemically_closed) {
            return *prev;
        }
    }
    let next = if closure.is_closed() {
        EpistemicBoundarySeal::closed(SealReason::Closure)
    } else if irreversibility == InterpretiveIrreversibility::Locked {
        EpistemicBoundarySeal::closed(SealReason::Locked)
    } else {
        EpistemicBoundarySeal::OPEN
    };
    if next.epistemically_closed {
        tracing::info!(reason = next.reason.as_str(), "epistemic seal closed");
    }
    next
}
