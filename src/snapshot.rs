//! Session snapshot — portable capture of an [`InferenceSession`]'s cross-call state.
//!
//! The host keeps the snapshot in session-scoped storage (serialised with any
//! serde format) and restores it after a reload within the same wallet
//! session. Only session-scoped state is captured; configuration and the
//! novelty gate are supplied again on restore.
//!
//! Restoring is refused for a different wallet or for a snapshot written by a
//! newer format version.
//!
//! # Example
//!
//! ```rust,ignore
//! use cre_core::session::InferenceSession;
//! use cre_core::snapshot::SessionSnapshot;
//!
//! let snapshot = session.snapshot();
//! let json = serde_json::to_string(&snapshot)?;
//! let back: SessionSnapshot = serde_json::from_str(&json)?;
//! let session = InferenceSession::restore("wallet-a", back, Default::default())?;
//! ```
//!
//! [`InferenceSession`]: crate::session::InferenceSession

use std::collections::BTreeMap;

use crate::config::InferenceConfig;
use crate::decay::EntropicDecayState;
use crate::error::{InferenceError, Result};
use crate::gating::EffectiveOutputs;
use crate::irreversibility::InterpretiveIrreversibility;
use crate::model::{InitialConditions, PeriodId};
use crate::seal::EpistemicBoundarySeal;
use crate::session::{FrozenPeriod, InferenceSession};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Serializable session state.
#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    /// Format version; [`SNAPSHOT_VERSION`] for newly created snapshots.
    pub version: u16,
    /// Wallet the session belongs to.
    pub wallet_id: String,
    /// Session start (ms).
    pub started_at: u64,
    /// Wallet baseline.
    pub initial_conditions: Option<InitialConditions>,
    /// Seal after the last computation; `None` before the first.
    pub seal: Option<EpistemicBoundarySeal>,
    /// Irreversibility after the last computation.
    pub irreversibility: InterpretiveIrreversibility,
    /// Current period of the last irreversibility update.
    #[serde(default)]
    pub irreversibility_period: Option<PeriodId>,
    /// Irreversibility before that period was first counted.
    #[serde(default)]
    pub irreversibility_base: InterpretiveIrreversibility,
    /// Decay after the last computation.
    pub decay: Option<EntropicDecayState>,
    /// Periods frozen by closure.
    pub frozen_periods: BTreeMap<PeriodId, FrozenPeriod>,
    /// Effective outputs of the last computation.
    pub last_effective: Option<EffectiveOutputs>,
}

impl InferenceSession {
    /// Capture the session-scoped state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            wallet_id: self.wallet_id.clone(),
            started_at: self.started_at,
            initial_conditions: self.initial_conditions,
            seal: self.seal,
            irreversibility: self.irreversibility,
            irreversibility_period: self.irreversibility_period.clone(),
            irreversibility_base: self.irreversibility_base,
            decay: self.decay,
            frozen_periods: self.frozen.clone(),
            last_effective: self.last_effective.clone(),
        }
    }

    /// Rebuild a session for `wallet_id` from a snapshot.
    pub fn restore(
        wallet_id: &str,
        snapshot: SessionSnapshot,
        config: InferenceConfig,
    ) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(InferenceError::UnsupportedSnapshotVersion(snapshot.version));
        }
        if snapshot.wallet_id != wallet_id {
            return Err(InferenceError::WalletMismatch {
                expected: wallet_id.to_owned(),
                found: snapshot.wallet_id,
            });
        }
        let mut session = Self::with_config(
            snapshot.wallet_id,
            snapshot.initial_conditions,
            snapshot.started_at,
            config,
        )?;
        session.seal = snapshot.seal;
        session.irreversibility = snapshot.irreversibility;
        session.irreversibility_period = snapshot.irreversibility_period;
        session.irreversibility_base = snapshot.irreversibility_base;
        session.decay = snapshot.decay;
        session.frozen = snapshot.frozen_periods;
        session.last_effective = snapshot.last_effective;
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seal::SealReason;

    fn sealed_session() -> InferenceSession {
        let mut s = InferenceSession::new("wallet-a", None, 10);
        s.seal = Some(EpistemicBoundarySeal { epistemically_closed: true, reason: SealReason::Closure });
        s.irreversibility = InterpretiveIrreversibility::Hardened;
        s.irreversibility_period = Some("2024".into());
        s
    }

    #[test]
    fn test_restore_preserves_state() {
        let snap = sealed_session().snapshot();
        let restored = InferenceSession::restore("wallet-a", snap, InferenceConfig::default());
        let Ok(restored) = restored else { panic!("same wallet must restore") };
        assert!(restored.is_epistemically_closed());
        assert_eq!(restored.irreversibility(), InterpretiveIrreversibility::Hardened);
        assert_eq!(restored.started_at(), 10);
        assert_eq!(restored.irreversibility_period.as_deref(), Some("2024"));
        assert_eq!(restored.irreversibility_base, InterpretiveIrreversibility::Open);
    }

    #[test]
    fn test_restore_other_wallet_fails() {
        let snap = sealed_session().snapshot();
        let err = InferenceSession::restore("wallet-b", snap, InferenceConfig::default()).err();
        assert_eq!(
            err,
            Some(InferenceError::WalletMismatch { expected: "wallet-b".into(), found: "wallet-a".into() })
        );
    }

    #[test]
    fn test_restore_future_version_fails() {
        let mut snap = sealed_session().snapshot();
        snap.version = SNAPSHOT_VERSION + 1;
        let err = InferenceSession::restore("wallet-a", snap, InferenceConfig::default()).err();
        assert_eq!(err, Some(InferenceError::UnsupportedSnapshotVersion(SNAPSHOT_VERSION + 1)));
    }
}
