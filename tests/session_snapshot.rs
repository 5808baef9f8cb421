//! Session snapshots survive a JSON round trip and refuse foreign wallets.

#![cfg(feature = "serde")]

use cre_core::snapshot::SessionSnapshot;
use cre_core::{
    ClusterAssociation, ConceptualCluster, InferenceConfig, InferenceError, InferenceInput,
    InferenceSession, InitialConditions, Level, PeriodSnapshot,
};

const T0: u64 = 1_700_000_000_000;

fn settled_session() -> InferenceSession {
    let years = ["2019", "2020", "2021", "2022", "2023", "2024"];
    let periods = [PeriodSnapshot::new(
        "2024",
        vec![
            ConceptualCluster::new("w", "work", years),
            ConceptualCluster::new("h", "home", years),
        ],
        vec![ClusterAssociation::new("h", "w", ["2022", "2023", "2024"])],
    )];
    let mut session = InferenceSession::new(
        "wallet-a",
        Some(InitialConditions::new(Level::High, Level::Medium, Level::Low)),
        T0,
    );
    session.infer(&InferenceInput { periods: &periods, reflections: &[], now: T0 });
    session
}

#[test]
fn test_snapshot_json_round_trip() {
    let session = settled_session();
    let snapshot = session.snapshot();
    let json = serde_json::to_string(&snapshot).expect("serialize");
    let back: SessionSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, snapshot);

    let restored =
        InferenceSession::restore("wallet-a", back, InferenceConfig::default()).expect("restore");
    assert!(restored.is_epistemically_closed());
    assert_eq!(restored.frozen_period_count(), 1);
    assert_eq!(restored.started_at(), T0);
}

#[test]
fn test_snapshot_refuses_other_wallet() {
    let snapshot = settled_session().snapshot();
    let err = InferenceSession::restore("wallet-b", snapshot, InferenceConfig::default()).err();
    assert!(matches!(err, Some(InferenceError::WalletMismatch { .. })));
}

#[test]
fn test_enum_wire_names() {
    let json = serde_json::to_string(&settled_session().snapshot()).expect("serialize");
    assert!(json.contains("\"irreversibility\":\"open\""));
    assert!(json.contains("\"reason\":\"closure\""));
}
