//! # cre-core
//!
//! Constraint-relative emergence inference: deciding, conservatively and
//! deterministically, whether any interpretive claim about a journal may
//! surface at all for a period, and how much.
//!
//! ---
//!
//! ## Silence is the default.
//!
//! Raw structure (which themes recur, how they associate across time) passes
//! through a chain of pure gates. Each gate reduces it to a small enumeration,
//! and every enumeration can only take output away. When evidence is thin,
//! ambiguous or contradictory, the answer is silence, not an error.
//!
//! **Hysteresis across periods**: a regime only changes after it has been
//! held for a minimum dwell and the evidence for the new regime crosses a
//! Schmitt-trigger threshold.
//!
//! **One-way session state**: a closed period stays frozen, a locked
//! interpretation never reopens, and once the epistemic seal closes it stays
//! closed until the wallet changes.
//!
//! **Two independent modulators**: entropic decay weakens meaning when nothing
//! new is written; the saturation ceiling caps how much meaning is active at
//! once.
//!
//! ---
//!
//! ## The pipeline
//!
//! ```text
//! clusters/associations ─▶ StructuralSignals ─▶ Regime ─▶ RegimeStabilizer
//!        ─▶ {ObservationClosure, position/drift, FeedbackMode}
//!        ─▶ EmergenceSignal ─▶ EmergencePersistence ─▶ InterpretiveLoad
//!        ─▶ InterpretiveIrreversibility ─▶ EpistemicBoundarySeal
//!        ─▶ gates (+ EntropicDecayState, SaturationState) ─▶ ViewModel
//! ```
//!
//! ## Module overview
//!
//! | Module | Key types | What it does |
//! |--------|-----------|--------------|
//! | [`model`] | [`ConceptualCluster`], [`PeriodSnapshot`], [`ReflectionEntry`] | Input data |
//! | [`signals`] | [`StructuralSignals`] | Order-independent per-period structure |
//! | [`regime`] | [`Regime`], [`RegimeStabilizer`] | Raw classifier and hysteresis stabilizer |
//! | [`closure`] | [`ObservationClosure`] | Period freeze |
//! | [`position`] | — | Observer position and drift phrases |
//! | [`feedback`] | [`FeedbackMode`] | Environment vs observer attribution |
//! | [`emergence`] | [`EmergenceSignal`] | Deviation from the constraint baseline |
//! | [`persistence`] | [`EmergencePersistence`] | Emergence across periods |
//! | [`load`] | [`InterpretiveLoad`] | One-step multiplicity cap |
//! | [`irreversibility`] | [`InterpretiveIrreversibility`] | Lock after repeated collapse |
//! | [`seal`] | [`EpistemicBoundarySeal`] | Session-monotonic terminal gate |
//! | [`decay`] | [`EntropicDecayState`], [`NoveltyGate`] | Time/novelty decay |
//! | [`saturation`] | [`SaturationState`] | Active-meaning ceiling |
//! | [`narrative`] | [`Continuation`] | Candidate text before gating |
//! | [`gating`] | [`EffectiveOutputs`] | Fixed-precedence gate composition |
//! | [`bridge`] | [`SessionBridge`] | Typed bridges between computations |
//! | [`view`] | [`ViewModel`], [`YearlyWrap`] | Finalized outputs and projection |
//! | [`session`] | [`InferenceSession`] | Cross-call state for one wallet |
//! | [`snapshot`] | `SessionSnapshot` | Session persistence (requires `serde` feature) |
//!
//! ## Logging
//!
//! Stages emit [`tracing`] events (regime switches, period freezes, seal
//! closure, irreversibility escalation, gate stops). The crate never installs
//! a subscriber.
//!
//! ## License
//!
//! Business Source License 1.1.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod config;
pub mod model;
pub mod signals;
pub mod regime;
pub mod closure;
pub mod position;
pub mod feedback;
pub mod emergence;
pub mod persistence;
pub mod load;
pub mod irreversibility;
pub mod seal;
pub mod decay;
pub mod saturation;
pub mod narrative;
pub mod gating;
pub mod bridge;
pub mod view;
pub mod session;
#[cfg(feature = "serde")]
pub mod snapshot;

#[cfg(feature = "python-ffi")]
pub mod ffi;

pub use bridge::{NarrativeBridge, NarrativeScope, SessionBridge};
pub use closure::ObservationClosure;
pub use config::InferenceConfig;
pub use decay::{EntropicDecayState, LexicalNoveltyGate, NoveltyGate};
pub use emergence::EmergenceSignal;
pub use error::{InferenceError, Result};
pub use feedback::FeedbackMode;
pub use gating::{EffectiveOutputs, SilenceState};
pub use irreversibility::InterpretiveIrreversibility;
pub use load::InterpretiveLoad;
pub use model::{
    ClusterAssociation, ConceptualCluster, InitialConditions, Level, PeriodId, PeriodSnapshot,
    ReflectionEntry,
};
pub use narrative::Continuation;
pub use persistence::EmergencePersistence;
pub use regime::{detect_regime, Regime, RegimeStabilizer};
pub use saturation::{MeaningNode, SaturationState};
pub use seal::{EpistemicBoundarySeal, SealReason};
pub use session::{InferenceInput, InferenceSession};
pub use signals::StructuralSignals;
pub use view::{FinalizedInferenceOutputs, ViewModel, YearlyWrap};
