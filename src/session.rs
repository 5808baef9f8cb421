/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Inference session — owner of all cross-call state for one wallet session.
//!
//! # Pipeline per period
//!
//! ```text
//! signals ─▶ stabilizer ─▶ candidates ─▶ position / raw drift ─▶ closure
//!        ─▶ feedback ─▶ emergence ─▶ persistence ─▶ load
//! ```
//!
//! Then, for the current (last) period only:
//!
//! ```text
//! irreversibility ─▶ seal ─▶ decay ─▶ saturation ─▶ gates ─▶ outputs
//! ```
//!
//! # Session state
//!
//! The stabilizer is rebuilt on every call from the ordered period sequence.
//! Seal, irreversibility, decay, frozen periods and the last effective
//! outputs persist across calls until the wallet changes.
//!
//! # Invariants
//!
//! - **SES-001**: no stage reads state outside its explicit inputs.
//! - **SES-002**: a closed period keeps its regime, position and drift on
//!   every later recomputation within the session.
//! - **SES-003**: `reset_for_wallet` with the current wallet is a no-op.
//! - **SES-004**: a collapse escalates irreversibility once, in the first
//!   computation whose current period it is. Repeating a computation yields
//!   the same irreversibility and seal.

use std::collections::BTreeMap;

use crate::closure::{infer_closure, ClosureInputs, ObservationClosure};
use crate::config::InferenceConfig;
use crate::decay::{compute_decay, DecayInputs, EntropicDecayState, LexicalNoveltyGate, NoveltyGate};
use crate::emergence::{deviation_magnitude, infer_emergence, EmergenceInputs, EmergenceSignal};
use crate::error::Result;
use crate::feedback::{infer_feedback, FeedbackInputs};
use crate::gating::{apply_gates, meaning_candidates, CandidateOutputs, EffectiveOutputs, GateContext, MeaningContext};
use crate::irreversibility::{
    infer_irreversibility, EvidenceBundle, InterpretiveIrreversibility, IrreversibilityInputs,
};
use crate::load::{regulate_load, InterpretiveLoad, LoadInputs};
use crate::model::{InitialConditions, PeriodId, PeriodSnapshot, ReflectionEntry};
use crate::narrative::{candidate_continuations, candidate_narrative};
use crate::persistence::{infer_persistence, EmergencePersistence, PersistenceInputs, PriorPeriod};
use crate::position::{effective_drift, infer_drift, infer_position, PositionInputs};
use crate::regime::{classify_signals, Regime, RegimeStabilizer};
use crate::saturation::enforce_ceiling;
use crate::seal::{seal, EpistemicBoundarySeal};
use crate::signals::StructuralSignals;
use crate::view::{FinalizedInferenceOutputs, PeriodInference, YearlyWrap};

/// What a closed period keeps on later recomputation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrozenPeriod {
    /// Stabilized regime at closure.
    pub regime: Regime,
    /// Position at closure.
    pub position: Option<String>,
    /// Raw drift at closure.
    pub drift: Option<String>,
}

/// Inputs gathered by the host before one computation.
#[derive(Clone, Copy, Debug)]
pub struct InferenceInput<'a> {
    /// Period snapshots, oldest first; the last one is current.
    pub periods: &'a [PeriodSnapshot],
    /// Reflections, including soft-deleted ones.
    pub reflections: &'a [ReflectionEntry],
    /// Current time (ms).
    pub now: u64,
}

/// One wallet session.
pub struct InferenceSession {
    pub(crate) wallet_id: String,
    pub(crate) config: InferenceConfig,
    pub(crate) initial_conditions: Option<InitialConditions>,
    pub(crate) started_at: u64,
    pub(crate) seal: Option<EpistemicBoundarySeal>,
    pub(crate) irreversibility: InterpretiveIrreversibility,
    /// Current period of the last irreversibility update.
    pub(crate) irreversibility_period: Option<PeriodId>,
    /// Irreversibility before `irreversibility_period` was first counted.
    pub(crate) irreversibility_base: InterpretiveIrreversibility,
    pub(crate) decay: Option<EntropicDecayState>,
    pub(crate) frozen: BTreeMap<PeriodId, FrozenPeriod>,
    pub(crate) last_effective: Option<EffectiveOutputs>,
    novelty: Box<dyn NoveltyGate + Send + Sync>,
}

impl core::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("wallet_id", &self.wallet_id)
            .field("started_at", &self.started_at)
            .field("seal", &self.seal)
            .field("irreversibility", &self.irreversibility)
            .field("frozen_periods", &self.frozen.len())
            .finish()
    }
}

/// Arithmetic mean, 0.0 when empty.
fn mean(values: impl ExactSizeIterator<Item = f32>) -> f32 {
    let n = values.len();
    if n == 0 {
        0.0
    } else {
        values.sum::<f32>() / n as f32
    }
}

impl InferenceSession {
    /// Open a session with the default configuration.
    ///
    /// - `wallet_id`: the connected wallet.
    /// - `initial_conditions`: the wallet's constraint baseline, if known.
    /// - `started_at`: session start (ms).
    pub fn new(
        wallet_id: impl Into<String>,
        initial_conditions: Option<InitialConditions>,
        started_at: u64,
    ) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            config: InferenceConfig::default(),
            initial_conditions,
            started_at,
            seal: None,
            irreversibility: InterpretiveIrreversibility::Open,
            irreversibility_period: None,
            irreversibility_base: InterpretiveIrreversibility::Open,
            decay: None,
            frozen: BTreeMap::new(),
            last_effective: None,
            novelty: Box::new(LexicalNoveltyGate::default()),
        }
    }

    /// Open a session with a validated configuration.
    pub fn with_config(
        wallet_id: impl Into<String>,
        initial_conditions: Option<InitialConditions>,
        started_at: u64,
        config: InferenceConfig,
    ) -> Result<Self> {
        config.validate()?;
        let mut session = Self::new(wallet_id, initial_conditions, started_at);
        session.config = config;
        Ok(session)
    }

    /// Replace the novelty gate.
    pub fn with_novelty_gate(mut self, gate: impl NoveltyGate + Send + Sync + 'static) -> Self {
        self.novelty = Box::new(gate);
        self
    }

    /// Connected wallet.
    pub fn wallet_id(&self) -> &str {
        &self.wallet_id
    }

    /// Session start (ms).
    pub fn started_at(&self) -> u64 {
        self.started_at
    }

    /// Active configuration.
    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// True once the seal has closed in this session.
    pub fn is_epistemically_closed(&self) -> bool {
        self.seal.map_or(false, |s| s.epistemically_closed)
    }

    /// Current irreversibility state.
    pub fn irreversibility(&self) -> InterpretiveIrreversibility {
        self.irreversibility
    }

    /// Number of periods frozen by closure.
    pub fn frozen_period_count(&self) -> usize {
        self.frozen.len()
    }

    /// Start over for a different wallet. Returns false (and changes nothing)
    /// when `wallet_id` is already connected.
    pub fn reset_for_wallet(
        &mut self,
        wallet_id: &str,
        initial_conditions: Option<InitialConditions>,
        now: u64,
    ) -> bool {
        if self.wallet_id == wallet_id {
            return false;
        }
        tracing::debug!(from = %self.wallet_id, to = wallet_id, "wallet changed; resetting session");
        self.wallet_id = wallet_id.to_owned();
        self.initial_conditions = initial_conditions;
        self.started_at = now;
        self.seal = None;
        self.irreversibility = InterpretiveIrreversibility::Open;
        self.irreversibility_period = None;
        self.irreversibility_base = InterpretiveIrreversibility::Open;
        self.decay = None;
        self.frozen.clear();
        self.last_effective = None;
        true
    }

    /// Run the full pipeline over the supplied periods.
    pub fn infer(&mut self, input: &InferenceInput<'_>) -> FinalizedInferenceOutputs {
        let ic = self.initial_conditions.as_ref();
        let mut stabilizer = RegimeStabilizer::new(self.config.stabilizer.clone());

        let mut trace: Vec<PeriodInference> = Vec::with_capacity(input.periods.len());
        let mut signal_history: Vec<StructuralSignals> = Vec::with_capacity(input.periods.len());
        let mut emergence_history: Vec<EmergenceSignal> = Vec::with_capacity(input.periods.len());
        let mut persistence_history: Vec<EmergencePersistence> =
            Vec::with_capacity(input.periods.len());
        let mut previous_load: Option<InterpretiveLoad> = None;
        let mut current: Option<(CandidateOutputs, StructuralSignals)> = None;

        for snap in input.periods {
            let signals = StructuralSignals::compute(&snap.clusters, &snap.associations, &snap.period);
            let raw_regime = classify_signals(&signals);
            let frozen = self.frozen.get(&snap.period).cloned();

            let regime = match &frozen {
                Some(f) => stabilizer.hold(f.regime),
                None => stabilizer.step(&signals, None),
            };
            let continuity_note = snap.continuity_note();
            let continuity = continuity_note.is_some();

            let narrative = candidate_narrative(regime, snap);
            let continuations = candidate_continuations(regime, &signals, snap);

            let (position, raw_drift) = match &frozen {
                Some(f) => (f.position.clone(), f.drift.clone()),
                None => {
                    let position = infer_position(&PositionInputs {
                        regime,
                        signals: &signals,
                        stable_clusters: snap.clusters.iter().filter(|c| c.period_count() >= 3).count(),
                        dominant_clusters: snap.clusters.iter().filter(|c| c.period_count() >= 2).count(),
                    });
                    let previous = trace
                        .last()
                        .and_then(|p| p.position.as_deref().map(|pos| (pos, p.regime)));
                    let drift = infer_drift(previous, position.map(|pos| (pos, regime)));
                    (position.map(String::from), drift.map(String::from))
                }
            };

            let closure = match &frozen {
                Some(_) => ObservationClosure::Closed,
                None => infer_closure(&ClosureInputs {
                    regime,
                    signals: &signals,
                    clusters: &snap.clusters,
                    drift: raw_drift.as_deref(),
                    continuations: &continuations,
                }),
            };
            if closure.is_closed() && frozen.is_none() {
                tracing::debug!(period = %snap.period, regime = regime.as_str(), "period closed; freezing");
                self.frozen.insert(
                    snap.period.clone(),
                    FrozenPeriod { regime, position: position.clone(), drift: raw_drift.clone() },
                );
            }

            let feedback = infer_feedback(&FeedbackInputs {
                closure,
                signals: &signals,
                continuity,
                drift: raw_drift.is_some(),
                initial_conditions: ic,
            });
            let drift = effective_drift(raw_drift.clone(), feedback);

            let emergence = infer_emergence(&EmergenceInputs {
                closure,
                regime,
                feedback,
                initial_conditions: ic,
                signals: &signals,
                prior_signals: &signal_history,
                continuity,
            });
            let deviation = deviation_magnitude(&signals, ic);
            let persistence = infer_persistence(&PersistenceInputs {
                signal: emergence,
                closure,
                regime,
                feedback,
                deviation,
                continuity,
                period_variance: signals.period_variance,
                historical_variance: mean(signal_history.iter().map(|s| s.period_variance)),
                previous: trace.last().map(|p| PriorPeriod {
                    signal: p.emergence,
                    regime: p.regime,
                    continuity: p.continuity_note.is_some(),
                }),
                prior_signals: &emergence_history,
            });
            let load = regulate_load(&LoadInputs {
                previous: previous_load,
                closure,
                persistence,
                regime,
                deviation,
                continuity,
                feedback,
                clusters: snap.clusters.len(),
                associations: snap.associations.len(),
            });

            trace.push(PeriodInference {
                period: snap.period.clone(),
                raw_regime,
                regime,
                closure,
                feedback,
                emergence,
                persistence,
                load,
                deviation,
                position: position.clone(),
                drift,
                continuity_note,
            });
            current = Some((
                CandidateOutputs { narrative, continuations, position, drift: raw_drift },
                signals.clone(),
            ));
            signal_history.push(signals);
            emergence_history.push(emergence);
            persistence_history.push(persistence);
            previous_load = Some(load);
        }

        let decay = compute_decay(
            &DecayInputs {
                reflections: input.reflections,
                session_start: self.started_at,
                now: input.now,
                previous: self.decay.as_ref(),
            },
            self.novelty.as_ref(),
            &self.config.decay,
        );
        self.decay = Some(decay);

        let Some(latest) = trace.last().cloned() else {
            return self.silent_outputs(trace, decay);
        };
        let (Some(snap), Some((candidates, signals))) = (input.periods.last(), current) else {
            return self.silent_outputs(trace, decay);
        };

        let evidence = EvidenceBundle {
            persistence: latest.persistence,
            deviation: latest.deviation,
            continuity: latest.continuity_note.is_some(),
            feedback: latest.feedback,
            load: latest.load,
        };
        let prior_persistence = &persistence_history[..persistence_history.len().saturating_sub(1)];
        let irreversibility_config = self.config.irreversibility.clone();
        let irreversibility = self.advance_irreversibility(&latest.period, |previous| {
            infer_irreversibility(
                &IrreversibilityInputs {
                    previous,
                    history: prior_persistence,
                    current: latest.persistence,
                    evidence,
                },
                &irreversibility_config,
            )
        });
        let is_new_session = self.seal.is_none();
        let sealed = seal(self.seal.as_ref(), is_new_session, latest.closure, irreversibility);

        let nodes = meaning_candidates(
            &candidates,
            &MeaningContext {
                snapshot: snap,
                signals: &signals,
                decay: &decay,
                reflections: input.reflections,
                now: input.now,
            },
        );
        let saturation = enforce_ceiling(nodes, input.now, Some(&decay), &self.config.saturation);
        let effective = apply_gates(
            &candidates,
            &GateContext {
                saturation: &saturation,
                seal: &sealed,
                closure: latest.closure,
                irreversibility,
                evidence,
                previous: self.last_effective.as_ref(),
            },
        );
        let wrap = if sealed.epistemically_closed { None } else { YearlyWrap::build(snap) };

        self.seal = Some(sealed);
        self.last_effective = Some(effective.clone());

        FinalizedInferenceOutputs {
            periods: trace,
            irreversibility,
            seal: sealed,
            decay,
            saturation,
            effective,
            wrap,
            clusters: snap.clusters.clone(),
            associations: snap.associations.clone(),
        }
    }

    /// Pick the state a computation for `period` starts from, run `step` on
    /// it and commit the result.
    ///
    /// A new latest period chains from the committed state. Recomputing the
    /// latest counted period starts again from the state before it, so its
    /// collapse is not counted twice. An older period adds no evidence.
    fn advance_irreversibility(
        &mut self,
        period: &PeriodId,
        step: impl FnOnce(InterpretiveIrreversibility) -> InterpretiveIrreversibility,
    ) -> InterpretiveIrreversibility {
        let committed = self.irreversibility;
        if committed == InterpretiveIrreversibility::Locked {
            return committed;
        }
        let previous = match &self.irreversibility_period {
            Some(counted) if counted == period => self.irreversibility_base,
            Some(counted) if counted > period => return committed,
            _ => {
                self.irreversibility_base = committed;
                self.irreversibility_period = Some(period.clone());
                committed
            }
        };
        let next = step(previous);
        self.irreversibility = next;
        next
    }

    fn silent_outputs(
        &self,
        periods: Vec<PeriodInference>,
        decay: EntropicDecayState,
    ) -> FinalizedInferenceOutputs {
        let seal = self.seal.unwrap_or(EpistemicBoundarySeal::OPEN);
        let mut effective = EffectiveOutputs::default();
        effective.silence.wrap = true;
        effective.silence.narrative = true;
        effective.silence.continuations = true;
        effective.silence.position = true;
        effective.silence.drift = true;
        FinalizedInferenceOutputs {
            periods,
            irreversibility: self.irreversibility,
            seal,
            decay,
            saturation: Default::default(),
            effective,
            wrap: None,
            clusters: Vec::new(),
            associations: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decay::MS_PER_DAY;
    use crate::model::{ConceptualCluster, Level};

    const T0: u64 = 1_700_000_000_000;

    fn settled(period: &str) -> PeriodSnapshot {
        PeriodSnapshot::new(
            period,
            vec![
                ConceptualCluster::new("w", "work", ["2019", "2020", "2021", "2022", "2023", "2024"]),
                ConceptualCluster::new("h", "home", ["2019", "2020", "2021", "2022", "2023", "2024"]),
            ],
            vec![crate::model::ClusterAssociation::new("h", "w", ["2020", "2021", "2022"])],
        )
    }

    fn session() -> InferenceSession {
        InferenceSession::new(
            "wallet-a",
            Some(InitialConditions::new(Level::Medium, Level::Medium, Level::Medium)),
            T0,
        )
    }

    #[test]
    fn test_no_periods_is_silent() {
        let mut s = session();
        let out = s.infer(&InferenceInput { periods: &[], reflections: &[], now: T0 });
        assert!(out.effective.silence.is_total());
        assert!(out.wrap.is_none());
        assert!(!s.is_epistemically_closed());
    }

    #[test]
    fn test_settled_period_closes_and_seals() {
        let mut s = session();
        let periods = [settled("2024")];
        let reflections = [ReflectionEntry::new("r", T0, "work again")];
        let out = s.infer(&InferenceInput { periods: &periods, reflections: &reflections, now: T0 });
        let Some(cur) = out.current() else { panic!("one period supplied") };
        assert_eq!(cur.regime, Regime::Deterministic);
        assert_eq!(cur.closure, ObservationClosure::Closed);
        assert!(out.seal.epistemically_closed);
        assert!(out.wrap.is_none());
        assert!(s.is_epistemically_closed());
        assert_eq!(s.frozen_period_count(), 1);
    }

    #[test]
    fn test_reset_for_same_wallet_is_noop() {
        let mut s = session();
        let periods = [settled("2024")];
        s.infer(&InferenceInput { periods: &periods, reflections: &[], now: T0 });
        assert!(!s.reset_for_wallet("wallet-a", None, T0 + MS_PER_DAY));
        assert!(s.is_epistemically_closed());
        assert_eq!(s.started_at(), T0);
    }

    #[test]
    fn test_reset_for_new_wallet_clears_state() {
        let mut s = session();
        let periods = [settled("2024")];
        s.infer(&InferenceInput { periods: &periods, reflections: &[], now: T0 });
        assert!(s.reset_for_wallet("wallet-b", None, T0 + MS_PER_DAY));
        assert!(!s.is_epistemically_closed());
        assert_eq!(s.frozen_period_count(), 0);
        assert_eq!(s.wallet_id(), "wallet-b");
        assert_eq!(s.irreversibility(), InterpretiveIrreversibility::Open);
    }

    #[test]
    fn test_irreversibility_counts_each_period_once() {
        use InterpretiveIrreversibility::*;
        let escalate = |prev: InterpretiveIrreversibility| match prev {
            Open => Hardened,
            _ => Locked,
        };
        let mut s = session();
        let period = PeriodId::from("2024-03");
        assert_eq!(s.advance_irreversibility(&period, escalate), Hardened);
        assert_eq!(s.advance_irreversibility(&period, escalate), Hardened);
        assert_eq!(s.irreversibility_base, Open);

        // An older period brings nothing new.
        assert_eq!(s.advance_irreversibility(&"2024-01".into(), escalate), Hardened);
        assert_eq!(s.irreversibility_period.as_deref(), Some("2024-03"));

        assert_eq!(s.advance_irreversibility(&"2024-04".into(), escalate), Locked);
        assert_eq!(s.advance_irreversibility(&period, |_| Open), Locked);
    }

    #[test]
    fn test_reset_clears_counted_period() {
        let mut s = session();
        s.advance_irreversibility(&"2024".into(), |_| InterpretiveIrreversibility::Hardened);
        assert!(s.reset_for_wallet("wallet-b", None, T0));
        assert_eq!(s.irreversibility_period, None);
        assert_eq!(s.irreversibility_base, InterpretiveIrreversibility::Open);
    }

    #[test]
    fn test_with_config_validates() {
        let mut config = InferenceConfig::default();
        config.stabilizer.min_dwell = 0;
        assert!(InferenceSession::with_config("w", None, T0, config).is_err());
        assert!(InferenceSession::with_config("w", None, T0, InferenceConfig::default()).is_ok());
    }
}
