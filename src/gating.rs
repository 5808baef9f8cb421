/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Gating composition — turns candidate outputs into effective outputs.
//!
//! # Precedence
//!
//! Gates apply in a fixed order. Earlier gates are strictly more
//! authoritative; a hard stop short-circuits everything after it.
//!
//! ```text
//! saturation ─▶ seal ─▶ closure ─▶ irreversibility ─▶ load ─▶ persistence ─▶ feedback
//!  displace     stop     stop      locked: stop        minimal: no narrative
//!                                  hardened: stop      constrained: ≤2 items
//!                                  unless extreme      saturated: existing only
//!                                                                 collapsed: stop
//!                                                                 none/transient: drop change-worded
//!                                                                             env-dominant: drop
//!                                                                             change-worded, drift, position
//! ```
//!
//! # Invariants
//!
//! - **GATE-001**: a closed seal yields no narrative, continuations, position or drift.
//! - **GATE-002**: effective continuations never exceed two items once load applies.
//! - **GATE-003**: gates only remove output; none adds to it.

use crate::closure::ObservationClosure;
use crate::decay::EntropicDecayState;
use crate::feedback::FeedbackMode;
use crate::irreversibility::{permits_output, EvidenceBundle, InterpretiveIrreversibility};
use crate::load::InterpretiveLoad;
use crate::model::{PeriodSnapshot, ReflectionEntry};
use crate::narrative::{is_change_worded, Continuation};
use crate::persistence::EmergencePersistence;
use crate::saturation::{MeaningKind, MeaningNode, SaturationState};
use crate::seal::EpistemicBoundarySeal;
use crate::signals::StructuralSignals;

/// Node id of the narrative fragment.
pub const NARRATIVE_NODE: &str = "narrative";
/// Node id of the position phrase.
pub const POSITION_NODE: &str = "position";
/// Node id of the drift phrase.
pub const DRIFT_NODE: &str = "drift";

/// Most continuations surfaced once load applies.
const MAX_CONSTRAINED_ITEMS: usize = 2;

// ─── Candidates ─────────────────────────────────────────────────────────────

/// Everything the pipeline could say about a period, before gating.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidateOutputs {
    /// Narrative fragment.
    pub narrative: Option<String>,
    /// Continuations, most specific first.
    pub continuations: Vec<Continuation>,
    /// Observer position phrase.
    pub position: Option<String>,
    /// Raw drift phrase.
    pub drift: Option<String>,
}

/// Context for scoring candidates as meaning nodes.
#[derive(Clone, Copy, Debug)]
pub struct MeaningContext<'a> {
    /// Current period.
    pub snapshot: &'a PeriodSnapshot,
    /// Current signals.
    pub signals: &'a StructuralSignals,
    /// Current decay state.
    pub decay: &'a EntropicDecayState,
    /// Reflections, for first-evidence times.
    pub reflections: &'a [ReflectionEntry],
    /// Current time (ms).
    pub now: u64,
}

impl MeaningContext<'_> {
    fn tracked(&self) -> f32 {
        self.snapshot.tracked_periods().len().max(1) as f32
    }

    fn label_of(&self, cluster_id: &str) -> Option<&str> {
        self.snapshot
            .clusters
            .iter()
            .find(|c| c.id == cluster_id)
            .map(|c| c.label.as_str())
    }

    fn span_of(&self, cluster_id: &str) -> usize {
        self.snapshot
            .clusters
            .iter()
            .find(|c| c.id == cluster_id)
            .map_or(0, |c| c.period_count())
    }

    fn top_label(&self) -> Option<&str> {
        self.snapshot
            .clusters
            .iter()
            .max_by(|a, b| {
                a.period_count().cmp(&b.period_count()).then_with(|| b.label.cmp(&a.label))
            })
            .map(|c| c.label.as_str())
    }

    /// Earliest live reflection mentioning `label`, else `now`.
    fn first_mention(&self, label: Option<&str>) -> u64 {
        let Some(label) = label.map(str::to_lowercase) else {
            return self.now;
        };
        self.reflections
            .iter()
            .filter(|r| r.is_live() && r.plaintext.to_lowercase().contains(&label))
            .map(|r| r.created_at)
            .min()
            .unwrap_or(self.now)
    }

    fn node(&self, id: &str, kind: MeaningKind, strength: f32, novelty: f32) -> MeaningNode {
        MeaningNode::new(id, kind, self.decay.scale(strength), novelty)
    }
}

/// Score every candidate as a [`MeaningNode`] for the saturation ceiling.
pub fn meaning_candidates(candidates: &CandidateOutputs, ctx: &MeaningContext<'_>) -> Vec<MeaningNode> {
    let s = ctx.signals;
    let tracked = ctx.tracked();
    let top = ctx.top_label();
    let top_share = top.map_or(0.0, |_| s.dominance);
    let mut nodes = Vec::new();

    if candidates.narrative.is_some() {
        nodes.push(
            ctx.node(NARRATIVE_NODE, MeaningKind::Narrative, s.dominance, s.recent_formation_ratio)
                .with_persistence(top_share)
                .created_at(ctx.first_mention(top)),
        );
    }

    for c in &candidates.continuations {
        let node = if let Some(pair) = c.id.strip_prefix("thread-") {
            let assoc = ctx.snapshot.associations.iter().find(|a| {
                let (x, y) = a.canonical_pair();
                pair.len() == x.len() + 1 + y.len()
                    && pair.starts_with(x)
                    && pair.ends_with(y)
            });
            match assoc {
                Some(a) => {
                    let (x, y) = a.canonical_pair();
                    let share = a.co_occurrence_count as f32 / tracked;
                    let novelty = 0.5
                        * (1.0 / ctx.span_of(x).max(1) as f32 + 1.0 / ctx.span_of(y).max(1) as f32);
                    ctx.node(&c.id, MeaningKind::Continuation, share, novelty)
                        .with_persistence(share)
                        .created_at(ctx.first_mention(ctx.label_of(x)))
                }
                None => ctx.node(&c.id, MeaningKind::Continuation, 0.0, 0.0).created_at(ctx.now),
            }
        } else if let Some(id) = c.id.strip_prefix("fading-") {
            let share = ctx.span_of(id) as f32 / tracked;
            ctx.node(&c.id, MeaningKind::Continuation, share, 0.0)
                .with_persistence(share)
                .created_at(ctx.first_mention(ctx.label_of(id)))
        } else {
            ctx.node(&c.id, MeaningKind::Continuation, s.association_concentration, s.new_cluster_rate)
                .with_persistence(s.structural_reuse)
                .created_at(ctx.first_mention(top))
        };
        nodes.push(node);
    }

    if candidates.position.is_some() {
        nodes.push(
            ctx.node(POSITION_NODE, MeaningKind::Position, s.structural_reuse, s.new_cluster_rate)
                .with_persistence(s.structural_reuse)
                .created_at(ctx.first_mention(top)),
        );
    }
    if candidates.drift.is_some() {
        nodes.push(
            ctx.node(DRIFT_NODE, MeaningKind::Drift, s.asymmetry, s.recent_formation_ratio)
                .created_at(ctx.now),
        );
    }
    nodes
}

// ─── Gates ──────────────────────────────────────────────────────────────────

/// Gate that stopped interpretive output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum GateStage {
    /// Epistemic seal.
    Seal,
    /// Observation closure.
    Closure,
    /// Interpretive irreversibility.
    Irreversibility,
    /// Emergence persistence.
    Persistence,
}

impl GateStage {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GateStage::Seal => "seal",
            GateStage::Closure => "closure",
            GateStage::Irreversibility => "irreversibility",
            GateStage::Persistence => "persistence",
        }
    }
}

/// Per-region suppression flags for the presentation layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SilenceState {
    /// Yearly wrap suppressed.
    pub wrap: bool,
    /// Narrative fragment suppressed.
    pub narrative: bool,
    /// Every continuation suppressed.
    pub continuations: bool,
    /// Position phrase suppressed.
    pub position: bool,
    /// Drift phrase suppressed.
    pub drift: bool,
}

impl SilenceState {
    /// True if every region is silent.
    pub fn is_total(&self) -> bool {
        self.wrap && self.narrative && self.continuations && self.position && self.drift
    }
}

/// Outputs that survived every gate.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectiveOutputs {
    /// Effective narrative fragment.
    pub narrative: Option<String>,
    /// Effective continuations (0–2 once load applies).
    pub continuations: Vec<Continuation>,
    /// Effective position phrase.
    pub position: Option<String>,
    /// Effective drift phrase.
    pub drift: Option<String>,
    /// Gate that short-circuited, if any.
    pub stopped_at: Option<GateStage>,
    /// Suppression flags.
    pub silence: SilenceState,
}

/// Stage states read by [`apply_gates`].
#[derive(Clone, Copy, Debug)]
pub struct GateContext<'a> {
    /// Saturation pass over the candidates.
    pub saturation: &'a SaturationState,
    /// Current seal.
    pub seal: &'a EpistemicBoundarySeal,
    /// Current closure.
    pub closure: ObservationClosure,
    /// Current irreversibility.
    pub irreversibility: InterpretiveIrreversibility,
    /// Persistence, deviation, continuity, feedback and load of the period.
    pub evidence: EvidenceBundle,
    /// Effective outputs of the previous computation in this session, for saturated load.
    pub previous: Option<&'a EffectiveOutputs>,
}

fn stop(mut out: EffectiveOutputs, stage: GateStage, clear_position: bool) -> EffectiveOutputs {
    tracing::trace!(stage = stage.as_str(), "gate stopped interpretive output");
    out.narrative = None;
    out.continuations.clear();
    if clear_position {
        out.position = None;
        out.drift = None;
    }
    out.stopped_at = Some(stage);
    out
}

/// Apply every gate in precedence order.
pub fn apply_gates(candidates: &CandidateOutputs, ctx: &GateContext<'_>) -> EffectiveOutputs {
    let mut out = gate_outputs(candidates, ctx);
    out.silence = SilenceState {
        wrap: ctx.seal.epistemically_closed,
        narrative: out.narrative.is_none(),
        continuations: out.continuations.is_empty(),
        position: out.position.is_none(),
        drift: out.drift.is_none(),
    };
    out
}

fn gate_outputs(candidates: &CandidateOutputs, ctx: &GateContext<'_>) -> EffectiveOutputs {
    let sat = ctx.saturation;
    let mut out = EffectiveOutputs {
        narrative: candidates.narrative.clone().filter(|_| sat.is_active(NARRATIVE_NODE)),
        continuations: candidates
            .continuations
            .iter()
            .filter(|c| sat.is_active(&c.id))
            .cloned()
            .collect(),
        position: candidates.position.clone().filter(|_| sat.is_active(POSITION_NODE)),
        drift: candidates.drift.clone().filter(|_| sat.is_active(DRIFT_NODE)),
        ..EffectiveOutputs::default()
    };

    if ctx.seal.epistemically_closed {
        return stop(out, GateStage::Seal, true);
    }
    if ctx.closure.is_closed() {
        return stop(out, GateStage::Closure, false);
    }
    if !permits_output(ctx.irreversibility, &ctx.evidence) {
        return stop(out, GateStage::Irreversibility, false);
    }

    match ctx.evidence.load {
        InterpretiveLoad::Minimal => {
            out.narrative = None;
            out.continuations.truncate(MAX_CONSTRAINED_ITEMS);
        }
        InterpretiveLoad::Constrained => out.continuations.truncate(MAX_CONSTRAINED_ITEMS),
        InterpretiveLoad::Saturated => match ctx.previous {
            Some(prev) => {
                if prev.narrative.is_none() {
                    out.narrative = None;
                }
                out.continuations
                    .retain(|c| prev.continuations.iter().any(|p| p.id == c.id));
                out.continuations.truncate(MAX_CONSTRAINED_ITEMS);
            }
            None => out.continuations.truncate(MAX_CONSTRAINED_ITEMS),
        },
    }

    match ctx.evidence.persistence {
        EmergencePersistence::Collapsed => return stop(out, GateStage::Persistence, false),
        EmergencePersistence::None | EmergencePersistence::Transient => drop_change_worded(&mut out),
        EmergencePersistence::Persistent => {}
    }

    if ctx.evidence.feedback == FeedbackMode::EnvironmentDominant {
        drop_change_worded(&mut out);
        out.position = None;
        out.drift = None;
    }
    out
}

fn drop_change_worded(out: &mut EffectiveOutputs) {
    if out.narrative.as_deref().map_or(false, is_change_worded) {
        out.narrative = None;
    }
    out.continuations.retain(|c| !c.is_change_worded());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClusterAssociation, ConceptualCluster};
    use crate::saturation::{enforce_ceiling, SaturationConfig};
    use crate::seal::SealReason;

    fn candidates() -> CandidateOutputs {
        CandidateOutputs {
            narrative: Some("Your reflections keep returning to work.".into()),
            continuations: vec![
                Continuation::new("thread-f-w", "work keeps appearing alongside family"),
                Continuation::new("thread-h-w", "work keeps appearing alongside health"),
                Continuation::new("fading-t", "travel has grown quieter"),
            ],
            position: Some("Near inherited constraints".into()),
            drift: Some("Moving toward emergent structure".into()),
        }
    }

    fn all_active(c: &CandidateOutputs) -> SaturationState {
        let mut nodes = vec![
            MeaningNode::new(NARRATIVE_NODE, MeaningKind::Narrative, 1.0, 0.0),
            MeaningNode::new(POSITION_NODE, MeaningKind::Position, 1.0, 0.0),
            MeaningNode::new(DRIFT_NODE, MeaningKind::Drift, 1.0, 0.0),
        ];
        nodes.extend(
            c.continuations
                .iter()
                .map(|x| MeaningNode::new(x.id.clone(), MeaningKind::Continuation, 1.0, 0.0)),
        );
        enforce_ceiling(nodes, 0, None, &SaturationConfig::default())
    }

    fn evidence() -> EvidenceBundle {
        EvidenceBundle {
            persistence: EmergencePersistence::Persistent,
            deviation: 0.9,
            continuity: true,
            feedback: FeedbackMode::ObserverDominant,
            load: InterpretiveLoad::Constrained,
        }
    }

    fn ctx<'a>(sat: &'a SaturationState, seal: &'a EpistemicBoundarySeal) -> GateContext<'a> {
        GateContext {
            saturation: sat,
            seal,
            closure: ObservationClosure::Open,
            irreversibility: InterpretiveIrreversibility::Open,
            evidence: evidence(),
            previous: None,
        }
    }

    #[test]
    fn test_open_pipeline_caps_continuations() {
        let c = candidates();
        let sat = all_active(&c);
        let out = apply_gates(&c, &ctx(&sat, &EpistemicBoundarySeal::OPEN));
        assert!(out.narrative.is_some());
        assert_eq!(out.continuations.len(), 2);
        assert!(out.position.is_some());
        assert!(out.drift.is_some());
        assert_eq!(out.stopped_at, None);
        assert!(!out.silence.wrap);
    }

    #[test]
    fn test_seal_stops_everything() {
        let c = candidates();
        let sat = all_active(&c);
        let seal = EpistemicBoundarySeal { epistemically_closed: true, reason: SealReason::Locked };
        let out = apply_gates(&c, &ctx(&sat, &seal));
        assert_eq!(out.stopped_at, Some(GateStage::Seal));
        assert!(out.silence.is_total());
    }

    #[test]
    fn test_seal_outranks_later_gates() {
        let c = candidates();
        let sat = all_active(&c);
        let seal = EpistemicBoundarySeal { epistemically_closed: true, reason: SealReason::Closure };
        let mut g = ctx(&sat, &seal);
        g.irreversibility = InterpretiveIrreversibility::Locked;
        g.evidence.persistence = EmergencePersistence::Collapsed;
        assert_eq!(apply_gates(&c, &g).stopped_at, Some(GateStage::Seal));
    }

    #[test]
    fn test_closure_stops_narrative_keeps_position() {
        let c = candidates();
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.closure = ObservationClosure::Closed;
        let out = apply_gates(&c, &g);
        assert_eq!(out.stopped_at, Some(GateStage::Closure));
        assert!(out.narrative.is_none());
        assert!(out.continuations.is_empty());
        assert!(out.position.is_some());
    }

    #[test]
    fn test_hardened_requires_extreme_evidence() {
        let c = candidates();
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.irreversibility = InterpretiveIrreversibility::Hardened;
        assert_eq!(apply_gates(&c, &g).stopped_at, None);
        g.evidence.deviation = 0.5;
        assert_eq!(apply_gates(&c, &g).stopped_at, Some(GateStage::Irreversibility));
        g.irreversibility = InterpretiveIrreversibility::Locked;
        g.evidence.deviation = 1.0;
        assert_eq!(apply_gates(&c, &g).stopped_at, Some(GateStage::Irreversibility));
    }

    #[test]
    fn test_minimal_load_drops_narrative() {
        let c = candidates();
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.evidence.load = InterpretiveLoad::Minimal;
        let out = apply_gates(&c, &g);
        assert!(out.narrative.is_none());
        assert!(out.continuations.len() <= 2);
    }

    #[test]
    fn test_saturated_load_keeps_existing_only() {
        let c = candidates();
        let sat = all_active(&c);
        let previous = EffectiveOutputs {
            narrative: None,
            continuations: vec![Continuation::new("fading-t", "travel has grown quieter")],
            ..EffectiveOutputs::default()
        };
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.evidence.load = InterpretiveLoad::Saturated;
        g.previous = Some(&previous);
        let out = apply_gates(&c, &g);
        assert!(out.narrative.is_none());
        let ids: Vec<_> = out.continuations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["fading-t"]);
    }

    #[test]
    fn test_collapse_stops() {
        let c = candidates();
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.evidence.persistence = EmergencePersistence::Collapsed;
        let out = apply_gates(&c, &g);
        assert_eq!(out.stopped_at, Some(GateStage::Persistence));
        assert!(out.narrative.is_none());
    }

    #[test]
    fn test_transient_drops_change_worded_only() {
        let mut c = candidates();
        c.narrative = Some("Something new is forming around work.".into());
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.evidence.persistence = EmergencePersistence::Transient;
        let out = apply_gates(&c, &g);
        assert!(out.narrative.is_none());
        assert_eq!(out.continuations.len(), 2);
        assert!(out.drift.is_some());
    }

    #[test]
    fn test_environment_dominant_drops_position_and_drift() {
        let c = candidates();
        let sat = all_active(&c);
        let mut g = ctx(&sat, &EpistemicBoundarySeal::OPEN);
        g.evidence.feedback = FeedbackMode::EnvironmentDominant;
        let out = apply_gates(&c, &g);
        assert!(out.position.is_none());
        assert!(out.drift.is_none());
        assert!(out.narrative.is_some());
        assert!(out.silence.position && out.silence.drift);
    }

    #[test]
    fn test_displaced_nodes_are_removed() {
        let c = candidates();
        let sat = enforce_ceiling(
            vec![MeaningNode::new("fading-t", MeaningKind::Continuation, 1.0, 1.0)],
            0,
            None,
            &SaturationConfig::default(),
        );
        let out = apply_gates(&c, &ctx(&sat, &EpistemicBoundarySeal::OPEN));
        assert!(out.narrative.is_none());
        assert!(out.position.is_none());
        assert_eq!(out.continuations.len(), 1);
    }

    #[test]
    fn test_meaning_candidates_cover_every_output() {
        let snapshot = PeriodSnapshot::new(
            "2024",
            vec![
                ConceptualCluster::new("w", "work", ["2022", "2023", "2024"]),
                ConceptualCluster::new("f", "family", ["2023", "2024"]),
                ConceptualCluster::new("t", "travel", ["2021", "2022"]),
            ],
            vec![ClusterAssociation::new("f", "w", ["2023", "2024"])],
        );
        let signals = StructuralSignals::compute(&snapshot.clusters, &snapshot.associations, "2024");
        let decay = EntropicDecayState {
            decay_factor: 1.0,
            is_decayed: false,
            time_since_last_reinforcement: 0,
            session_start: 0,
            last_novel_reflection_time: Some(0),
        };
        let reflections = [ReflectionEntry::new("r", 10, "Long day at WORK")];
        let ctx = MeaningContext { snapshot: &snapshot, signals: &signals, decay: &decay, reflections: &reflections, now: 100 };
        let nodes = meaning_candidates(&candidates(), &ctx);
        assert_eq!(nodes.len(), 6);
        let narrative = nodes.iter().find(|n| n.id == NARRATIVE_NODE);
        assert_eq!(narrative.map(|n| n.created_at), Some(10));
        let thread = nodes.iter().find(|n| n.id == "thread-f-w");
        assert!(thread.map_or(false, |n| n.strength > 0.0));
    }
}
