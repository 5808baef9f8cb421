/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Finalized outputs and the presentation projection.
//!
//! [`ViewModel`] is a field projection of [`FinalizedInferenceOutputs`]. It
//! adds no logic; every suppression decision was made by the gates.

use crate::bridge::{NarrativeBridge, SessionBridge};
use crate::closure::ObservationClosure;
use crate::decay::EntropicDecayState;
use crate::emergence::EmergenceSignal;
use crate::feedback::FeedbackMode;
use crate::gating::{EffectiveOutputs, SilenceState};
use crate::irreversibility::InterpretiveIrreversibility;
use crate::load::InterpretiveLoad;
use crate::model::{ClusterAssociation, ConceptualCluster, PeriodId, PeriodSnapshot};
use crate::narrative::Continuation;
use crate::persistence::EmergencePersistence;
use crate::regime::Regime;
use crate::saturation::SaturationState;
use crate::seal::EpistemicBoundarySeal;

// ─── Yearly wrap ────────────────────────────────────────────────────────────

/// The summary the product shows at the end of a period.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct YearlyWrap {
    /// One-line headline naming the top recurring theme.
    pub headline: String,
    /// Counts of recurring themes and periods.
    pub summary: String,
    /// One line per theme, most recurrent first.
    pub moments: Vec<String>,
    /// Fade phrases of themes that went quiet.
    pub shifts: Vec<String>,
}

impl YearlyWrap {
    /// Build a wrap from a snapshot; `None` without clusters.
    pub fn build(snapshot: &PeriodSnapshot) -> Option<Self> {
        let mut ranked: Vec<&ConceptualCluster> = snapshot.clusters.iter().collect();
        ranked.sort_by(|a, b| {
            b.period_count().cmp(&a.period_count()).then_with(|| a.label.cmp(&b.label))
        });
        let top = ranked.first()?;

        let periods = snapshot.tracked_periods().len();
        let themes = ranked.len();
        let summary = format!(
            "{themes} recurring {} across {periods} {}",
            if themes == 1 { "theme" } else { "themes" },
            if periods == 1 { "period" } else { "periods" },
        );
        let moments = ranked
            .iter()
            .map(|c| format!("{} appeared in {} periods", c.label, c.period_count()))
            .collect();
        let shifts = ranked
            .iter()
            .filter(|c| c.faded)
            .map(|c| c.fade_phrase.clone().unwrap_or_else(|| format!("{} faded", c.label)))
            .collect();

        Some(Self {
            headline: format!("{} kept returning", top.label),
            summary,
            moments,
            shifts,
        })
    }
}

// ─── Finalized outputs ──────────────────────────────────────────────────────

/// Stage results for one period of the input sequence.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodInference {
    /// Period id.
    pub period: PeriodId,
    /// Raw per-period classification.
    pub raw_regime: Regime,
    /// Stabilized regime.
    pub regime: Regime,
    /// Closure.
    pub closure: ObservationClosure,
    /// Feedback mode.
    pub feedback: FeedbackMode,
    /// Emergence signal.
    pub emergence: EmergenceSignal,
    /// Emergence persistence.
    pub persistence: EmergencePersistence,
    /// Interpretive load.
    pub load: InterpretiveLoad,
    /// Deviation magnitude from the constraint baseline.
    pub deviation: f32,
    /// Position phrase before gating.
    pub position: Option<String>,
    /// Drift phrase after feedback suppression.
    pub drift: Option<String>,
    /// Continuity note.
    pub continuity_note: Option<String>,
}

/// Everything one computation produced.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FinalizedInferenceOutputs {
    /// Per-period trace, in input order.
    pub periods: Vec<PeriodInference>,
    /// Irreversibility after this computation.
    pub irreversibility: InterpretiveIrreversibility,
    /// Seal after this computation.
    pub seal: EpistemicBoundarySeal,
    /// Decay after this computation.
    pub decay: EntropicDecayState,
    /// Saturation pass over the current period's meaning.
    pub saturation: SaturationState,
    /// Gated outputs for the current period.
    pub effective: EffectiveOutputs,
    /// Yearly wrap, unless sealed.
    pub wrap: Option<YearlyWrap>,
    /// Clusters of the current period.
    pub clusters: Vec<ConceptualCluster>,
    /// Associations of the current period.
    pub associations: Vec<ClusterAssociation>,
}

impl FinalizedInferenceOutputs {
    /// The most recent period, if any was supplied.
    pub fn current(&self) -> Option<&PeriodInference> {
        self.periods.last()
    }

    /// Bridges to hand to the next screen.
    pub fn bridges(&self) -> Vec<SessionBridge> {
        let mut out = vec![SessionBridge::Meaning {
            node_ids: self.saturation.active_ids(),
            saturated: self.saturation.saturated,
        }];
        if let Some(bridge) = self
            .current()
            .and_then(|p| NarrativeBridge::for_period(p.period.clone(), self.effective.narrative.clone()))
        {
            out.push(SessionBridge::Narrative(bridge));
        }
        out
    }
}

// ─── View model ─────────────────────────────────────────────────────────────

/// What the presentation layer renders.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViewModel {
    /// Yearly wrap.
    pub wrap: Option<YearlyWrap>,
    /// Narrative fragment.
    pub narrative: Option<String>,
    /// Continuations (0–2).
    pub continuations: Vec<Continuation>,
    /// Position phrase.
    pub position: Option<String>,
    /// Drift phrase.
    pub drift: Option<String>,
    /// Clusters.
    pub clusters: Vec<ConceptualCluster>,
    /// Associations.
    pub associations: Vec<ClusterAssociation>,
    /// Continuity note.
    pub continuity_note: Option<String>,
    /// Per-region suppression flags.
    pub silence: SilenceState,
}

impl From<&FinalizedInferenceOutputs> for ViewModel {
    fn from(out: &FinalizedInferenceOutputs) -> Self {
        Self {
            wrap: out.wrap.clone(),
            narrative: out.effective.narrative.clone(),
            continuations: out.effective.continuations.clone(),
            position: out.effective.position.clone(),
            drift: out.effective.drift.clone(),
            clusters: out.clusters.clone(),
            associations: out.associations.clone(),
            continuity_note: out.current().and_then(|p| p.continuity_note.clone()),
            silence: out.effective.silence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> PeriodSnapshot {
        PeriodSnapshot::new(
            "2024",
            vec![
                ConceptualCluster::new("f", "family", ["2023", "2024"]),
                ConceptualCluster::new("w", "work", ["2022", "2023", "2024"]),
                ConceptualCluster::new("t", "travel", ["2021", "2022"]).with_fade("travel went quiet"),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_wrap_from_snapshot() {
        let wrap = YearlyWrap::build(&snapshot());
        let Some(wrap) = wrap else { panic!("clusters present") };
        assert_eq!(wrap.headline, "work kept returning");
        assert_eq!(wrap.summary, "3 recurring themes across 4 periods");
        assert_eq!(wrap.moments[0], "work appeared in 3 periods");
        assert_eq!(wrap.shifts, ["travel went quiet"]);
    }

    #[test]
    fn test_wrap_needs_clusters() {
        assert_eq!(YearlyWrap::build(&PeriodSnapshot::new("2024", Vec::new(), Vec::new())), None);
    }

    #[test]
    fn test_view_is_projection() {
        let out = FinalizedInferenceOutputs {
            periods: Vec::new(),
            irreversibility: InterpretiveIrreversibility::Open,
            seal: EpistemicBoundarySeal::OPEN,
            decay: EntropicDecayState::at_session_start(0),
            saturation: SaturationState::default(),
            effective: EffectiveOutputs {
                narrative: Some("x".into()),
                ..EffectiveOutputs::default()
            },
            wrap: YearlyWrap::build(&snapshot()),
            clusters: snapshot().clusters,
            associations: Vec::new(),
        };
        let view = ViewModel::from(&out);
        assert_eq!(view.narrative.as_deref(), Some("x"));
        assert_eq!(view.wrap, out.wrap);
        assert_eq!(view.clusters.len(), 3);
        assert_eq!(view.continuity_note, None);
        assert_eq!(out.bridges().len(), 1);
    }
}
