//! Candidate narrative fragments and continuations.
//!
//! These are the *ungated* interpretive outputs for one period. Nothing built
//! here reaches the presentation layer directly: [`crate::gating`] decides what
//! survives.

use crate::model::PeriodSnapshot;
use crate::regime::Regime;
use crate::signals::StructuralSignals;

/// Continuation id signalling several open threads in a transitional period.
/// Its presence keeps a period open.
pub const TRANSITIONAL_MULTIPLICITY: &str = "transitional-multiplicity";

/// Words that mark a fragment as describing change or variation.
const CHANGE_WORDS: [&str; 8] =
    ["change", "shift", "variation", "moving", "new", "forming", "emerging", "drift"];

/// A suggested thread the user could keep following.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Continuation {
    /// Stable identifier (e.g. `"transitional-multiplicity"`, `"thread-a-b"`).
    pub id: String,
    /// Display text.
    pub text: String,
}

impl Continuation {
    /// Construct a continuation.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { id: id.into(), text: text.into() }
    }

    /// True if the text speaks about change.
    pub fn is_change_worded(&self) -> bool {
        is_change_worded(&self.text)
    }
}

/// True if `text` contains a change/variation word (whole-word, case-insensitive).
pub fn is_change_worded(text: &str) -> bool {
    text.split(|ch: char| !ch.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| {
            let w = w.to_lowercase();
            CHANGE_WORDS.iter().any(|cw| w == *cw || (w.starts_with(cw) && w.len() <= cw.len() + 3))
        })
}

/// Labels of the clusters ordered by recurrence (most periods first, then label).
fn ranked_labels(snapshot: &PeriodSnapshot) -> Vec<&str> {
    let mut clusters: Vec<_> = snapshot.clusters.iter().collect();
    clusters.sort_by(|a, b| {
        b.period_count().cmp(&a.period_count()).then_with(|| a.label.cmp(&b.label))
    });
    clusters.into_iter().map(|c| c.label.as_str()).collect()
}

/// Candidate narrative fragment for a stabilized regime, or `None` with no clusters.
pub fn candidate_narrative(regime: Regime, snapshot: &PeriodSnapshot) -> Option<String> {
    let labels = ranked_labels(snapshot);
    let top = *labels.first()?;
    Some(match regime {
        Regime::Deterministic => format!("Your reflections keep returning to {top}."),
        Regime::Transitional => match labels.get(1) {
            Some(second) => format!("Your attention is shifting between {top} and {second}."),
            None => format!("Your attention is shifting around {top}."),
        },
        Regime::Emergent => format!("Something new is forming around {top}."),
    })
}

/// Candidate continuations, most specific first.
pub fn candidate_continuations(
    regime: Regime,
    signals: &StructuralSignals,
    snapshot: &PeriodSnapshot,
) -> Vec<Continuation> {
    let mut out = Vec::new();
    if regime == Regime::Transitional && signals.cluster_count >= 3 {
        out.push(Continuation::new(TRANSITIONAL_MULTIPLICITY, "Several threads remain open"));
    }

    let label_of = |id: &str| {
        snapshot.clusters.iter().find(|c| c.id == id).map(|c| c.label.as_str())
    };
    let mut assocs: Vec<_> = snapshot.associations.iter().collect();
    assocs.sort_by(|a, b| {
        b.co_occurrence_count
            .cmp(&a.co_occurrence_count)
            .then_with(|| a.canonical_pair().cmp(&b.canonical_pair()))
    });
    for a in assocs {
        let (x, y) = a.canonical_pair();
        if let (Some(lx), Some(ly)) = (label_of(x), label_of(y)) {
            out.push(Continuation::new(
                format!("thread-{x}-{y}"),
                format!("{lx} keeps appearing alongside {ly}"),
            ));
        }
    }

    let mut faded: Vec<_> = snapshot.clusters.iter().filter(|c| c.faded).collect();
    faded.sort_by(|a, b| a.id.cmp(&b.id));
    for c in faded {
        let text = c
            .fade_phrase
            .clone()
            .unwrap_or_else(|| format!("{} has grown quieter", c.label));
        out.push(Continuation::new(format!("fading-{}", c.id), text));
    }
    out
}
