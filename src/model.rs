/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Input data model — clusters, associations, baselines and reflections.
//!
//! Everything in this module is produced by collaborators outside the crate
//! (the clustering heuristic, the constraints baseline, encrypted storage) and
//! consumed read-only by the inference pipeline. Values are recreated for every
//! input snapshot and never mutated in place.
//!
//! # Invariants
//!
//! - **M-001**: a cluster has appeared in ≥2 distinct periods (enforced upstream,
//!   not re-checked here).
//! - **M-002**: `co_occurrence_count == periods.len() ≥ 2` for associations.
//! - **M-003**: period ids order lexicographically in time (`"2023" < "2024"`,
//!   `"2024-01" < "2024-02"`).

use std::collections::BTreeSet;

/// Observation period identifier — a year (`"2024"`), month (`"2024-03"`) or
/// ISO week (`"2024-W09"`) string.
pub type PeriodId = String;

// ─── ConceptualCluster ──────────────────────────────────────────────────────

/// A recurring theme across reflections, as produced by the clustering collaborator.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConceptualCluster {
    /// Stable identifier within one input snapshot.
    pub id: String,
    /// One to three word label.
    pub label: String,
    /// Optional longer description.
    pub description: Option<String>,
    /// Periods in which the theme was observed.
    pub source_periods: BTreeSet<PeriodId>,
    /// Set when the theme has stopped recurring.
    pub faded: bool,
    /// Neutral phrase describing the fade, when `faded`.
    pub fade_phrase: Option<String>,
}

impl ConceptualCluster {
    /// Construct a live (non-faded) cluster observed in `periods`.
    pub fn new<I, P>(id: impl Into<String>, label: impl Into<String>, periods: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeriodId>,
    {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            source_periods: periods.into_iter().map(Into::into).collect(),
            faded: false,
            fade_phrase: None,
        }
    }

    /// Mark the cluster as faded with a neutral phrase.
    pub fn with_fade(mut self, phrase: impl Into<String>) -> Self {
        self.faded = true;
        self.fade_phrase = Some(phrase.into());
        self
    }

    /// Number of distinct periods the cluster spans.
    pub fn period_count(&self) -> usize {
        self.source_periods.len()
    }

    /// Earliest period the cluster was observed in.
    pub fn first_period(&self) -> Option<&PeriodId> {
        self.source_periods.iter().next()
    }

    /// True if the cluster was observed in `period`.
    pub fn spans(&self, period: &str) -> bool {
        self.source_periods.contains(period)
    }
}

// ─── ClusterAssociation ─────────────────────────────────────────────────────

/// Unordered co-occurrence of two clusters across periods.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterAssociation {
    /// One endpoint.
    pub from_cluster_id: String,
    /// The other endpoint.
    pub to_cluster_id: String,
    /// Number of periods in which both clusters occurred (M-002).
    pub co_occurrence_count: u32,
    /// Periods in which both clusters occurred.
    pub periods: BTreeSet<PeriodId>,
}

impl ClusterAssociation {
    /// Construct an association; `co_occurrence_count` is derived from `periods`.
    pub fn new<I, P>(from: impl Into<String>, to: impl Into<String>, periods: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PeriodId>,
    {
        let periods: BTreeSet<PeriodId> = periods.into_iter().map(Into::into).collect();
        Self {
            from_cluster_id: from.into(),
            to_cluster_id: to.into(),
            co_occurrence_count: periods.len() as u32,
            periods,
        }
    }

    /// True if `cluster_id` is either endpoint.
    pub fn touches(&self, cluster_id: &str) -> bool {
        self.from_cluster_id == cluster_id || self.to_cluster_id == cluster_id
    }

    /// Endpoints in canonical (sorted) order, so `(a, b)` and `(b, a)` compare equal.
    pub fn canonical_pair(&self) -> (&str, &str) {
        if self.from_cluster_id <= self.to_cluster_id {
            (&self.from_cluster_id, &self.to_cluster_id)
        } else {
            (&self.to_cluster_id, &self.from_cluster_id)
        }
    }
}

// ─── InitialConditions ──────────────────────────────────────────────────────

/// Three-step qualitative level used by the constraint baseline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Level {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
}

/// Per-wallet structural baseline, computed once per session and read-only after.
///
/// Used to predict the structure that would be *expected* given the observer's
/// own constraints, so that emergence is judged relative to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InitialConditions {
    /// How densely constrained the observer's reflection history is.
    pub constraint_density: Level,
    /// How concentrated authority/attention is on few themes.
    pub authority_concentration: Level,
    /// How variable the observer's history normally is.
    pub variability_baseline: Level,
}

impl InitialConditions {
    /// Construct a baseline from its three levels.
    pub fn new(
        constraint_density: Level,
        authority_concentration: Level,
        variability_baseline: Level,
    ) -> Self {
        Self { constraint_density, authority_concentration, variability_baseline }
    }
}

// ─── PeriodSnapshot ─────────────────────────────────────────────────────────

/// Clusters and associations as observed for one period.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeriodSnapshot {
    /// The period this snapshot describes.
    pub period: PeriodId,
    /// Clusters known as of this period.
    pub clusters: Vec<ConceptualCluster>,
    /// Associations known as of this period.
    pub associations: Vec<ClusterAssociation>,
}

impl PeriodSnapshot {
    /// Bundle one period's inputs.
    pub fn new(
        period: impl Into<PeriodId>,
        clusters: Vec<ConceptualCluster>,
        associations: Vec<ClusterAssociation>,
    ) -> Self {
        Self { period: period.into(), clusters, associations }
    }

    /// Sorted union of every period any cluster was observed in.
    pub fn tracked_periods(&self) -> Vec<&PeriodId> {
        let set: BTreeSet<&PeriodId> =
            self.clusters.iter().flat_map(|c| c.source_periods.iter()).collect();
        set.into_iter().collect()
    }

    /// The tracked period immediately before `self.period`, if any.
    pub fn previous_tracked_period(&self) -> Option<&PeriodId> {
        self.tracked_periods()
            .into_iter()
            .filter(|p| p.as_str() < self.period.as_str())
            .last()
    }

    /// Continuity note: clusters carried from the previous tracked period into
    /// this one. `None` when nothing carries over.
    pub fn continuity_note(&self) -> Option<String> {
        let prev = self.previous_tracked_period()?;
        let mut carried: Vec<&ConceptualCluster> = self
            .clusters
            .iter()
            .filter(|c| c.spans(&self.period) && c.spans(prev))
            .collect();
        if carried.is_empty() {
            return None;
        }
        carried.sort_by(|a, b| {
            b.period_count().cmp(&a.period_count()).then_with(|| a.label.cmp(&b.label))
        });
        let labels: Vec<&str> = carried.iter().take(2).map(|c| c.label.as_str()).collect();
        Some(format!("{} carried through from {}", labels.join(" and "), prev))
    }
}

// ─── ReflectionEntry ────────────────────────────────────────────────────────

/// A decrypted journal reflection, as handed over by the storage collaborator.
///
/// Timestamps are Unix milliseconds.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReflectionEntry {
    /// Storage identifier.
    pub id: String,
    /// Creation time (ms).
    pub created_at: u64,
    /// Soft-delete time (ms), if deleted.
    pub deleted_at: Option<u64>,
    /// Decrypted body.
    pub plaintext: String,
}

impl ReflectionEntry {
    /// Construct a live reflection.
    pub fn new(id: impl Into<String>, created_at: u64, plaintext: impl Into<String>) -> Self {
        Self { id: id.into(), created_at, deleted_at: None, plaintext: plaintext.into() }
    }

    /// True unless the entry has been soft-deleted.
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_association_count_matches_periods() {
        let a = ClusterAssociation::new("a", "b", ["2022", "2023", "2023"]);
        assert_eq!(a.co_occurrence_count, 2);
        assert_eq!(a.periods.len(), 2);
    }

    #[test]
    fn test_canonical_pair_is_order_free() {
        let ab = ClusterAssociation::new("a", "b", ["2022", "2023"]);
        let ba = ClusterAssociation::new("b", "a", ["2022", "2023"]);
        assert_eq!(ab.canonical_pair(), ba.canonical_pair());
    }

    #[test]
    fn test_previous_tracked_period() {
        let snap = PeriodSnapshot::new(
            "2024",
            vec![
                ConceptualCluster::new("a", "work", ["2021", "2024"]),
                ConceptualCluster::new("b", "family", ["2022", "2023"]),
            ],
            vec![],
        );
        assert_eq!(snap.previous_tracked_period().map(String::as_str), Some("2023"));
    }

    #[test]
    fn test_continuity_note_names_carried_clusters() {
        let snap = PeriodSnapshot::new(
            "2024",
            vec![
                ConceptualCluster::new("a", "work", ["2023", "2024"]),
                ConceptualCluster::new("b", "travel", ["2021", "2022"]),
            ],
            vec![],
        );
        assert_eq!(snap.continuity_note().as_deref(), Some("work carried through from 2023"));
    }

    #[test]
    fn test_no_continuity_without_overlap() {
        let snap = PeriodSnapshot::new(
            "2024",
            vec![ConceptualCluster::new("a", "work", ["2021", "2022"])],
            vec![],
        );
        assert!(snap.continuity_note().is_none());
    }
}
