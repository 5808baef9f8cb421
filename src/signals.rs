/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Structural signals — the scalar summary of one period's cluster structure.
//!
//! Every downstream gate reads these numbers instead of re-walking the cluster
//! list. They are pure functions of `(clusters, associations, period)` and do
//! not depend on input order.
//!
//! # Invariants
//!
//! - **SIG-001**: all ratio signals are bounded [0.0, 1.0].
//! - **SIG-002**: empty input yields all-zero signals (silence, not error).
//! - **SIG-003**: permuting clusters or associations never changes a signal.

use hashbrown::{HashMap, HashSet};

use crate::model::{ClusterAssociation, ConceptualCluster, PeriodId};

/// Scalar summary of one period's structure.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructuralSignals {
    /// Number of clusters.
    pub cluster_count: usize,
    /// Number of associations.
    pub association_count: usize,
    /// Top cluster's period count over all periods touched.
    pub dominance: f32,
    /// Population variance of the number of clusters present per touched period.
    pub period_variance: f32,
    /// Population variance of per-cluster period counts (cluster-size variance).
    pub frequency_variance: f32,
    /// Fraction of clusters with no period earlier than the current one.
    pub new_cluster_rate: f32,
    /// Fraction of clusters participating in any association.
    pub association_concentration: f32,
    /// Fraction of clusters spanning ≥2 periods.
    pub structural_reuse: f32,
    /// Associations over possible cluster pairs.
    pub association_density: f32,
    /// `(top − second) / top` over cluster period counts.
    pub asymmetry: f32,
    /// Fraction of clusters that are newly formed.
    pub recent_formation_ratio: f32,
    /// Fraction of current-period clusters that also occur earlier.
    pub recurrence_ratio: f32,
}

/// Normalise an unbounded variance into [0.0, 1.0): `v / (1 + v)`.
#[inline]
pub fn normalized_variance(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else {
        v / (1.0 + v)
    }
}

fn population_variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n
}

/// True if `cluster` is newly formed with respect to `tracked` (sorted periods):
/// its first period is among the two most recent tracked periods and it spans
/// at most three periods.
pub fn is_newly_formed(cluster: &ConceptualCluster, tracked: &[&PeriodId]) -> bool {
    if cluster.period_count() > 3 {
        return false;
    }
    let Some(first) = cluster.first_period() else {
        return false;
    };
    let recent_start = tracked.len().saturating_sub(2);
    tracked[recent_start..].iter().any(|p| *p == first)
}

impl StructuralSignals {
    /// Compute the signals for one period.
    pub fn compute(
        clusters: &[ConceptualCluster],
        associations: &[ClusterAssociation],
        period: &str,
    ) -> Self {
        let n = clusters.len();
        if n == 0 {
            return Self { association_count: associations.len(), ..Self::default() };
        }
        let nf = n as f32;

        // Per-period presence tally (order-free).
        let mut per_period: HashMap<&str, u32> = HashMap::new();
        for c in clusters {
            for p in &c.source_periods {
                *per_period.entry(p.as_str()).or_insert(0) += 1;
            }
        }
        let touched = per_period.len();

        let mut counts: Vec<usize> = clusters.iter().map(|c| c.period_count()).collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        let top = counts[0];

        let dominance = if touched == 0 { 0.0 } else { (top as f32 / touched as f32).min(1.0) };

        // Sorted so the float reduction is identical for any input order.
        let mut per_period_values: Vec<f32> = per_period.values().map(|&v| v as f32).collect();
        per_period_values.sort_unstable_by(f32::total_cmp);
        let period_variance = population_variance(&per_period_values);
        let size_values: Vec<f32> = counts.iter().map(|&v| v as f32).collect();
        let frequency_variance = population_variance(&size_values);

        let new_clusters = clusters
            .iter()
            .filter(|c| !c.source_periods.iter().any(|p| p.as_str() < period))
            .count();

        let ids: HashSet<&str> = clusters.iter().map(|c| c.id.as_str()).collect();
        let mut associated: HashSet<&str> = HashSet::new();
        for a in associations {
            if ids.contains(a.from_cluster_id.as_str()) {
                associated.insert(a.from_cluster_id.as_str());
            }
            if ids.contains(a.to_cluster_id.as_str()) {
                associated.insert(a.to_cluster_id.as_str());
            }
        }

        let reused = counts.iter().filter(|&&c| c >= 2).count();

        let pairs = n * n.saturating_sub(1) / 2;
        let association_density = if pairs == 0 {
            0.0
        } else {
            (associations.len() as f32 / pairs as f32).min(1.0)
        };

        let asymmetry = if n < 2 || top == 0 {
            0.0
        } else {
            (top - counts[1]) as f32 / top as f32
        };

        let mut tracked: Vec<&PeriodId> =
            clusters.iter().flat_map(|c| c.source_periods.iter()).collect();
        tracked.sort_unstable();
        tracked.dedup();
        let newly_formed = clusters.iter().filter(|c| is_newly_formed(c, &tracked)).count();

        let current: Vec<&ConceptualCluster> = clusters.iter().filter(|c| c.spans(period)).collect();
        let recurrence_ratio = if current.is_empty() {
            reused as f32 / nf
        } else {
            let recurring = current
                .iter()
                .filter(|c| c.source_periods.iter().any(|p| p.as_str() < period))
                .count();
            recurring as f32 / current.len() as f32
        };

        Self {
            cluster_count: n,
            association_count: associations.len(),
            dominance,
            period_variance,
            frequency_variance,
            new_cluster_rate: new_clusters as f32 / nf,
            association_concentration: associated.len() as f32 / nf,
            structural_reuse: reused as f32 / nf,
            association_density,
            asymmetry,
            recent_formation_ratio: newly_formed as f32 / nf,
            recurrence_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(id: &str, periods: &[&str]) -> ConceptualCluster {
        ConceptualCluster::new(id, id, periods.iter().copied())
    }

    #[test]
    fn test_empty_is_all_zero() {
        let s = StructuralSignals::compute(&[], &[], "2024");
        assert_eq!(s, StructuralSignals::default());
    }

    #[test]
    fn test_single_cluster_two_periods() {
        let s = StructuralSignals::compute(&[c("a", &["2022", "2023"])], &[], "2023");
        assert_eq!(s.cluster_count, 1);
        assert!((s.dominance - 1.0).abs() < f32::EPSILON);
        assert!((s.structural_reuse - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.association_concentration, 0.0);
        assert_eq!(s.new_cluster_rate, 0.0);
    }

    #[test]
    fn test_three_single_period_clusters() {
        let clusters = [c("a", &["2024"]), c("b", &["2024"]), c("c", &["2024"])];
        let s = StructuralSignals::compute(&clusters, &[], "2024");
        assert!((s.dominance - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.structural_reuse, 0.0);
        assert!((s.new_cluster_rate - 1.0).abs() < f32::EPSILON);
        assert_eq!(s.period_variance, 0.0);
    }

    #[test]
    fn test_association_concentration_and_density() {
        let clusters = [c("a", &["2022", "2023"]), c("b", &["2022", "2023"]), c("c", &["2023", "2024"])];
        let assocs = [ClusterAssociation::new("a", "b", ["2022", "2023"])];
        let s = StructuralSignals::compute(&clusters, &assocs, "2024");
        assert!((s.association_concentration - 2.0 / 3.0).abs() < 1e-6);
        assert!((s.association_density - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_order_independence() {
        let mut clusters = vec![
            c("a", &["2021", "2022", "2023"]),
            c("b", &["2022", "2023"]),
            c("c", &["2023", "2024"]),
        ];
        let assocs = vec![
            ClusterAssociation::new("a", "b", ["2022", "2023"]),
            ClusterAssociation::new("b", "c", ["2023", "2024"]),
        ];
        let s1 = StructuralSignals::compute(&clusters, &assocs, "2024");
        clusters.reverse();
        let mut rev = assocs.clone();
        rev.reverse();
        let s2 = StructuralSignals::compute(&clusters, &rev, "2024");
        assert_eq!(s1, s2);
    }

    #[test]
    fn test_newly_formed_uses_two_most_recent_periods() {
        let tracked_owned: Vec<PeriodId> =
            ["2020", "2021", "2022", "2023"].iter().map(|s| s.to_string()).collect();
        let tracked: Vec<&PeriodId> = tracked_owned.iter().collect();
        assert!(is_newly_formed(&c("x", &["2022", "2023"]), &tracked));
        assert!(!is_newly_formed(&c("y", &["2020", "2023"]), &tracked));
    }

    #[test]
    fn test_normalized_variance_bounds() {
        assert_eq!(normalized_variance(0.0), 0.0);
        assert!((normalized_variance(1.0) - 0.5).abs() < f32::EPSILON);
        assert!(normalized_variance(1e6) < 1.0);
    }
}
