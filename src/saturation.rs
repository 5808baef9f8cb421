/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Saturation ceiling — a hard cap on concurrently active meaning.
//!
//! Every surfaced item (narrative, continuation, position, drift) is a
//! [`MeaningNode`]. Nodes are ranked by priority and only the top
//! `max_concurrent_meaning` stay active; the rest are displaced.
//!
//! ```text
//! priority = 0.4·strength + 0.3·novelty + 0.3·(age / max_age)
//! ```
//!
//! When decay has set in, narrative and continuation nodes are displaced
//! before ranking.
//!
//! # Invariants
//!
//! - **SAT-001**: `active_nodes.len() <= max_concurrent_meaning`.
//! - **SAT-002**: `displaced_nodes` is exactly the complement of `active_nodes`.
//! - **SAT-003**: empty input is not saturated.

use core::cmp::Ordering;

use crate::decay::EntropicDecayState;

/// Ceiling tuning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaturationConfig {
    /// Maximum number of active nodes. Default 8.
    pub max_concurrent_meaning: usize,
}

impl Default for SaturationConfig {
    fn default() -> Self {
        Self { max_concurrent_meaning: 8 }
    }
}

/// What a meaning node stands for in the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MeaningKind {
    /// The narrative fragment.
    Narrative,
    /// One continuation.
    Continuation,
    /// The observer position phrase.
    Position,
    /// The drift phrase.
    Drift,
}

impl MeaningKind {
    /// Kinds displaced outright once meaning has decayed.
    pub fn yields_to_decay(&self) -> bool {
        matches!(self, MeaningKind::Narrative | MeaningKind::Continuation)
    }
}

/// One candidate piece of surfaced meaning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeaningNode {
    /// Unique id; continuations reuse their continuation id.
    pub id: String,
    /// Node kind.
    pub kind: MeaningKind,
    /// Structural strength [0.0, 1.0], already scaled by decay.
    pub strength: f32,
    /// Novelty [0.0, 1.0].
    pub novelty: f32,
    /// Share of tracked periods the node's backing structure spans [0.0, 1.0].
    pub persistence: f32,
    /// First evidence of this meaning (ms).
    pub created_at: u64,
    /// Ranking priority; set by [`enforce_ceiling`].
    pub priority: f32,
}

impl MeaningNode {
    /// Construct an unranked node.
    pub fn new(id: impl Into<String>, kind: MeaningKind, strength: f32, novelty: f32) -> Self {
        Self {
            id: id.into(),
            kind,
            strength: strength.clamp(0.0, 1.0),
            novelty: novelty.clamp(0.0, 1.0),
            persistence: 0.0,
            created_at: 0,
            priority: 0.0,
        }
    }

    /// Set first-evidence time.
    pub fn created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Set persistence share.
    pub fn with_persistence(mut self, persistence: f32) -> Self {
        self.persistence = persistence.clamp(0.0, 1.0);
        self
    }
}

/// Outcome of one ceiling pass.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SaturationState {
    /// Surviving nodes, highest priority first.
    pub active_nodes: Vec<MeaningNode>,
    /// True when at least one node was displaced.
    pub saturated: bool,
    /// Displaced nodes, highest priority first.
    pub displaced_nodes: Vec<MeaningNode>,
}

impl SaturationState {
    /// True if a node with `id` survived.
    pub fn is_active(&self, id: &str) -> bool {
        self.active_nodes.iter().any(|n| n.id == id)
    }

    /// Ids of the active nodes, in rank order.
    pub fn active_ids(&self) -> Vec<String> {
        self.active_nodes.iter().map(|n| n.id.clone()).collect()
    }
}

fn by_priority(a: &MeaningNode, b: &MeaningNode) -> Ordering {
    b.priority.total_cmp(&a.priority).then_with(|| a.id.cmp(&b.id))
}

/// Rank candidates and displace everything past the ceiling.
///
/// - `now`: current time (ms), for node age.
/// - `decay`: when decayed, narrative and continuation nodes are displaced first.
pub fn enforce_ceiling(
    candidates: Vec<MeaningNode>,
    now: u64,
    decay: Option<&EntropicDecayState>,
    config: &SaturationConfig,
) -> SaturationState {
    if candidates.is_empty() {
        return SaturationState::default();
    }
    let max_age = candidates
        .iter()
        .map(|n| now.saturating_sub(n.created_at))
        .max()
        .unwrap_or(0);

    let decayed = decay.map_or(false, |d| d.is_decayed);
    let mut ranked = Vec::with_capacity(candidates.len());
    let mut displaced = Vec::new();
    for mut node in candidates {
        let age = if max_age == 0 {
            0.0
        } else {
            now.saturating_sub(node.created_at) as f32 / max_age as f32
        };
        node.priority = 0.4 * node.strength + 0.3 * node.novelty + 0.3 * age;
        if decayed && node.kind.yields_to_decay() {
            displaced.push(node);
        } else {
            ranked.push(node);
        }
    }
    ranked.sort_by(by_priority);
    if ranked.len() > config.max_concurrent_meaning {
        displaced.extend(ranked.split_off(config.max_concurrent_meaning));
    }
    displaced.sort_by(by_priority);

    SaturationState { saturated: !displaced.is_empty(), active_nodes: ranked, displaced_nodes: displaced }
}
