/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Entropic decay of meaning strength in the absence of novel input.
//!
//! Decay is a session-scoped modulator independent of the regime pipeline.
//! It weakens surfaced meaning when the observer stops writing anything new.
//!
//! ```text
//! density = live_reflections / max(days_since_session_start, 1)
//! rate    = ln 2 / half_life · clamp(1 / density, 0.5, 2.0)
//! factor  = 1.0                         if since_last_novel < 24h
//!         = exp(−rate · since_last_novel) otherwise
//! ```
//!
//! Dense writers decay slower; sparse writers decay faster.
//!
//! # Invariants
//!
//! - **DEC-001**: `decay_factor` bounded [0.0, 1.0].
//! - **DEC-002**: zero live reflections ⇒ `decay_factor == 0` and `is_decayed`.
//! - **DEC-003**: deleted reflections never count as reinforcing.

use hashbrown::HashSet;

use crate::model::ReflectionEntry;

/// One hour in milliseconds.
pub const MS_PER_HOUR: u64 = 3_600_000;
/// One day in milliseconds.
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

// ─── Config ─────────────────────────────────────────────────────────────────

/// Decay tuning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecayConfig {
    /// Base half-life (ms). Default 7 days.
    pub half_life_ms: u64,
    /// A novel reflection within this window (ms) fully reinforces. Default 24h.
    pub reinforcement_window_ms: u64,
    /// Factor below which meaning counts as decayed. Default 0.3.
    pub decayed_below: f32,
    /// Clamp on the inverse-density rate multiplier. Default (0.5, 2.0).
    pub density_clamp: (f32, f32),
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            half_life_ms: 7 * MS_PER_DAY,
            reinforcement_window_ms: MS_PER_DAY,
            decayed_below: 0.3,
            density_clamp: (0.5, 2.0),
        }
    }
}

// ─── Novelty gate ───────────────────────────────────────────────────────────

/// Decides whether a reflection brings genuinely new input.
pub trait NoveltyGate {
    /// `earlier` holds the live reflections created before `entry`, oldest first.
    fn is_novel(&self, entry: &ReflectionEntry, earlier: &[&ReflectionEntry]) -> bool;
}

/// Word-overlap novelty: novel when the Jaccard similarity of lower-cased word
/// sets against every earlier reflection stays below `max_overlap`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LexicalNoveltyGate {
    /// Similarity at or above which a reflection repeats an earlier one.
    pub max_overlap: f32,
}

impl Default for LexicalNoveltyGate {
    fn default() -> Self {
        Self { max_overlap: 0.8 }
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard similarity of two word sets; two empty sets are identical.
pub fn jaccard(a: &str, b: &str) -> f32 {
    let (a, b) = (words(a), words(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}

impl NoveltyGate for LexicalNoveltyGate {
    fn is_novel(&self, entry: &ReflectionEntry, earlier: &[&ReflectionEntry]) -> bool {
        entry.is_live()
            && earlier
                .iter()
                .all(|e| jaccard(&entry.plaintext, &e.plaintext) < self.max_overlap)
    }
}

// ─── Decay state ────────────────────────────────────────────────────────────

/// Session-scoped decay state.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropicDecayState {
    /// Multiplier on meaning strength [0.0, 1.0].
    pub decay_factor: f32,
    /// `decay_factor` below the configured floor.
    pub is_decayed: bool,
    /// Milliseconds since the last novel reflection (or session start).
    pub time_since_last_reinforcement: u64,
    /// Session start (ms).
    pub session_start: u64,
    /// Creation time of the most recent novel reflection (ms).
    pub last_novel_reflection_time: Option<u64>,
}

impl EntropicDecayState {
    /// Fresh state at session start: nothing written yet.
    pub fn at_session_start(session_start: u64) -> Self {
        Self {
            decay_factor: 0.0,
            is_decayed: true,
            time_since_last_reinforcement: 0,
            session_start,
            last_novel_reflection_time: None,
        }
    }

    /// Scale a meaning strength by the decay factor.
    pub fn scale(&self, strength: f32) -> f32 {
        (strength * self.decay_factor).clamp(0.0, 1.0)
    }
}

/// Inputs to [`compute_decay`].
#[derive(Clone, Copy, Debug)]
pub struct DecayInputs<'a> {
    /// All reflections, including soft-deleted ones.
    pub reflections: &'a [ReflectionEntry],
    /// Session start (ms).
    pub session_start: u64,
    /// Current time (ms).
    pub now: u64,
    /// State returned by the previous computation in this session.
    pub previous: Option<&'a EntropicDecayState>,
}

/// Recompute decay for the current time and reflection set.
pub fn compute_decay(
    inputs: &DecayInputs<'_>,
    gate: &dyn NoveltyGate,
    config: &DecayConfig,
) -> EntropicDecayState {
    let mut live: Vec<&ReflectionEntry> =
        inputs.reflections.iter().filter(|r| r.is_live()).collect();
    live.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    if live.is_empty() {
        let mut state = EntropicDecayState::at_session_start(inputs.session_start);
        state.time_since_last_reinforcement = inputs.now.saturating_sub(inputs.session_start);
        return state;
    }

    let mut last_novel = live
        .iter()
        .enumerate()
        .filter(|(i, r)| gate.is_novel(r, &live[..*i]))
        .map(|(_, r)| r.created_at)
        .max();
    // Reinforcement already credited earlier in this session is kept.
    if let Some(prev) = inputs.previous.filter(|p| p.session_start == inputs.session_start) {
        last_novel = last_novel.max(prev.last_novel_reflection_time);
    }

    let since = inputs.now.saturating_sub(last_novel.unwrap_or(inputs.session_start));
    let decay_factor = if since < config.reinforcement_window_ms {
        1.0
    } else {
        let elapsed_days =
            (inputs.now.saturating_sub(inputs.session_start) as f64 / MS_PER_DAY as f64).max(1.0);
        let density = live.len() as f64 / elapsed_days;
        let (lo, hi) = config.density_clamp;
        let multiplier = (1.0 / density).clamp(f64::from(lo), f64::from(hi));
        let rate = core::f64::consts::LN_2 / config.half_life_ms.max(1) as f64 * multiplier;
        ((-rate * since as f64).exp() as f32).clamp(0.0, 1.0)
    };
    let is_decayed = decay_factor < config.decayed_below;

    if let Some(prev) = inputs.previous {
        if prev.is_decayed != is_decayed {
            tracing::debug!(decay_factor, is_decayed, since_ms = since, "decay state changed");
        }
    }

    EntropicDecayState {
        decay_factor,
        is_decayed,
        time_since_last_reinforcement: since,
        session_start: inputs.session_start,
        last_novel_reflection_time: last_novel,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
