/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Session bridges handed to the presentation layer between computations.
//!
//! A bridge is either the set of active meaning nodes or a scoped narrative
//! fragment. Each kind carries its own required fields.

use crate::error::{InferenceError, Result};
use crate::model::PeriodId;

/// Granularity of a narrative, inferred from the period id shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NarrativeScope {
    /// `YYYY-Www`
    Week,
    /// `YYYY-MM`
    Month,
    /// `YYYY`
    Year,
}

impl NarrativeScope {
    /// Lower-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeScope::Week => "week",
            NarrativeScope::Month => "month",
            NarrativeScope::Year => "year",
        }
    }

    /// Infer the scope of a period id; `None` for unrecognised shapes.
    pub fn of_period(period: &str) -> Option<Self> {
        let digits = |s: &str, n: usize| s.len() == n && s.bytes().all(|b| b.is_ascii_digit());
        let (year, rest) = match period.split_once('-') {
            Some((y, r)) => (y, Some(r)),
            None => (period, None),
        };
        if !digits(year, 4) {
            return None;
        }
        match rest {
            None => Some(NarrativeScope::Year),
            Some(r) if digits(r, 2) => Some(NarrativeScope::Month),
            Some(r) => match r.strip_prefix('W') {
                Some(w) if digits(w, 2) => Some(NarrativeScope::Week),
                _ => None,
            },
        }
    }
}

/// A narrative fragment pinned to one period.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NarrativeBridge {
    /// Scope of `period`.
    pub scope: NarrativeScope,
    /// Period the fragment describes.
    pub period: PeriodId,
    /// Effective narrative fragment, if any survived gating.
    pub fragment: Option<String>,
}

impl NarrativeBridge {
    /// Bridge for a period id; `None` if the id has no recognisable scope.
    pub fn for_period(period: impl Into<PeriodId>, fragment: Option<String>) -> Option<Self> {
        let period = period.into();
        let scope = NarrativeScope::of_period(&period)?;
        Some(Self { scope, period, fragment })
    }

    /// True if `other`'s fragment differs from this one.
    ///
    /// Comparing bridges of different scopes is a caller bug and fails with
    /// [`InferenceError::ScopeMismatch`].
    pub fn compare(&self, other: &NarrativeBridge) -> Result<bool> {
        if self.scope != other.scope {
            return Err(InferenceError::ScopeMismatch {
                left: self.scope.as_str(),
                right: other.scope.as_str(),
            });
        }
        Ok(self.fragment != other.fragment)
    }
}

/// What survives from one computation to the next.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "lowercase"))]
pub enum SessionBridge {
    /// Active meaning nodes after the saturation ceiling.
    Meaning {
        /// Active node ids, highest priority first.
        node_ids: Vec<String>,
        /// The ceiling displaced at least one node.
        saturated: bool,
    },
    /// A scoped narrative.
    Narrative(NarrativeBridge),
}
