/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Errors for caller bugs.
//!
//! Insufficient or ambiguous evidence is never an error: every stage answers
//! with silence (`None` or a `none` variant). These variants cover misuse only.

use thiserror::Error;

/// Invalid use of the inference API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// Two narrative bridges with different scopes were compared.
    #[error("cannot compare narrative scopes `{left}` and `{right}`")]
    ScopeMismatch {
        /// Scope of the left-hand bridge.
        left: &'static str,
        /// Scope of the right-hand bridge.
        right: &'static str,
    },

    /// A configuration contradicts itself.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// A session snapshot belongs to another wallet.
    #[error("session snapshot belongs to wallet `{found}`, expected `{expected}`")]
    WalletMismatch {
        /// Wallet of the live session.
        expected: String,
        /// Wallet recorded in the snapshot.
        found: String,
    },

    /// A session snapshot was written by a newer format.
    #[error("unsupported session snapshot version {0}")]
    UnsupportedSnapshotVersion(u16),
}

/// Result alias for fallible inference operations.
pub type Result<T> = core::result::Result<T, InferenceError>;
