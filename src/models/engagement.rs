// SPDX-License-Identifier: MIT

//! Per-user prompt engagement records.
//!
//! Each record lives in its own collection keyed by the composite
//! `{uid}_{prompt_id}` document ID. These collections are the single
//! source of truth; dashboard counts are derived by query rather than
//! from denormalized arrays on the profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A credit spent by a Free-tier user to permanently unlock one prompt.
///
/// Append-only; there is no revocation path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub user_id: String,
    pub prompt_id: String,
    pub unlocked_at: DateTime<Utc>,
}

/// Tracking of which prompts a user has opened.
///
/// Written with merge semantics: exactly one record per (user, prompt).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRecord {
    pub user_id: String,
    pub prompt_id: String,
    /// First time the prompt was opened
    pub accessed_at: DateTime<Utc>,
    /// Most recent open
    pub last_accessed_at: DateTime<Utc>,
}

/// Explicit user favorite, created/deleted by toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub user_id: String,
    pub prompt_id: String,
    pub favorited_at: DateTime<Utc>,
}
