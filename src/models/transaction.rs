// SPDX-License-Identifier: MIT

//! Billing audit records written by the webhook reconciler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit record for a processed billing event.
///
/// Keyed by the Stripe event ID, so webhook redelivery overwrites the
/// same document instead of appending a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Stripe event ID (also the document ID)
    pub event_id: String,
    pub event_type: String,
    pub user_id: String,
    /// Plan granted by this event
    pub plano: String,
    /// Amount in the smallest currency unit, when present on the event
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    pub created_at: DateTime<Utc>,
}
