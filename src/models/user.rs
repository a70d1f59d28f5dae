// SPDX-License-Identifier: MIT

//! User profile model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Plan ID for the credit-limited Free tier.
pub const PLAN_FREE: &str = "free";

/// Subscription status value for an active Elite subscription.
pub const STATUS_ACTIVE: &str = "active";

/// User profile stored in Firestore (keyed by identity-provider uid).
///
/// Created on first sign-in; mutated by credit consumption, webhook plan
/// updates, and the lazy monthly reset. Never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Identity-provider user ID (also the document ID)
    pub uid: String,
    /// Email address (may be None if not shared)
    pub email: Option<String>,
    /// Display name from the identity provider
    pub display_name: Option<String>,

    /// Plan ID: `free` or an Elite plan such as `ELITE_MENSAL` / `ELITE_VITALICIO`
    #[serde(default = "default_plan")]
    pub plano: String,
    /// Monthly unlock credit ceiling for the current period
    #[serde(default)]
    pub monthly_credits: u32,
    /// Credits consumed in the current period
    #[serde(default)]
    pub credits_used: u32,
    /// When the credit counters were last reset
    pub last_credit_reset: DateTime<Utc>,

    /// Stripe customer ID, set by the webhook reconciler
    #[serde(default)]
    pub stripe_customer_id: Option<String>,
    /// Stripe subscription ID
    #[serde(default)]
    pub subscription_id: Option<String>,
    /// Stripe subscription status (`active`, `canceled`, ...)
    #[serde(default)]
    pub subscription_status: Option<String>,
    /// End of the current billing period
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
    /// When the Elite plan was activated
    #[serde(default)]
    pub activated_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_plan() -> String {
    PLAN_FREE.to_string()
}

impl User {
    /// Build a fresh Free-plan profile for a first sign-in.
    pub fn new(
        uid: String,
        email: Option<String>,
        display_name: Option<String>,
        monthly_credits: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            uid,
            email,
            display_name,
            plano: PLAN_FREE.to_string(),
            monthly_credits,
            credits_used: 0,
            last_credit_reset: now,
            stripe_customer_id: None,
            subscription_id: None,
            subscription_status: None,
            current_period_end: None,
            activated_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}
