// SPDX-License-Identifier: MIT

//! Database layer (Firestore).

pub mod firestore;

pub use firestore::{FirestoreDb, UnlockOutcome};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROMPTS: &str = "prompts";
    pub const UNLOCKED_PROMPTS: &str = "unlocked_prompts";
    pub const ACCESSED_PROMPTS: &str = "accessed_prompts";
    pub const FAVORITES: &str = "favorites";
    /// Billing audit records (keyed by Stripe event id)
    pub const TRANSACTIONS: &str = "transactions";
    pub const LEADS: &str = "leads";
}
