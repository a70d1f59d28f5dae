// SPDX-License-Identifier: MIT

//! Prompt Vault: backend API for the prompt library SaaS.
//!
//! This crate serves prompt content, tracks per-user entitlements
//! (plan tier, monthly credits, unlocks, favorites) in Firestore, and
//! reconciles Stripe billing events into those entitlements.

pub mod config;
pub mod db;
pub mod entitlements;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::FirestoreDb;
use services::{IdentityVerifier, StripeClient};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub identity: Arc<IdentityVerifier>,
    pub stripe: StripeClient,
}
