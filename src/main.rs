// SPDX-License-Identifier: MIT

//! Prompt Vault API Server
//!
//! Serves the prompt library, enforces plan entitlements and unlock
//! credits, and reconciles Stripe billing events into user profiles.

use prompt_vault::{
    config::Config,
    db::FirestoreDb,
    services::{IdentityVerifier, StripeClient},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(port = config.port, "Starting Prompt Vault API");

    if !config.has_service_account() {
        tracing::warn!("Identity service account not configured; token verification uses public provider keys only");
    }

    // Initialize Firestore database
    let db = FirestoreDb::new(&config.gcp_project_id)
        .await
        .expect("Failed to connect to Firestore");
    tracing::info!(project = %config.gcp_project_id, "Firestore connected");

    // Token verifier for the identity provider
    let identity = Arc::new(
        IdentityVerifier::new(&config.gcp_project_id)
            .expect("Failed to initialize identity verifier"),
    );

    // Stripe API client
    let stripe = StripeClient::new(config.stripe_secret_key.clone());

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db,
        identity,
        stripe,
    });

    // Build router
    let app = prompt_vault::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("prompt_vault=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
