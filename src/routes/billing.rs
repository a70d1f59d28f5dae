// SPDX-License-Identifier: MIT

//! Billing routes: checkout session creation and payment verification.

use crate::entitlements;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::services::stripe::CheckoutMode;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Billing routes (require authentication via middleware in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/stripe/checkout", post(create_checkout))
        .route("/api/stripe/verify-payment", get(verify_payment))
}

// ─── Checkout ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CheckoutRequest {
    #[serde(rename = "planoId", default)]
    plano_id: Option<String>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub url: Option<String>,
}

/// Create a hosted checkout session for an Elite plan.
async fn create_checkout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let plano_id = body
        .plano_id
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("planoId é obrigatório".to_string()))?;

    let (price_id, mode) = match plano_id.as_str() {
        "ELITE_MENSAL" => (
            state.config.stripe_price_elite_mensal.as_str(),
            CheckoutMode::Subscription,
        ),
        "ELITE_VITALICIO" => (
            state.config.stripe_price_elite_vitalicio.as_str(),
            CheckoutMode::Payment,
        ),
        _ => {
            return Err(AppError::BadRequest(format!(
                "Plano inválido: {}",
                plano_id
            )))
        }
    };

    // Make sure a profile exists before the webhook tries to activate it
    state
        .db
        .get_or_create_user(
            &auth.uid,
            auth.email.clone(),
            auth.display_name.clone(),
            state.config.free_monthly_credits,
        )
        .await?;

    let success_url = format!(
        "{}/obrigado?session_id={{CHECKOUT_SESSION_ID}}",
        state.config.app_base_url
    );
    let cancel_url = format!("{}/planos", state.config.app_base_url);

    let session = state
        .stripe
        .create_checkout_session(
            price_id,
            mode,
            &auth.uid,
            &plano_id,
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(
        uid = %auth.uid,
        plano = %plano_id,
        session_id = %session.id,
        "Checkout session created"
    );

    Ok(Json(CheckoutResponse {
        session_id: session.id,
        url: session.url,
    }))
}

// ─── Payment verification ────────────────────────────────────────

#[derive(Serialize)]
pub struct VerifyPaymentResponse {
    #[serde(rename = "hasActiveSubscription")]
    pub has_active_subscription: bool,
    pub plano: String,
    pub status: Option<String>,
    #[serde(rename = "dataAtivacao")]
    pub data_ativacao: Option<String>,
}

/// Report the user's current entitlement snapshot.
async fn verify_payment(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<VerifyPaymentResponse>> {
    let user = state
        .db
        .get_or_create_user(
            &auth.uid,
            auth.email.clone(),
            auth.display_name.clone(),
            state.config.free_monthly_credits,
        )
        .await?;

    Ok(Json(VerifyPaymentResponse {
        has_active_subscription: entitlements::is_elite(&user),
        plano: user.plano,
        status: user.subscription_status,
        data_ativacao: user.activated_at.map(format_utc_rfc3339),
    }))
}
