// SPDX-License-Identifier: MIT

//! Funnel lead capture.

use crate::error::{AppError, Result};
use crate::models::Lead;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Lead capture routes (public).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/leads", post(capture_lead))
}

#[derive(Deserialize)]
struct LeadRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Serialize)]
pub struct LeadResponse {
    pub success: bool,
}

/// Minimal shape check; the doc id is the URL-encoded email, so
/// re-submission is an idempotent upsert rather than a duplicate.
fn validate_email(raw: Option<String>) -> Result<String> {
    let email = raw
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::BadRequest("Email é obrigatório".to_string()))?;

    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
    });
    if !valid {
        return Err(AppError::BadRequest("Email inválido".to_string()));
    }

    Ok(email)
}

/// Capture a marketing lead (POST, public).
async fn capture_lead(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LeadRequest>,
) -> Result<Json<LeadResponse>> {
    let email = validate_email(body.email)?;

    let lead = Lead {
        email,
        name: body.name.filter(|n| !n.trim().is_empty()),
        source: body.source.filter(|s| !s.trim().is_empty()),
        captured_at: Utc::now(),
    };

    state.db.upsert_lead(&lead).await?;

    tracing::info!(source = lead.source.as_deref().unwrap_or("direct"), "Lead captured");

    Ok(Json(LeadResponse { success: true }))
}
