// SPDX-License-Identifier: MIT

//! Prompt content and engagement routes.
//!
//! Listing and fetching prompts is public; unlocking, access tracking
//! and favorites require authentication.

use crate::db::UnlockOutcome;
use crate::entitlements;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::Prompt;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Public prompt routes.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/prompts", get(list_prompts))
        .route("/api/prompts/{id}", get(get_prompt))
}

/// Engagement routes (require authentication via middleware in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/prompts/unlock", post(unlock_prompt))
        .route("/api/prompts/track-access", post(track_access))
        .route("/api/prompts/favorite", post(toggle_favorite))
}

// ─── Content (public) ────────────────────────────────────────────

/// List all prompts, newest first.
async fn list_prompts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Prompt>>> {
    let prompts = state.db.list_prompts().await?;
    Ok(Json(prompts))
}

/// Get a single prompt by ID.
async fn get_prompt(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>> {
    let prompt = state.db.get_prompt(&id).await?.ok_or_else(|| {
        AppError::NotFound(format!("Prompt com ID {} não encontrado.", id))
    })?;

    Ok(Json(prompt))
}

// ─── Unlock ──────────────────────────────────────────────────────

#[derive(Deserialize)]
struct UnlockRequest {
    #[serde(rename = "promptId", default)]
    prompt_id: Option<String>,
}

#[derive(Serialize)]
pub struct UnlockResponse {
    pub success: bool,
    pub message: String,
}

/// Extract and validate the `promptId` body field.
fn required_prompt_id(raw: Option<String>) -> Result<String> {
    match raw {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(AppError::BadRequest("promptId é obrigatório".to_string())),
    }
}

/// Spend a credit to unlock a prompt.
///
/// Elite users bypass the credit system entirely. A free user with no
/// remaining credits gets a business rejection (200 with
/// `success: false`), not an HTTP error.
async fn unlock_prompt(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>> {
    let prompt_id = required_prompt_id(body.prompt_id)?;

    let user = state
        .db
        .get_or_create_user(
            &auth.uid,
            auth.email.clone(),
            auth.display_name.clone(),
            state.config.free_monthly_credits,
        )
        .await?;

    if entitlements::is_elite(&user) {
        return Ok(Json(UnlockResponse {
            success: true,
            message: "Plano Elite: acesso ilimitado".to_string(),
        }));
    }

    let outcome = state
        .db
        .unlock_prompt(&auth.uid, &prompt_id, state.config.free_monthly_credits)
        .await?;

    let response = match outcome {
        UnlockOutcome::Unlocked => UnlockResponse {
            success: true,
            message: "Prompt desbloqueado com sucesso".to_string(),
        },
        UnlockOutcome::AlreadyUnlocked => UnlockResponse {
            success: true,
            message: "Prompt já desbloqueado".to_string(),
        },
        UnlockOutcome::NoCredits => UnlockResponse {
            success: false,
            message: "Sem Créditos Disponíveis".to_string(),
        },
    };

    Ok(Json(response))
}

// ─── Access tracking ─────────────────────────────────────────────

#[derive(Deserialize)]
struct TrackAccessRequest {
    #[serde(rename = "promptId", default)]
    prompt_id: Option<String>,
}

#[derive(Serialize)]
pub struct TrackAccessResponse {
    pub success: bool,
}

/// Record that the user opened a prompt (idempotent merge).
async fn track_access(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<TrackAccessRequest>,
) -> Result<Json<TrackAccessResponse>> {
    let prompt_id = required_prompt_id(body.prompt_id)?;

    state.db.record_access(&auth.uid, &prompt_id).await?;

    Ok(Json(TrackAccessResponse { success: true }))
}

// ─── Favorites ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct FavoriteRequest {
    #[serde(rename = "promptId", default)]
    prompt_id: Option<String>,
}

#[derive(Serialize)]
pub struct FavoriteResponse {
    pub success: bool,
    pub favorited: bool,
}

/// Toggle a prompt favorite.
async fn toggle_favorite(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<FavoriteRequest>,
) -> Result<Json<FavoriteResponse>> {
    let prompt_id = required_prompt_id(body.prompt_id)?;

    let favorited = state.db.toggle_favorite(&auth.uid, &prompt_id).await?;

    Ok(Json(FavoriteResponse {
        success: true,
        favorited,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_prompt_id_validation() {
        assert_eq!(required_prompt_id(Some("p1".to_string())).unwrap(), "p1");

        assert!(matches!(
            required_prompt_id(None),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            required_prompt_id(Some("   ".to_string())),
            Err(AppError::BadRequest(_))
        ));
    }
}
