// SPDX-License-Identifier: MIT

//! Aggregated dashboard endpoint.
//!
//! One round trip for the authenticated shell: profile + credits,
//! catalog with per-prompt lock state, and the user's engagement
//! history. Engagement collections are the only source of truth for
//! unlock/access/favorite state.

use crate::entitlements;
use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::Prompt;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Dashboard routes (require authentication via middleware in routes/mod.rs).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/dashboard", get(get_dashboard))
}

#[derive(Serialize)]
pub struct DashboardUser {
    pub uid: String,
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
    pub plano: String,
    #[serde(rename = "isElite")]
    pub is_elite: bool,
    #[serde(rename = "monthlyCredits")]
    pub monthly_credits: u32,
    #[serde(rename = "creditsUsed")]
    pub credits_used: u32,
    #[serde(rename = "creditsRemaining")]
    pub credits_remaining: u32,
    #[serde(rename = "lastCreditReset")]
    pub last_credit_reset: String,
}

#[derive(Serialize)]
pub struct DashboardPrompt {
    #[serde(flatten)]
    pub prompt: Prompt,
    pub unlocked: bool,
    pub favorited: bool,
}

#[derive(Serialize)]
pub struct DashboardStats {
    #[serde(rename = "totalPrompts")]
    pub total_prompts: usize,
    #[serde(rename = "unlockedCount")]
    pub unlocked_count: usize,
    #[serde(rename = "accessedCount")]
    pub accessed_count: usize,
    #[serde(rename = "favoriteCount")]
    pub favorite_count: usize,
}

#[derive(Serialize)]
pub struct DashboardResponse {
    pub user: DashboardUser,
    pub prompts: Vec<DashboardPrompt>,
    pub stats: DashboardStats,
    #[serde(rename = "recentlyAccessed")]
    pub recently_accessed: Vec<String>,
}

/// Assemble the dashboard for the authenticated user.
async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DashboardResponse>> {
    let user = state
        .db
        .get_or_create_user(
            &auth.uid,
            auth.email.clone(),
            auth.display_name.clone(),
            state.config.free_monthly_credits,
        )
        .await?;

    let (prompts, unlocked, mut accessed, favorites) = tokio::try_join!(
        state.db.list_prompts(),
        state.db.list_unlocked(&auth.uid),
        state.db.list_accessed(&auth.uid),
        state.db.list_favorites(&auth.uid),
    )?;

    let is_elite = entitlements::is_elite(&user);
    let unlocked_ids: HashSet<String> = unlocked.into_iter().map(|r| r.prompt_id).collect();
    let favorite_ids: HashSet<String> = favorites.into_iter().map(|r| r.prompt_id).collect();

    // Most recently opened first
    accessed.sort_by(|a, b| b.last_accessed_at.cmp(&a.last_accessed_at));
    let accessed_count = accessed.len();
    let recently_accessed: Vec<String> = accessed
        .into_iter()
        .take(10)
        .map(|r| r.prompt_id)
        .collect();

    let total_prompts = prompts.len();
    let prompts: Vec<DashboardPrompt> = prompts
        .into_iter()
        .map(|p| {
            let unlocked = entitlements::is_prompt_unlocked(is_elite, &unlocked_ids, &p.id);
            let favorited = favorite_ids.contains(&p.id);
            DashboardPrompt {
                prompt: p,
                unlocked,
                favorited,
            }
        })
        .collect();

    let stats = DashboardStats {
        total_prompts,
        unlocked_count: unlocked_ids.len(),
        accessed_count,
        favorite_count: favorite_ids.len(),
    };

    Ok(Json(DashboardResponse {
        user: DashboardUser {
            uid: user.uid,
            email: user.email,
            display_name: user.display_name,
            plano: user.plano.clone(),
            is_elite,
            monthly_credits: user.monthly_credits,
            credits_used: user.credits_used,
            credits_remaining: user.monthly_credits.saturating_sub(user.credits_used),
            last_credit_reset: format_utc_rfc3339(user.last_credit_reset),
        },
        prompts,
        stats,
        recently_accessed,
    }))
}
