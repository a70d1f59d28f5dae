// SPDX-License-Identifier: MIT

//! Bearer-token authentication middleware.

use crate::error::AppError;
use crate::services::IdentityError;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Session cookie name (set by the web app after sign-in).
const SESSION_COOKIE: &str = "vault_session";

/// Authenticated user extracted from a verified ID token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

/// Middleware that requires a valid identity-provider ID token.
///
/// The token is taken from the session cookie or the Authorization
/// header; the verified identity is inserted as a request extension.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Try cookie first, then header
    let token = if let Some(cookie) = jar.get(SESSION_COOKIE) {
        cookie.value().to_string()
    } else {
        let auth_header = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok());

        match auth_header {
            Some(h) if h.starts_with("Bearer ") && h.len() > 7 => h[7..].to_string(),
            _ => return Err(AppError::MissingToken),
        }
    };

    let identity = state
        .identity
        .verify_id_token(&token)
        .await
        .map_err(|e| match e {
            IdentityError::Unauthorized(msg) => {
                tracing::debug!(reason = %msg, "Token rejected");
                AppError::InvalidToken
            }
            IdentityError::Transient(msg) => {
                AppError::Internal(anyhow::anyhow!("identity verification failed: {msg}"))
            }
        })?;

    let auth_user = AuthUser {
        uid: identity.uid,
        email: identity.email,
        display_name: identity.name,
    };
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
