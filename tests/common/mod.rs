// SPDX-License-Identifier: MIT

use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use prompt_vault::config::Config;
use prompt_vault::db::FirestoreDb;
use prompt_vault::routes::create_router;
use prompt_vault::services::{IdentityVerifier, StripeClient};
use prompt_vault::AppState;
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shared secret for minting test ID tokens (HS256 static-key verifier).
#[allow(dead_code)]
pub const TEST_IDENTITY_SECRET: &[u8] = b"test_identity_secret_32_bytes!!!";

/// Kid registered with the static-key verifier.
#[allow(dead_code)]
pub const TEST_KID: &str = "test-kid";

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build the shared state for tests around a given database.
#[allow(dead_code)]
pub fn test_state(db: FirestoreDb) -> Arc<AppState> {
    let config = Config::test_default();

    let identity = Arc::new(
        IdentityVerifier::new_with_static_key(
            &config.gcp_project_id,
            TEST_KID,
            Algorithm::HS256,
            DecodingKey::from_secret(TEST_IDENTITY_SECRET),
        )
        .expect("Failed to build static-key verifier"),
    );

    let stripe = StripeClient::new(config.stripe_secret_key.clone());

    Arc::new(AppState {
        config,
        db,
        identity,
        stripe,
    })
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db_offline());
    (create_router(state.clone()), state)
}

/// Create a test app backed by the Firestore emulator.
#[allow(dead_code)]
pub async fn create_emulator_app() -> (axum::Router, Arc<AppState>) {
    let state = test_state(test_db().await);
    (create_router(state.clone()), state)
}

/// Mint a valid ID token for the static-key verifier.
#[allow(dead_code)]
pub fn mint_id_token(uid: &str, email: Option<&str>, name: Option<&str>) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        aud: String,
        iss: String,
        exp: usize,
        iat: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: uid.to_string(),
        aud: "test-project".to_string(),
        iss: "https://securetoken.google.com/test-project".to_string(),
        exp: now + 3600,
        iat: now,
        email: email.map(|e| e.to_string()),
        name: name.map(|n| n.to_string()),
    };

    let header = Header {
        kid: Some(TEST_KID.to_string()),
        ..Header::new(Algorithm::HS256)
    };

    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(TEST_IDENTITY_SECRET),
    )
    .unwrap()
}
