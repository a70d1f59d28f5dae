// SPDX-License-Identifier: MIT

//! Stripe webhook reconciler.
//!
//! Consumes asynchronous billing events and reconciles them into user
//! profiles. Signature failures are a hard 400; per-event processing
//! failures are logged and swallowed so Stripe does not retry events
//! this service cannot use. Redelivery dedup relies on audit records
//! being keyed by event ID.

use crate::db::firestore::CheckoutActivation;
use crate::services::stripe::{construct_event, StripeEvent};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Webhook routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/stripe/webhook", post(handle_event))
}

#[derive(Serialize)]
struct WebhookAck {
    received: bool,
}

#[derive(Serialize)]
struct WebhookError {
    error: String,
}

/// Handle an incoming webhook event (POST).
async fn handle_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let Some(signature) = headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    else {
        tracing::warn!("Webhook rejected: missing Stripe-Signature header");
        return (
            StatusCode::BAD_REQUEST,
            Json(WebhookError {
                error: "Assinatura do webhook ausente".to_string(),
            }),
        )
            .into_response();
    };

    let event = match construct_event(&body, signature, &state.config.stripe_webhook_secret) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(error = %e, "Webhook rejected: signature verification failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookError {
                    error: "Assinatura do webhook inválida".to_string(),
                }),
            )
                .into_response();
        }
    };

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "Webhook event verified"
    );

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            handle_checkout_completed(&state, &event).await;
        }
        "customer.subscription.created" | "customer.subscription.updated" => {
            handle_subscription_change(&state, &event).await;
        }
        "customer.subscription.deleted" => {
            handle_subscription_deleted(&state, &event).await;
        }
        "payment_intent.succeeded" => {
            // One-time payments are fully handled at checkout completion
            tracing::debug!(event_id = %event.id, "Payment intent succeeded (no-op)");
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled event type");
        }
    }

    // Return 200 for any verified event so Stripe does not redeliver
    (StatusCode::OK, Json(WebhookAck { received: true })).into_response()
}

/// Activate a plan from a completed checkout session.
///
/// `client_reference_id` and `metadata.planoId` were set when the
/// session was created; either missing means the event is unusable and
/// is dropped after logging (fire-and-forget policy).
async fn handle_checkout_completed(state: &AppState, event: &StripeEvent) {
    let object = &event.data.object;

    let uid = object
        .get("client_reference_id")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());
    let plano = object
        .get("metadata")
        .and_then(|m| m.get("planoId"))
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty());

    let (Some(uid), Some(plano)) = (uid, plano) else {
        tracing::warn!(
            event_id = %event.id,
            has_uid = uid.is_some(),
            has_plano = plano.is_some(),
            "Dropping checkout event with missing attribution"
        );
        return;
    };

    let activation = CheckoutActivation {
        event_id: event.id.clone(),
        uid: uid.to_string(),
        plano: plano.to_string(),
        customer_id: object
            .get("customer")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        amount_total: object.get("amount_total").and_then(|v| v.as_i64()),
        currency: object
            .get("currency")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
    };

    if let Err(e) = state
        .db
        .apply_checkout_completed(&activation, state.config.free_monthly_credits)
        .await
    {
        tracing::error!(
            error = %e,
            event_id = %event.id,
            uid = %activation.uid,
            "Failed to reconcile checkout completion"
        );
    }
}

/// Update subscription linkage from a created/updated subscription.
async fn handle_subscription_change(state: &AppState, event: &StripeEvent) {
    let object = &event.data.object;

    let Some(customer_id) = object.get("customer").and_then(|v| v.as_str()) else {
        tracing::warn!(event_id = %event.id, "Subscription event without customer id");
        return;
    };

    let subscription_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let status = object
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or("active");
    let period_end = object
        .get("current_period_end")
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

    match state
        .db
        .update_subscription_by_customer(customer_id, subscription_id, status, period_end)
        .await
    {
        Ok(true) => {
            tracing::info!(event_id = %event.id, customer_id, status, "Subscription updated");
        }
        Ok(false) => {
            // The subscription event can arrive before checkout completion
            // stores the customer id; Stripe will not redeliver, so the
            // linkage is picked up by the next checkout-derived write.
            tracing::warn!(
                event_id = %event.id,
                customer_id,
                "No user found for subscription event"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, event_id = %event.id, "Failed to update subscription");
        }
    }
}

/// Flip the user back to Free when their subscription is deleted.
async fn handle_subscription_deleted(state: &AppState, event: &StripeEvent) {
    let object = &event.data.object;

    let Some(customer_id) = object.get("customer").and_then(|v| v.as_str()) else {
        tracing::warn!(event_id = %event.id, "Subscription deletion without customer id");
        return;
    };

    let subscription_id = object
        .get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    match state
        .db
        .update_subscription_by_customer(customer_id, subscription_id, "canceled", None)
        .await
    {
        Ok(true) => {
            tracing::info!(event_id = %event.id, customer_id, "Subscription canceled");
        }
        Ok(false) => {
            tracing::warn!(
                event_id = %event.id,
                customer_id,
                "No user found for subscription deletion"
            );
        }
        Err(e) => {
            tracing::error!(error = %e, event_id = %event.id, "Failed to cancel subscription");
        }
    }
}
