use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState, app_error::AppResult, use_cases::webhook::WebhookUseCases,
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe", post(stripe_webhook))
}

/// The body is taken as raw bytes so the signature is checked over exactly
/// what the processor signed.
async fn stripe_webhook(
    State(webhooks): State<Arc<WebhookUseCases>>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    // Side effects keep running after the response; their handle is dropped here.
    webhooks.handle_stripe_event(&body, signature).await?;

    Ok(Json(json!({ "received": true })))
}
