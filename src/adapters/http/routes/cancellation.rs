use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    use_cases::subscription_cancellation::SubscriptionCancellationUseCases,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/cancel", get(inspect_cancellation).post(confirm_cancellation))
        .route("/manage-link", post(request_manage_link))
        .route("/revoke", post(revoke_link))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectQuery {
    token: Option<String>,
    subscription_id: Option<String>,
}

async fn inspect_cancellation(
    State(cancellations): State<Arc<SubscriptionCancellationUseCases>>,
    Query(query): Query<InspectQuery>,
) -> AppResult<impl IntoResponse> {
    let token = query.token.ok_or(AppError::InvalidToken)?;
    let subscription_id = query
        .subscription_id
        .ok_or_else(|| AppError::InvalidInput("subscriptionId is required".into()))?;

    let preview = cancellations.inspect(&token, &subscription_id).await?;
    Ok(Json(preview))
}

#[derive(Deserialize)]
struct ConfirmPayload {
    token: Option<String>,
    #[serde(default)]
    confirmed: bool,
}

async fn confirm_cancellation(
    State(cancellations): State<Arc<SubscriptionCancellationUseCases>>,
    Json(payload): Json<ConfirmPayload>,
) -> AppResult<impl IntoResponse> {
    let token = payload.token.ok_or(AppError::InvalidToken)?;

    let outcome = cancellations.confirm(&token, payload.confirmed).await?;
    Ok(Json(outcome.confirmation))
}

#[derive(Deserialize)]
struct ManageLinkPayload {
    email: String,
}

/// Always 202 for well-formed addresses so the response does not reveal
/// whether the donor exists.
async fn request_manage_link(
    State(cancellations): State<Arc<SubscriptionCancellationUseCases>>,
    Json(payload): Json<ManageLinkPayload>,
) -> AppResult<impl IntoResponse> {
    cancellations.request_management_link(&payload.email).await?;
    Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))))
}

#[derive(Deserialize)]
struct RevokePayload {
    token: Option<String>,
}

async fn revoke_link(
    State(cancellations): State<Arc<SubscriptionCancellationUseCases>>,
    Json(payload): Json<RevokePayload>,
) -> AppResult<impl IntoResponse> {
    let token = payload.token.ok_or(AppError::InvalidToken)?;

    cancellations.revoke_link(&token).await?;
    Ok(Json(json!({ "revoked": true })))
}
