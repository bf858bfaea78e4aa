use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        if self.is_transient() {
            tracing::error!(error = ?self, "Request failed");
        } else {
            tracing::warn!(error = ?self, "Request rejected");
        }

        match self {
            AppError::Database(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::DatabaseError,
                "Database operation failed".into(),
            ),
            AppError::Processor(_) => error_resp(
                StatusCode::BAD_GATEWAY,
                ErrorCode::ProcessorError,
                "Payment processor unavailable, please retry".into(),
            ),
            AppError::Timeout(_) => error_resp(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorCode::Timeout,
                "Upstream timed out, please retry".into(),
            ),
            AppError::InvalidSignature(_) => error_resp(
                StatusCode::BAD_REQUEST,
                ErrorCode::InvalidSignature,
                "Webhook signature verification failed".into(),
            ),
            AppError::InvalidPayload(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidPayload, msg)
            }
            e @ AppError::MissingDonorEmail(_) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::MissingDonorEmail, e.to_string())
            }
            e @ AppError::InvalidToken => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidToken, e.to_string())
            }
            e @ AppError::ExpiredToken => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::ExpiredToken, e.to_string())
            }
            e @ AppError::SubscriptionNotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::SubscriptionNotFound, e.to_string())
            }
            e @ AppError::CustomerNotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::CustomerNotFound, e.to_string())
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, msg)
            }
            AppError::NotFound => {
                error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, "Not found".into())
            }
            AppError::Internal(_) => error_resp(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorCode::InternalError,
                "Internal error".into(),
            ),
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String) -> Response {
    let body = serde_json::json!({ "error": message, "code": code.as_str() });
    (status, Json(body)).into_response()
}
