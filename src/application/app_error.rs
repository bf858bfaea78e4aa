use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Payment processor error: {0}")]
    Processor(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("Invalid webhook signature: {0}")]
    InvalidSignature(String),

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),

    #[error("Event {0} has no resolvable donor email")]
    MissingDonorEmail(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invalid or expired token")]
    ExpiredToken,

    #[error("Subscription not found")]
    SubscriptionNotFound,

    #[error("Customer not found")]
    CustomerNotFound,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the failure may clear up on its own, so the caller (or the
    /// processor's redelivery) should try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AppError::Database(_)
                | AppError::Processor(_)
                | AppError::Timeout(_)
                | AppError::Internal(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    ProcessorError,
    Timeout,
    InvalidSignature,
    InvalidPayload,
    MissingDonorEmail,
    InvalidToken,
    ExpiredToken,
    SubscriptionNotFound,
    CustomerNotFound,
    InvalidInput,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ProcessorError => "PROCESSOR_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::InvalidPayload => "INVALID_PAYLOAD",
            ErrorCode::MissingDonorEmail => "MISSING_DONOR_EMAIL",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::ExpiredToken => "EXPIRED_TOKEN",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::CustomerNotFound => "CUSTOMER_NOT_FOUND",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
