use sqlx::PgPool;

use crate::app_error::AppError;

pub mod donation;
pub mod donor;
pub mod subscription_cancellation;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Uniqueness is handled with `ON CONFLICT` in the queries themselves, so any
/// database error reaching this point is a real failure the processor should
/// retry.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::PoolTimedOut => {
                tracing::error!(error = ?err, "Database pool exhausted");
                AppError::Timeout("datastore")
            }
            _ => {
                // Log the actual error for debugging, but don't expose details
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}
