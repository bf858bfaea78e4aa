use async_trait::async_trait;
use redis::{AsyncCommands, aio::ConnectionManager};

use crate::{
    app_error::{AppError, AppResult},
    application::cancellation_token::TokenDenylist,
};

/// Revoked cancellation-token ids, each kept only until the token would
/// have expired on its own.
#[derive(Clone)]
pub struct RedisTokenDenylist {
    manager: ConnectionManager,
}

impl RedisTokenDenylist {
    pub async fn new(redis_url: &str) -> AppResult<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            AppError::Internal(format!(
                "Redis connection failed (check redis password/URL): {e}"
            ))
        })?;
        let manager = ConnectionManager::new(client).await.map_err(|e| {
            AppError::Internal(format!(
                "Redis auth/connection failed (check redis password/URL): {e}"
            ))
        })?;

        Ok(Self { manager })
    }

    fn key(token_id: &str) -> String {
        format!("cancel-token:revoked:{token_id}")
    }
}

#[async_trait]
impl TokenDenylist for RedisTokenDenylist {
    async fn is_revoked(&self, token_id: &str) -> AppResult<bool> {
        let mut conn = self.manager.clone();
        conn.exists(Self::key(token_id))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn revoke(&self, token_id: &str, ttl_secs: u64) -> AppResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(Self::key(token_id), "1", ttl_secs.max(1))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(())
    }
}
