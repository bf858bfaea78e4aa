use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::timeout::bounded;

// ============================================================================
// Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CancellationClaims {
    pub sub: String, // processor subscription id
    pub email: String,
    pub jti: String,
    pub exp: i64,
    pub iat: i64,
}

/// What a valid token authorizes: cancelling `subscription_id` on behalf of `email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCancellation {
    pub subscription_id: String,
    pub email: String,
    pub token_id: String,
    pub expires_at: i64,
}

pub fn issue(
    subscription_id: &str,
    email: &str,
    secret: &SecretString,
    ttl: Duration,
) -> AppResult<String> {
    let now = OffsetDateTime::now_utc().unix_timestamp();
    let exp = now + ttl.whole_seconds();
    let claims = CancellationClaims {
        sub: subscription_id.to_string(),
        email: email.trim().to_lowercase(),
        jti: Uuid::new_v4().to_string(),
        iat: now,
        exp,
    };
    let header = Header::new(Algorithm::HS256);
    encode(
        &header,
        &claims,
        &EncodingKey::from_secret(secret.expose_secret().as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}

pub fn verify(token: &str, secret: &SecretString) -> AppResult<VerifiedCancellation> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let claims = decode::<CancellationClaims>(
        token,
        &DecodingKey::from_secret(secret.expose_secret().as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::ExpiredToken,
        _ => AppError::InvalidToken,
    })?;

    if claims.sub.is_empty() || claims.email.is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(VerifiedCancellation {
        subscription_id: claims.sub,
        email: claims.email,
        token_id: claims.jti,
        expires_at: claims.exp,
    })
}

// ============================================================================
// Revocation
// ============================================================================

/// Server-side list of revoked token ids. Entries only need to live until the
/// token would have expired anyway.
#[async_trait]
pub trait TokenDenylist: Send + Sync {
    async fn is_revoked(&self, token_id: &str) -> AppResult<bool>;
    async fn revoke(&self, token_id: &str, ttl_secs: u64) -> AppResult<()>;
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct CancellationTokenService {
    secret: SecretString,
    ttl: Duration,
    denylist: Option<Arc<dyn TokenDenylist>>,
    denylist_timeout: std::time::Duration,
}

impl CancellationTokenService {
    pub fn new(secret: SecretString, ttl: Duration) -> Self {
        Self {
            secret,
            ttl,
            denylist: None,
            denylist_timeout: std::time::Duration::ZERO,
        }
    }

    /// Every denylist lookup and write runs under `timeout`.
    pub fn with_denylist(
        mut self,
        denylist: Arc<dyn TokenDenylist>,
        timeout: std::time::Duration,
    ) -> Self {
        self.denylist = Some(denylist);
        self.denylist_timeout = timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, subscription_id: &str, email: &str) -> AppResult<String> {
        issue(subscription_id, email, &self.secret, self.ttl)
    }

    pub fn issue_with_ttl(&self, subscription_id: &str, email: &str, ttl: Duration) -> AppResult<String> {
        issue(subscription_id, email, &self.secret, ttl)
    }

    /// Cryptographic + expiry check, then the denylist when one is configured.
    pub async fn verify(&self, token: &str) -> AppResult<VerifiedCancellation> {
        let verified = verify(token, &self.secret)?;

        if let Some(denylist) = &self.denylist {
            let revoked = bounded(
                self.denylist_timeout,
                "token denylist",
                denylist.is_revoked(&verified.token_id),
            )
            .await?;
            if revoked {
                tracing::info!(
                    token_id = %verified.token_id,
                    subscription_id = %verified.subscription_id,
                    "Rejected revoked cancellation token"
                );
                return Err(AppError::InvalidToken);
            }
        }

        Ok(verified)
    }

    /// Revoke a still-valid token before its expiry. Requires a denylist.
    pub async fn revoke(&self, token: &str) -> AppResult<VerifiedCancellation> {
        let denylist = self.denylist.as_ref().ok_or_else(|| {
            AppError::Internal("token revocation requires a configured denylist".into())
        })?;
        let verified = verify(token, &self.secret)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let remaining = (verified.expires_at - now).max(1) as u64;
        bounded(
            self.denylist_timeout,
            "token denylist",
            denylist.revoke(&verified.token_id, remaining),
        )
        .await?;
        Ok(verified)
    }
}
