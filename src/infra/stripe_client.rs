use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::{
        PaymentProcessor, ProcessorCustomer, ProcessorSubscription,
    },
    domain::entities::{
        donation_frequency::DonationFrequency, money::normalize_currency,
        subscription_status::ProcessorSubscriptionStatus,
    },
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString, timeout: Duration) -> AppResult<Self> {
        Self::with_api_base(secret_key, timeout, STRIPE_API_BASE)
    }

    pub fn with_api_base(
        secret_key: SecretString,
        timeout: Duration,
        api_base: &str,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            secret_key,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<StripeSubscription>> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{}", self.api_base, subscription_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_optional_response(response).await
    }

    /// Cancel immediately rather than at period end.
    pub async fn delete_subscription(&self, subscription_id: &str) -> AppResult<StripeSubscription> {
        let response = self
            .client
            .delete(format!("{}/subscriptions/{}", self.api_base, subscription_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn fetch_customer(&self, customer_id: &str) -> AppResult<Option<StripeCustomer>> {
        let response = self
            .client
            .get(format!("{}/customers/{}", self.api_base, customer_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(request_failed)?;

        let customer: Option<StripeCustomer> = self.handle_optional_response(response).await?;
        Ok(customer.filter(|c| !c.deleted))
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    /// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=<hex>]`)
    /// against the raw request body.
    pub fn verify_webhook_signature(
        payload: &[u8],
        signature_header: &str,
        webhook_secret: &str,
        tolerance_secs: i64,
    ) -> AppResult<()> {
        verify_signature_at(
            payload,
            signature_header,
            webhook_secret,
            tolerance_secs,
            Utc::now().timestamp(),
        )
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_optional_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<Option<T>> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Processor(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Processor(format!(
                    "Stripe error ({}): {}",
                    status,
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Processor(format!(
                "Stripe API error: {} - {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse Stripe response");
            AppError::Processor(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn request_failed(e: reqwest::Error) -> AppError {
    AppError::Processor(format!("Stripe request failed: {}", e))
}

fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp
        .ok_or_else(|| AppError::InvalidSignature("missing timestamp".into()))?;
    if signatures.is_empty() {
        return Err(AppError::InvalidSignature("missing v1 signature".into()));
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::InvalidSignature("no matching signature".into()));
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| AppError::InvalidSignature("invalid timestamp".into()))?;
    if (now - ts).abs() > tolerance_secs {
        return Err(AppError::InvalidSignature(
            "timestamp outside tolerance".into(),
        ));
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

// ============================================================================
// PaymentProcessor Implementation
// ============================================================================

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<ProcessorSubscription>> {
        Ok(self
            .fetch_subscription(subscription_id)
            .await?
            .map(StripeSubscription::into_processor))
    }

    async fn get_customer(&self, customer_id: &str) -> AppResult<Option<ProcessorCustomer>> {
        Ok(self.fetch_customer(customer_id).await?.map(|c| ProcessorCustomer {
            id: c.id,
            email: c.email,
            name: c.name,
        }))
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<ProcessorSubscription> {
        Ok(self
            .delete_subscription(subscription_id)
            .await?
            .into_processor())
    }
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

impl StripeSubscription {
    fn into_processor(self) -> ProcessorSubscription {
        let item = self.items.data.first();
        let price = item.map(|i| &i.price);
        let quantity = item.and_then(|i| i.quantity).unwrap_or(1).max(1);

        let amount_cents = price.and_then(|p| p.unit_amount).unwrap_or(0) * quantity;
        let currency = price
            .map(|p| normalize_currency(&p.currency))
            .unwrap_or_default();
        let frequency = price
            .and_then(|p| p.recurring.as_ref())
            .map(|r| DonationFrequency::from_stripe_interval(&r.interval, r.interval_count))
            .unwrap_or(DonationFrequency::Monthly);

        ProcessorSubscription {
            status: ProcessorSubscriptionStatus::from_stripe(&self.status),
            canceled_at: self.canceled_at.and_then(unix_to_utc),
            id: self.id,
            customer_id: self.customer,
            amount_cents,
            currency,
            frequency,
        }
    }
}

fn unix_to_utc(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscriptionItems {
    #[serde(default)]
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub price: StripePrice,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StripePrice {
    pub id: String,
    #[serde(default)]
    pub unit_amount: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub recurring: Option<StripePriceRecurring>,
}

#[derive(Debug, Deserialize)]
pub struct StripePriceRecurring {
    pub interval: String,
    #[serde(default = "default_interval_count")]
    pub interval_count: i64,
}

fn default_interval_count() -> i64 {
    1
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}
