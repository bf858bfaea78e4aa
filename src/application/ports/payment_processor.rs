use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{
        donation_frequency::DonationFrequency, subscription_status::ProcessorSubscriptionStatus,
    },
};

// ============================================================================
// Port Types - Provider-agnostic views of processor state
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorSubscription {
    pub id: String,
    pub customer_id: String,
    pub status: ProcessorSubscriptionStatus,
    /// Per-cycle amount in minor units
    pub amount_cents: i64,
    pub currency: String,
    pub frequency: DonationFrequency,
    pub canceled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessorCustomer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

// ============================================================================
// Port
// ============================================================================

/// The subset of the payment processor's API the cancellation flow needs.
/// Lookups return `Ok(None)` when the processor reports the object missing
/// (or deleted); transport and server failures are errors.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn get_subscription(&self, subscription_id: &str)
    -> AppResult<Option<ProcessorSubscription>>;

    async fn get_customer(&self, customer_id: &str) -> AppResult<Option<ProcessorCustomer>>;

    /// Cancel immediately (not at period end).
    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<ProcessorSubscription>;
}
