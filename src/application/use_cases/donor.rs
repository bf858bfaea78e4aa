use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    app_error::AppResult,
    domain::entities::{
        donation_frequency::DonationFrequency, subscription_status::DonorSubscriptionStatus,
    },
};

// ============================================================================
// Profile Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct DonorProfile {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub total_donations_cents: i64,
    pub last_donation_at: DateTime<Utc>,
    pub subscription_status: DonorSubscriptionStatus,
    pub active_subscription_id: Option<String>,
    pub frequency: DonationFrequency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One recorded donation's contribution to the donor ledger.
#[derive(Debug, Clone)]
pub struct DonorLedgerEntry {
    /// Normalized (trimmed, lower-cased) ledger key
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub amount_cents: i64,
    pub frequency: DonationFrequency,
    /// Set for recurring donations; marks the donor's subscription active
    pub subscription_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

// ============================================================================
// Repository Trait
// ============================================================================

/// Donor ledger storage. `apply_donation` must be a single atomic
/// create-or-increment so concurrent donations for one email never lose an
/// update: the stored total becomes `existing + amount_cents`, the last
/// donation timestamp only moves forward, and name/phone are overwritten only
/// by present values. A recurring entry sets status `active` and the active
/// subscription id unless that subscription already has a cancellation
/// record, in which case only the total and timestamp move. A one-time entry
/// leaves subscription fields untouched and only replaces the frequency when
/// the donor has no active subscription.
#[async_trait]
pub trait DonorRepoTrait: Send + Sync {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<DonorProfile>>;

    async fn apply_donation(&self, entry: &DonorLedgerEntry) -> AppResult<DonorProfile>;

    /// Mark the donor's subscription cancelled when `subscription_id` is the
    /// active one (or none is recorded). Returns whether a row changed.
    async fn mark_subscription_cancelled(
        &self,
        email: &str,
        subscription_id: &str,
    ) -> AppResult<bool>;
}
