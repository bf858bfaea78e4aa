//! In-memory mock implementations for the ledger repository traits.
//!
//! Each repo holds its rows behind a single mutex so the read-check-write in
//! `insert`/`apply_donation`/`append` is atomic, matching the single-statement
//! Postgres queries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        donation::{DonationProfile, DonationRepoTrait, InsertOutcome},
        donor::{DonorLedgerEntry, DonorProfile, DonorRepoTrait},
        subscription_cancellation::{
            SubscriptionCancellationProfile, SubscriptionCancellationRepoTrait,
        },
    },
    domain::entities::{
        donation_frequency::DonationFrequency, subscription_status::DonorSubscriptionStatus,
    },
};

// ============================================================================
// Donations
// ============================================================================

/// In-memory implementation of DonationRepoTrait for testing.
#[derive(Default)]
pub struct InMemoryDonationRepo {
    pub donations: Mutex<HashMap<String, DonationProfile>>,
}

impl InMemoryDonationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all donations (for test assertions).
    pub fn all(&self) -> Vec<DonationProfile> {
        self.donations.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl DonationRepoTrait for InMemoryDonationRepo {
    async fn get_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> AppResult<Option<DonationProfile>> {
        Ok(self
            .donations
            .lock()
            .unwrap()
            .get(payment_intent_id)
            .cloned())
    }

    async fn insert(&self, donation: &DonationProfile) -> AppResult<InsertOutcome> {
        let mut donations = self.donations.lock().unwrap();
        if donations.contains_key(&donation.stripe_payment_intent_id) {
            return Ok(InsertOutcome::Duplicate);
        }
        donations.insert(donation.stripe_payment_intent_id.clone(), donation.clone());
        Ok(InsertOutcome::Inserted)
    }
}

/// Donation repo whose datastore is down.
pub struct FailingDonationRepo;

#[async_trait]
impl DonationRepoTrait for FailingDonationRepo {
    async fn get_by_payment_intent_id(&self, _id: &str) -> AppResult<Option<DonationProfile>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn insert(&self, _donation: &DonationProfile) -> AppResult<InsertOutcome> {
        Err(AppError::Database("connection refused".into()))
    }
}

/// Donation repo that never answers in time.
pub struct SlowDonationRepo;

#[async_trait]
impl DonationRepoTrait for SlowDonationRepo {
    async fn get_by_payment_intent_id(&self, _id: &str) -> AppResult<Option<DonationProfile>> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(None)
    }

    async fn insert(&self, _donation: &DonationProfile) -> AppResult<InsertOutcome> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(InsertOutcome::Inserted)
    }
}

// ============================================================================
// Donors
// ============================================================================

/// In-memory implementation of DonorRepoTrait for testing.
#[derive(Default)]
pub struct InMemoryDonorRepo {
    pub donors: Mutex<HashMap<String, DonorProfile>>,
    cancellations: Option<Arc<InMemorySubscriptionCancellationRepo>>,
}

impl InMemoryDonorRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share the cancellation audit table, so recurring charges for a
    /// cancelled subscription do not reactivate the donor.
    pub fn with_cancellations(cancellations: Arc<InMemorySubscriptionCancellationRepo>) -> Self {
        Self {
            donors: Mutex::default(),
            cancellations: Some(cancellations),
        }
    }

    fn is_cancelled(&self, subscription_id: &str) -> bool {
        self.cancellations.as_ref().is_some_and(|c| {
            c.records
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.subscription_id == subscription_id)
        })
    }

    /// Seed the repo with a donor row.
    pub fn insert_donor(&self, donor: DonorProfile) {
        self.donors
            .lock()
            .unwrap()
            .insert(donor.email.clone(), donor);
    }

    pub fn get(&self, email: &str) -> Option<DonorProfile> {
        self.donors.lock().unwrap().get(email).cloned()
    }

    pub fn count(&self) -> usize {
        self.donors.lock().unwrap().len()
    }
}

#[async_trait]
impl DonorRepoTrait for InMemoryDonorRepo {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<DonorProfile>> {
        Ok(self.get(email))
    }

    async fn apply_donation(&self, entry: &DonorLedgerEntry) -> AppResult<DonorProfile> {
        let mut donors = self.donors.lock().unwrap();
        let now = Utc::now();
        let live_subscription = entry
            .subscription_id
            .clone()
            .filter(|id| !self.is_cancelled(id));

        let donor = donors
            .entry(entry.email.clone())
            .and_modify(|d| {
                if entry.name.is_some() {
                    d.name = entry.name.clone();
                }
                if entry.phone.is_some() {
                    d.phone = entry.phone.clone();
                }
                d.total_donations_cents += entry.amount_cents;
                d.last_donation_at = d.last_donation_at.max(entry.occurred_at);
                match (&live_subscription, &entry.subscription_id) {
                    (Some(subscription_id), _) => {
                        d.subscription_status = DonorSubscriptionStatus::Active;
                        d.active_subscription_id = Some(subscription_id.clone());
                        d.frequency = entry.frequency;
                    }
                    (None, Some(_)) => {}
                    (None, None) if d.subscription_status != DonorSubscriptionStatus::Active => {
                        d.frequency = entry.frequency;
                    }
                    (None, None) => {}
                }
                d.updated_at = now;
            })
            .or_insert_with(|| DonorProfile {
                email: entry.email.clone(),
                name: entry.name.clone(),
                phone: entry.phone.clone(),
                total_donations_cents: entry.amount_cents,
                last_donation_at: entry.occurred_at,
                subscription_status: if live_subscription.is_some() {
                    DonorSubscriptionStatus::Active
                } else {
                    DonorSubscriptionStatus::None
                },
                active_subscription_id: live_subscription.clone(),
                frequency: entry.frequency,
                created_at: now,
                updated_at: now,
            });

        Ok(donor.clone())
    }

    async fn mark_subscription_cancelled(
        &self,
        email: &str,
        subscription_id: &str,
    ) -> AppResult<bool> {
        let mut donors = self.donors.lock().unwrap();
        let Some(donor) = donors.get_mut(email) else {
            return Ok(false);
        };

        let matches = donor
            .active_subscription_id
            .as_deref()
            .is_none_or(|active| active == subscription_id);
        if donor.subscription_status == DonorSubscriptionStatus::Cancelled || !matches {
            return Ok(false);
        }

        donor.subscription_status = DonorSubscriptionStatus::Cancelled;
        donor.active_subscription_id = None;
        donor.frequency = DonationFrequency::OneTime;
        donor.updated_at = Utc::now();
        Ok(true)
    }
}

/// Donor repo whose datastore is down.
pub struct FailingDonorRepo;

#[async_trait]
impl DonorRepoTrait for FailingDonorRepo {
    async fn get_by_email(&self, _email: &str) -> AppResult<Option<DonorProfile>> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn apply_donation(&self, _entry: &DonorLedgerEntry) -> AppResult<DonorProfile> {
        Err(AppError::Database("connection refused".into()))
    }

    async fn mark_subscription_cancelled(&self, _email: &str, _id: &str) -> AppResult<bool> {
        Err(AppError::Database("connection refused".into()))
    }
}

// ============================================================================
// Subscription Cancellations
// ============================================================================

/// In-memory implementation of SubscriptionCancellationRepoTrait for testing.
#[derive(Default)]
pub struct InMemorySubscriptionCancellationRepo {
    pub records: Mutex<Vec<SubscriptionCancellationProfile>>,
}

impl InMemorySubscriptionCancellationRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<SubscriptionCancellationProfile> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionCancellationRepoTrait for InMemorySubscriptionCancellationRepo {
    async fn append(&self, record: &SubscriptionCancellationProfile) -> AppResult<bool> {
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.subscription_id == record.subscription_id)
        {
            return Ok(false);
        }
        records.push(record.clone());
        Ok(true)
    }

    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<SubscriptionCancellationProfile>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.subscription_id == subscription_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{create_test_donor, test_datetime};

    fn entry(amount_cents: i64, subscription_id: Option<&str>) -> DonorLedgerEntry {
        DonorLedgerEntry {
            email: "donor@example.com".to_string(),
            name: None,
            phone: Some("555-0100".to_string()),
            amount_cents,
            frequency: if subscription_id.is_some() {
                DonationFrequency::Monthly
            } else {
                DonationFrequency::OneTime
            },
            subscription_id: subscription_id.map(str::to_string),
            occurred_at: test_datetime() - chrono::Duration::days(1),
        }
    }

    #[tokio::test]
    async fn one_time_gift_keeps_active_subscription_fields() {
        let repo = InMemoryDonorRepo::new();
        repo.insert_donor(create_test_donor(|d| {
            d.subscription_status = DonorSubscriptionStatus::Active;
            d.active_subscription_id = Some("sub_1".to_string());
            d.frequency = DonationFrequency::Monthly;
        }));

        let donor = repo.apply_donation(&entry(1000, None)).await.unwrap();

        assert_eq!(donor.total_donations_cents, 3500);
        assert_eq!(donor.frequency, DonationFrequency::Monthly);
        assert_eq!(donor.active_subscription_id.as_deref(), Some("sub_1"));
        // Absent name does not erase, present phone overwrites
        assert_eq!(donor.name.as_deref(), Some("Dana Donor"));
        assert_eq!(donor.phone.as_deref(), Some("555-0100"));
        // Older event does not move the timestamp backwards
        assert_eq!(donor.last_donation_at, test_datetime());
    }

    #[tokio::test]
    async fn cancellation_only_applies_to_the_active_subscription() {
        let repo = InMemoryDonorRepo::new();
        repo.apply_donation(&entry(2500, Some("sub_2"))).await.unwrap();

        assert!(!repo
            .mark_subscription_cancelled("donor@example.com", "sub_1")
            .await
            .unwrap());
        assert!(repo
            .mark_subscription_cancelled("donor@example.com", "sub_2")
            .await
            .unwrap());
        assert!(!repo
            .mark_subscription_cancelled("donor@example.com", "sub_2")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn charge_for_cancelled_subscription_does_not_reactivate_donor() {
        let cancellations = Arc::new(InMemorySubscriptionCancellationRepo::new());
        cancellations
            .append(&SubscriptionCancellationProfile {
                id: uuid::Uuid::new_v4(),
                subscription_id: "sub_1".to_string(),
                donor_email: "donor@example.com".to_string(),
                donor_name: None,
                amount_cents: 2500,
                currency: "USD".to_string(),
                frequency: DonationFrequency::Monthly,
                cancelled_at: test_datetime(),
                reason: "donor request".to_string(),
                voluntary: true,
            })
            .await
            .unwrap();

        let repo = InMemoryDonorRepo::with_cancellations(cancellations);
        repo.insert_donor(create_test_donor(|d| {
            d.subscription_status = DonorSubscriptionStatus::Cancelled;
            d.active_subscription_id = None;
            d.frequency = DonationFrequency::OneTime;
        }));

        let donor = repo.apply_donation(&entry(2500, Some("sub_1"))).await.unwrap();

        assert_eq!(donor.total_donations_cents, 5000);
        assert_eq!(donor.subscription_status, DonorSubscriptionStatus::Cancelled);
        assert_eq!(donor.active_subscription_id, None);
        assert_eq!(donor.frequency, DonationFrequency::OneTime);

        // A different, live subscription still activates
        let donor = repo.apply_donation(&entry(2500, Some("sub_2"))).await.unwrap();
        assert_eq!(donor.subscription_status, DonorSubscriptionStatus::Active);
        assert_eq!(donor.active_subscription_id.as_deref(), Some("sub_2"));
    }
}
