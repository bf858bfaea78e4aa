use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        timeout::bounded,
        validators::{is_valid_email, normalize_email},
    },
    domain::entities::{donation_frequency::DonationFrequency, payment_status::PaymentStatus},
};

use super::{
    donor::{DonorLedgerEntry, DonorRepoTrait},
    side_effects::{DispatchHandle, SideEffectDispatcher},
};

const DEFAULT_DONOR_NAME: &str = "Anonymous";
const DEFAULT_DONATION_TYPE: &str = "general";

// ============================================================================
// Profile Types
// ============================================================================

/// One successful charge. Written once, never updated.
#[derive(Debug, Clone, Serialize)]
pub struct DonationProfile {
    pub id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub donation_type: String,
    pub donor_name: String,
    pub donor_email: String,
    pub donor_phone: Option<String>,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub stripe_payment_intent_id: String,
    pub stripe_charge_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub receipt_number: String,
    pub frequency: DonationFrequency,
    pub is_recurring: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything the recorder needs from a verified payment event, already
/// pulled out of whichever processor object carried it.
#[derive(Debug, Clone)]
pub struct PaymentFacts {
    pub event_id: String,
    pub payment_intent_id: String,
    pub charge_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Settled amount in minor units
    pub amount_cents: i64,
    pub currency: String,
    pub donor_email: Option<String>,
    pub donor_name: Option<String>,
    pub donor_phone: Option<String>,
    pub donation_type: Option<String>,
    pub payment_method: String,
    pub frequency: DonationFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A donation for the same payment intent already exists
    Duplicate,
}

#[derive(Debug)]
pub enum ReconcileOutcome {
    Recorded {
        donation: DonationProfile,
        /// False when the donor upsert failed after the donation was written
        ledger_updated: bool,
        side_effects: DispatchHandle,
    },
    Duplicate {
        payment_intent_id: String,
    },
    Skipped {
        reason: &'static str,
    },
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait DonationRepoTrait: Send + Sync {
    async fn get_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> AppResult<Option<DonationProfile>>;

    /// Insert guarded by the unique payment-intent constraint. A conflict is
    /// reported as `InsertOutcome::Duplicate`, never as an error.
    async fn insert(&self, donation: &DonationProfile) -> AppResult<InsertOutcome>;
}

// ============================================================================
// Use Cases
// ============================================================================

pub fn generate_receipt_number(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
    format!("RCPT-{}-{}", at.format("%Y%m%d"), suffix)
}

#[derive(Clone)]
pub struct DonationUseCases {
    donations: Arc<dyn DonationRepoTrait>,
    donors: Arc<dyn DonorRepoTrait>,
    side_effects: SideEffectDispatcher,
    timeout: Duration,
}

impl DonationUseCases {
    pub fn new(
        donations: Arc<dyn DonationRepoTrait>,
        donors: Arc<dyn DonorRepoTrait>,
        side_effects: SideEffectDispatcher,
        timeout: Duration,
    ) -> Self {
        Self {
            donations,
            donors,
            side_effects,
            timeout,
        }
    }

    /// Turn one successful payment into exactly one donation and one ledger
    /// increment, however many times the event is delivered.
    #[instrument(
        skip(self, facts),
        fields(event_id = %facts.event_id, payment_intent_id = %facts.payment_intent_id)
    )]
    pub async fn reconcile(&self, facts: PaymentFacts) -> AppResult<ReconcileOutcome> {
        if facts.amount_cents <= 0 {
            info!(amount_cents = facts.amount_cents, "Ignoring payment with no settled amount");
            return Ok(ReconcileOutcome::Skipped {
                reason: "non-positive amount",
            });
        }

        let existing = bounded(
            self.timeout,
            "datastore",
            self.donations
                .get_by_payment_intent_id(&facts.payment_intent_id),
        )
        .await?;
        if let Some(existing) = existing {
            info!(
                donation_id = %existing.id,
                "Duplicate delivery, donation already recorded"
            );
            return Ok(ReconcileOutcome::Duplicate {
                payment_intent_id: facts.payment_intent_id,
            });
        }

        let donor_email = match facts
            .donor_email
            .as_deref()
            .map(normalize_email)
            .filter(|e| is_valid_email(e))
        {
            Some(email) => email,
            None => {
                error!(
                    raw_email = ?facts.donor_email,
                    amount_cents = facts.amount_cents,
                    currency = %facts.currency,
                    "Successful payment has no usable donor email, needs manual follow-up"
                );
                return Err(AppError::MissingDonorEmail(facts.payment_intent_id));
            }
        };

        let now = Utc::now();
        let is_recurring = facts.subscription_id.is_some() || facts.frequency.is_recurring();
        let frequency = match (is_recurring, facts.frequency) {
            (true, DonationFrequency::OneTime) => DonationFrequency::Monthly,
            (_, f) => f,
        };
        let donation = DonationProfile {
            id: Uuid::new_v4(),
            amount_cents: facts.amount_cents,
            currency: facts.currency.clone(),
            donation_type: facts
                .donation_type
                .clone()
                .unwrap_or_else(|| DEFAULT_DONATION_TYPE.to_string()),
            donor_name: facts
                .donor_name
                .clone()
                .unwrap_or_else(|| DEFAULT_DONOR_NAME.to_string()),
            donor_email: donor_email.clone(),
            donor_phone: facts.donor_phone.clone(),
            payment_method: facts.payment_method.clone(),
            payment_status: PaymentStatus::Succeeded,
            stripe_payment_intent_id: facts.payment_intent_id.clone(),
            stripe_charge_id: facts.charge_id.clone(),
            stripe_subscription_id: facts.subscription_id.clone(),
            receipt_number: generate_receipt_number(now),
            frequency,
            is_recurring,
            created_at: now,
        };

        let inserted = bounded(self.timeout, "datastore", self.donations.insert(&donation)).await?;
        if inserted == InsertOutcome::Duplicate {
            info!("Lost insert race to a concurrent delivery, treating as duplicate");
            return Ok(ReconcileOutcome::Duplicate {
                payment_intent_id: facts.payment_intent_id,
            });
        }

        info!(
            donation_id = %donation.id,
            donor_email = %donation.donor_email,
            amount_cents = donation.amount_cents,
            currency = %donation.currency,
            recurring = donation.is_recurring,
            "Donation recorded"
        );

        let entry = DonorLedgerEntry {
            email: donor_email,
            name: facts.donor_name,
            phone: facts.donor_phone,
            amount_cents: donation.amount_cents,
            frequency,
            subscription_id: facts.subscription_id,
            occurred_at: now,
        };

        let ledger_updated =
            match bounded(self.timeout, "datastore", self.donors.apply_donation(&entry)).await {
                Ok(donor) => {
                    info!(
                        donor_email = %donor.email,
                        total_donations_cents = donor.total_donations_cents,
                        "Donor ledger updated"
                    );
                    true
                }
                Err(e) => {
                    error!(
                        ledger_inconsistency = true,
                        donation_id = %donation.id,
                        donor_email = %entry.email,
                        amount_cents = entry.amount_cents,
                        error = %e,
                        "Donation recorded but donor ledger was not updated, needs repair"
                    );
                    false
                }
            };

        let side_effects = self.side_effects.dispatch_donation(&donation);

        Ok(ReconcileOutcome::Recorded {
            donation,
            ledger_updated,
            side_effects,
        })
    }
}
