use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        cancellation_token::{CancellationTokenService, VerifiedCancellation},
        ports::payment_processor::{PaymentProcessor, ProcessorSubscription},
        timeout::bounded,
        validators::{is_valid_email, normalize_email},
    },
    domain::entities::{
        donation_frequency::DonationFrequency, money::major_units,
        subscription_status::{DonorSubscriptionStatus, ProcessorSubscriptionStatus},
    },
};

use super::{
    donor::DonorRepoTrait,
    side_effects::{CancellationNotice, DispatchHandle, SideEffectDispatcher},
};

pub const DONOR_REQUESTED_REASON: &str = "donor_requested";

// ============================================================================
// Profile Types
// ============================================================================

/// Audit record of a donor-initiated cancellation. At most one per subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionCancellationProfile {
    pub id: Uuid,
    pub subscription_id: String,
    pub donor_email: String,
    pub donor_name: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub frequency: DonationFrequency,
    pub cancelled_at: DateTime<Utc>,
    pub reason: String,
    pub voluntary: bool,
}

// ============================================================================
// View Models
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPreview {
    pub subscription: SubscriptionPreview,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPreview {
    pub id: String,
    pub status: ProcessorSubscriptionStatus,
    /// Major units, e.g. 25.0 for 2500 cents
    pub amount: f64,
    pub currency: String,
    pub frequency: DonationFrequency,
    pub customer: CustomerPreview,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerPreview {
    pub name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationConfirmation {
    pub success: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub already_cancelled: bool,
    pub subscription: CancelledSubscription,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledSubscription {
    pub id: String,
    pub status: &'static str,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct ConfirmOutcome {
    pub confirmation: CancellationConfirmation,
    pub notification: DispatchHandle,
}

impl ConfirmOutcome {
    fn cancelled(subscription_id: String, cancelled_at: Option<DateTime<Utc>>, already: bool) -> Self {
        Self {
            confirmation: CancellationConfirmation {
                success: true,
                already_cancelled: already,
                subscription: CancelledSubscription {
                    id: subscription_id,
                    status: "cancelled",
                    cancelled_at,
                },
            },
            notification: DispatchHandle::empty(),
        }
    }
}

// ============================================================================
// Repository Trait
// ============================================================================

#[async_trait]
pub trait SubscriptionCancellationRepoTrait: Send + Sync {
    /// Append an audit record. Returns `false` when the subscription already
    /// has one; the existing record is kept.
    async fn append(&self, record: &SubscriptionCancellationProfile) -> AppResult<bool>;

    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<SubscriptionCancellationProfile>>;
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct SubscriptionCancellationUseCases {
    processor: Arc<dyn PaymentProcessor>,
    donors: Arc<dyn DonorRepoTrait>,
    cancellations: Arc<dyn SubscriptionCancellationRepoTrait>,
    tokens: Arc<CancellationTokenService>,
    side_effects: SideEffectDispatcher,
    timeout: Duration,
}

impl SubscriptionCancellationUseCases {
    pub fn new(
        processor: Arc<dyn PaymentProcessor>,
        donors: Arc<dyn DonorRepoTrait>,
        cancellations: Arc<dyn SubscriptionCancellationRepoTrait>,
        tokens: Arc<CancellationTokenService>,
        side_effects: SideEffectDispatcher,
        timeout: Duration,
    ) -> Self {
        Self {
            processor,
            donors,
            cancellations,
            tokens,
            side_effects,
            timeout,
        }
    }

    /// Read-only view of the subscription a token grants access to.
    #[instrument(skip(self, token))]
    pub async fn inspect(
        &self,
        token: &str,
        subscription_id: &str,
    ) -> AppResult<CancellationPreview> {
        let verified = self.tokens.verify(token).await?;
        if verified.subscription_id != subscription_id {
            warn!(
                token_subscription_id = %verified.subscription_id,
                "Token presented for a different subscription"
            );
            return Err(AppError::InvalidToken);
        }

        let subscription = self.fetch_subscription(&verified.subscription_id).await?;
        let customer = bounded(
            self.timeout,
            "processor",
            self.processor.get_customer(&subscription.customer_id),
        )
        .await?
        .ok_or(AppError::CustomerNotFound)?;

        if let Some(customer_email) = customer.email.as_deref() {
            if normalize_email(customer_email) != verified.email {
                warn!(
                    customer_id = %customer.id,
                    "Token email does not match the subscription's customer"
                );
                return Err(AppError::InvalidToken);
            }
        }

        Ok(CancellationPreview {
            subscription: SubscriptionPreview {
                amount: major_units(subscription.amount_cents, &subscription.currency),
                id: subscription.id,
                status: subscription.status,
                currency: subscription.currency,
                frequency: subscription.frequency,
                customer: CustomerPreview {
                    name: customer.name,
                    email: customer.email.unwrap_or(verified.email),
                },
            },
            token: token.to_string(),
        })
    }

    /// Cancel the token's subscription immediately. Safe to repeat: once the
    /// processor reports the subscription cancelled, later calls return the
    /// already-cancelled shape.
    #[instrument(skip(self, token))]
    pub async fn confirm(&self, token: &str, confirmed: bool) -> AppResult<ConfirmOutcome> {
        if !confirmed {
            return Err(AppError::InvalidInput(
                "Cancellation must be explicitly confirmed".into(),
            ));
        }

        let verified = self.tokens.verify(token).await?;
        let subscription = self.fetch_subscription(&verified.subscription_id).await?;

        if subscription.status.is_cancelled() {
            info!(subscription_id = %subscription.id, "Subscription already cancelled");
            self.mark_donor_cancelled(&verified).await;
            return Ok(ConfirmOutcome::cancelled(
                subscription.id,
                subscription.canceled_at,
                true,
            ));
        }

        let cancelled = match bounded(
            self.timeout,
            "processor",
            self.processor.cancel_subscription(&subscription.id),
        )
        .await
        {
            Ok(cancelled) => cancelled,
            Err(e) => {
                // A concurrent confirm may have won; the processor is the source of truth.
                let current = bounded(
                    self.timeout,
                    "processor",
                    self.processor.get_subscription(&subscription.id),
                )
                .await;
                match current {
                    Ok(Some(current)) if current.status.is_cancelled() => {
                        info!(
                            subscription_id = %current.id,
                            error = %e,
                            "Cancel failed but subscription is now cancelled"
                        );
                        self.mark_donor_cancelled(&verified).await;
                        return Ok(ConfirmOutcome::cancelled(
                            current.id,
                            current.canceled_at,
                            true,
                        ));
                    }
                    _ => return Err(e),
                }
            }
        };

        let cancelled_at = cancelled.canceled_at.unwrap_or_else(Utc::now);
        info!(
            subscription_id = %cancelled.id,
            donor_email = %verified.email,
            "Subscription cancelled by donor"
        );

        self.mark_donor_cancelled(&verified).await;

        let donor_name = match bounded(
            self.timeout,
            "datastore",
            self.donors.get_by_email(&verified.email),
        )
        .await
        {
            Ok(donor) => donor.and_then(|d| d.name),
            Err(e) => {
                warn!(error = %e, "Could not load donor name for cancellation record");
                None
            }
        };

        self.append_audit_record(&subscription, &verified, donor_name.clone(), cancelled_at)
            .await;

        let notification = self.side_effects.dispatch_cancellation(CancellationNotice {
            subscription_id: subscription.id.clone(),
            donor_email: verified.email.clone(),
            donor_name: donor_name.unwrap_or_else(|| "friend".to_string()),
            amount_cents: subscription.amount_cents,
            currency: subscription.currency.clone(),
            frequency: subscription.frequency,
        });

        let mut outcome = ConfirmOutcome::cancelled(subscription.id, Some(cancelled_at), false);
        outcome.notification = notification;
        Ok(outcome)
    }

    /// Email a fresh manage link when the address belongs to a donor with an
    /// active subscription. The caller answers the same way either way.
    #[instrument(skip(self, email))]
    pub async fn request_management_link(&self, email: &str) -> AppResult<()> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput("A valid email address is required".into()));
        }

        let donor = bounded(self.timeout, "datastore", self.donors.get_by_email(&email)).await?;
        let subscription_id = match donor {
            Some(donor) if donor.subscription_status == DonorSubscriptionStatus::Active => {
                donor.active_subscription_id
            }
            _ => None,
        };

        let Some(subscription_id) = subscription_id else {
            info!("Manage link requested for an address with no active subscription");
            return Ok(());
        };

        if let Err(e) = self
            .side_effects
            .send_management_link(&email, &subscription_id)
            .await
        {
            error!(
                subscription_id = %subscription_id,
                error = %e,
                "Failed to send manage link"
            );
        }
        Ok(())
    }

    /// Invalidate a cancellation link before it expires, e.g. one the donor
    /// forwarded by mistake. The subscription itself is left untouched.
    #[instrument(skip(self, token))]
    pub async fn revoke_link(&self, token: &str) -> AppResult<()> {
        let revoked = self.tokens.revoke(token).await?;
        info!(
            subscription_id = %revoked.subscription_id,
            token_id = %revoked.token_id,
            "Cancellation link revoked"
        );
        Ok(())
    }

    async fn fetch_subscription(&self, subscription_id: &str) -> AppResult<ProcessorSubscription> {
        bounded(
            self.timeout,
            "processor",
            self.processor.get_subscription(subscription_id),
        )
        .await?
        .ok_or(AppError::SubscriptionNotFound)
    }

    async fn mark_donor_cancelled(&self, verified: &VerifiedCancellation) {
        let result = bounded(
            self.timeout,
            "datastore",
            self.donors
                .mark_subscription_cancelled(&verified.email, &verified.subscription_id),
        )
        .await;

        match result {
            Ok(true) => info!(
                subscription_id = %verified.subscription_id,
                "Donor ledger marked cancelled"
            ),
            Ok(false) => {}
            Err(e) => error!(
                ledger_inconsistency = true,
                subscription_id = %verified.subscription_id,
                donor_email = %verified.email,
                error = %e,
                "Subscription cancelled but donor ledger was not updated, needs repair"
            ),
        }
    }

    async fn append_audit_record(
        &self,
        subscription: &ProcessorSubscription,
        verified: &VerifiedCancellation,
        donor_name: Option<String>,
        cancelled_at: DateTime<Utc>,
    ) {
        let record = SubscriptionCancellationProfile {
            id: Uuid::new_v4(),
            subscription_id: subscription.id.clone(),
            donor_email: verified.email.clone(),
            donor_name,
            amount_cents: subscription.amount_cents,
            currency: subscription.currency.clone(),
            frequency: subscription.frequency,
            cancelled_at,
            reason: DONOR_REQUESTED_REASON.to_string(),
            voluntary: true,
        };

        match bounded(self.timeout, "datastore", self.cancellations.append(&record)).await {
            Ok(true) => {}
            Ok(false) => info!(
                subscription_id = %record.subscription_id,
                "Cancellation already recorded"
            ),
            Err(e) => error!(
                subscription_id = %record.subscription_id,
                error = %e,
                "Failed to write cancellation audit record"
            ),
        }
    }
}
