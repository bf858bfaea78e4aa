use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use url::Url;

use crate::{
    app_error::AppResult,
    application::{
        cancellation_token::CancellationTokenService,
        email_templates::{
            DonationSummary, cancellation_confirmation_email, donation_confirmation_email,
            donation_receipt_document, management_link_email,
        },
        ports::notifications::{EmailSender, ReceiptDocument, ReceiptGenerator},
        timeout::bounded,
    },
    domain::entities::donation_frequency::DonationFrequency,
};

use super::donation::DonationProfile;

const MANAGE_PATH: &str = "/donate/manage";

/// Details of a confirmed cancellation the donor is notified about.
#[derive(Debug, Clone)]
pub struct CancellationNotice {
    pub subscription_id: String,
    pub donor_email: String,
    pub donor_name: String,
    pub amount_cents: i64,
    pub currency: String,
    pub frequency: DonationFrequency,
}

/// Background tasks started by a dispatch. Dropping the handle detaches them;
/// tests await `finished` to observe their effects.
#[derive(Debug, Default)]
pub struct DispatchHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl DispatchHandle {
    pub fn empty() -> Self {
        Self::default()
    }

    pub async fn finished(self) {
        for task in self.tasks {
            if let Err(e) = task.await {
                error!(error = %e, "Side-effect task panicked");
            }
        }
    }
}

/// Fire-and-forget receipts and notifications. Nothing here reports back to
/// the caller: every failure is logged with enough context for follow-up.
#[derive(Clone)]
pub struct SideEffectDispatcher {
    email: Arc<dyn EmailSender>,
    receipts: Arc<dyn ReceiptGenerator>,
    tokens: Arc<CancellationTokenService>,
    site_base_url: Url,
    timeout: Duration,
}

impl SideEffectDispatcher {
    pub fn new(
        email: Arc<dyn EmailSender>,
        receipts: Arc<dyn ReceiptGenerator>,
        tokens: Arc<CancellationTokenService>,
        site_base_url: Url,
        timeout: Duration,
    ) -> Self {
        Self {
            email,
            receipts,
            tokens,
            site_base_url,
            timeout,
        }
    }

    /// Link to the self-service page that inspects and cancels a subscription.
    pub fn manage_url(&self, token: &str, subscription_id: &str) -> String {
        let mut url = self.site_base_url.clone();
        url.set_path(MANAGE_PATH);
        url.query_pairs_mut()
            .clear()
            .append_pair("token", token)
            .append_pair("subscriptionId", subscription_id);
        url.to_string()
    }

    /// Generate the receipt and send the confirmation email for a newly
    /// recorded donation, as two independent tasks.
    pub fn dispatch_donation(&self, donation: &DonationProfile) -> DispatchHandle {
        let receipt_task = {
            let receipts = self.receipts.clone();
            let origin = self.site_base_url.to_string();
            let donation = donation.clone();
            let timeout = self.timeout;
            tokio::spawn(async move {
                let date_label = donation.created_at.format("%B %-d, %Y").to_string();
                let document = ReceiptDocument {
                    receipt_number: donation.receipt_number.clone(),
                    donor_email: donation.donor_email.clone(),
                    html: donation_receipt_document(&origin, &summary(&donation, &date_label)),
                };

                match bounded(timeout, "receipt generator", receipts.generate(&document)).await {
                    Ok(location) => info!(
                        donation_id = %donation.id,
                        receipt_number = %donation.receipt_number,
                        location = %location,
                        "Receipt generated"
                    ),
                    Err(e) => error!(
                        donation_id = %donation.id,
                        payment_intent_id = %donation.stripe_payment_intent_id,
                        donor_email = %donation.donor_email,
                        receipt_number = %donation.receipt_number,
                        error = %e,
                        "Receipt generation failed"
                    ),
                }
            })
        };

        let email_task = {
            let dispatcher = self.clone();
            let donation = donation.clone();
            tokio::spawn(async move {
                let manage_url = dispatcher.manage_url_for(&donation);
                let date_label = donation.created_at.format("%B %-d, %Y").to_string();
                let (subject, html) = donation_confirmation_email(
                    dispatcher.site_base_url.as_str(),
                    &summary(&donation, &date_label),
                    manage_url.as_deref(),
                );

                if let Err(e) = dispatcher
                    .send(&donation.donor_email, &subject, &html)
                    .await
                {
                    error!(
                        donation_id = %donation.id,
                        payment_intent_id = %donation.stripe_payment_intent_id,
                        donor_email = %donation.donor_email,
                        receipt_number = %donation.receipt_number,
                        error = %e,
                        "Donation confirmation email failed"
                    );
                }
            })
        };

        DispatchHandle {
            tasks: vec![receipt_task, email_task],
        }
    }

    pub fn dispatch_cancellation(&self, notice: CancellationNotice) -> DispatchHandle {
        let dispatcher = self.clone();
        let task = tokio::spawn(async move {
            let (subject, html) = cancellation_confirmation_email(
                dispatcher.site_base_url.as_str(),
                &notice.donor_name,
                notice.amount_cents,
                &notice.currency,
                notice.frequency,
            );

            if let Err(e) = dispatcher.send(&notice.donor_email, &subject, &html).await {
                error!(
                    subscription_id = %notice.subscription_id,
                    donor_email = %notice.donor_email,
                    error = %e,
                    "Cancellation confirmation email failed"
                );
            }
        });

        DispatchHandle { tasks: vec![task] }
    }

    /// Issue a fresh token and email the manage link. Unlike the dispatches
    /// above this runs inline and reports failure to the caller.
    pub async fn send_management_link(&self, email: &str, subscription_id: &str) -> AppResult<()> {
        let token = self.tokens.issue(subscription_id, email)?;
        let url = self.manage_url(&token, subscription_id);
        let (subject, html) = management_link_email(self.site_base_url.as_str(), &url);
        self.send(email, &subject, &html).await
    }

    fn manage_url_for(&self, donation: &DonationProfile) -> Option<String> {
        if !donation.is_recurring {
            return None;
        }
        let subscription_id = donation.stripe_subscription_id.as_deref()?;

        match self.tokens.issue(subscription_id, &donation.donor_email) {
            Ok(token) => Some(self.manage_url(&token, subscription_id)),
            Err(e) => {
                warn!(
                    donation_id = %donation.id,
                    subscription_id = %subscription_id,
                    error = %e,
                    "Could not issue manage token, sending confirmation without link"
                );
                None
            }
        }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        bounded(self.timeout, "email sender", self.email.send(to, subject, html)).await
    }
}

fn summary<'a>(donation: &'a DonationProfile, date_label: &'a str) -> DonationSummary<'a> {
    DonationSummary {
        donor_name: &donation.donor_name,
        amount_cents: donation.amount_cents,
        currency: &donation.currency,
        frequency: donation.frequency,
        donation_type: &donation.donation_type,
        payment_method: &donation.payment_method,
        receipt_number: &donation.receipt_number,
        date_label,
    }
}
