use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::{
    app_error::{AppError, AppResult},
    application::validators::non_blank,
    domain::entities::{
        donation_frequency::DonationFrequency,
        money::normalize_currency,
        processor_event::{
            DonationMetadata, EventEnvelope, InvoiceObject, PaymentIntentObject, ProcessorEvent,
        },
    },
    infra::stripe_client::StripeClient,
};

use super::donation::{DonationUseCases, PaymentFacts, ReconcileOutcome};

const DEFAULT_PAYMENT_METHOD: &str = "card";

#[derive(Debug)]
pub enum WebhookOutcome {
    Reconciled(ReconcileOutcome),
    /// Verified and understood, but nothing to record
    Acknowledged { event_type: String },
}

/// Entry point for processor notifications: signature gate, decode, dispatch.
#[derive(Clone)]
pub struct WebhookUseCases {
    webhook_secret: SecretString,
    tolerance_secs: i64,
    donations: Arc<DonationUseCases>,
}

impl WebhookUseCases {
    pub fn new(
        webhook_secret: SecretString,
        tolerance_secs: i64,
        donations: Arc<DonationUseCases>,
    ) -> Self {
        Self {
            webhook_secret,
            tolerance_secs,
            donations,
        }
    }

    /// Verify the raw body against the signature header before anything is
    /// decoded, then route the event by kind.
    #[instrument(skip(self, payload, signature_header), fields(payload_len = payload.len()))]
    pub async fn handle_stripe_event(
        &self,
        payload: &[u8],
        signature_header: Option<&str>,
    ) -> AppResult<WebhookOutcome> {
        let signature_header = signature_header
            .ok_or_else(|| AppError::InvalidSignature("missing Stripe-Signature header".into()))?;

        StripeClient::verify_webhook_signature(
            payload,
            signature_header,
            self.webhook_secret.expose_secret(),
            self.tolerance_secs,
        )?;

        let envelope = EventEnvelope::parse(payload)?;
        info!(event_id = %envelope.id, event_type = %envelope.event_type, "Processing webhook event");

        match envelope.event {
            ProcessorEvent::PaymentSucceeded(intent) => {
                // Subscription charges also arrive as an invoice event keyed by
                // the same intent; only that one knows the subscription.
                if let Some(invoice_id) = intent.invoice_id() {
                    if intent.metadata.subscription_id().is_none() {
                        info!(
                            event_id = %envelope.id,
                            payment_intent_id = %intent.id,
                            invoice_id = %invoice_id,
                            "Intent settles an invoice, recording it from the invoice event"
                        );
                        return Ok(WebhookOutcome::Acknowledged {
                            event_type: envelope.event_type,
                        });
                    }
                }
                let facts = payment_intent_facts(&envelope.id, &intent);
                self.donations
                    .reconcile(facts)
                    .await
                    .map(WebhookOutcome::Reconciled)
            }
            ProcessorEvent::InvoicePaymentSucceeded(invoice) => {
                info!(
                    invoice_id = %invoice.id,
                    billing_reason = invoice.billing_reason.as_deref().unwrap_or("unknown"),
                    "Invoice payment received"
                );
                match invoice_facts(&envelope.id, &invoice) {
                    Some(facts) => self
                        .donations
                        .reconcile(facts)
                        .await
                        .map(WebhookOutcome::Reconciled),
                    None => {
                        info!(
                            event_id = %envelope.id,
                            invoice_id = %invoice.id,
                            amount_paid = invoice.amount_paid,
                            "Invoice has no payment intent, nothing to record"
                        );
                        Ok(WebhookOutcome::Acknowledged {
                            event_type: envelope.event_type,
                        })
                    }
                }
            }
            ProcessorEvent::Subscription {
                change,
                subscription,
            } => {
                // Lifecycle changes are informational; only the donor-initiated
                // cancellation flow mutates the ledger.
                info!(
                    event_id = %envelope.id,
                    change = change.as_str(),
                    subscription_id = %subscription.id,
                    status = %subscription.status,
                    customer_id = subscription.customer.as_ref().map(|c| c.id()).unwrap_or_default(),
                    "Subscription lifecycle event acknowledged"
                );
                Ok(WebhookOutcome::Acknowledged {
                    event_type: envelope.event_type,
                })
            }
            ProcessorEvent::Unhandled => {
                info!(
                    event_id = %envelope.id,
                    event_type = %envelope.event_type,
                    "Ignoring unhandled webhook event type"
                );
                Ok(WebhookOutcome::Acknowledged {
                    event_type: envelope.event_type,
                })
            }
        }
    }
}

fn first_of<'a>(
    sources: &[&'a DonationMetadata],
    field: impl Fn(&'a DonationMetadata) -> Option<&'a str>,
) -> Option<String> {
    sources.iter().find_map(|m| field(*m)).map(str::to_string)
}

/// Donor email precedence: checkout metadata, charge billing details, then
/// the intent's receipt email.
pub fn payment_intent_facts(event_id: &str, intent: &PaymentIntentObject) -> PaymentFacts {
    let metadata = &intent.metadata;
    let billing = intent.charge().map(|c| &c.billing_details);

    let donor_email = metadata
        .donor_email()
        .map(str::to_string)
        .or_else(|| billing.and_then(|b| non_blank(b.email.as_deref())))
        .or_else(|| non_blank(intent.receipt_email.as_deref()));
    let donor_name = metadata
        .donor_name()
        .map(str::to_string)
        .or_else(|| billing.and_then(|b| non_blank(b.name.as_deref())));
    let donor_phone = metadata
        .donor_phone()
        .map(str::to_string)
        .or_else(|| billing.and_then(|b| non_blank(b.phone.as_deref())));

    let frequency = metadata
        .frequency()
        .and_then(DonationFrequency::from_metadata)
        .unwrap_or_default();

    PaymentFacts {
        event_id: event_id.to_string(),
        payment_intent_id: intent.id.clone(),
        charge_id: intent.charge_id(),
        subscription_id: metadata.subscription_id().map(str::to_string),
        amount_cents: intent.settled_amount(),
        currency: normalize_currency(&intent.currency),
        donor_email,
        donor_name,
        donor_phone,
        donation_type: metadata.donation_type().map(str::to_string),
        payment_method: intent.payment_method_label(),
        frequency,
    }
}

/// Recurring charge facts. `None` for invoices settled without a payment
/// intent (zero-amount or fully credited).
pub fn invoice_facts(event_id: &str, invoice: &InvoiceObject) -> Option<PaymentFacts> {
    let payment_intent_id = invoice.payment_intent_id()?.to_string();
    let sources = invoice.metadata_sources();

    let donor_email = first_of(&sources, DonationMetadata::donor_email)
        .or_else(|| non_blank(invoice.customer_email.as_deref()));
    let donor_name = first_of(&sources, DonationMetadata::donor_name)
        .or_else(|| non_blank(invoice.customer_name.as_deref()));
    let donor_phone = first_of(&sources, DonationMetadata::donor_phone)
        .or_else(|| non_blank(invoice.customer_phone.as_deref()));

    let frequency = invoice
        .recurring_interval()
        .map(|r| DonationFrequency::from_stripe_interval(&r.interval, r.interval_count.unwrap_or(1)))
        .or_else(|| {
            first_of(&sources, DonationMetadata::frequency)
                .and_then(|f| DonationFrequency::from_metadata(&f))
        })
        .filter(|f| f.is_recurring())
        .unwrap_or(DonationFrequency::Monthly);

    let subscription_id = invoice
        .subscription_id()
        .map(str::to_string)
        .or_else(|| first_of(&sources, DonationMetadata::subscription_id));
    if subscription_id.is_none() {
        warn!(invoice_id = %invoice.id, "Paid invoice carries no subscription reference");
    }

    Some(PaymentFacts {
        event_id: event_id.to_string(),
        payment_intent_id,
        charge_id: invoice.charge.as_ref().map(|c| c.id().to_string()),
        subscription_id,
        amount_cents: invoice.amount_paid,
        currency: normalize_currency(&invoice.currency),
        donor_email,
        donor_name,
        donor_phone,
        donation_type: first_of(&sources, DonationMetadata::donation_type),
        payment_method: DEFAULT_PAYMENT_METHOD.to_string(),
        frequency,
    })
}
