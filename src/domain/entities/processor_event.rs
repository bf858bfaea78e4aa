//! Typed view of payment-processor webhook events.
//!
//! The envelope is decoded into a closed set of variants, one per event kind the
//! reconciliation pipeline acts on. Each variant carries only the fields the
//! pipeline reads; anything else in the payload is dropped during decoding.

use std::collections::HashMap;

use serde::Deserialize;

use crate::app_error::{AppError, AppResult};

/// Event kinds the pipeline understands, keyed by every name the processor
/// (or our own test tooling) uses for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    PaymentSucceeded,
    InvoicePaymentSucceeded,
    SubscriptionCreated,
    SubscriptionUpdated,
    SubscriptionCanceled,
    Unhandled,
}

impl EventKind {
    pub fn classify(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" | "payment.succeeded" => EventKind::PaymentSucceeded,
            "invoice.payment_succeeded" | "invoice.paid" => EventKind::InvoicePaymentSucceeded,
            "customer.subscription.created" | "subscription.created" => {
                EventKind::SubscriptionCreated
            }
            "customer.subscription.updated" | "subscription.updated" => {
                EventKind::SubscriptionUpdated
            }
            "customer.subscription.deleted" | "subscription.canceled" | "subscription.deleted" => {
                EventKind::SubscriptionCanceled
            }
            _ => EventKind::Unhandled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionChange {
    Created,
    Updated,
    Canceled,
}

impl SubscriptionChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionChange::Created => "created",
            SubscriptionChange::Updated => "updated",
            SubscriptionChange::Canceled => "canceled",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ProcessorEvent {
    PaymentSucceeded(PaymentIntentObject),
    InvoicePaymentSucceeded(InvoiceObject),
    Subscription {
        change: SubscriptionChange,
        subscription: SubscriptionObject,
    },
    Unhandled,
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub event_type: String,
    pub event: ProcessorEvent,
}

#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl EventEnvelope {
    /// Decode a verified webhook body. Unknown event kinds decode to
    /// `ProcessorEvent::Unhandled`; a known kind with an unusable object is an
    /// `InvalidPayload` error.
    pub fn parse(body: &[u8]) -> AppResult<Self> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| AppError::InvalidPayload(format!("malformed envelope: {}", e)))?;

        let id = raw.id.unwrap_or_else(|| "unknown".to_string());
        let object = raw.data.object;

        let event = match EventKind::classify(&raw.event_type) {
            EventKind::PaymentSucceeded => {
                ProcessorEvent::PaymentSucceeded(decode_object(object, &raw.event_type)?)
            }
            EventKind::InvoicePaymentSucceeded => {
                ProcessorEvent::InvoicePaymentSucceeded(decode_object(object, &raw.event_type)?)
            }
            EventKind::SubscriptionCreated => ProcessorEvent::Subscription {
                change: SubscriptionChange::Created,
                subscription: decode_object(object, &raw.event_type)?,
            },
            EventKind::SubscriptionUpdated => ProcessorEvent::Subscription {
                change: SubscriptionChange::Updated,
                subscription: decode_object(object, &raw.event_type)?,
            },
            EventKind::SubscriptionCanceled => ProcessorEvent::Subscription {
                change: SubscriptionChange::Canceled,
                subscription: decode_object(object, &raw.event_type)?,
            },
            EventKind::Unhandled => ProcessorEvent::Unhandled,
        };

        Ok(Self {
            id,
            event_type: raw.event_type,
            event,
        })
    }
}

fn decode_object<T: serde::de::DeserializeOwned>(
    object: serde_json::Value,
    event_type: &str,
) -> AppResult<T> {
    serde_json::from_value(object)
        .map_err(|e| AppError::InvalidPayload(format!("unusable {} object: {}", event_type, e)))
}

// ============================================================================
// Event objects
// ============================================================================

/// A reference that the processor sends either as a bare id or as the
/// expanded object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ObjectRef {
    Id(String),
    Expanded { id: String },
}

impl ObjectRef {
    pub fn id(&self) -> &str {
        match self {
            ObjectRef::Id(id) => id,
            ObjectRef::Expanded { id } => id,
        }
    }
}

/// Checkout metadata attached by the donation form. Keys are matched against
/// both camelCase and snake_case spellings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DonationMetadata(pub HashMap<String, String>);

impl DonationMetadata {
    fn first(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.0.get(*k))
            .map(|v| v.trim())
            .find(|v| !v.is_empty())
    }

    pub fn donor_email(&self) -> Option<&str> {
        self.first(&["donorEmail", "donor_email", "email"])
    }

    pub fn donor_name(&self) -> Option<&str> {
        self.first(&["donorName", "donor_name", "name"])
    }

    pub fn donor_phone(&self) -> Option<&str> {
        self.first(&["donorPhone", "donor_phone", "phone"])
    }

    pub fn donation_type(&self) -> Option<&str> {
        self.first(&["donationType", "donation_type", "category"])
    }

    pub fn frequency(&self) -> Option<&str> {
        self.first(&["frequency", "donationFrequency", "donation_frequency"])
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.first(&["subscriptionId", "subscription_id"])
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BillingDetails {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardDetails {
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub last4: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentMethodDetails {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub card: Option<CardDetails>,
}

impl PaymentMethodDetails {
    /// "visa •••• 4242" for cards, the method type otherwise.
    pub fn label(&self) -> String {
        match &self.card {
            Some(CardDetails {
                brand: Some(brand),
                last4: Some(last4),
            }) => format!("{} •••• {}", brand, last4),
            _ => self.kind.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChargeObject {
    pub id: String,
    #[serde(default)]
    pub billing_details: BillingDetails,
    #[serde(default)]
    pub payment_method_details: Option<PaymentMethodDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ChargeRef {
    Id(String),
    Expanded(Box<ChargeObject>),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChargeList {
    #[serde(default)]
    pub data: Vec<ChargeObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_received: Option<i64>,
    pub currency: String,
    #[serde(default)]
    pub metadata: DonationMetadata,
    #[serde(default)]
    pub receipt_email: Option<String>,
    #[serde(default)]
    pub latest_charge: Option<ChargeRef>,
    #[serde(default)]
    pub charges: Option<ChargeList>,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
    #[serde(default)]
    pub invoice: Option<ObjectRef>,
}

impl PaymentIntentObject {
    /// Set when the intent settles an invoice, i.e. a subscription charge.
    pub fn invoice_id(&self) -> Option<&str> {
        self.invoice.as_ref().map(|r| r.id())
    }

    /// The charge carried inline with the event, if the processor expanded it.
    pub fn charge(&self) -> Option<&ChargeObject> {
        match &self.latest_charge {
            Some(ChargeRef::Expanded(charge)) => Some(charge),
            _ => self.charges.as_ref().and_then(|c| c.data.first()),
        }
    }

    pub fn charge_id(&self) -> Option<String> {
        match &self.latest_charge {
            Some(ChargeRef::Id(id)) => Some(id.clone()),
            Some(ChargeRef::Expanded(charge)) => Some(charge.id.clone()),
            None => self.charge().map(|c| c.id.clone()),
        }
    }

    /// Amount actually captured, falling back to the requested amount.
    pub fn settled_amount(&self) -> i64 {
        match self.amount_received {
            Some(received) if received > 0 => received,
            _ => self.amount,
        }
    }

    pub fn payment_method_label(&self) -> String {
        self.charge()
            .and_then(|c| c.payment_method_details.as_ref())
            .map(|d| d.label())
            .or_else(|| self.payment_method_types.first().cloned())
            .unwrap_or_else(|| "card".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceRecurring {
    pub interval: String,
    #[serde(default)]
    pub interval_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinePrice {
    #[serde(default)]
    pub recurring: Option<PriceRecurring>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceLine {
    #[serde(default)]
    pub price: Option<LinePrice>,
    #[serde(default)]
    pub metadata: DonationMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceLines {
    #[serde(default)]
    pub data: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionDetails {
    #[serde(default)]
    pub metadata: DonationMetadata,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceObject {
    pub id: String,
    #[serde(default)]
    pub payment_intent: Option<ObjectRef>,
    #[serde(default)]
    pub charge: Option<ObjectRef>,
    #[serde(default)]
    pub subscription: Option<ObjectRef>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    pub amount_paid: i64,
    pub currency: String,
    #[serde(default)]
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub subscription_details: Option<SubscriptionDetails>,
    #[serde(default)]
    pub lines: InvoiceLines,
    #[serde(default)]
    pub metadata: DonationMetadata,
}

impl InvoiceObject {
    pub fn payment_intent_id(&self) -> Option<&str> {
        self.payment_intent.as_ref().map(|r| r.id())
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_ref().map(|r| r.id())
    }

    /// Metadata sources in precedence order: subscription, line item, invoice.
    pub fn metadata_sources(&self) -> Vec<&DonationMetadata> {
        let mut sources = Vec::new();
        if let Some(details) = &self.subscription_details {
            sources.push(&details.metadata);
        }
        if let Some(line) = self.lines.data.first() {
            sources.push(&line.metadata);
        }
        sources.push(&self.metadata);
        sources
    }

    pub fn recurring_interval(&self) -> Option<&PriceRecurring> {
        self.lines
            .data
            .iter()
            .filter_map(|l| l.price.as_ref())
            .find_map(|p| p.recurring.as_ref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionObject {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub customer: Option<ObjectRef>,
}
