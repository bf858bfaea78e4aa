//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    application::ports::payment_processor::{ProcessorCustomer, ProcessorSubscription},
    application::use_cases::{
        donation::{DonationProfile, PaymentFacts},
        donor::DonorProfile,
    },
    domain::entities::{
        donation_frequency::DonationFrequency,
        payment_status::PaymentStatus,
        subscription_status::{DonorSubscriptionStatus, ProcessorSubscriptionStatus},
    },
};

/// Facts of a one-time 50.00 USD card payment (`pi_1`) from donor@example.com.
pub fn create_test_payment_facts(overrides: impl FnOnce(&mut PaymentFacts)) -> PaymentFacts {
    let mut facts = PaymentFacts {
        event_id: "evt_1".to_string(),
        payment_intent_id: "pi_1".to_string(),
        charge_id: Some("ch_1".to_string()),
        subscription_id: None,
        amount_cents: 5000,
        currency: "USD".to_string(),
        donor_email: Some("donor@example.com".to_string()),
        donor_name: Some("Dana Donor".to_string()),
        donor_phone: None,
        donation_type: None,
        payment_method: "card".to_string(),
        frequency: DonationFrequency::OneTime,
    };
    overrides(&mut facts);
    facts
}

/// Create a recorded one-time donation with sensible defaults.
pub fn create_test_donation(overrides: impl FnOnce(&mut DonationProfile)) -> DonationProfile {
    let mut donation = DonationProfile {
        id: Uuid::new_v4(),
        amount_cents: 5000,
        currency: "USD".to_string(),
        donation_type: "general".to_string(),
        donor_name: "Dana Donor".to_string(),
        donor_email: "donor@example.com".to_string(),
        donor_phone: None,
        payment_method: "card".to_string(),
        payment_status: PaymentStatus::Succeeded,
        stripe_payment_intent_id: "pi_1".to_string(),
        stripe_charge_id: Some("ch_1".to_string()),
        stripe_subscription_id: None,
        receipt_number: "RCPT-20260101-AB12CD34".to_string(),
        frequency: DonationFrequency::OneTime,
        is_recurring: false,
        created_at: test_datetime(),
    };
    overrides(&mut donation);
    donation
}

/// Create an active monthly 25.00 USD subscription (`sub_1` for `cus_1`).
pub fn create_test_subscription(
    overrides: impl FnOnce(&mut ProcessorSubscription),
) -> ProcessorSubscription {
    let mut subscription = ProcessorSubscription {
        id: "sub_1".to_string(),
        customer_id: "cus_1".to_string(),
        status: ProcessorSubscriptionStatus::Active,
        amount_cents: 2500,
        currency: "USD".to_string(),
        frequency: DonationFrequency::Monthly,
        canceled_at: None,
    };
    overrides(&mut subscription);
    subscription
}

/// Create the processor customer behind `create_test_subscription`.
pub fn create_test_customer(overrides: impl FnOnce(&mut ProcessorCustomer)) -> ProcessorCustomer {
    let mut customer = ProcessorCustomer {
        id: "cus_1".to_string(),
        email: Some("donor@example.com".to_string()),
        name: Some("Dana Donor".to_string()),
    };
    overrides(&mut customer);
    customer
}

/// Create a donor ledger row with one prior gift and no subscription.
pub fn create_test_donor(overrides: impl FnOnce(&mut DonorProfile)) -> DonorProfile {
    let mut donor = DonorProfile {
        email: "donor@example.com".to_string(),
        name: Some("Dana Donor".to_string()),
        phone: None,
        total_donations_cents: 2500,
        last_donation_at: test_datetime(),
        subscription_status: DonorSubscriptionStatus::None,
        active_subscription_id: None,
        frequency: DonationFrequency::OneTime,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut donor);
    donor
}

/// Fixed timestamp for reproducible fixtures.
pub fn test_datetime() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-01-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}
