use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::donation::{DonationProfile, DonationRepoTrait, InsertOutcome},
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> DonationProfile {
    DonationProfile {
        id: row.get("id"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        donation_type: row.get("donation_type"),
        donor_name: row.get("donor_name"),
        donor_email: row.get("donor_email"),
        donor_phone: row.get("donor_phone"),
        payment_method: row.get("payment_method"),
        payment_status: row.get("payment_status"),
        stripe_payment_intent_id: row.get("stripe_payment_intent_id"),
        stripe_charge_id: row.get("stripe_charge_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        receipt_number: row.get("receipt_number"),
        frequency: row.get("frequency"),
        is_recurring: row.get("is_recurring"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, amount_cents, currency, donation_type, donor_name, donor_email, donor_phone,
    payment_method, payment_status, stripe_payment_intent_id, stripe_charge_id,
    stripe_subscription_id, receipt_number, frequency, is_recurring, created_at
"#;

#[async_trait]
impl DonationRepoTrait for PostgresPersistence {
    async fn get_by_payment_intent_id(
        &self,
        payment_intent_id: &str,
    ) -> AppResult<Option<DonationProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM donations WHERE stripe_payment_intent_id = $1",
            SELECT_COLS
        ))
        .bind(payment_intent_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn insert(&self, donation: &DonationProfile) -> AppResult<InsertOutcome> {
        // The unique index on the payment intent id is the real idempotency
        // guard; a concurrent delivery that lost the race inserts nothing.
        let result = sqlx::query(
            r#"
            INSERT INTO donations
                (id, amount_cents, currency, donation_type, donor_name, donor_email, donor_phone,
                 payment_method, payment_status, stripe_payment_intent_id, stripe_charge_id,
                 stripe_subscription_id, receipt_number, frequency, is_recurring, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (stripe_payment_intent_id) DO NOTHING
            "#,
        )
        .bind(donation.id)
        .bind(donation.amount_cents)
        .bind(&donation.currency)
        .bind(&donation.donation_type)
        .bind(&donation.donor_name)
        .bind(&donation.donor_email)
        .bind(&donation.donor_phone)
        .bind(&donation.payment_method)
        .bind(donation.payment_status)
        .bind(&donation.stripe_payment_intent_id)
        .bind(&donation.stripe_charge_id)
        .bind(&donation.stripe_subscription_id)
        .bind(&donation.receipt_number)
        .bind(donation.frequency)
        .bind(donation.is_recurring)
        .bind(donation.created_at)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }
}
