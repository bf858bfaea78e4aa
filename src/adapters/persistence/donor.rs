use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::donor::{DonorLedgerEntry, DonorProfile, DonorRepoTrait},
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> DonorProfile {
    DonorProfile {
        email: row.get("email"),
        name: row.get("name"),
        phone: row.get("phone"),
        total_donations_cents: row.get("total_donations_cents"),
        last_donation_at: row.get("last_donation_at"),
        subscription_status: row.get("subscription_status"),
        active_subscription_id: row.get("active_subscription_id"),
        frequency: row.get("frequency"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    email, name, phone, total_donations_cents, last_donation_at, subscription_status,
    active_subscription_id, frequency, created_at, updated_at
"#;

#[async_trait]
impl DonorRepoTrait for PostgresPersistence {
    async fn get_by_email(&self, email: &str) -> AppResult<Option<DonorProfile>> {
        let row = sqlx::query(&format!("SELECT {} FROM donors WHERE email = $1", SELECT_COLS))
            .bind(email)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn apply_donation(&self, entry: &DonorLedgerEntry) -> AppResult<DonorProfile> {
        // Single statement: the increment reads the locked row, so concurrent
        // donations for the same email serialize instead of overwriting.
        // A charge on a subscription with a cancellation record still counts
        // toward the total but never reactivates the donor.
        let row = sqlx::query(&format!(
            r#"
            WITH sub AS (
                SELECT CASE
                    WHEN $6::text IS NOT NULL AND NOT EXISTS (
                        SELECT 1 FROM subscription_cancellations WHERE subscription_id = $6
                    ) THEN $6::text
                END AS live_id
            )
            INSERT INTO donors
                (email, name, phone, total_donations_cents, last_donation_at,
                 subscription_status, active_subscription_id, frequency)
            SELECT
                $1, $2, $3, $4, $5,
                CASE WHEN sub.live_id IS NULL THEN 'none' ELSE 'active' END::donor_subscription_status,
                sub.live_id, $7
            FROM sub
            ON CONFLICT (email) DO UPDATE SET
                name = COALESCE(EXCLUDED.name, donors.name),
                phone = COALESCE(EXCLUDED.phone, donors.phone),
                total_donations_cents = donors.total_donations_cents + EXCLUDED.total_donations_cents,
                last_donation_at = GREATEST(donors.last_donation_at, EXCLUDED.last_donation_at),
                subscription_status = CASE
                    WHEN EXCLUDED.active_subscription_id IS NULL THEN donors.subscription_status
                    ELSE 'active'::donor_subscription_status
                END,
                active_subscription_id = COALESCE(EXCLUDED.active_subscription_id, donors.active_subscription_id),
                frequency = CASE
                    WHEN EXCLUDED.active_subscription_id IS NOT NULL THEN EXCLUDED.frequency
                    WHEN $6::text IS NOT NULL THEN donors.frequency
                    WHEN donors.subscription_status = 'active' THEN donors.frequency
                    ELSE EXCLUDED.frequency
                END,
                updated_at = NOW()
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(&entry.email)
        .bind(&entry.name)
        .bind(&entry.phone)
        .bind(entry.amount_cents)
        .bind(entry.occurred_at)
        .bind(&entry.subscription_id)
        .bind(entry.frequency)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn mark_subscription_cancelled(
        &self,
        email: &str,
        subscription_id: &str,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE donors SET
                subscription_status = 'cancelled',
                active_subscription_id = NULL,
                frequency = 'one-time',
                updated_at = NOW()
            WHERE email = $1
              AND subscription_status <> 'cancelled'
              AND (active_subscription_id = $2 OR active_subscription_id IS NULL)
            "#,
        )
        .bind(email)
        .bind(subscription_id)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
