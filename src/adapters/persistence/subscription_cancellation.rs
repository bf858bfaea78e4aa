use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription_cancellation::{
        SubscriptionCancellationProfile, SubscriptionCancellationRepoTrait,
    },
};

fn row_to_profile(row: sqlx::postgres::PgRow) -> SubscriptionCancellationProfile {
    SubscriptionCancellationProfile {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        donor_email: row.get("donor_email"),
        donor_name: row.get("donor_name"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        frequency: row.get("frequency"),
        cancelled_at: row.get("cancelled_at"),
        reason: row.get("reason"),
        voluntary: row.get("voluntary"),
    }
}

const SELECT_COLS: &str = r#"
    id, subscription_id, donor_email, donor_name, amount_cents, currency, frequency,
    cancelled_at, reason, voluntary
"#;

#[async_trait]
impl SubscriptionCancellationRepoTrait for PostgresPersistence {
    async fn append(&self, record: &SubscriptionCancellationProfile) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO subscription_cancellations
                (id, subscription_id, donor_email, donor_name, amount_cents, currency,
                 frequency, cancelled_at, reason, voluntary)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (subscription_id) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.subscription_id)
        .bind(&record.donor_email)
        .bind(&record.donor_name)
        .bind(record.amount_cents)
        .bind(&record.currency)
        .bind(record.frequency)
        .bind(record.cancelled_at)
        .bind(&record.reason)
        .bind(record.voluntary)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<SubscriptionCancellationProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_cancellations WHERE subscription_id = $1",
            SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }
}
