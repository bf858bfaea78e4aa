use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod app;
pub mod config;
pub mod db;
pub mod setup;
pub mod stripe_client;
pub mod token_denylist;

pub async fn postgres_persistence(
    database_url: &str,
    acquire_timeout: std::time::Duration,
) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url, acquire_timeout).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
