use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        email::resend::ResendEmailSender, http::app_state::AppState,
        receipts::FileReceiptGenerator,
    },
    application::{
        cancellation_token::CancellationTokenService,
        ports::{
            notifications::{EmailSender, ReceiptGenerator},
            payment_processor::PaymentProcessor,
        },
    },
    infra::{
        config::AppConfig, postgres_persistence, stripe_client::StripeClient,
        token_denylist::RedisTokenDenylist,
    },
    use_cases::{
        donation::{DonationRepoTrait, DonationUseCases},
        donor::DonorRepoTrait,
        side_effects::SideEffectDispatcher,
        subscription_cancellation::{
            SubscriptionCancellationRepoTrait, SubscriptionCancellationUseCases,
        },
        webhook::WebhookUseCases,
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();
    let timeout = config.outbound_timeout;

    let postgres_arc =
        Arc::new(postgres_persistence(&config.database_url, timeout).await?);
    let donation_repo = postgres_arc.clone() as Arc<dyn DonationRepoTrait>;
    let donor_repo = postgres_arc.clone() as Arc<dyn DonorRepoTrait>;
    let cancellation_repo = postgres_arc.clone() as Arc<dyn SubscriptionCancellationRepoTrait>;

    let processor = Arc::new(StripeClient::new(config.stripe_secret_key.clone(), timeout)?)
        as Arc<dyn PaymentProcessor>;

    let mut tokens = CancellationTokenService::new(
        config.cancellation_token_secret.clone(),
        config.cancellation_token_ttl,
    );
    if let Some(redis_url) = &config.redis_url {
        let denylist = RedisTokenDenylist::new(redis_url).await?;
        tokens = tokens.with_denylist(Arc::new(denylist), timeout);
        tracing::info!("Cancellation token denylist enabled");
    }
    let tokens = Arc::new(tokens);

    let email = Arc::new(ResendEmailSender::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
        timeout,
    )?) as Arc<dyn EmailSender>;
    let receipts = Arc::new(FileReceiptGenerator::new(&config.receipts_dir))
        as Arc<dyn ReceiptGenerator>;

    let side_effects = SideEffectDispatcher::new(
        email,
        receipts,
        tokens.clone(),
        config.site_base_url.clone(),
        timeout,
    );

    let donation_use_cases = Arc::new(DonationUseCases::new(
        donation_repo,
        donor_repo.clone(),
        side_effects.clone(),
        timeout,
    ));

    let webhook_use_cases = WebhookUseCases::new(
        config.stripe_webhook_secret.clone(),
        config.webhook_tolerance_secs,
        donation_use_cases,
    );

    let cancellation_use_cases = SubscriptionCancellationUseCases::new(
        processor,
        donor_repo,
        cancellation_repo,
        tokens,
        side_effects,
        timeout,
    );

    Ok(AppState {
        config: Arc::new(config),
        webhook_use_cases: Arc::new(webhook_use_cases),
        cancellation_use_cases: Arc::new(cancellation_use_cases),
    })
}

pub fn init_tracing(log_file: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "donation_ledger=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false) // don't show target (module path)
        .with_level(true) // show log level
        .pretty(); // human-friendly, with colors

    // File (structured JSON logs); console only when the file can't be opened
    let json_layer = match File::create(log_file) {
        Ok(file) => Some(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(true)
                .with_span_list(true),
        ),
        Err(e) => {
            eprintln!("cannot create log file {log_file}: {e}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
