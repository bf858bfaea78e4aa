//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires the real use cases over in-memory repos and a
//! fake processor, and hands back the fakes so tests can assert on them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        cancellation_token::CancellationTokenService,
        ports::{
            notifications::{EmailSender, ReceiptGenerator},
            payment_processor::{ProcessorCustomer, ProcessorSubscription},
        },
    },
    infra::config::AppConfig,
    test_utils::{
        FakePaymentProcessor, InMemoryDonationRepo, InMemoryDonorRepo, InMemoryEmailSender,
        InMemoryReceiptGenerator, InMemorySubscriptionCancellationRepo, InMemoryTokenDenylist,
    },
    use_cases::{
        donation::{DonationRepoTrait, DonationUseCases},
        donor::{DonorProfile, DonorRepoTrait},
        side_effects::SideEffectDispatcher,
        subscription_cancellation::SubscriptionCancellationUseCases,
        webhook::WebhookUseCases,
    },
};

pub const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_TOKEN_SECRET: &str = "test-cancellation-token-secret";
pub const TEST_SITE_URL: &str = "https://give.example.org";

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a `Stripe-Signature` header value for `body` signed at `timestamp`.
pub fn sign_webhook_payload(secret: &str, timestamp: i64, body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(format!("{}.{}", timestamp, body).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

pub fn test_token_service() -> CancellationTokenService {
    CancellationTokenService::new(
        SecretString::new(TEST_TOKEN_SECRET.into()),
        time::Duration::hours(24),
    )
}

/// Token service with an in-memory denylist, so links can be revoked.
pub fn test_revocable_token_service(denylist: Arc<InMemoryTokenDenylist>) -> CancellationTokenService {
    test_token_service().with_denylist(denylist, TEST_TIMEOUT)
}

pub fn test_dispatcher(
    email: Arc<dyn EmailSender>,
    receipts: Arc<dyn ReceiptGenerator>,
) -> SideEffectDispatcher {
    SideEffectDispatcher::new(
        email,
        receipts,
        Arc::new(test_token_service()),
        Url::parse(TEST_SITE_URL).unwrap(),
        TEST_TIMEOUT,
    )
}

/// Donation use cases over the given repos with recording notification fakes.
pub fn test_donation_use_cases(
    donations: Arc<dyn DonationRepoTrait>,
    donors: Arc<dyn DonorRepoTrait>,
) -> DonationUseCases {
    let dispatcher = test_dispatcher(
        Arc::new(InMemoryEmailSender::new()),
        Arc::new(InMemoryReceiptGenerator::new()),
    );
    DonationUseCases::new(donations, donors, dispatcher, TEST_TIMEOUT)
}

// ============================================================================
// CancellationHarness
// ============================================================================

/// Cancellation use cases plus every fake they talk to.
pub struct CancellationHarness {
    pub processor: Arc<FakePaymentProcessor>,
    pub donors: Arc<InMemoryDonorRepo>,
    pub cancellations: Arc<InMemorySubscriptionCancellationRepo>,
    pub email: Arc<InMemoryEmailSender>,
    pub tokens: Arc<CancellationTokenService>,
    pub denylist: Arc<InMemoryTokenDenylist>,
    pub use_cases: SubscriptionCancellationUseCases,
}

impl CancellationHarness {
    pub fn new() -> Self {
        let processor = Arc::new(FakePaymentProcessor::new());
        let cancellations = Arc::new(InMemorySubscriptionCancellationRepo::new());
        let donors = Arc::new(InMemoryDonorRepo::with_cancellations(cancellations.clone()));
        let email = Arc::new(InMemoryEmailSender::new());
        let denylist = Arc::new(InMemoryTokenDenylist::new());
        let tokens = Arc::new(test_revocable_token_service(denylist.clone()));

        let dispatcher = SideEffectDispatcher::new(
            email.clone(),
            Arc::new(InMemoryReceiptGenerator::new()),
            tokens.clone(),
            Url::parse(TEST_SITE_URL).unwrap(),
            TEST_TIMEOUT,
        );
        let use_cases = SubscriptionCancellationUseCases::new(
            processor.clone(),
            donors.clone(),
            cancellations.clone(),
            tokens.clone(),
            dispatcher,
            TEST_TIMEOUT,
        );

        Self {
            processor,
            donors,
            cancellations,
            email,
            tokens,
            denylist,
            use_cases,
        }
    }

    pub fn token(&self, subscription_id: &str, email: &str) -> String {
        self.tokens.issue(subscription_id, email).unwrap()
    }
}

impl Default for CancellationHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Fakes behind an `AppState` built by `TestAppStateBuilder`.
pub struct TestHandles {
    pub donations: Arc<InMemoryDonationRepo>,
    pub donors: Arc<InMemoryDonorRepo>,
    pub cancellations: Arc<InMemorySubscriptionCancellationRepo>,
    pub processor: Arc<FakePaymentProcessor>,
    pub email: Arc<InMemoryEmailSender>,
    pub receipts: Arc<InMemoryReceiptGenerator>,
    pub tokens: Arc<CancellationTokenService>,
    pub denylist: Arc<InMemoryTokenDenylist>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let (app_state, handles) = TestAppStateBuilder::new()
///     .with_subscription(create_test_subscription(|_| {}))
///     .with_customer(create_test_customer(|_| {}))
///     .build();
/// ```
pub struct TestAppStateBuilder {
    subscriptions: Vec<ProcessorSubscription>,
    customers: Vec<ProcessorCustomer>,
    donors: Vec<DonorProfile>,
    donation_repo: Option<Arc<dyn DonationRepoTrait>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            subscriptions: vec![],
            customers: vec![],
            donors: vec![],
            donation_repo: None,
        }
    }

    /// Add a subscription to the fake processor.
    pub fn with_subscription(mut self, subscription: ProcessorSubscription) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Add a customer to the fake processor.
    pub fn with_customer(mut self, customer: ProcessorCustomer) -> Self {
        self.customers.push(customer);
        self
    }

    /// Seed the donor ledger.
    pub fn with_donor(mut self, donor: DonorProfile) -> Self {
        self.donors.push(donor);
        self
    }

    /// Replace the in-memory donation repo (e.g. with a failing one).
    pub fn with_donation_repo(mut self, repo: Arc<dyn DonationRepoTrait>) -> Self {
        self.donation_repo = Some(repo);
        self
    }

    /// Build the AppState with all configured mocks.
    pub fn build(self) -> (AppState, TestHandles) {
        let donations = Arc::new(InMemoryDonationRepo::new());
        let cancellations = Arc::new(InMemorySubscriptionCancellationRepo::new());
        let donors = Arc::new(InMemoryDonorRepo::with_cancellations(cancellations.clone()));
        for donor in self.donors {
            donors.insert_donor(donor);
        }

        let processor = Arc::new(FakePaymentProcessor::new());
        for subscription in self.subscriptions {
            processor.insert_subscription(subscription);
        }
        for customer in self.customers {
            processor.insert_customer(customer);
        }

        let email = Arc::new(InMemoryEmailSender::new());
        let receipts = Arc::new(InMemoryReceiptGenerator::new());
        let denylist = Arc::new(InMemoryTokenDenylist::new());
        let tokens = Arc::new(test_revocable_token_service(denylist.clone()));

        let dispatcher = SideEffectDispatcher::new(
            email.clone(),
            receipts.clone(),
            tokens.clone(),
            Url::parse(TEST_SITE_URL).unwrap(),
            TEST_TIMEOUT,
        );

        let donation_repo: Arc<dyn DonationRepoTrait> =
            self
            .donation_repo
            .unwrap_or_else(|| donations.clone() as Arc<dyn DonationRepoTrait>);
        let donation_use_cases = Arc::new(DonationUseCases::new(
            donation_repo,
            donors.clone(),
            dispatcher.clone(),
            TEST_TIMEOUT,
        ));
        let webhook_use_cases = Arc::new(WebhookUseCases::new(
            SecretString::new(TEST_WEBHOOK_SECRET.into()),
            300,
            donation_use_cases,
        ));
        let cancellation_use_cases = Arc::new(SubscriptionCancellationUseCases::new(
            processor.clone(),
            donors.clone(),
            cancellations.clone(),
            tokens.clone(),
            dispatcher,
            TEST_TIMEOUT,
        ));

        // Create minimal config for testing
        let config = Arc::new(AppConfig {
            bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
            database_url: String::new(),
            stripe_secret_key: SecretString::new("sk_test_unused".into()),
            stripe_webhook_secret: SecretString::new(TEST_WEBHOOK_SECRET.into()),
            webhook_tolerance_secs: 300,
            cancellation_token_secret: SecretString::new(TEST_TOKEN_SECRET.into()),
            cancellation_token_ttl: time::Duration::hours(24),
            site_base_url: Url::parse(TEST_SITE_URL).unwrap(),
            cors_origin: HeaderValue::from_static(TEST_SITE_URL),
            resend_api_key: SecretString::new("re_test_unused".into()),
            email_from: "Donations <donations@give.example.org>".to_string(),
            receipts_dir: "receipts".to_string(),
            outbound_timeout: TEST_TIMEOUT,
            redis_url: None,
            log_file: "test.log".to_string(),
        });

        let app_state = AppState {
            config,
            webhook_use_cases,
            cancellation_use_cases,
        };
        let handles = TestHandles {
            donations,
            donors,
            cancellations,
            processor,
            email,
            receipts,
            tokens,
            denylist,
        };
        (app_state, handles)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
