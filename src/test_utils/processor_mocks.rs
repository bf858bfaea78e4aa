//! Fake payment processor holding subscriptions and customers in memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_processor::{
        PaymentProcessor, ProcessorCustomer, ProcessorSubscription,
    },
    domain::entities::subscription_status::ProcessorSubscriptionStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CancelBehavior {
    #[default]
    Succeed,
    /// Processor rejects the call and nothing changes
    Fail,
    /// Cancellation lands but the response is lost
    FailAfterCancelling,
}

#[derive(Default)]
pub struct FakePaymentProcessor {
    subscriptions: Mutex<HashMap<String, ProcessorSubscription>>,
    customers: Mutex<HashMap<String, ProcessorCustomer>>,
    cancel_behavior: Mutex<CancelBehavior>,
    calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl FakePaymentProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_subscription(&self, subscription: ProcessorSubscription) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id.clone(), subscription);
    }

    pub fn insert_customer(&self, customer: ProcessorCustomer) {
        self.customers
            .lock()
            .unwrap()
            .insert(customer.id.clone(), customer);
    }

    pub fn set_cancel_behavior(&self, behavior: CancelBehavior) {
        *self.cancel_behavior.lock().unwrap() = behavior;
    }

    /// Total processor calls of any kind.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentProcessor for FakePaymentProcessor {
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<ProcessorSubscription>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .get(subscription_id)
            .cloned())
    }

    async fn get_customer(&self, customer_id: &str) -> AppResult<Option<ProcessorCustomer>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.customers.lock().unwrap().get(customer_id).cloned())
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AppResult<ProcessorSubscription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);

        let behavior = *self.cancel_behavior.lock().unwrap();
        if behavior == CancelBehavior::Fail {
            return Err(AppError::Processor("processor returned 500".into()));
        }

        let mut subscriptions = self.subscriptions.lock().unwrap();
        let subscription = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| AppError::Processor(format!("No such subscription: {subscription_id}")))?;

        // Mirrors the live API: cancelling twice is an error, not a no-op.
        if subscription.status.is_cancelled() {
            return Err(AppError::Processor(
                "invalid_request_error: subscription is already canceled".into(),
            ));
        }

        subscription.status = ProcessorSubscriptionStatus::Canceled;
        subscription.canceled_at = Some(Utc::now());

        if behavior == CancelBehavior::FailAfterCancelling {
            return Err(AppError::Processor("connection reset".into()));
        }
        Ok(subscription.clone())
    }
}
