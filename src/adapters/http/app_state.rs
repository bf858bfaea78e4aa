use std::sync::Arc;

use axum::extract::FromRef;

use crate::{
    infra::config::AppConfig,
    use_cases::{
        subscription_cancellation::SubscriptionCancellationUseCases, webhook::WebhookUseCases,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub webhook_use_cases: Arc<WebhookUseCases>,
    pub cancellation_use_cases: Arc<SubscriptionCancellationUseCases>,
}

impl FromRef<AppState> for Arc<WebhookUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.webhook_use_cases.clone()
    }
}

impl FromRef<AppState> for Arc<SubscriptionCancellationUseCases> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.cancellation_use_cases.clone()
    }
}
