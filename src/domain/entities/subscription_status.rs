use serde::{Deserialize, Serialize};

/// Recurring-donation state tracked on the donor ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "donor_subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DonorSubscriptionStatus {
    #[default]
    None,
    Active,
    Cancelled,
}

impl DonorSubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonorSubscriptionStatus::None => "none",
            DonorSubscriptionStatus::Active => "active",
            DonorSubscriptionStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DonorSubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription status as reported by the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorSubscriptionStatus {
    Active,
    PastDue,
    Canceled,
    Trialing,
    Incomplete,
    IncompleteExpired,
    Unpaid,
    Paused,
}

impl ProcessorSubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessorSubscriptionStatus::Active => "active",
            ProcessorSubscriptionStatus::PastDue => "past_due",
            ProcessorSubscriptionStatus::Canceled => "canceled",
            ProcessorSubscriptionStatus::Trialing => "trialing",
            ProcessorSubscriptionStatus::Incomplete => "incomplete",
            ProcessorSubscriptionStatus::IncompleteExpired => "incomplete_expired",
            ProcessorSubscriptionStatus::Unpaid => "unpaid",
            ProcessorSubscriptionStatus::Paused => "paused",
        }
    }

    /// Convert from Stripe subscription status string
    pub fn from_stripe(s: &str) -> Self {
        match s {
            "active" => ProcessorSubscriptionStatus::Active,
            "past_due" => ProcessorSubscriptionStatus::PastDue,
            "canceled" | "cancelled" => ProcessorSubscriptionStatus::Canceled,
            "trialing" => ProcessorSubscriptionStatus::Trialing,
            "incomplete" => ProcessorSubscriptionStatus::Incomplete,
            "incomplete_expired" => ProcessorSubscriptionStatus::IncompleteExpired,
            "unpaid" => ProcessorSubscriptionStatus::Unpaid,
            "paused" => ProcessorSubscriptionStatus::Paused,
            // Unknown statuses are treated as not yet active
            _ => ProcessorSubscriptionStatus::Incomplete,
        }
    }

    /// A subscription in a terminal state can no longer be cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ProcessorSubscriptionStatus::Canceled | ProcessorSubscriptionStatus::IncompleteExpired
        )
    }
}

impl std::fmt::Display for ProcessorSubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
