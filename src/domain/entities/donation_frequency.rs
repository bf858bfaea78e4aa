use serde::{Deserialize, Serialize};

/// How often a donor gives. Recurring frequencies come from the processor's
/// price interval; everything else is a one-time gift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "donation_frequency", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DonationFrequency {
    #[default]
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl DonationFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationFrequency::OneTime => "one-time",
            DonationFrequency::Daily => "daily",
            DonationFrequency::Weekly => "weekly",
            DonationFrequency::Monthly => "monthly",
            DonationFrequency::Quarterly => "quarterly",
            DonationFrequency::Yearly => "yearly",
        }
    }

    pub fn is_recurring(&self) -> bool {
        !matches!(self, DonationFrequency::OneTime)
    }

    /// Convert from a Stripe recurring price (`interval` + `interval_count`).
    pub fn from_stripe_interval(interval: &str, interval_count: i64) -> Self {
        match (interval, interval_count.max(1)) {
            ("day", _) => DonationFrequency::Daily,
            ("week", _) => DonationFrequency::Weekly,
            ("month", 3) => DonationFrequency::Quarterly,
            ("month", 12) => DonationFrequency::Yearly,
            ("month", _) => DonationFrequency::Monthly,
            ("year", _) => DonationFrequency::Yearly,
            _ => DonationFrequency::Monthly,
        }
    }

    /// Lenient parse of the frequency a checkout form put in metadata.
    pub fn from_metadata(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "one-time" | "onetime" | "once" | "single" => Some(DonationFrequency::OneTime),
            "daily" | "day" => Some(DonationFrequency::Daily),
            "weekly" | "week" => Some(DonationFrequency::Weekly),
            "monthly" | "month" => Some(DonationFrequency::Monthly),
            "quarterly" | "quarter" => Some(DonationFrequency::Quarterly),
            "yearly" | "annually" | "annual" | "year" => Some(DonationFrequency::Yearly),
            _ => None,
        }
    }
}

impl std::fmt::Display for DonationFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
