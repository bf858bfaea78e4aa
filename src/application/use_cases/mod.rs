pub mod donation;
pub mod donor;
pub mod side_effects;
pub mod subscription_cancellation;
pub mod webhook;
