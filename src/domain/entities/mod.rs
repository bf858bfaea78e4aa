pub mod donation_frequency;
pub mod money;
pub mod payment_status;
pub mod processor_event;
pub mod subscription_status;
