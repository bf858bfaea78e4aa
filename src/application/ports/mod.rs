pub mod notifications;
pub mod payment_processor;
