pub mod app_error;
pub mod cancellation_token;
pub mod email_templates;
pub mod ports;
pub mod timeout;
pub mod use_cases;
pub mod validators;
