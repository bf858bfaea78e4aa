use async_trait::async_trait;

use crate::app_error::AppResult;

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()>;
}

/// A rendered receipt ready to be archived.
#[derive(Debug, Clone)]
pub struct ReceiptDocument {
    pub receipt_number: String,
    pub donor_email: String,
    pub html: String,
}

#[async_trait]
pub trait ReceiptGenerator: Send + Sync {
    /// Persist the receipt and return where it was stored.
    async fn generate(&self, receipt: &ReceiptDocument) -> AppResult<String>;
}
