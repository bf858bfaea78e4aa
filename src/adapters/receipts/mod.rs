use std::path::PathBuf;

use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::notifications::{ReceiptDocument, ReceiptGenerator},
};

/// Writes each receipt as `<receipt number>.html` under a configured directory.
#[derive(Clone)]
pub struct FileReceiptGenerator {
    dir: PathBuf,
}

impl FileReceiptGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, receipt_number: &str) -> AppResult<PathBuf> {
        let safe = !receipt_number.is_empty()
            && receipt_number
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(AppError::InvalidInput(format!(
                "unusable receipt number {:?}",
                receipt_number
            )));
        }
        Ok(self.dir.join(format!("{}.html", receipt_number)))
    }
}

#[async_trait]
impl ReceiptGenerator for FileReceiptGenerator {
    async fn generate(&self, receipt: &ReceiptDocument) -> AppResult<String> {
        let path = self.path_for(&receipt.receipt_number)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create receipts dir: {}", e)))?;
        tokio::fs::write(&path, receipt.html.as_bytes())
            .await
            .map_err(|e| AppError::Internal(format!("Cannot write receipt: {}", e)))?;

        Ok(path.display().to_string())
    }
}
