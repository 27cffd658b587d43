//! Withdrawal receipts, written as plain-text files under `RECEIPTS_DIR`.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::services::money_utils::format_usd;

/// Public URL prefix the receipt files are served under
pub const RECEIPT_URL_PREFIX: &str = "/uploads/receipts";

/// Everything printed on a receipt
#[derive(Debug, Clone)]
pub struct ReceiptData {
    pub withdrawal_id: i32,
    pub user_name: String,
    pub user_email: String,
    pub amount: Decimal,
    pub withdrawal_address: String,
    pub transaction_hash: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl ReceiptData {
    /// `WR-{withdrawal id}-{unix millis}`
    pub fn receipt_id(&self) -> String {
        format!("WR-{}-{}", self.withdrawal_id, self.issued_at.timestamp_millis())
    }
}

#[async_trait]
pub trait ReceiptRenderer: Send + Sync {
    /// Render the receipt and return its reference, or None on failure
    async fn render(&self, data: &ReceiptData) -> Option<String>;

    /// Drop a rendered receipt that ended up attached to nothing
    async fn discard(&self, _receipt_url: &str) {}
}

pub fn receipt_file_name(receipt_id: &str) -> String {
    format!("receipt_{}.txt", receipt_id)
}

pub fn render_receipt_text(data: &ReceiptData) -> String {
    format!(
        "MPI STRATEGY - WITHDRAWAL RECEIPT\n\
         ================================\n\n\
         Receipt ID: {}\n\
         Date: {}\n\
         User: {}\n\
         Email: {}\n\n\
         WITHDRAWAL DETAILS:\n\
         Amount: {}\n\
         Withdrawal Address: {}\n\
         Transaction Hash: {}\n\
         Status: Completed\n\n\
         This receipt confirms that your withdrawal request has been processed.\n",
        data.receipt_id(),
        data.issued_at.format("%Y-%m-%d %H:%M:%S UTC"),
        data.user_name,
        data.user_email,
        format_usd(data.amount),
        data.withdrawal_address,
        data.transaction_hash.as_deref().unwrap_or("N/A"),
    )
}

pub struct FileReceiptRenderer {
    dir: PathBuf,
}

impl FileReceiptRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReceiptRenderer for FileReceiptRenderer {
    async fn render(&self, data: &ReceiptData) -> Option<String> {
        let receipt_id = data.receipt_id();
        let file_name = receipt_file_name(&receipt_id);

        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "Cannot create receipts directory");
            return None;
        }
        let path = self.dir.join(&file_name);
        if let Err(e) = tokio::fs::write(&path, render_receipt_text(data)).await {
            warn!(path = %path.display(), error = %e, "Cannot write receipt");
            return None;
        }

        info!(withdrawal_id = data.withdrawal_id, receipt_id = %receipt_id, "Receipt written");
        Some(format!("{}/{}", RECEIPT_URL_PREFIX, file_name))
    }

    async fn discard(&self, receipt_url: &str) {
        let Some(file_name) = receipt_url
            .strip_prefix(RECEIPT_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.contains('/'))
        else {
            warn!(receipt_url, "Not a receipt reference; nothing discarded");
            return;
        };

        let path = self.dir.join(file_name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => info!(path = %path.display(), "Discarded unused receipt"),
            Err(e) => warn!(path = %path.display(), error = %e, "Cannot discard receipt"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn data() -> ReceiptData {
        ReceiptData {
            withdrawal_id: 42,
            user_name: "Ada Lovelace".to_string(),
            user_email: "ada@example.com".to_string(),
            amount: dec!(100),
            withdrawal_address: "bc1qexample".to_string(),
            transaction_hash: None,
            issued_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
        }
    }

    #[test]
    fn test_receipt_id_format() {
        assert_eq!(data().receipt_id(), "WR-42-1700000000123");
        assert_eq!(receipt_file_name("WR-42-1"), "receipt_WR-42-1.txt");
    }

    #[tokio::test]
    async fn test_file_renderer_writes_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileReceiptRenderer::new(dir.path().join("receipts"));

        let url = renderer.render(&data()).await.unwrap();
        assert_eq!(url, "/uploads/receipts/receipt_WR-42-1700000000123.txt");

        let written = std::fs::read_to_string(
            dir.path().join("receipts").join("receipt_WR-42-1700000000123.txt"),
        )
        .unwrap();
        assert!(written.contains("Amount: $100.00"));
        assert!(written.contains("Transaction Hash: N/A"));
    }

    #[tokio::test]
    async fn test_file_renderer_discards_receipt() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FileReceiptRenderer::new(dir.path());

        let url = renderer.render(&data()).await.unwrap();
        let path = dir.path().join("receipt_WR-42-1700000000123.txt");
        assert!(path.exists());

        renderer.discard("/elsewhere/receipt_WR-42-1700000000123.txt").await;
        assert!(path.exists());

        renderer.discard(&url).await;
        assert!(!path.exists());
    }
}
