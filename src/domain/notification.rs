//! Notification records and the ledger that deduplicates them.
//!
//! A transaction is expected to move through several statuses (pending → confirmed, or
//! pending → failed). Each status is notifiable once per user, so the deduplication key is
//! `(user_id, transaction_hash, transaction_status)` rather than the hash alone.

use crate::domain::registration::UserId;
use crate::domain::transaction::{TransactionStatus, TransactionType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default page size for notification history queries.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(EmailStatus::Sent),
            "failed" => Some(EmailStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub user_id: UserId,
    pub transaction_hash: String,
    pub transaction_status: TransactionStatus,
}

impl DedupKey {
    /// Hex hashes are lowercased so `0xABC..` and `0xabc..` name the same transaction.
    pub fn new(
        user_id: UserId,
        transaction_hash: impl Into<String>,
        transaction_status: TransactionStatus,
    ) -> Self {
        Self {
            user_id,
            transaction_hash: normalize_hash(&transaction_hash.into()),
            transaction_status,
        }
    }
}

pub fn normalize_hash(raw: &str) -> String {
    let raw = raw.trim();
    let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"));
    match digits {
        Some(d) if !d.is_empty() && d.chars().all(|c| c.is_ascii_hexdigit()) => {
            format!("0x{}", d.to_ascii_lowercase())
        }
        _ => raw.to_string(),
    }
}

/// Input to [`NotificationLedger::record_notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub key: DedupKey,
    pub transaction_type: TransactionType,
    pub email_status: EmailStatus,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub user_id: UserId,
    pub transaction_hash: String,
    pub transaction_status: TransactionStatus,
    pub transaction_type: TransactionType,
    pub sent_at: DateTime<Utc>,
    pub email_status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl NotificationRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey::new(
            self.user_id.clone(),
            self.transaction_hash.clone(),
            self.transaction_status,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Duplicate notification")]
    DuplicateNotification,

    #[error("Notification ledger unavailable: {0}")]
    StoreUnavailable(String),
}

#[async_trait]
pub trait NotificationLedger: Send + Sync {
    /// True iff a record already exists for exactly this triple.
    async fn has_notified(&self, key: &DedupKey) -> Result<bool, LedgerError>;

    /// Inserts a record; an existing triple is rejected with `DuplicateNotification`.
    async fn record_notification(
        &self,
        entry: NewNotification,
    ) -> Result<NotificationRecord, LedgerError>;

    /// Most recent records for a user, newest first.
    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, LedgerError>;

    /// Reachability check used by `/health`.
    async fn ping(&self) -> Result<(), LedgerError> {
        Ok(())
    }
}
