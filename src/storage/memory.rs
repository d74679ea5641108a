//! In-memory stores for offline / transitional operation.
//!
//! Nothing here survives a restart. The ledger is bounded (see [`BoundedCache`]); transactions
//! evicted from it are no longer deduplicated.

use crate::domain::{
    DedupKey, EmailAddress, LedgerError, NewNotification, NotificationLedger, NotificationRecord,
    Registration, RegistrationError, RegistrationStore, UserId, WalletAddress,
};
use crate::storage::bounded::{BoundedCache, DEFAULT_CAPACITY, DEFAULT_RETAIN};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

#[derive(Default)]
struct Registrations {
    by_wallet: HashMap<WalletAddress, Registration>,
    emails: HashSet<EmailAddress>,
    next_id: u64,
}

#[derive(Default)]
pub struct MemoryRegistrationStore {
    inner: RwLock<Registrations>,
}

impl MemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryRegistrationStore {
    async fn register(
        &self,
        email: EmailAddress,
        wallet: WalletAddress,
    ) -> Result<Registration, RegistrationError> {
        let mut inner = self.inner.write().await;
        if inner.by_wallet.contains_key(&wallet) {
            return Err(RegistrationError::DuplicateWallet);
        }
        if inner.emails.contains(&email) {
            return Err(RegistrationError::DuplicateEmail);
        }

        inner.next_id += 1;
        let registration = Registration {
            user_id: UserId(format!("mem-{}", inner.next_id)),
            wallet_address: wallet.clone(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        inner.emails.insert(email);
        inner.by_wallet.insert(wallet, registration.clone());
        Ok(registration)
    }

    async fn lookup_by_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Option<Registration>, RegistrationError> {
        Ok(self.inner.read().await.by_wallet.get(wallet).cloned())
    }

    async fn count(&self) -> Result<u64, RegistrationError> {
        Ok(self.inner.read().await.by_wallet.len() as u64)
    }
}

pub struct MemoryLedger {
    records: Mutex<BoundedCache<DedupKey, NotificationRecord>>,
}

impl MemoryLedger {
    pub fn new(capacity: usize, retain: usize) -> Self {
        Self {
            records: Mutex::new(BoundedCache::new(capacity, retain)),
        }
    }

    /// Number of records currently remembered.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_RETAIN)
    }
}

#[async_trait]
impl NotificationLedger for MemoryLedger {
    async fn has_notified(&self, key: &DedupKey) -> Result<bool, LedgerError> {
        Ok(self.records.lock().await.contains(key))
    }

    async fn record_notification(
        &self,
        entry: NewNotification,
    ) -> Result<NotificationRecord, LedgerError> {
        let record = NotificationRecord {
            user_id: entry.key.user_id.clone(),
            transaction_hash: entry.key.transaction_hash.clone(),
            transaction_status: entry.key.transaction_status,
            transaction_type: entry.transaction_type,
            sent_at: Utc::now(),
            email_status: entry.email_status,
            error_message: entry.error_message,
        };

        let mut records = self.records.lock().await;
        if !records.insert(entry.key, record.clone()) {
            return Err(LedgerError::DuplicateNotification);
        }
        Ok(record)
    }

    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, LedgerError> {
        let records = self.records.lock().await;
        Ok(records
            .iter_newest_first()
            .filter(|r| &r.user_id == user_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
