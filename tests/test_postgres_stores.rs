//! Postgres store behaviour: unique constraints and concurrent ledger inserts.
//!
//! Skipped unless `DATABASE_URL` points at a disposable database.

use chrono::Utc;
use std::sync::Arc;
use tranzantions::domain::{
    DedupKey, EmailAddress, EmailStatus, LedgerError, NewNotification, NotificationLedger,
    RegistrationError, RegistrationStore, TransactionStatus, TransactionType, WalletAddress,
};
use tranzantions::storage::postgres::{self, PostgresLedger, PostgresRegistrationStore};

async fn pool() -> Option<sqlx::PgPool> {
    dotenv::dotenv().ok();
    let Ok(url) = std::env::var("DATABASE_URL") else {
        println!("DATABASE_URL not set; skipping Postgres store test");
        return None;
    };
    Some(postgres::connect(&url, 20).await.unwrap())
}

/// Wallet/email pair unique to this run, so the test can be repeated against the same database.
fn fresh_identity(tag: u8) -> (EmailAddress, WalletAddress) {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let wallet = WalletAddress::parse(&format!("0x{:02x}{:038x}", tag, nanos)).unwrap();
    let email = EmailAddress::parse(&format!("user{}-{}@example.com", tag, nanos)).unwrap();
    (email, wallet)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registration_constraints() {
    let Some(pool) = pool().await else { return };
    let store = PostgresRegistrationStore::new(pool);

    let (email, wallet) = fresh_identity(1);
    let before = store.count().await.unwrap();
    let reg = store.register(email.clone(), wallet.clone()).await.unwrap();
    assert_eq!(reg.email, email);
    assert_eq!(store.count().await.unwrap(), before + 1);

    let upper = WalletAddress::parse(&wallet.as_str().to_ascii_uppercase().replacen("0X", "0x", 1))
        .unwrap();
    let found = store.lookup_by_wallet(&upper).await.unwrap().unwrap();
    assert_eq!(found.user_id, reg.user_id);

    let (other_email, other_wallet) = fresh_identity(2);
    assert_eq!(
        store.register(other_email, wallet.clone()).await.unwrap_err(),
        RegistrationError::DuplicateWallet
    );
    assert_eq!(
        store.register(email, other_wallet).await.unwrap_err(),
        RegistrationError::DuplicateEmail
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_records_have_one_winner() {
    let Some(pool) = pool().await else { return };
    let registrations = PostgresRegistrationStore::new(pool.clone());
    let ledger = Arc::new(PostgresLedger::new(pool));

    let (email, wallet) = fresh_identity(3);
    let reg = registrations.register(email, wallet).await.unwrap();
    let key = DedupKey::new(reg.user_id.clone(), "0xfeed", TransactionStatus::Pending);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let ledger = ledger.clone();
        let key = key.clone();
        tasks.push(tokio::spawn(async move {
            ledger
                .record_notification(NewNotification {
                    key,
                    transaction_type: TransactionType::Received,
                    email_status: EmailStatus::Sent,
                    error_message: None,
                })
                .await
        }));
    }

    let mut wins = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => wins += 1,
            Err(LedgerError::DuplicateNotification) => {}
            Err(e) => panic!("unexpected ledger error: {e}"),
        }
    }
    assert_eq!(wins, 1);
    assert!(ledger.has_notified(&key).await.unwrap());

    let confirmed = DedupKey::new(reg.user_id.clone(), "0xfeed", TransactionStatus::Confirmed);
    assert!(!ledger.has_notified(&confirmed).await.unwrap());

    let history = ledger.history(&reg.user_id, 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].transaction_status, TransactionStatus::Pending);
}
