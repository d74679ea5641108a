//! Durable stores backed by PostgreSQL.
//!
//! Uniqueness lives in the schema (`migrations/`): concurrent inserts of the same wallet, email
//! or `(user_id, transaction_hash, transaction_status)` triple are arbitrated by Postgres, and the
//! loser sees SQLSTATE 23505 which is mapped to the matching duplicate error here.

use crate::domain::{
    DedupKey, EmailAddress, EmailStatus, LedgerError, NewNotification, NotificationLedger,
    NotificationRecord, Registration, RegistrationError, RegistrationStore, TransactionStatus,
    TransactionType, UserId, WalletAddress,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

const UNIQUE_VIOLATION: &str = "23505";
const WALLET_CONSTRAINT: &str = "users_wallet_address_key";
const EMAIL_CONSTRAINT: &str = "users_email_key";
const DEDUP_CONSTRAINT: &str = "notification_history_dedup_key";

/// Connects to Postgres and applies pending migrations.
pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    apply_schema(&pool).await?;
    Ok(pool)
}

pub async fn apply_schema(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Name of the unique constraint that rejected the statement, if that is what failed.
fn violated_constraint(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

fn registration_error(err: sqlx::Error) -> RegistrationError {
    match violated_constraint(&err).as_deref() {
        Some(WALLET_CONSTRAINT) => RegistrationError::DuplicateWallet,
        Some(EMAIL_CONSTRAINT) => RegistrationError::DuplicateEmail,
        _ => RegistrationError::StoreUnavailable(err.to_string()),
    }
}

fn ledger_error(err: sqlx::Error) -> LedgerError {
    match violated_constraint(&err).as_deref() {
        Some(DEDUP_CONSTRAINT) => LedgerError::DuplicateNotification,
        _ => LedgerError::StoreUnavailable(err.to_string()),
    }
}

#[derive(Clone)]
pub struct PostgresRegistrationStore {
    pool: PgPool,
}

impl PostgresRegistrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_registration(row: &PgRow) -> Result<Registration, RegistrationError> {
        let invalid = |e: String| RegistrationError::StoreUnavailable(format!("corrupt users row: {}", e));
        let wallet: String = row.try_get("wallet_address").map_err(registration_error)?;
        let email: String = row.try_get("email").map_err(registration_error)?;
        Ok(Registration {
            user_id: UserId(row.try_get("id").map_err(registration_error)?),
            wallet_address: WalletAddress::parse(&wallet).map_err(|e| invalid(e.to_string()))?,
            email: EmailAddress::parse(&email).map_err(|e| invalid(e.to_string()))?,
            created_at: row.try_get("created_at").map_err(registration_error)?,
        })
    }

    async fn exists(&self, column: &str, value: &str) -> Result<bool, RegistrationError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM users WHERE {} = $1)", column);
        sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&self.pool)
            .await
            .map_err(registration_error)
    }
}

#[async_trait]
impl RegistrationStore for PostgresRegistrationStore {
    async fn register(
        &self,
        email: EmailAddress,
        wallet: WalletAddress,
    ) -> Result<Registration, RegistrationError> {
        // Pre-checks give a stable error order; the constraints still decide races.
        if self.exists("wallet_address", wallet.as_str()).await? {
            return Err(RegistrationError::DuplicateWallet);
        }
        if self.exists("email", email.as_str()).await? {
            return Err(RegistrationError::DuplicateEmail);
        }

        let row = sqlx::query(
            "INSERT INTO users (email, wallet_address) VALUES ($1, $2)
             RETURNING id, email, wallet_address, created_at",
        )
        .bind(email.as_str())
        .bind(wallet.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(registration_error)?;

        Self::row_to_registration(&row)
    }

    async fn lookup_by_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Option<Registration>, RegistrationError> {
        let row = sqlx::query(
            "SELECT id, email, wallet_address, created_at FROM users WHERE wallet_address = $1",
        )
        .bind(wallet.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(registration_error)?;

        row.as_ref().map(Self::row_to_registration).transpose()
    }

    async fn count(&self) -> Result<u64, RegistrationError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(registration_error)?;
        Ok(n.max(0) as u64)
    }

    async fn ping(&self) -> Result<(), RegistrationError> {
        sqlx::query("SELECT 1 FROM users LIMIT 1")
            .execute(&self.pool)
            .await
            .map_err(registration_error)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &PgRow) -> Result<NotificationRecord, LedgerError> {
        let corrupt = |field: &str, value: &str| {
            LedgerError::StoreUnavailable(format!(
                "corrupt notification_history row: {}={}",
                field, value
            ))
        };
        let status: String = row.try_get("transaction_status").map_err(ledger_error)?;
        let tx_type: String = row.try_get("transaction_type").map_err(ledger_error)?;
        let email_status: String = row.try_get("email_status").map_err(ledger_error)?;
        let sent_at: DateTime<Utc> = row.try_get("sent_at").map_err(ledger_error)?;

        Ok(NotificationRecord {
            user_id: UserId(row.try_get("user_id").map_err(ledger_error)?),
            transaction_hash: row.try_get("transaction_hash").map_err(ledger_error)?,
            transaction_status: TransactionStatus::from_db(&status),
            transaction_type: TransactionType::from_db(&tx_type)
                .ok_or_else(|| corrupt("transaction_type", &tx_type))?,
            sent_at,
            email_status: EmailStatus::from_db(&email_status)
                .ok_or_else(|| corrupt("email_status", &email_status))?,
            error_message: row.try_get("error_message").map_err(ledger_error)?,
        })
    }
}

#[async_trait]
impl NotificationLedger for PostgresLedger {
    async fn has_notified(&self, key: &DedupKey) -> Result<bool, LedgerError> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM notification_history
                WHERE user_id = $1 AND transaction_hash = $2 AND transaction_status = $3
             )",
        )
        .bind(key.user_id.as_str())
        .bind(&key.transaction_hash)
        .bind(key.transaction_status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_error)
    }

    async fn record_notification(
        &self,
        entry: NewNotification,
    ) -> Result<NotificationRecord, LedgerError> {
        let row = sqlx::query(
            "INSERT INTO notification_history
                (user_id, transaction_hash, transaction_type, transaction_status, email_status, error_message)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING user_id, transaction_hash, transaction_type, transaction_status,
                       sent_at, email_status, error_message",
        )
        .bind(entry.key.user_id.as_str())
        .bind(&entry.key.transaction_hash)
        .bind(entry.transaction_type.as_str())
        .bind(entry.key.transaction_status.as_str())
        .bind(entry.email_status.as_str())
        .bind(entry.error_message.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(ledger_error)?;

        Self::row_to_record(&row)
    }

    async fn history(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, LedgerError> {
        let rows = sqlx::query(
            "SELECT user_id, transaction_hash, transaction_type, transaction_status,
                    sent_at, email_status, error_message
             FROM notification_history
             WHERE user_id = $1
             ORDER BY sent_at DESC, id DESC
             LIMIT $2",
        )
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(ledger_error)?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1 FROM notification_history LIMIT 1")
            .execute(&self.pool)
            .await
            .map_err(ledger_error)?;
        Ok(())
    }
}
