//! Centralized configuration (environment variables + defaults).
//!
//! Call `dotenv::dotenv().ok()` before reading so a local `.env` is honoured.

use crate::domain::EmailAddress;
use crate::storage::bounded::{DEFAULT_CAPACITY, DEFAULT_RETAIN};
use anyhow::{anyhow, Context};
use std::env;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_EXPLORER_API_URL: &str = "https://base-sepolia.blockscout.com/api/v2";
pub const DEFAULT_EXPLORER_TX_URL: &str = "https://sepolia.basescan.org/tx/";

fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn flag(name: &str) -> bool {
    matches!(
        var(name).map(|v| v.to_ascii_lowercase()).as_deref(),
        Some("true" | "1" | "yes")
    )
}

fn parsed<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(v) => v
            .parse::<T>()
            .map_err(|e| anyhow!("{} must be valid: {} ({})", name, v, e)),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTransport {
    Smtp,
    /// Log messages instead of sending them (local development).
    Log,
}

pub fn listen_addr() -> anyhow::Result<SocketAddr> {
    parsed("LISTEN_ADDR", DEFAULT_LISTEN_ADDR.parse()?)
}

/// Database URL (required only for the Postgres backend).
pub fn database_url() -> Option<String> {
    var("DATABASE_URL")
}

pub fn database_max_connections() -> anyhow::Result<u32> {
    Ok(parsed("DATABASE_MAX_CONNECTIONS", 5u32)?.max(1))
}

/// `STORE_BACKEND=postgres|memory`; defaults to Postgres when `DATABASE_URL` is set.
pub fn store_backend() -> anyhow::Result<StoreBackend> {
    match var("STORE_BACKEND").map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("postgres") => Ok(StoreBackend::Postgres),
        Some("memory") => Ok(StoreBackend::Memory),
        Some(other) => Err(anyhow!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other)),
        None if database_url().is_some() => Ok(StoreBackend::Postgres),
        None => Ok(StoreBackend::Memory),
    }
}

/// In-memory ledger bound and the number of entries kept after eviction.
pub fn ledger_bounds() -> anyhow::Result<(usize, usize)> {
    let capacity = parsed("LEDGER_CAPACITY", DEFAULT_CAPACITY)?;
    let retain = parsed("LEDGER_RETAIN", DEFAULT_RETAIN)?;
    if retain > capacity {
        return Err(anyhow!("LEDGER_RETAIN ({}) must not exceed LEDGER_CAPACITY ({})", retain, capacity));
    }
    Ok((capacity, retain))
}

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

/// SMTP credentials; falls back to the `GMAIL_ACCOUNT` / `GMAIL_PASSWORD` pair.
pub fn smtp_settings() -> anyhow::Result<Option<SmtpSettings>> {
    let username = var("SMTP_USERNAME").or_else(|| var("GMAIL_ACCOUNT"));
    let password = var("SMTP_PASSWORD").or_else(|| var("GMAIL_PASSWORD"));
    let (Some(username), Some(password)) = (username, password) else {
        return Ok(None);
    };
    Ok(Some(SmtpSettings {
        host: var("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
        port: parsed("SMTP_PORT", DEFAULT_SMTP_PORT)?,
        username,
        password,
    }))
}

/// `MAIL_TRANSPORT=smtp|log`; defaults to SMTP when credentials are configured.
pub fn mail_transport() -> anyhow::Result<MailTransport> {
    match var("MAIL_TRANSPORT").map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("smtp") => Ok(MailTransport::Smtp),
        Some("log") => Ok(MailTransport::Log),
        Some(other) => Err(anyhow!("MAIL_TRANSPORT must be 'smtp' or 'log', got '{}'", other)),
        None if smtp_settings()?.is_some() => Ok(MailTransport::Smtp),
        None => Ok(MailTransport::Log),
    }
}

/// Sender mailbox, e.g. `"TranzAntions" <alerts@example.com>`.
pub fn email_from() -> String {
    if let Some(from) = var("EMAIL_FROM") {
        return from;
    }
    match var("SMTP_USERNAME").or_else(|| var("GMAIL_ACCOUNT")) {
        Some(account) => format!("\"TranzAntions\" <{}>", account),
        None => "\"TranzAntions\" <notifications@tranzantions.com>".to_string(),
    }
}

pub fn explorer_api_url() -> String {
    var("EXPLORER_API_URL")
        .unwrap_or_else(|| DEFAULT_EXPLORER_API_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

pub fn explorer_api_key() -> Option<String> {
    var("EXPLORER_API_KEY")
}

/// Prefix for transaction links in alert emails; the hash is appended.
pub fn explorer_tx_url() -> String {
    var("EXPLORER_TX_URL").unwrap_or_else(|| DEFAULT_EXPLORER_TX_URL.to_string())
}

/// Development-only destination override. Needs both `ALLOW_DEV_FALLBACK_EMAIL=true` and
/// `DEV_FALLBACK_EMAIL`.
pub fn dev_fallback_email() -> anyhow::Result<Option<EmailAddress>> {
    if !flag("ALLOW_DEV_FALLBACK_EMAIL") {
        return Ok(None);
    }
    let raw = var("DEV_FALLBACK_EMAIL")
        .context("ALLOW_DEV_FALLBACK_EMAIL is set but DEV_FALLBACK_EMAIL is missing")?;
    let email = EmailAddress::parse(&raw)
        .map_err(|e| anyhow!("DEV_FALLBACK_EMAIL is not a valid address: {}", e))?;
    Ok(Some(email))
}
