//! Wallet → email registrations and the store contract that owns them.

use crate::domain::address::{EmailAddress, WalletAddress};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Identity used for deliveries redirected to the development fallback address.
    pub fn dev_fallback(wallet: &WalletAddress) -> Self {
        Self(format!("dev-fallback:{}", wallet))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub user_id: UserId,
    pub wallet_address: WalletAddress,
    pub email: EmailAddress,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error("Wallet address already registered")]
    DuplicateWallet,

    #[error("Email already registered")]
    DuplicateEmail,

    /// The backing store is unreachable or not provisioned.
    #[error("Registration store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Contract for any registration backend.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Persists a new registration. The wallet is checked for duplicates before the email.
    async fn register(
        &self,
        email: EmailAddress,
        wallet: WalletAddress,
    ) -> Result<Registration, RegistrationError>;

    async fn lookup_by_wallet(
        &self,
        wallet: &WalletAddress,
    ) -> Result<Option<Registration>, RegistrationError>;

    async fn count(&self) -> Result<u64, RegistrationError>;

    /// Reachability probe used by the health endpoint.
    async fn ping(&self) -> Result<(), RegistrationError> {
        self.count().await.map(|_| ())
    }
}
