//! Registration store and notification ledger backends.

pub mod bounded;
pub mod memory;
pub mod postgres;

pub use bounded::BoundedCache;
pub use memory::{MemoryLedger, MemoryRegistrationStore};
pub use postgres::{PostgresLedger, PostgresRegistrationStore};

use crate::domain::{NotificationLedger, RegistrationStore};
use crate::infra::config::{self, StoreBackend};
use anyhow::Context;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// The two stores the notifier depends on, behind their trait objects.
#[derive(Clone)]
pub struct Stores {
    pub backend: StoreBackend,
    pub registrations: Arc<dyn RegistrationStore>,
    pub ledger: Arc<dyn NotificationLedger>,
}

impl Stores {
    pub fn in_memory(capacity: usize, retain: usize) -> Self {
        Self {
            backend: StoreBackend::Memory,
            registrations: Arc::new(MemoryRegistrationStore::new()),
            ledger: Arc::new(MemoryLedger::new(capacity, retain)),
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            backend: StoreBackend::Postgres,
            registrations: Arc::new(PostgresRegistrationStore::new(pool.clone())),
            ledger: Arc::new(PostgresLedger::new(pool)),
        }
    }

    /// Opens the backend selected by `STORE_BACKEND` / `DATABASE_URL`.
    pub async fn from_env() -> anyhow::Result<Self> {
        match config::store_backend()? {
            StoreBackend::Postgres => {
                let url = config::database_url()
                    .context("STORE_BACKEND=postgres requires DATABASE_URL")?;
                let pool = postgres::connect(&url, config::database_max_connections()?).await?;
                info!("Using Postgres registration store and notification ledger");
                Ok(Self::postgres(pool))
            }
            StoreBackend::Memory => {
                let (capacity, retain) = config::ledger_bounds()?;
                warn!(
                    capacity,
                    retain,
                    "Using in-memory stores; registrations and notification history are lost on restart"
                );
                Ok(Self::in_memory(capacity, retain))
            }
        }
    }
}
