pub mod app;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{EmailComposer, Notifier, NotifyError, NotifyOutcome};
pub use domain::{
    EmailAddress, NotificationLedger, RegistrationStore, TransactionEvent, TransactionStatus,
    WalletAddress,
};
pub use storage::Stores;
