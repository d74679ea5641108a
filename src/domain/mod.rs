//! Domain types: registrations, transaction events, notification records.

pub mod address;
pub mod notification;
pub mod registration;
pub mod status;
pub mod transaction;

pub use address::{EmailAddress, ValidationError, WalletAddress};
pub use notification::{
    DedupKey, EmailStatus, LedgerError, NewNotification, NotificationLedger, NotificationRecord,
    DEFAULT_HISTORY_LIMIT,
};
pub use registration::{Registration, RegistrationError, RegistrationStore, UserId};
pub use status::StatusDisplay;
pub use transaction::{
    format_amount, TransactionEvent, TransactionStatus, TransactionType, TxValue, NATIVE_DECIMALS,
};
