//! The notification service.
//!
//! This module sits between the event sources and the stores. For each observed transaction it:
//! 1.  Resolves the destination email from the `RegistrationStore`.
//! 2.  Checks the `NotificationLedger` for the `(user, hash, status)` triple.
//! 3.  Composes and dispatches the alert through the `Mailer`.
//! 4.  Records the attempt (delivered or failed) in the ledger.
//!
//! There are no retries here: a failed dispatch is reported once and recorded as failed.

use crate::app::email::EmailComposer;
use crate::domain::{
    DedupKey, EmailAddress, EmailStatus, LedgerError, NewNotification, NotificationLedger,
    NotificationRecord, Registration, RegistrationError, RegistrationStore, TransactionEvent,
    TransactionType, UserId, WalletAddress,
};
use crate::infra::mailer::{MailError, Mailer};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Notified {
        email: EmailAddress,
        transaction_type: TransactionType,
        /// `None` when the email went out but the ledger write failed.
        record: Option<NotificationRecord>,
    },
    AlreadyNotified {
        transaction_type: TransactionType,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("No registered email for wallet {0}")]
    NotRegistered(WalletAddress),

    #[error("Email delivery failed: {source}")]
    DeliveryFailed {
        #[source]
        source: MailError,
        /// The `email_status = failed` record, if it could be written.
        record: Option<NotificationRecord>,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<RegistrationError> for NotifyError {
    fn from(err: RegistrationError) -> Self {
        NotifyError::StoreUnavailable(err.to_string())
    }
}

impl From<LedgerError> for NotifyError {
    fn from(err: LedgerError) -> Self {
        NotifyError::StoreUnavailable(err.to_string())
    }
}

pub struct Notifier {
    registrations: Arc<dyn RegistrationStore>,
    ledger: Arc<dyn NotificationLedger>,
    mailer: Arc<dyn Mailer>,
    composer: EmailComposer,
    dev_fallback: Option<EmailAddress>,
}

impl Notifier {
    pub fn new(
        registrations: Arc<dyn RegistrationStore>,
        ledger: Arc<dyn NotificationLedger>,
        mailer: Arc<dyn Mailer>,
        composer: EmailComposer,
    ) -> Self {
        Self {
            registrations,
            ledger,
            mailer,
            composer,
            dev_fallback: None,
        }
    }

    /// Development only: deliver alerts for unregistered wallets to `email`.
    pub fn with_dev_fallback(mut self, email: Option<EmailAddress>) -> Self {
        if let Some(email) = &email {
            warn!(%email, "Development fallback email enabled; unregistered wallets will be alerted there");
        }
        self.dev_fallback = email;
        self
    }

    async fn resolve_destination(
        &self,
        wallet: &WalletAddress,
    ) -> Result<(UserId, EmailAddress), NotifyError> {
        if let Some(reg) = self.registrations.lookup_by_wallet(wallet).await? {
            return Ok((reg.user_id, reg.email));
        }
        match &self.dev_fallback {
            Some(email) => {
                warn!(%wallet, %email, "Wallet not registered; using development fallback email");
                Ok((UserId::dev_fallback(wallet), email.clone()))
            }
            None => Err(NotifyError::NotRegistered(wallet.clone())),
        }
    }

    pub async fn notify(
        &self,
        wallet: &WalletAddress,
        event: &TransactionEvent,
    ) -> Result<NotifyOutcome, NotifyError> {
        let (user_id, email) = self.resolve_destination(wallet).await?;

        let transaction_type = if wallet.matches(&event.from) {
            TransactionType::Sent
        } else {
            TransactionType::Received
        };

        let key = DedupKey::new(user_id, event.hash.clone(), event.status);
        if self.ledger.has_notified(&key).await? {
            info!(
                %wallet,
                hash = %event.hash,
                status = %event.status,
                "Notification already sent for this transaction status"
            );
            return Ok(NotifyOutcome::AlreadyNotified { transaction_type });
        }

        let message = self.composer.transaction_alert(&email, event, transaction_type);
        match self.mailer.send(&message).await {
            Ok(()) => {
                info!(
                    %wallet,
                    %email,
                    hash = %event.hash,
                    status = %event.status,
                    direction = %transaction_type,
                    "Transaction alert sent"
                );
                let entry = NewNotification {
                    key,
                    transaction_type,
                    email_status: EmailStatus::Sent,
                    error_message: None,
                };
                let record = match self.ledger.record_notification(entry).await {
                    Ok(record) => Some(record),
                    Err(LedgerError::DuplicateNotification) => {
                        // A concurrent call recorded the same triple between check and insert.
                        warn!(hash = %event.hash, status = %event.status, "Alert raced with a concurrent delivery");
                        return Ok(NotifyOutcome::AlreadyNotified { transaction_type });
                    }
                    Err(e) => {
                        error!(hash = %event.hash, error = %e, "Alert sent but not recorded in ledger");
                        None
                    }
                };
                Ok(NotifyOutcome::Notified {
                    email,
                    transaction_type,
                    record,
                })
            }
            Err(source) => {
                error!(%wallet, %email, hash = %event.hash, error = %source, "Transaction alert delivery failed");
                let entry = NewNotification {
                    key,
                    transaction_type,
                    email_status: EmailStatus::Failed,
                    error_message: Some(source.to_string()),
                };
                let record = match self.ledger.record_notification(entry).await {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(hash = %event.hash, error = %e, "Failed delivery could not be recorded");
                        None
                    }
                };
                Err(NotifyError::DeliveryFailed { source, record })
            }
        }
    }

    /// Sends the registration welcome email. Failures are logged, never propagated.
    pub async fn send_welcome(&self, registration: &Registration) -> bool {
        let message = self
            .composer
            .welcome(&registration.email, &registration.wallet_address);
        match self.mailer.send(&message).await {
            Ok(()) => {
                info!(email = %registration.email, wallet = %registration.wallet_address, "Welcome email sent");
                true
            }
            Err(e) => {
                warn!(email = %registration.email, error = %e, "Welcome email failed");
                false
            }
        }
    }
}
