pub mod config;
pub mod explorer;
pub mod logging;
pub mod mailer;

pub use explorer::ExplorerClient;
pub use mailer::{LogMailer, MailError, Mailer, OutgoingEmail, SmtpMailer};
