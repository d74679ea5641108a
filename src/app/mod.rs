pub mod email;
pub mod notifier;

pub use email::EmailComposer;
pub use notifier::{NotifyError, NotifyOutcome, Notifier};
