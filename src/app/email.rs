//! Alert and welcome email composition.

use crate::domain::{
    format_amount, EmailAddress, TransactionEvent, TransactionType, WalletAddress, NATIVE_DECIMALS,
};
use crate::infra::config;
use crate::infra::mailer::OutgoingEmail;
use html_escape::{encode_double_quoted_attribute, encode_text};

pub const CURRENCY_SYMBOL: &str = "ETH";

#[derive(Debug, Clone)]
pub struct EmailComposer {
    explorer_tx_url: String,
    currency: String,
    decimals: u8,
}

impl EmailComposer {
    pub fn new(explorer_tx_url: impl Into<String>) -> Self {
        Self {
            explorer_tx_url: explorer_tx_url.into(),
            currency: CURRENCY_SYMBOL.to_string(),
            decimals: NATIVE_DECIMALS,
        }
    }

    pub fn from_env() -> Self {
        Self::new(config::explorer_tx_url())
    }

    pub fn explorer_link(&self, hash: &str) -> String {
        format!("{}{}", self.explorer_tx_url, hash)
    }

    pub fn transaction_alert(
        &self,
        to: &EmailAddress,
        event: &TransactionEvent,
        direction: TransactionType,
    ) -> OutgoingEmail {
        let amount = format_amount(event.wei(), self.decimals);
        let status = event.status.display();
        let direction_color = match direction {
            TransactionType::Sent => "#ff6b6b",
            TransactionType::Received => "#4ecdc4",
        };
        let block = event
            .block_number
            .map(|b| b.to_string())
            .unwrap_or_else(|| "Pending".to_string());
        let time = event.timestamp.format("%Y-%m-%d %H:%M:%S UTC");
        let explorer_link = self.explorer_link(&event.hash);
        let link = encode_double_quoted_attribute(&explorer_link);

        let subject = format!(
            "Transaction Alert: {} {} {} ({})",
            direction.label(),
            amount,
            self.currency,
            status.label
        );

        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;">
  <h2 style="color: {direction_color};">Transaction {direction}</h2>
  <p>We detected a transaction on your monitored wallet:</p>
  <p style="display: inline-block; background-color: {status_color}; color: white; padding: 4px 10px; border-radius: 4px;">{status_label}</p>
  <p>{status_message}</p>
  <div style="background-color: #f5f5f5; padding: 15px; border-radius: 4px; margin: 15px 0;">
    <p><strong>Type:</strong> {direction}</p>
    <p><strong>Amount:</strong> {amount} {currency}</p>
    <p><strong>Transaction Hash:</strong> <span style="font-family: monospace; word-break: break-all;">{hash}</span></p>
    <p><strong>From:</strong> <span style="font-family: monospace; word-break: break-all;">{from}</span></p>
    <p><strong>To:</strong> <span style="font-family: monospace; word-break: break-all;">{to}</span></p>
    <p><strong>Block Number:</strong> {block}</p>
    <p><strong>Time:</strong> {time}</p>
    <p><strong>Status:</strong> {status_label}</p>
  </div>
  <p><a href="{link}" style="display: inline-block; background-color: #3498db; color: white; padding: 10px 15px; text-decoration: none; border-radius: 4px;">View Transaction on Block Explorer</a></p>
  <p>If you did not expect this transaction, please secure your wallet immediately.</p>
  <p>Best regards,<br>The TranzAntions Team</p>
</div>"#,
            direction = direction.label(),
            status_color = status.color,
            status_label = status.label,
            status_message = status.message,
            currency = self.currency,
            hash = encode_text(&event.hash),
            from = encode_text(&event.from),
            to = encode_text(event.to_display()),
        );

        OutgoingEmail {
            to: to.clone(),
            subject,
            html,
        }
    }

    pub fn welcome(&self, to: &EmailAddress, wallet: &WalletAddress) -> OutgoingEmail {
        let html = format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #eee; border-radius: 5px;">
  <h2 style="color: #333;">Welcome to TranzAntions!</h2>
  <p>Thank you for registering with our transaction monitoring service.</p>
  <p>We will now monitor the following wallet address for transactions:</p>
  <p style="background-color: #f5f5f5; padding: 10px; border-radius: 4px; font-family: monospace;">{wallet}</p>
  <p>You will receive email notifications whenever there is activity on this wallet.</p>
  <p>Best regards,<br>The TranzAntions Team</p>
</div>"#
        );
        OutgoingEmail {
            to: to.clone(),
            subject: "Welcome to TranzAntions - Transaction Monitoring Service".to_string(),
            html,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TransactionStatus, TxValue};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn event() -> TransactionEvent {
        TransactionEvent {
            hash: "0xabc".to_string(),
            from: "0xaa00000000000000000000000000000000000000".to_string(),
            to: None,
            value: TxValue(json!("1000000000000000000")),
            status: TransactionStatus::Pending,
            block_number: None,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn alert_contains_transaction_details() {
        let composer = EmailComposer::new("https://sepolia.basescan.org/tx/");
        let to = EmailAddress::parse("alice@example.com").unwrap();
        let email = composer.transaction_alert(&to, &event(), TransactionType::Sent);

        assert_eq!(email.to, to);
        assert_eq!(email.subject, "Transaction Alert: Sent 1.000000 ETH (Pending)");
        for needle in [
            "Transaction Sent",
            "1.000000 ETH",
            "0xabc",
            "Contract Creation",
            "<strong>Block Number:</strong> Pending",
            "2024-03-01 12:30:00 UTC",
            "https://sepolia.basescan.org/tx/0xabc",
        ] {
            assert!(email.html.contains(needle), "missing {needle:?}");
        }
    }

    #[test]
    fn alert_escapes_untrusted_fields() {
        let composer = EmailComposer::new("https://explorer/tx/");
        let to = EmailAddress::parse("alice@example.com").unwrap();
        let mut ev = event();
        ev.hash = "<script>".to_string();
        ev.block_number = Some(42);
        let email = composer.transaction_alert(&to, &ev, TransactionType::Received);
        assert!(!email.html.contains("<script>"));
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(email.html.contains("<strong>Block Number:</strong> 42"));
    }

    #[test]
    fn welcome_mentions_wallet() {
        let composer = EmailComposer::new("https://explorer/tx/");
        let to = EmailAddress::parse("alice@example.com").unwrap();
        let wallet = WalletAddress::parse("0xAA00000000000000000000000000000000000000").unwrap();
        let email = composer.welcome(&to, &wallet);
        assert!(email.html.contains("0xaa00000000000000000000000000000000000000"));
    }
}
