//! Observed transaction events and amount formatting.

use chrono::{DateTime, TimeZone, Utc};
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Decimal places of the native currency (ETH on Base Sepolia).
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimal places shown in alert emails.
pub const DISPLAY_DECIMALS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Confirmed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub const ALL: [TransactionStatus; 5] = [
        TransactionStatus::Pending,
        TransactionStatus::Processing,
        TransactionStatus::Confirmed,
        TransactionStatus::Failed,
        TransactionStatus::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Confirmed => "confirmed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Unknown => "unknown",
        }
    }

    /// Parses the stored column value; anything unrecognized is `Unknown`.
    pub fn from_db(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .unwrap_or(TransactionStatus::Unknown)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction relative to the notified wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Sent,
    Received,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Sent => "sent",
            TransactionType::Received => "received",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransactionType::Sent => "Sent",
            TransactionType::Received => "Received",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "sent" => Some(TransactionType::Sent),
            "received" => Some(TransactionType::Received),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw transaction value as it arrived: hex string, decimal string or JSON number.
///
/// Parsing is deferred so a malformed value never rejects the whole event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxValue(pub JsonValue);

impl TxValue {
    pub fn from_wei(value: U256) -> Self {
        Self(JsonValue::String(value.to_string()))
    }

    pub fn parse(&self) -> Option<U256> {
        match &self.0 {
            JsonValue::String(s) => parse_u256(s),
            JsonValue::Number(n) => {
                if let Some(u) = n.as_u64() {
                    return Some(U256::from(u));
                }
                // Large integers arrive as floats once they exceed u64.
                let f = n.as_f64()?;
                if f.is_finite() && f >= 0.0 && f.fract() == 0.0 {
                    U256::from_dec_str(&format!("{:.0}", f)).ok()
                } else {
                    None
                }
            }
            JsonValue::Null => Some(U256::zero()),
            _ => None,
        }
    }

    /// The value in smallest units; malformed input is treated as zero and logged.
    pub fn wei(&self) -> U256 {
        match self.parse() {
            Some(v) => v,
            None => {
                tracing::warn!(value = %self.0, "Malformed transaction value, formatting as zero");
                U256::zero()
            }
        }
    }
}

fn parse_u256(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some("") => Some(U256::zero()),
        Some(digits) => U256::from_str_radix(digits, 16).ok(),
        None => U256::from_dec_str(raw).ok(),
    }
}

/// Formats `value / 10^decimals` with exactly six decimal places, rounding half up.
pub fn format_amount(value: U256, decimals: u8) -> String {
    let display = DISPLAY_DECIMALS as usize;
    let scaled = if decimals as usize >= display {
        let divisor = U256::exp10(decimals as usize - display);
        let half = divisor / 2;
        match value.checked_add(half) {
            Some(v) => v / divisor,
            None => value / divisor,
        }
    } else {
        value.saturating_mul(U256::exp10(display - decimals as usize))
    };
    let unit = U256::exp10(display);
    let whole = scaled / unit;
    let frac = (scaled % unit).low_u64();
    format!("{}.{:0width$}", whole, frac, width = display)
}

/// A single observation of a transaction touching a watched address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEvent {
    pub hash: String,
    pub from: String,
    /// `None` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub value: TxValue,
    #[serde(default = "default_status")]
    pub status: TransactionStatus,
    #[serde(default, alias = "block_number", deserialize_with = "deserialize_block_number")]
    pub block_number: Option<u64>,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

fn default_status() -> TransactionStatus {
    TransactionStatus::Pending
}

impl TransactionEvent {
    pub fn wei(&self) -> U256 {
        self.value.wei()
    }

    pub fn amount(&self) -> String {
        format_amount(self.wei(), NATIVE_DECIMALS)
    }

    pub fn to_display(&self) -> &str {
        self.to.as_deref().unwrap_or("Contract Creation")
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }
}

fn deserialize_block_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match raw {
        Some(JsonValue::Number(n)) => n.as_u64(),
        Some(JsonValue::String(s)) => parse_u256(&s).filter(|v| *v <= U256::from(u64::MAX)).map(|v| v.low_u64()),
        _ => None,
    })
}

/// Accepts RFC 3339 strings, unix seconds, or unix milliseconds.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = JsonValue::deserialize(deserializer)?;
    match raw {
        JsonValue::String(s) => {
            if let Ok(dt) = DateTime::parse_from_rfc3339(&s) {
                return Ok(dt.with_timezone(&Utc));
            }
            s.parse::<i64>()
                .ok()
                .and_then(timestamp_from_unix)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", s)))
        }
        JsonValue::Number(n) => n
            .as_i64()
            .and_then(timestamp_from_unix)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", n))),
        JsonValue::Null => Ok(Utc::now()),
        other => Err(D::Error::custom(format!("invalid timestamp: {}", other))),
    }
}

fn timestamp_from_unix(v: i64) -> Option<DateTime<Utc>> {
    // Anything past 10^11 seconds is year 5138; treat it as milliseconds.
    if v.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(v).single()
    } else {
        Utc.timestamp_opt(v, 0).single()
    }
}
