//! Client for the chain-indexing HTTP API (Blockscout v2).

use crate::domain::WalletAddress;
use crate::infra::config;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ExplorerError {
    #[error("Explorer API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Explorer API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
}

#[derive(Clone)]
pub struct ExplorerClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExplorerClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = config::explorer_api_key();
        if api_key.is_none() {
            warn!("EXPLORER_API_KEY is not set; explorer requests will be rate limited");
        }
        Self::new(config::explorer_api_url(), api_key)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Transactions touching `address`, optionally only those after `start_timestamp`.
    ///
    /// The returned document always carries an `items` array.
    pub async fn address_transactions(
        &self,
        address: &WalletAddress,
        start_timestamp: Option<&str>,
    ) -> Result<JsonValue, ExplorerError> {
        let url = format!("{}/addresses/{}/transactions", self.base_url, address);
        let mut query: Vec<(&str, &str)> = vec![("filter", "all")];
        if let Some(ts) = start_timestamp {
            query.push(("start_timestamp", ts));
        }

        let mut request = self.http.get(&url).query(&query);
        if let Some(key) = &self.api_key {
            request = request.header("X-API-Key", key);
        }

        debug!(%url, ?start_timestamp, "Fetching address transactions");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplorerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let data = match serde_json::from_slice::<JsonValue>(&body) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Explorer returned a non-JSON body");
                JsonValue::Null
            }
        };
        Ok(ensure_items(data))
    }

    /// Reachability probe used by `preflight`.
    pub async fn check(&self) -> Result<(), ExplorerError> {
        let url = format!("{}/stats", self.base_url);
        let response = self.http.get(&url).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(ExplorerError::Status {
                status: response.status().as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

/// Guarantees an `items` array, replacing anything malformed with an empty one.
pub fn ensure_items(data: JsonValue) -> JsonValue {
    match data {
        JsonValue::Object(mut map) => {
            if !map.get("items").is_some_and(JsonValue::is_array) {
                map.insert("items".to_string(), JsonValue::Array(Vec::new()));
            }
            JsonValue::Object(map)
        }
        _ => serde_json::json!({ "items": [] }),
    }
}
