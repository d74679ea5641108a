use crate::app::Notifier;
use crate::domain::{NotificationLedger, RegistrationStore, TxValue};
use crate::infra::config::StoreBackend;
use crate::infra::ExplorerClient;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

#[derive(Clone)]
pub struct AppState {
    pub registrations: Arc<dyn RegistrationStore>,
    pub ledger: Arc<dyn NotificationLedger>,
    pub notifier: Arc<Notifier>,
    pub explorer: Arc<ExplorerClient>,
    pub backend: StoreBackend,
}

#[derive(Serialize, Debug, ToSchema)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub data: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiResponse {
    pub fn ok(message: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data,
            error: None,
        }
    }

    pub fn err(error: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            success: false,
            message: None,
            data,
            error: Some(error.into()),
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    /// `0x` followed by 40 hex digits, any case.
    #[serde(default, alias = "wallet_address")]
    pub wallet_address: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    #[serde(default, alias = "wallet_address")]
    pub wallet_address: Option<String>,
    /// `{hash, from, to, value, status, blockNumber, timestamp}`; `value` may be a hex string,
    /// a decimal string or a number.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub transaction: Option<JsonValue>,
}

/// Address-activity webhook (Alchemy style).
#[derive(Deserialize, Debug, ToSchema)]
pub struct WebhookRequest {
    #[serde(default)]
    pub event: Option<WebhookEvent>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct WebhookEvent {
    /// A single activity object or an array of them.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub activity: Option<OneOrMany<WebhookActivity>>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(v) => v,
        }
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WebhookActivity {
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub from_address: Option<String>,
    #[serde(default)]
    pub to_address: Option<String>,
    /// Hex block number, e.g. `0x10`.
    #[serde(default)]
    pub block_num: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub value: TxValue,
    #[serde(default)]
    pub raw_contract: Option<RawContract>,
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    /// Exact amount in smallest units, hex encoded.
    #[serde(default)]
    pub raw_value: Option<String>,
}

pub fn json_422(err: JsonRejection, expected: &str) -> (StatusCode, Json<ApiResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::err(
            format!("Invalid JSON body: {} (expected: {})", err, expected),
            None,
        )),
    )
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionsQuery {
    /// Wallet address whose transactions are listed.
    pub address: Option<String>,
    /// Only transactions after this instant (passed through to the explorer).
    pub start_timestamp: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Maximum number of records, newest first. Defaults to 50.
    pub limit: Option<u32>,
}
