//! End-to-end HTTP test: register a wallet, push transaction events, check deduplication.
//!
//! Runs the router in-process against the in-memory stores, so no database or SMTP server is needed.

use async_trait::async_trait;
use axum::extract::Query;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tranzantions::domain::{
    DedupKey, EmailAddress, LedgerError, NewNotification, NotificationLedger, NotificationRecord,
    Registration, RegistrationError, RegistrationStore, UserId, WalletAddress,
};
use tranzantions::infra::{ExplorerClient, MailError, Mailer, OutgoingEmail};
use tranzantions::{transport, EmailComposer, Notifier, Stores};

const ALICE_WALLET: &str = "0xAbC0000000000000000000000000000000000001";
const BOB_WALLET: &str = "0xbb00000000000000000000000000000000000002";
const STRANGER_WALLET: &str = "0xcc00000000000000000000000000000000000003";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    fn subjects(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|e| e.subject.clone()).collect()
    }

    fn alerts(&self) -> usize {
        self.subjects()
            .iter()
            .filter(|s| s.starts_with("Transaction Alert"))
            .count()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("connection refused".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Registration store whose backend is down.
struct UnreachableRegistrations;

#[async_trait]
impl RegistrationStore for UnreachableRegistrations {
    async fn register(
        &self,
        _email: EmailAddress,
        _wallet: WalletAddress,
    ) -> Result<Registration, RegistrationError> {
        Err(RegistrationError::StoreUnavailable("connection refused".to_string()))
    }

    async fn lookup_by_wallet(
        &self,
        _wallet: &WalletAddress,
    ) -> Result<Option<Registration>, RegistrationError> {
        Err(RegistrationError::StoreUnavailable("connection refused".to_string()))
    }

    async fn count(&self) -> Result<u64, RegistrationError> {
        Err(RegistrationError::StoreUnavailable("connection refused".to_string()))
    }
}

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    mailer: Arc<RecordingMailer>,
    handle: tokio::task::JoinHandle<()>,
}

/// Ledger whose backend is down.
struct UnreachableLedger;

fn ledger_down() -> LedgerError {
    LedgerError::StoreUnavailable("relation \"notification_history\" does not exist".to_string())
}

#[async_trait]
impl NotificationLedger for UnreachableLedger {
    async fn has_notified(&self, _key: &DedupKey) -> Result<bool, LedgerError> {
        Err(ledger_down())
    }

    async fn record_notification(
        &self,
        _entry: NewNotification,
    ) -> Result<NotificationRecord, LedgerError> {
        Err(ledger_down())
    }

    async fn history(
        &self,
        _user_id: &UserId,
        _limit: u32,
    ) -> Result<Vec<NotificationRecord>, LedgerError> {
        Err(ledger_down())
    }

    async fn ping(&self) -> Result<(), LedgerError> {
        Err(ledger_down())
    }
}

impl TestServer {
    async fn start(explorer_url: &str) -> Self {
        Self::start_with(Stores::in_memory(1000, 500), explorer_url).await
    }

    async fn start_with(stores: Stores, explorer_url: &str) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let notifier = Notifier::new(
            stores.registrations.clone(),
            stores.ledger.clone(),
            mailer.clone(),
            EmailComposer::new("https://sepolia.basescan.org/tx/"),
        );
        let explorer = ExplorerClient::new(explorer_url, Some("test-key".to_string())).unwrap();
        let app_state = transport::http::AppState {
            registrations: stores.registrations.clone(),
            ledger: stores.ledger.clone(),
            notifier: Arc::new(notifier),
            explorer: Arc::new(explorer),
            backend: stores.backend,
        };
        let router = transport::http::create_router(app_state);

        // Bind to an ephemeral port to avoid conflicts if an API server is already running.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
            mailer,
            handle,
        }
    }

    async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn register(&self, email: &str, wallet: &str) -> (u16, Value) {
        self.post("/api/register", json!({ "email": email, "walletAddress": wallet }))
            .await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn transaction(hash: &str, status: &str) -> Value {
    json!({
        "hash": hash,
        "from": ALICE_WALLET,
        "to": BOB_WALLET,
        "value": "0xde0b6b3a7640000",
        "status": status,
        "blockNumber": 1234,
        "timestamp": "2025-02-10T12:00:00Z"
    })
}

#[tokio::test]
async fn register_then_notify_once_per_status() {
    let server = TestServer::start("http://127.0.0.1:9").await;

    let (status, body) = server.register("Alice@Example.com", ALICE_WALLET).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["email"], json!("alice@example.com"));
    assert_eq!(
        body["data"]["walletAddress"],
        json!(ALICE_WALLET.to_ascii_lowercase())
    );
    assert_eq!(body["data"]["welcomeEmailSent"], json!(true));

    // Same wallet in a different case is still a duplicate.
    let (status, body) = server
        .register("other@example.com", &ALICE_WALLET.to_ascii_lowercase())
        .await;
    assert_eq!(status, 409, "{body}");
    let (status, _) = server.register("alice@example.com", BOB_WALLET).await;
    assert_eq!(status, 409);

    let notify = json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xaaa1", "pending") });
    let (status, body) = server.post("/api/notify", notify.clone()).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["outcome"], json!("notified"));
    assert_eq!(body["data"]["transactionType"], json!("sent"));

    let (status, body) = server.post("/api/notify", notify).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["outcome"], json!("already_notified"));
    assert_eq!(server.mailer.alerts(), 1);

    // A new status for the same transaction is a new notification.
    let confirmed = json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xaaa1", "confirmed") });
    let (status, body) = server.post("/api/notify", confirmed.clone()).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["outcome"], json!("notified"));
    let (_, body) = server.post("/api/notify", confirmed).await;
    assert_eq!(body["data"]["outcome"], json!("already_notified"));

    let subjects = server.mailer.subjects();
    assert_eq!(server.mailer.alerts(), 2);
    assert!(subjects.contains(&"Transaction Alert: Sent 1.000000 ETH (Pending)".to_string()));
    assert!(subjects.contains(&"Transaction Alert: Sent 1.000000 ETH (Confirmed)".to_string()));

    let (status, body) = server
        .get(&format!("/api/notifications/{}", ALICE_WALLET))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["count"], json!(2));
    let notifications = body["data"]["notifications"].as_array().unwrap();
    assert_eq!(notifications[0]["transaction_status"], json!("confirmed"));
    assert_eq!(notifications[1]["transaction_status"], json!("pending"));

    let (status, body) = server.get("/api/register").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["registeredUsers"], json!(1));
}

#[tokio::test]
async fn validation_and_unknown_wallets() {
    let server = TestServer::start("http://127.0.0.1:9").await;

    let (status, _) = server.register("not-an-email", ALICE_WALLET).await;
    assert_eq!(status, 400);
    let (status, _) = server.register("alice@example.com", "0x1234").await;
    assert_eq!(status, 400);
    let (status, _) = server
        .post("/api/register", json!({ "walletAddress": ALICE_WALLET }))
        .await;
    assert_eq!(status, 400);

    let (status, body) = server
        .post(
            "/api/notify",
            json!({ "walletAddress": STRANGER_WALLET, "transaction": transaction("0xbbb1", "pending") }),
        )
        .await;
    assert_eq!(status, 404, "{body}");

    let (status, _) = server
        .post("/api/notify", json!({ "walletAddress": STRANGER_WALLET }))
        .await;
    assert_eq!(status, 400);

    let (status, _) = server
        .get(&format!("/api/notifications/{}", STRANGER_WALLET))
        .await;
    assert_eq!(status, 404);

    let (status, _) = server.get("/api/notifications/nope").await;
    assert_eq!(status, 400);

    assert!(server.mailer.subjects().is_empty());
}

#[tokio::test]
async fn webhook_notifies_registered_participants() {
    let server = TestServer::start("http://127.0.0.1:9").await;
    server.register("bob@example.com", BOB_WALLET).await;

    let payload = json!({
        "webhookId": "wh_1",
        "type": "ADDRESS_ACTIVITY",
        "event": {
            "network": "BASE_SEPOLIA",
            "activity": [{
                "hash": "0xccc1",
                "fromAddress": STRANGER_WALLET,
                "toAddress": BOB_WALLET,
                "blockNum": "0x10",
                "value": 0.5,
                "asset": "ETH",
                "rawContract": { "rawValue": "0x6f05b59d3b20000", "decimals": 18 }
            }]
        }
    });

    let (status, body) = server.post("/api/webhook", payload.clone()).await;
    assert_eq!(status, 200, "{body}");
    let results = body["data"]["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["outcome"], json!("not_registered"));
    assert_eq!(results[1]["outcome"], json!("notified"));
    assert_eq!(results[1]["transactionType"], json!("received"));

    // Providers retry deliveries; the second one must not produce another email.
    let (status, body) = server.post("/api/webhook", payload).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["results"][1]["outcome"], json!("already_notified"));

    assert_eq!(
        server.mailer.subjects().last().unwrap(),
        "Transaction Alert: Received 0.500000 ETH (Confirmed)"
    );
    assert_eq!(server.mailer.alerts(), 1);

    let (status, _) = server.post("/api/webhook", json!({ "event": {} })).await;
    assert_eq!(status, 400);
    let (status, _) = server
        .post("/api/webhook", json!({ "event": { "activity": { "hash": "0x1" } } }))
        .await;
    assert_eq!(status, 400);
}

async fn mock_explorer(
    axum::extract::Path(address): axum::extract::Path<String>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    Json(json!({
        "items": [{ "hash": "0xddd1", "address": address }],
        "apiKey": headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        "filter": params.get("filter"),
        "start_timestamp": params.get("start_timestamp"),
    }))
}

#[tokio::test]
async fn explorer_proxy_forwards_query_and_key() {
    let mock = Router::new()
        .route("/addresses/:address/transactions", get(mock_explorer))
        .route("/broken/addresses/:address/transactions", get(|| async { "not json" }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mock_port = listener.local_addr().unwrap().port();
    let mock_handle = tokio::spawn(async move {
        axum::serve(listener, mock).await.unwrap();
    });

    let server = TestServer::start(&format!("http://127.0.0.1:{}/", mock_port)).await;
    let (status, body) = server
        .get(&format!(
            "/api/blockscout/transactions?address={}&start_timestamp=2025-02-10T00:00:00Z",
            ALICE_WALLET
        ))
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["items"][0]["hash"], json!("0xddd1"));
    assert_eq!(
        body["items"][0]["address"],
        json!(ALICE_WALLET.to_ascii_lowercase())
    );
    assert_eq!(body["apiKey"], json!("test-key"));
    assert_eq!(body["filter"], json!("all"));
    assert_eq!(body["start_timestamp"], json!("2025-02-10T00:00:00Z"));

    let (status, _) = server.get("/api/blockscout/transactions").await;
    assert_eq!(status, 400);

    // Non-JSON upstream body still yields an `items` array.
    let broken = TestServer::start(&format!("http://127.0.0.1:{}/broken", mock_port)).await;
    let (status, body) = broken
        .get(&format!("/api/blockscout/transactions?address={}", ALICE_WALLET))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["items"], json!([]));

    // Unreachable upstream.
    let down = TestServer::start("http://127.0.0.1:9").await;
    let (status, body) = down
        .get(&format!("/api/blockscout/transactions?address={}", ALICE_WALLET))
        .await;
    assert_eq!(status, 500);
    assert_eq!(body["items"], json!([]));
    assert!(body["error"].is_string());

    mock_handle.abort();
}

#[tokio::test]
async fn health_reports_store() {
    let server = TestServer::start("http://127.0.0.1:9").await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["store"], json!("memory"));
}

#[tokio::test]
async fn unreachable_store_is_503_not_404() {
    let mut stores = Stores::in_memory(1000, 500);
    stores.registrations = Arc::new(UnreachableRegistrations);
    let server = TestServer::start_with(stores, "http://127.0.0.1:9").await;

    let (status, body) = server
        .post(
            "/api/notify",
            json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xeee1", "pending") }),
        )
        .await;
    assert_eq!(status, 503, "{body}");
    assert_eq!(body["success"], json!(false));

    let (status, _) = server.register("alice@example.com", ALICE_WALLET).await;
    assert_eq!(status, 503);

    let (status, body) = server.get("/health").await;
    assert_eq!(status, 503);
    assert_eq!(body["data"]["status"], json!("unhealthy"));

    let (status, _) = server.get("/api/register").await;
    assert_eq!(status, 503);

    assert!(server.mailer.subjects().is_empty());
}

#[tokio::test]
async fn failed_delivery_is_500_and_not_retried() {
    let server = TestServer::start("http://127.0.0.1:9").await;
    server.register("alice@example.com", ALICE_WALLET).await;
    server.mailer.fail.store(true, Ordering::SeqCst);

    let notify = json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xfff1", "pending") });
    let (status, body) = server.post("/api/notify", notify.clone()).await;
    assert_eq!(status, 500, "{body}");
    assert_eq!(body["data"]["outcome"], json!("delivery_failed"));
    assert_eq!(body["data"]["record"]["email_status"], json!("failed"));

    let webhook = json!({
        "event": { "activity": {
            "hash": "0xfff2",
            "fromAddress": ALICE_WALLET,
            "toAddress": STRANGER_WALLET,
            "value": 1
        } }
    });
    let (status, body) = server.post("/api/webhook", webhook).await;
    assert_eq!(status, 500, "{body}");
    assert_eq!(body["data"]["results"][0]["outcome"], json!("delivery_failed"));

    // The failure is recorded, so the same status is not attempted again.
    server.mailer.fail.store(false, Ordering::SeqCst);
    let (status, body) = server.post("/api/notify", notify).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["data"]["outcome"], json!("already_notified"));
    assert_eq!(server.mailer.alerts(), 0);
}

#[tokio::test]
async fn hash_case_does_not_defeat_deduplication() {
    let server = TestServer::start("http://127.0.0.1:9").await;
    server.register("alice@example.com", ALICE_WALLET).await;

    let upper = json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xABCDEF12", "confirmed") });
    let lower = json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0xabcdef12", "confirmed") });
    let (_, body) = server.post("/api/notify", upper).await;
    assert_eq!(body["data"]["outcome"], json!("notified"));
    let (_, body) = server.post("/api/notify", lower).await;
    assert_eq!(body["data"]["outcome"], json!("already_notified"));
    assert_eq!(server.mailer.alerts(), 1);
}

#[tokio::test]
async fn unreachable_ledger_fails_health_and_notify() {
    let mut stores = Stores::in_memory(1000, 500);
    stores.ledger = Arc::new(UnreachableLedger);
    let server = TestServer::start_with(stores, "http://127.0.0.1:9").await;
    server.register("alice@example.com", ALICE_WALLET).await;

    let (status, body) = server.get("/health").await;
    assert_eq!(status, 503, "{body}");

    let (status, _) = server
        .post(
            "/api/notify",
            json!({ "walletAddress": ALICE_WALLET, "transaction": transaction("0x1111", "pending") }),
        )
        .await;
    assert_eq!(status, 503);
    assert_eq!(server.mailer.alerts(), 0);

    let (status, _) = server
        .get(&format!("/api/notifications/{}", ALICE_WALLET))
        .await;
    assert_eq!(status, 503);
}
