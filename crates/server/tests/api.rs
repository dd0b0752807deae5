use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use http_body_util::BodyExt;
use migration::MigratorTrait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use serde_json::{Value, json};
use tower::ServiceExt;

use receipts::{Extractor, GenerativeService, InlineImage, ModelInfo, ServiceError};
use server::{AbuseGuard, Conclusion, RateLimitError, RateLimiter, ServerState, router};

const BOUNDARY: &str = "receipt-boundary";

async fn database() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob"] {
        let now = Utc::now();
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password, created_at, updated_at) VALUES (?, ?, ?, ?)",
            vec![
                username.into(),
                "password".into(),
                now.into(),
                now.into(),
            ],
        ))
        .await
        .unwrap();
    }
    db
}

async fn state() -> ServerState {
    let db = database().await;
    let engine = engine::Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    ServerState::new(engine, db)
}

fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

fn json_request(method: &str, uri: &str, user: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, basic(user, "password"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get_request(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, basic(user, "password"))
        .body(Body::empty())
        .unwrap()
}

fn scan_request(user: &str, field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"r.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/receipts/scan")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, basic(user, "password"))
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    (status, body)
}

async fn create_account(app: &Router, user: &str, balance: f64) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/accounts",
            Some(user),
            json!({"name": "Main", "kind": "CURRENT", "balance": balance}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn create_transaction(app: &Router, user: &str, account_id: &str, kind: &str, amount: f64) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/transactions",
            Some(user),
            json!({
                "account_id": account_id,
                "kind": kind,
                "amount": amount,
                "category": "Groceries",
                "date": "2024-01-15T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn anonymous_mutation_is_rejected_with_envelope() {
    let app = router(state().await);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/accounts",
            None,
            json!({"name": "Main", "kind": "CURRENT"}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["kind"], "not_authenticated");
}

#[tokio::test]
async fn wrong_password_is_anonymous() {
    let app = router(state().await);
    let request = Request::builder()
        .uri("/accounts")
        .header(header::AUTHORIZATION, basic("alice", "nope"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "not_authenticated");
}

#[tokio::test]
async fn transactions_move_the_balance() {
    let app = router(state().await);
    let account_id = create_account(&app, "alice", 100.0).await;
    let tx_id = create_transaction(&app, "alice", &account_id, "EXPENSE", 50.0).await;

    let (status, body) = send(&app, get_request(&format!("/accounts/{account_id}"), "alice")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["account"]["balance"], json!(50.0));
    assert_eq!(body["data"]["transactions"][0]["amount"], json!(50.0));

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/transactions/{tx_id}"),
            Some("alice"),
            json!({
                "account_id": account_id,
                "kind": "INCOME",
                "amount": 30,
                "category": "Salary",
                "date": "2024-01-16T00:00:00Z"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["kind"], "INCOME");

    let (_, body) = send(&app, get_request(&format!("/accounts/{account_id}"), "alice")).await;
    assert_eq!(body["data"]["account"]["balance"], json!(130.0));
}

#[tokio::test]
async fn recurring_transaction_exposes_next_date() {
    let app = router(state().await);
    let account_id = create_account(&app, "alice", 0.0).await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/transactions",
            Some("alice"),
            json!({
                "account_id": account_id,
                "kind": "EXPENSE",
                "amount": 9.99,
                "category": "Entertainment",
                "date": "2024-01-31T10:00:00Z",
                "is_recurring": true,
                "recurring_interval": "MONTHLY"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["next_recurring_date"], "2024-02-29T10:00:00Z");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/recurring/process",
            Some("alice"),
            json!({"now": "2024-03-01T00:00:00Z"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["templates"], 1);
    assert_eq!(body["data"]["created"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn recurring_without_interval_is_a_validation_error() {
    let app = router(state().await);
    let account_id = create_account(&app, "alice", 0.0).await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/transactions",
            Some("alice"),
            json!({
                "account_id": account_id,
                "kind": "EXPENSE",
                "amount": 1,
                "category": "Other",
                "date": "2024-01-31T10:00:00Z",
                "is_recurring": true
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn bulk_delete_with_foreign_id_is_partial_ownership() {
    let app = router(state().await);
    let mine = create_account(&app, "alice", 100.0).await;
    let theirs = create_account(&app, "bob", 100.0).await;
    let a = create_transaction(&app, "alice", &mine, "EXPENSE", 10.0).await;
    let b = create_transaction(&app, "bob", &theirs, "EXPENSE", 10.0).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/transactions/bulk-delete",
            Some("alice"),
            json!({"ids": [a, b]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "partial_ownership");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/transactions/bulk-delete",
            Some("alice"),
            json!({"ids": [a]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], 1);

    let (_, body) = send(&app, get_request(&format!("/accounts/{mine}"), "alice")).await;
    assert_eq!(body["data"]["account"]["balance"], json!(100.0));
}

#[tokio::test]
async fn foreign_transaction_is_not_found() {
    let app = router(state().await);
    let theirs = create_account(&app, "bob", 100.0).await;
    let tx = create_transaction(&app, "bob", &theirs, "EXPENSE", 10.0).await;

    let (status, body) = send(&app, get_request(&format!("/transactions/{tx}"), "alice")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(&app, get_request("/transactions/not-a-uuid", "alice")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn default_account_moves() {
    let app = router(state().await);
    let first = create_account(&app, "alice", 0.0).await;
    let second = create_account(&app, "alice", 0.0).await;

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/accounts/{second}/default"),
            Some("alice"),
            json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = send(&app, get_request("/accounts", "alice")).await;
    let accounts = body["data"].as_array().unwrap();
    let defaults: Vec<&str> = accounts
        .iter()
        .filter(|a| a["is_default"] == true)
        .map(|a| a["id"].as_str().unwrap())
        .collect();
    assert_eq!(defaults, vec![second.as_str()]);
    assert!(accounts.iter().any(|a| a["id"] == first.as_str()));
}

#[tokio::test]
async fn user_sync_updates_profile() {
    let app = router(state().await);
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/user/sync",
            Some("alice"),
            json!({"name": "Alice", "email": "alice@example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["name"], "Alice");

    let (_, body) = send(&app, get_request("/user", "alice")).await;
    assert_eq!(body["data"]["email"], "alice@example.com");
}

struct Deny;

#[async_trait]
impl RateLimiter for Deny {
    async fn decide(&self, _: &str, _: u32) -> Result<Conclusion, RateLimitError> {
        Ok(Conclusion::Deny)
    }
}

#[tokio::test]
async fn denied_caller_is_rate_limited() {
    let app = router(state().await.guard(AbuseGuard::new().limiter(Arc::new(Deny))));
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/accounts",
            Some("alice"),
            json!({"name": "Main", "kind": "CURRENT"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["kind"], "rate_limited");

    // reads skip the limiter
    let (status, _) = send(&app, get_request("/accounts", "alice")).await;
    assert_eq!(status, StatusCode::OK);
}

/// Model service where only `working` answers.
struct FakeModels {
    working: Option<&'static str>,
}

#[async_trait]
impl GenerativeService for FakeModels {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ServiceError> {
        Ok(vec![ModelInfo::new("gemini-pro-vision")])
    }

    async fn generate(
        &self,
        model: &str,
        _prompt: &str,
        image: &InlineImage,
    ) -> Result<String, ServiceError> {
        assert_eq!(image.mime_type, "image/png");
        if self.working == Some(model) {
            Ok("```json\n{\"amount\": 45.67, \"date\": \"2023-10-15T00:00:00.000Z\", \"merchantName\": \"Safeway\", \"category\": \"Groceries\"}\n```".to_string())
        } else {
            Err(ServiceError::Status {
                status: 429,
                message: "quota exceeded".to_string(),
            })
        }
    }
}

fn extractor(working: Option<&'static str>) -> Extractor {
    Extractor::new(Arc::new(FakeModels { working }))
}

#[tokio::test]
async fn scan_returns_camel_case_draft() {
    let app = router(state().await.extractor(extractor(Some("gemini-pro-vision"))));
    let (status, body) = send(&app, scan_request("alice", "file", b"\x89PNG")).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["amount"], json!(45.67));
    assert_eq!(body["data"]["merchantName"], "Safeway");
    assert_eq!(body["data"]["description"], "Safeway");
    assert_eq!(body["data"]["category"], "Groceries");
    assert_eq!(body["data"]["date"], "2023-10-15T00:00:00Z");
}

#[tokio::test]
async fn scan_reports_exhausted_models() {
    let app = router(state().await.extractor(extractor(None)));
    let (status, body) = send(&app, scan_request("alice", "file", b"\x89PNG")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "external_service_unavailable");
    assert!(
        body["error"]
            .as_str()
            .unwrap()
            .contains("gemini-pro-vision")
    );
}

#[tokio::test]
async fn scan_without_file_field_is_rejected() {
    let app = router(state().await.extractor(extractor(Some("gemini-1.5-flash"))));
    let (status, body) = send(&app, scan_request("alice", "image", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn scan_over_the_limit_is_rejected() {
    let app = router(
        state()
            .await
            .extractor(extractor(Some("gemini-1.5-flash")))
            .upload_limit(64),
    );
    let (status, body) = send(&app, scan_request("alice", "file", &[0u8; 1024])).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["kind"], "validation_error");
}

#[tokio::test]
async fn scan_without_model_service_is_unavailable() {
    let app = router(state().await);
    let (status, body) = send(&app, scan_request("alice", "file", b"\x89PNG")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "AI service is not configured.");
}
