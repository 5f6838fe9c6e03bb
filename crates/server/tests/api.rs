use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use http_body_util::BodyExt;
use sea_orm::Database;
use serde_json::{Value, json};
use tower::ServiceExt;

use engine::Engine;
use migration::MigratorTrait;
use server::{ServerState, router};

async fn app() -> Router {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    router(ServerState {
        engine: Arc::new(engine),
    })
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn new_account(app: &Router, name: &str, kind: &str, baseline_minor: i64) -> String {
    let (status, body) = send(
        app,
        Method::POST,
        "/accounts",
        Some(json!({"name": name, "kind": kind, "baseline_minor": baseline_minor})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn ledger_shows_running_balances() {
    let app = app().await;
    let account = new_account(&app, "Asha", "cash", 100_000).await;

    for (kind, amount, date) in [("income", 50_000, "2024-04-01"), ("expense", 20_000, "2024-04-02")] {
        let (status, body) = send(
            &app,
            Method::POST,
            "/transactions",
            Some(json!({"account_id": account, "kind": kind, "amount_minor": amount, "date": date})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["propagation"]["status"], json!("skipped"));
    }

    let (status, body) = send(&app, Method::GET, &format!("/accounts/{account}/ledger"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_balance_minor"], json!(130_000));
    assert_eq!(body["rows"][0]["running_balance_minor"], json!(150_000));
    assert_eq!(body["rows"][1]["effect"], json!("decrease"));
    assert_eq!(body["account"]["baseline_minor"], json!(100_000));
}

#[tokio::test]
async fn payment_updates_the_linked_record() {
    let app = app().await;
    let account = new_account(&app, "HDFC", "bank", 0).await;
    let (status, record) = send(
        &app,
        Method::POST,
        "/records",
        Some(json!({
            "module": "targets",
            "name": "Car",
            "principal_minor": 1_000_000,
            "notes": {"totalPaid": 2000}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let record_id = record["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        Some(json!({
            "account_id": account,
            "kind": "debit",
            "amount_minor": 30_000,
            "date": "2024-04-05",
            "merchant": "Maruti",
            "paying_for": {"module": "targets", "referenceId": record_id}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["propagation"]["status"], json!("applied"));
    assert_eq!(body["propagation"]["record_id"], json!(record_id));

    let (status, record) = send(&app, Method::GET, &format!("/records/{record_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["notes"]["totalPaid"], json!(2300));
    assert_eq!(record["notes"]["remaining"], json!(7700));
    assert_eq!(record["notes"]["payments"][0]["source"], json!("Maruti"));
    assert_eq!(record["version"], json!(1));
}

#[tokio::test]
async fn failed_propagation_still_saves_the_transaction() {
    let app = app().await;
    let account = new_account(&app, "Asha", "cash", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        Some(json!({
            "account_id": account,
            "kind": "expense",
            "amount_minor": 500,
            "date": "2024-04-05",
            "paying_for": {"module": "loan-ledger", "referenceId": "8b0f9a5e-3f55-4e0c-9d43-2c57f4d0a001"}
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["propagation"]["status"], json!("failed"));
    assert!(
        body["propagation"]["warning"]
            .as_str()
            .unwrap()
            .starts_with("transaction saved; linked-record update failed")
    );

    let id = body["id"].as_str().unwrap();
    let (status, tx) = send(&app, Method::GET, &format!("/transactions/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["amount_minor"], json!(500));
}

#[tokio::test]
async fn stale_record_edit_is_a_conflict() {
    let app = app().await;
    let (_, record) = send(
        &app,
        Method::POST,
        "/records",
        Some(json!({"module": "loan-ledger", "name": "Home", "principal_minor": 500_000})),
    )
    .await;
    let uri = format!("/records/{}", record["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PATCH, &uri, Some(json!({"version": 0, "name": "Home loan"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], json!(1));

    let (status, _) = send(&app, Method::PATCH, &uri, Some(json!({"version": 0, "name": "Flat"}))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = app().await;
    let account = new_account(&app, "Asha", "cash", 0).await;

    let (status, _) = send(&app, Method::GET, "/accounts/8b0f9a5e-3f55-4e0c-9d43-2c57f4d0a001", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/accounts",
        Some(json!({"name": "asha", "kind": "cash"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::POST,
        "/transactions",
        Some(json!({"account_id": account, "kind": "income", "amount_minor": 0, "date": "2024-04-05"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("amount must be > 0"));

    let (status, _) = send(&app, Method::PATCH, &format!("/accounts/{account}"), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preview_reconciles_loose_rows() {
    let app = app().await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/ledger/preview",
        Some(json!({
            "kind": "bank",
            "baseline_minor": 10_000,
            "rows": [
                {"type": "Credit", "amount": "1,000"},
                {"type": "income", "amount": 50},
                {"type": "debit", "amount": "oops"},
                {"type": "debit", "amount": 250.5}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["running_balance_minor"], json!([110_000, 110_000, 110_000, 84_950]));
    assert_eq!(body["current_balance_minor"], json!(84_950));
}

#[tokio::test]
async fn import_counts_skipped_rows() {
    let app = app().await;
    let account = new_account(&app, "Asha", "cash", 0).await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/accounts/{account}/import"),
        Some(json!({"rows": [
            {"Date": "01/04/24", "Type": "income", "Amount": "2,500"},
            {"Date": 45383, "Amount": 0},
            {"date": "02/04/2024", "amount": 100, "Sub Category": "tea"}
        ]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"imported": 2, "skipped": 1}));

    let (_, ledger) = send(&app, Method::GET, &format!("/accounts/{account}/ledger"), None).await;
    assert_eq!(ledger["current_balance_minor"], json!(240_000));
    assert_eq!(ledger["rows"][1]["transaction"]["sub_category"], json!("tea"));
}
