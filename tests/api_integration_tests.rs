//! API Integration Tests
//!
//! Tests the HTTP API endpoints with a real database.
//!
//! Tests are serialized because they share a global test pool.
//!
//! Note: The `more-di` DI framework doesn't support injecting custom pools.
//! We work around this by using `DatabaseConnection::set_test_pool()` to set
//! a global pool that the DI-created DatabaseConnection will use.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
};
use chrono::{Duration, FixedOffset, TimeZone, Utc};
use di_axum::RouterServiceProviderExtensions;
use housing_balance_admin::config::AppConfig;
use housing_balance_admin::infrastructure::database::DatabaseConnection;
use housing_balance_admin::infrastructure::entities::{ChatStatus, DealStatus, Sender};
use housing_balance_admin::{api, services};
use serde_json::{Value, json};
use serial_test::serial;
use sqlx::SqlitePool;
use std::sync::atomic::{AtomicU32, Ordering};
use tower::ServiceExt;
use uuid::Uuid;

/// Counter for unique test database URIs
static TEST_DB_COUNTER: AtomicU32 = AtomicU32::new(0);

const BOUNDARY: &str = "dashboard-test-boundary";

/// Setup test database with migrations and returns pool
/// Uses in-memory SQLite for test isolation
async fn setup_test_db() -> SqlitePool {
    let db_num = TEST_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    // Use file URI format with shared cache - each test gets a unique DB
    let db_url = format!("sqlite:file:apidb{}?mode=memory&cache=shared", db_num);

    let pool = SqlitePool::connect(&db_url).await.unwrap();
    sqlx::migrate!().run(&pool).await.unwrap();

    // Set this pool as the global test pool so DI uses it
    DatabaseConnection::set_test_pool(pool.clone());

    pool
}

/// Clean up after test
fn cleanup_test_db() {
    DatabaseConnection::clear_test_pool();
}

/// Create test app - uses the global test pool set by setup_test_db()
fn create_test_app() -> axum::Router {
    create_test_app_with(AppConfig::default())
}

fn create_test_app_with(config: AppConfig) -> axum::Router {
    let provider = services(config).build_provider().unwrap();
    api::router().with_provider(provider)
}

async fn get(app: axum::Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_json(app: axum::Router, uri: &str, body: Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

async fn post_empty(app: axum::Router, uri: &str) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Multipart form; a field with a file name is sent as a file part.
async fn post_mailing_form(
    app: axum::Router,
    fields: &[(&str, Option<&str>, &str)],
) -> Response {
    let mut body = Vec::new();
    for (name, file_name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        let disposition = match file_name {
            Some(file_name) => format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: text/csv\r\n\r\n"
            ),
            None => format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/webhook/gb/mailing/config")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

/// Asserts a 400 with a JSON `detail` message
async fn assert_bad_request(response: Response) {
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()["content-type"],
        "application/json",
        "rejections answer in JSON"
    );
    assert!(json_body(response).await["detail"].is_string());
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Inserts a chat with two messages and returns its id
async fn insert_chat(pool: &SqlitePool, name: &str, phone: &str, minutes_ago: i64) -> Uuid {
    let chat_id = Uuid::new_v4();
    let last_message_at = Utc::now() - Duration::minutes(minutes_ago);
    let started_at = last_message_at - Duration::minutes(5);

    sqlx::query(
        "INSERT INTO chats (id, client_id, client_name, client_phone, search_key, status, started_at, last_message_at, total_interactions, total_tokens_used, dialog_cost) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 2, 140, 7.5)",
    )
    .bind(chat_id)
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(phone)
    .bind(format!("{name}\n{phone}").to_lowercase())
    .bind(ChatStatus::Active)
    .bind(started_at)
    .bind(last_message_at)
    .execute(pool)
    .await
    .unwrap();

    for (offset, sender, text) in [
        (0, Sender::Bot, "Добрый день!"),
        (1, Sender::Client, "Интересует рассрочка"),
    ] {
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender, text, created_at, tokens_used) VALUES (?, ?, ?, ?, ?, 70)",
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(sender)
        .bind(text)
        .bind(started_at + Duration::minutes(offset))
        .execute(pool)
        .await
        .unwrap();
    }

    chat_id
}

#[tokio::test]
#[serial]
async fn test_root_banner() {
    let _pool = setup_test_db().await;

    for uri in ["/api", "/api/"] {
        let response = get(create_test_app(), uri).await;
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["message"], "Жилищный баланс - Админ панель API");
    }

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_statistics_empty_window() {
    let _pool = setup_test_db().await;

    let response = get(
        create_test_app(),
        "/api/statistics?start_date=2025-08-01&end_date=2025-08-07",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["total_deals"], 0);
    assert_eq!(json["total_chats"], 0);
    assert_eq!(json["average_dialog_cost"], 0.0);
    assert_eq!(json["deals_by_day"].as_array().unwrap().len(), 0);
    assert_eq!(json["daily_costs"].as_array().unwrap().len(), 0);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_statistics_rejects_bad_dates() {
    let _pool = setup_test_db().await;

    let response = get(create_test_app(), "/api/statistics?start_date=not-a-date").await;
    assert_bad_request(response).await;

    let response = get(
        create_test_app(),
        "/api/statistics?start_date=2025-08-07&end_date=2025-08-01",
    )
    .await;
    assert_bad_request(response).await;

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_statistics_dates_follow_configured_offset() {
    let pool = setup_test_db().await;

    // 22:00 UTC on the 7th is already 01:00 on the 8th at +03:00
    let created_at = Utc.with_ymd_and_hms(2025, 8, 7, 22, 0, 0).unwrap();
    sqlx::query(
        "INSERT INTO deals (id, client_id, client_name, status, created_at, updated_at, estimated_cost) VALUES (?, ?, ?, ?, ?, ?, 150000.0)",
    )
    .bind(Uuid::new_v4())
    .bind(Uuid::new_v4())
    .bind("Мария Петрова")
    .bind(DealStatus::ConsultationScheduled)
    .bind(created_at)
    .bind(created_at)
    .execute(&pool)
    .await
    .unwrap();

    let config = AppConfig {
        utc_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
        ..AppConfig::default()
    };

    let response = get(
        create_test_app_with(config.clone()),
        "/api/statistics?start_date=2025-08-01&end_date=2025-08-07",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let first_week = json_body(response).await;
    assert_eq!(first_week["total_deals"], 0);
    assert!(first_week["deals_by_day"].as_array().unwrap().is_empty());

    let response = get(
        create_test_app_with(config),
        "/api/statistics?start_date=2025-08-08&end_date=2025-08-08",
    )
    .await;
    let next_day = json_body(response).await;
    assert_eq!(next_day["total_deals"], 1);
    assert_eq!(next_day["deals_by_day"][0]["date"], "2025-08-08");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_generate_test_data_feeds_statistics() {
    let _pool = setup_test_db().await;

    let response = post_empty(create_test_app(), "/api/generate-test-data").await;
    assert_eq!(response.status(), StatusCode::OK);
    let generated = json_body(response).await;
    assert_eq!(generated["message"], "Test data generated successfully");
    assert_eq!(generated["chats"], 50);
    let deals = generated["deals"].as_u64().unwrap();

    let response = get(
        create_test_app(),
        "/api/statistics?start_date=2000-01-01&end_date=2100-01-01",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(response).await;

    assert_eq!(stats["total_chats"], 50);
    assert_eq!(stats["total_deals"].as_u64().unwrap(), deals);

    let distribution = &stats["status_distribution"];
    let distributed = distribution["consultation_scheduled"].as_u64().unwrap()
        + distribution["individual_consultation_scheduled"].as_u64().unwrap()
        + distribution["no_response"].as_u64().unwrap();
    assert!(distributed <= deals);
    assert!(stats["average_dialog_cost"].as_f64().unwrap() >= 0.0);

    // regenerating replaces the data instead of adding to it
    let response = post_empty(create_test_app(), "/api/generate-test-data").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(create_test_app(), "/api/chats").await;
    assert_eq!(json_body(response).await["total"], 50);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_list_chats_pagination() {
    let _pool = setup_test_db().await;

    let response = post_empty(create_test_app(), "/api/generate-test-data").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = get(create_test_app(), "/api/chats").await;
    assert_eq!(response.status(), StatusCode::OK);
    let first = json_body(response).await;
    assert_eq!(first["total"], 50);
    assert_eq!(first["chats"].as_array().unwrap().len(), 20);

    let response = get(create_test_app(), "/api/chats?limit=20&offset=40").await;
    let last = json_body(response).await;
    assert_eq!(last["total"], 50);
    assert_eq!(last["chats"].as_array().unwrap().len(), 10);

    let response = get(create_test_app(), "/api/chats?limit=500").await;
    let clamped = json_body(response).await;
    assert_eq!(clamped["chats"].as_array().unwrap().len(), 50);

    let response = get(create_test_app(), "/api/chats?limit=0").await;
    let at_least_one = json_body(response).await;
    assert_eq!(at_least_one["chats"].as_array().unwrap().len(), 1);

    let response = get(create_test_app(), "/api/chats?offset=60").await;
    let past_end = json_body(response).await;
    assert_eq!(past_end["total"], 50);
    assert!(past_end["chats"].as_array().unwrap().is_empty());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_list_chats_search() {
    let pool = setup_test_db().await;

    insert_chat(&pool, "Мария Петрова", "+375291112233", 1).await;
    insert_chat(&pool, "Иван Петров", "+375294445566", 2).await;
    insert_chat(&pool, "Ольга Сидорова", "+375297778899", 3).await;

    // "ПЕТРОВ"
    let uri = "/api/chats?search=%D0%9F%D0%95%D0%A2%D0%A0%D0%9E%D0%92";
    let response = get(create_test_app(), uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    let by_name = json_body(response).await;
    assert_eq!(by_name["total"], 2);
    let names: Vec<&str> = by_name["chats"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["client_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Мария Петрова", "Иван Петров"]);

    let response = get(create_test_app(), "/api/chats?search=7778").await;
    let by_phone = json_body(response).await;
    assert_eq!(by_phone["total"], 1);
    assert_eq!(by_phone["chats"][0]["client_phone"], "+375297778899");

    let response = get(create_test_app(), "/api/chats?search=%20%20").await;
    assert_eq!(json_body(response).await["total"], 3);

    let response = get(create_test_app(), "/api/chats?limit=many").await;
    assert_bad_request(response).await;

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_chat_detail() {
    let pool = setup_test_db().await;
    let chat_id = insert_chat(&pool, "Мария Петрова", "+375291112233", 1).await;

    let response = get(create_test_app(), &format!("/api/chats/{chat_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = json_body(response).await;
    assert_eq!(json["id"], chat_id.to_string());
    assert_eq!(json["client_name"], "Мария Петрова");
    assert_eq!(json["status"], "active");

    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["sender"], "bot");
    assert_eq!(messages[0]["message"], "Добрый день!");
    assert_eq!(messages[1]["sender"], "client");
    assert_eq!(messages[1]["chat_id"], chat_id.to_string());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_chat_detail_not_found() {
    let _pool = setup_test_db().await;

    let response = get(create_test_app(), &format!("/api/chats/{}", Uuid::new_v4())).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["detail"], "Chat not found");

    for id in ["not-a-uuid", "abc"] {
        let response = get(create_test_app(), &format!("/api/chats/{id}")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["detail"], "Chat not found");
    }

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_schedule_defaults_and_round_trip() {
    let _pool = setup_test_db().await;

    let response = get(create_test_app(), "/webhook/gb/schedule").await;
    assert_eq!(response.status(), StatusCode::OK);
    let defaults = json_body(response).await;
    assert_eq!(defaults["scheduleEnabled"], false);
    assert_eq!(defaults["schedule"]["1"]["enabled"], true);
    assert_eq!(defaults["schedule"]["1"]["startTime"], "09:00");
    assert_eq!(defaults["schedule"]["0"]["enabled"], false);

    let response = post_json(
        create_test_app(),
        "/webhook/gb/schedule",
        json!({
            "scheduleEnabled": true,
            "schedule": {
                "0": { "enabled": true, "startTime": "10:00", "endTime": "14:30" },
                "3": { "enabled": false, "startTime": "09:00", "endTime": "18:00" }
            }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["schedule"].as_object().unwrap().len(), 7);

    let response = get(create_test_app(), "/webhook/gb/schedule").await;
    let stored = json_body(response).await;
    assert_eq!(stored, saved);
    assert_eq!(stored["scheduleEnabled"], true);
    assert_eq!(stored["schedule"]["0"]["enabled"], true);
    assert_eq!(stored["schedule"]["0"]["endTime"], "14:30");
    assert_eq!(stored["schedule"]["3"]["enabled"], false);
    // weekdays left out keep their defaults
    assert_eq!(stored["schedule"]["1"]["enabled"], true);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_schedule_rejects_invalid_windows() {
    let _pool = setup_test_db().await;

    let response = post_json(
        create_test_app(),
        "/webhook/gb/schedule",
        json!({
            "scheduleEnabled": true,
            "schedule": { "2": { "enabled": true, "startTime": "18:00", "endTime": "09:00" } }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        create_test_app(),
        "/webhook/gb/schedule",
        json!({
            "scheduleEnabled": true,
            "schedule": { "9": { "enabled": true, "startTime": "09:00", "endTime": "18:00" } }
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json(
        create_test_app(),
        "/webhook/gb/schedule",
        json!({
            "schedule": { "1": { "enabled": true, "startTime": "9am", "endTime": "18:00" } }
        }),
    )
    .await;
    assert_bad_request(response).await;

    // a key that is not a weekday number at all
    let response = post_json(
        create_test_app(),
        "/webhook/gb/schedule",
        json!({
            "scheduleEnabled": true,
            "schedule": { "300": { "enabled": true, "startTime": "09:00", "endTime": "18:00" } }
        }),
    )
    .await;
    assert_bad_request(response).await;

    // nothing was stored
    let response = get(create_test_app(), "/webhook/gb/schedule").await;
    assert_eq!(json_body(response).await["scheduleEnabled"], false);

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_mailing_round_trip() {
    let _pool = setup_test_db().await;

    let response = get(create_test_app(), "/webhook/gb/mailing/config").await;
    assert_eq!(response.status(), StatusCode::OK);
    let defaults = json_body(response).await;
    assert_eq!(defaults["mailingTime"], "09:00");
    assert_eq!(defaults["pauseBetweenClients"], 30);
    assert_eq!(defaults["mailingDays"]["monday"], false);
    assert!(defaults["fileName"].is_null());

    let response = post_mailing_form(
        create_test_app(),
        &[
            ("mailingTime", None, "14:45"),
            ("mailingDays", None, r#"{"monday":true,"wednesday":true}"#),
            ("pauseBetweenClients", None, "120"),
            ("contactsFile", Some("clients.csv"), "name,phone\nAnna,+375291112233\n"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = json_body(response).await;
    assert_eq!(saved["fileName"], "clients.csv");
    assert_eq!(saved["fileSize"], 30);

    let response = get(create_test_app(), "/webhook/gb/mailing/config").await;
    let stored = json_body(response).await;
    assert_eq!(stored, saved);
    assert_eq!(stored["mailingTime"], "14:45");
    assert_eq!(stored["pauseBetweenClients"], 120);
    assert_eq!(stored["mailingDays"]["monday"], true);
    assert_eq!(stored["mailingDays"]["wednesday"], true);
    assert_eq!(stored["mailingDays"]["friday"], false);

    // fields left out keep their stored values
    let response =
        post_mailing_form(create_test_app(), &[("pauseBetweenClients", None, "5")]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let partial = json_body(response).await;
    assert_eq!(partial["pauseBetweenClients"], 5);
    assert_eq!(partial["mailingTime"], "14:45");
    assert_eq!(partial["fileName"], "clients.csv");

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_mailing_rejects_invalid_fields() {
    let _pool = setup_test_db().await;

    for pause in ["0", "3601", "soon"] {
        let response =
            post_mailing_form(create_test_app(), &[("pauseBetweenClients", None, pause)]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["detail"].is_string());
    }

    let response = post_mailing_form(create_test_app(), &[("mailingTime", None, "25:99")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_mailing_form(create_test_app(), &[("mailingDays", None, "monday")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // day names are lower case; anything else is not silently dropped
    let response =
        post_mailing_form(create_test_app(), &[("mailingDays", None, r#"{"Monday":true}"#)]).await;
    assert_bad_request(response).await;

    let response = post_json(create_test_app(), "/webhook/gb/mailing/config", json!({})).await;
    assert_bad_request(response).await;

    let response =
        post_mailing_form(create_test_app(), &[("contactsFile", Some("empty.csv"), "")]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // nothing was stored
    let response = get(create_test_app(), "/webhook/gb/mailing/config").await;
    let stored = json_body(response).await;
    assert_eq!(stored["pauseBetweenClients"], 30);
    assert!(stored["fileName"].is_null());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_mailing_save_is_all_or_nothing() {
    let pool = setup_test_db().await;

    let response =
        post_mailing_form(create_test_app(), &[("pauseBetweenClients", None, "60")]).await;
    assert_eq!(response.status(), StatusCode::OK);

    sqlx::query(
        "CREATE TRIGGER reject_contacts BEFORE INSERT ON contact_files BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let response = post_mailing_form(
        create_test_app(),
        &[
            ("mailingTime", None, "20:15"),
            ("pauseBetweenClients", None, "600"),
            ("contactsFile", Some("clients.csv"), "name,phone\nAnna,+375291112233\n"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let response = get(create_test_app(), "/webhook/gb/mailing/config").await;
    let stored = json_body(response).await;
    assert_eq!(stored["pauseBetweenClients"], 60);
    assert_eq!(stored["mailingTime"], "09:00");
    assert!(stored["fileName"].is_null());

    cleanup_test_db();
}

#[tokio::test]
#[serial]
async fn test_bot_toggle() {
    let _pool = setup_test_db().await;

    let response = get(create_test_app(), "/webhook/gb/togglebot/status").await;
    assert_eq!(response.status(), StatusCode::OK);
    let status = json_body(response).await;
    assert_eq!(status["botEnabled"], true);
    assert_eq!(status["scheduleEnabled"], false);
    // without a schedule the switch alone decides
    assert_eq!(status["active"], true);
    assert!(status["weekday"].as_u64().unwrap() <= 6);
    assert_eq!(status["currentTime"].as_str().unwrap().len(), 5);

    let response = post_empty(create_test_app(), "/webhook/gb/togglebot/toggle").await;
    assert_eq!(response.status(), StatusCode::OK);
    let toggled = json_body(response).await;
    assert_eq!(toggled["botEnabled"], false);
    assert_eq!(toggled["active"], false);

    let response = get(create_test_app(), "/webhook/gb/togglebot/status").await;
    assert_eq!(json_body(response).await["botEnabled"], false);

    let response = post_empty(create_test_app(), "/webhook/gb/togglebot/toggle").await;
    assert_eq!(json_body(response).await["botEnabled"], true);

    cleanup_test_db();
}
