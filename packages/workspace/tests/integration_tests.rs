//! API tests against the in-memory and file-backed stores

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use contentdesk_common::{CollectionKind, FileSnapshotStorage, LeadKind};
use contentdesk_editor::{MemoryGateway, PersistenceGateway, SectionEndpoint, SectionRegistry, StatusNotifier};
use contentdesk_workspace::{router, AppState, ConsoleState, FileGateway};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn app_with(gateway: Arc<dyn PersistenceGateway>) -> Router {
    let console = ConsoleState::new(SectionRegistry::builtin(), gateway, StatusNotifier::new());
    console.load().await.unwrap();
    router(AppState::new(console))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_section_edit_flow() {
    let app = app_with(Arc::new(MemoryGateway::new())).await;

    let (status, draft) = send(&app, Method::POST, "/api/sections/dashboardStats/edit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draft["value"]["successRate"], json!("98%"));

    let (status, view) = send(&app, Method::GET, "/api/sections/dashboardStats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["phase"], json!("editing"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sections/dashboardStats/draft",
        Some(json!({"type": "setField", "path": "successRate", "value": "99%"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, saved) = send(&app, Method::POST, "/api/sections/dashboardStats/commit", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["value"]["successRate"], json!("99%"));
    assert_eq!(saved["version"], json!(1));

    let (_, message) = send(&app, Method::GET, "/api/status", None).await;
    assert_eq!(message["text"], json!("Dashboard stat updated successfully"));
    assert_eq!(message["kind"], json!("success"));
}

#[tokio::test]
async fn test_field_scoped_array_edit() {
    let app = app_with(Arc::new(MemoryGateway::new())).await;

    send(&app, Method::POST, "/api/sections/contactInfo/edit?field=phone", None).await;
    let (_, draft) = send(
        &app,
        Method::POST,
        "/api/sections/contactInfo/draft?field=phone",
        Some(json!({"type": "appendItem", "field": "", "element": "222"})),
    )
    .await;
    assert_eq!(draft["value"], json!(["", "222"]));

    let (status, saved) = send(&app, Method::POST, "/api/sections/contactInfo/commit?field=phone", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["value"]["phone"], json!(["", "222"]));
    assert_eq!(saved["value"]["email"], json!([""]));
}

#[tokio::test]
async fn test_error_statuses() {
    let app = app_with(Arc::new(MemoryGateway::new())).await;

    let (status, body) = send(&app, Method::POST, "/api/sections/pricing/edit", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("pricing"));

    let (status, _) = send(&app, Method::POST, "/api/sections/hero/commit", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, Method::POST, "/api/sections/hero/edit", None).await;
    send(
        &app,
        Method::POST,
        "/api/sections/hero/draft",
        Some(json!({"type": "setField", "path": "title", "value": "Hi"})),
    )
    .await;
    let (status, _) = send(&app, Method::POST, "/api/sections/hero/edit", None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/sections/hero/draft",
        Some(json!({"type": "appendItem", "field": "title", "element": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_store_failure_is_bad_gateway_and_keeps_draft() {
    let gateway = Arc::new(MemoryGateway::new());
    let app = app_with(gateway.clone()).await;

    send(&app, Method::POST, "/api/sections/about/edit", None).await;
    send(
        &app,
        Method::POST,
        "/api/sections/about/draft",
        Some(json!({"type": "setField", "path": "title", "value": "About us"})),
    )
    .await;

    gateway.fail_next(1);
    let (status, _) = send(&app, Method::POST, "/api/sections/about/commit", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (_, view) = send(&app, Method::GET, "/api/sections/about", None).await;
    assert_eq!(view["phase"], json!("failed"));
    assert_eq!(view["draft"]["value"]["title"], json!("About us"));
    assert_eq!(view["value"]["title"], json!(""));
}

#[tokio::test]
async fn test_collection_lifecycle() {
    let gateway = Arc::new(MemoryGateway::new());
    let app = app_with(gateway.clone()).await;

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/collections/testimonials",
        Some(json!({"name": "Asha", "approved": false, "featured": false})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["_id"].as_str().unwrap().to_string();

    let (_, record) = send(
        &app,
        Method::POST,
        &format!("/api/collections/testimonials/{}/flags", id),
        Some(json!({"approved": true})),
    )
    .await;
    assert_eq!(record["approved"], json!(true));
    assert_eq!(record["featured"], json!(false));

    let (_, record) = send(
        &app,
        Method::PATCH,
        &format!("/api/collections/testimonials/{}", id),
        Some(json!({"company": "Acme"})),
    )
    .await;
    assert_eq!(record["company"], json!("Acme"));

    let (_, requested) = send(
        &app,
        Method::POST,
        &format!("/api/collections/testimonials/{}/delete", id),
        None,
    )
    .await;
    let token = requested["token"].as_u64().unwrap();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/collections/testimonials/deletes/{}/abort", token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(gateway.list_entities(CollectionKind::Testimonials).await.unwrap().len(), 1);

    let (_, requested) = send(
        &app,
        Method::POST,
        &format!("/api/collections/testimonials/{}/delete", id),
        None,
    )
    .await;
    let token = requested["token"].as_u64().unwrap();
    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/collections/testimonials/deletes/{}/confirm", token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, entities) = send(&app, Method::GET, "/api/collections/testimonials", None).await;
    assert_eq!(entities, json!([]));
}

#[tokio::test]
async fn test_create_from_template() {
    let app = app_with(Arc::new(MemoryGateway::new())).await;

    send(
        &app,
        Method::POST,
        "/api/collections/services/template",
        Some(json!({"type": "setField", "path": "title", "value": "Forensics"})),
    )
    .await;
    let (status, created) = send(&app, Method::POST, "/api/collections/services", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], json!("Forensics"));
    assert_eq!(created["icon"], json!("Shield"));

    let (_, template) = send(&app, Method::GET, "/api/collections/services/template", None).await;
    assert_eq!(template["title"], json!(""));
}

#[tokio::test]
async fn test_leads_and_overview() {
    let gateway = Arc::new(MemoryGateway::new());
    let lead = gateway.seed_lead(LeadKind::JobApplications, json!({"name": "Dev", "status": "pending"}));
    gateway.seed_lead(LeadKind::Contacts, json!({"name": "A"}));
    let app = app_with(gateway).await;

    let (_, overview) = send(&app, Method::GET, "/api/overview", None).await;
    assert_eq!(
        overview,
        json!({"totalContacts": 1, "totalUsers": 0, "jobApplications": 1, "fraudCases": 0})
    );

    let (status, record) = send(
        &app,
        Method::PUT,
        &format!("/api/leads/jobApplications/{}/status", lead.id),
        Some(json!({"status": "reviewed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["status"], json!("reviewed"));

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/leads/jobApplications/application-99/status",
        Some(json!({"status": "reviewed"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store").join("contentdesk.store.json");

    {
        let gateway = Arc::new(FileGateway::open(Box::new(FileSnapshotStorage::new(&path))).unwrap());
        let app = app_with(gateway).await;
        send(&app, Method::POST, "/api/sections/hero/edit", None).await;
        send(
            &app,
            Method::POST,
            "/api/sections/hero/draft",
            Some(json!({"type": "setField", "path": "title", "value": "Stay safe online"})),
        )
        .await;
        let (status, _) = send(&app, Method::POST, "/api/sections/hero/commit", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let gateway = FileGateway::open(Box::new(FileSnapshotStorage::new(&path))).unwrap();
    let hero = gateway
        .read_section(&SectionEndpoint::WebsiteContent("hero".to_string()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hero.value["title"], json!("Stay safe online"));
    assert_eq!(hero.version, 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_commit_request_still_completes() {
    let gateway = Arc::new(MemoryGateway::new());
    let app = app_with(gateway.clone()).await;

    send(&app, Method::POST, "/api/sections/hero/edit", None).await;
    send(
        &app,
        Method::POST,
        "/api/sections/hero/draft",
        Some(json!({"type": "setField", "path": "title", "value": "Patient"})),
    )
    .await;

    gateway.set_latency(Some(Duration::from_millis(200)));
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        send(&app, Method::POST, "/api/sections/hero/commit", None),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(500)).await;
    gateway.set_latency(None);

    let (_, view) = send(&app, Method::GET, "/api/sections/hero", None).await;
    assert_eq!(view["phase"], json!("viewing"));
    assert_eq!(view["value"]["title"], json!("Patient"));
    assert_eq!(view["version"], json!(1));

    let (status, _) = send(&app, Method::POST, "/api/sections/hero/cancel", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test(start_paused = true)]
async fn test_slow_create_does_not_block_sections() {
    let gateway = Arc::new(MemoryGateway::new());
    let app = app_with(gateway.clone()).await;
    gateway.set_latency(Some(Duration::from_secs(1)));

    let creating = tokio::spawn({
        let app = app.clone();
        async move {
            send(
                &app,
                Method::POST,
                "/api/collections/testimonials",
                Some(json!({"name": "Asha"})),
            )
            .await
        }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let (status, _) = tokio::time::timeout(
        Duration::from_millis(500),
        send(&app, Method::POST, "/api/sections/about/edit", None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, _) = tokio::time::timeout(
        Duration::from_millis(500),
        send(&app, Method::GET, "/api/status", None),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::OK);

    let (status, record) = creating.await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["_id"], json!("testimonial-1"));
}
