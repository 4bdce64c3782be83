//! Lookups and per-client report toggles over HTTP.

mod common;

use std::sync::Arc;

use serde_json::{json, Value};

use common::{spawn_app, FakeSigner, TestApp};

async fn report_type_ids(app: &TestApp, token: &str) -> Vec<i64> {
    let (status, body) = app.get("/lookup/report-type", Some(token)).await;
    assert_eq!(status, 200);
    body.as_array().unwrap().iter().map(|e| e["id"].as_i64().unwrap()).collect()
}

fn enabled_for(rows: &Value, lookup_id: i64) -> bool {
    rows.as_array().unwrap().iter()
        .find(|r| r["lookupId"].as_i64() == Some(lookup_id))
        .and_then(|r| r["enabled"].as_bool())
        .expect("lookup present")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn lookup_categories() {
    let app = spawn_app(Arc::new(FakeSigner::default())).await;
    let token = app.user_with("staff@example.com", &["STAFF"], &["H1"]).await;

    for category in ["classification", "category", "factor", "report-type"] {
        let (status, body) = app.get(&format!("/lookup/{}", category), Some(&token)).await;
        assert_eq!(status, 200, "{}", category);
        let entries = body.as_array().unwrap();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e["category"] == json!(category)));
    }

    let (status, body) = app.get("/lookup/colour", Some(&token)).await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], json!("unknown_lookup_category"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn toggle_on_then_off_is_reflected() {
    let app = spawn_app(Arc::new(FakeSigner::default())).await;
    let manager = app.user_with("mgr@example.com", &["MANAGER"], &["H1"]).await;
    let ids = report_type_ids(&app, &manager).await;
    let lookup = ids[0];

    let (status, rows) = app.get("/clientReport/get/1", Some(&manager)).await;
    assert_eq!(status, 200);
    assert_eq!(rows.as_array().unwrap().len(), ids.len());
    assert!(!enabled_for(&rows, lookup));

    for enabled in [true, true, false] {
        let (status, body) = app.post("/clientReport/toggle-report", Some(&manager), json!({
            "clientId": 1, "lookupId": lookup, "enabled": enabled,
        })).await;
        assert_eq!(status, 200);
        assert_eq!(body, json!({ "success": true, "enabled": enabled }));
        let (_, rows) = app.get("/clientReport/get/1", Some(&manager)).await;
        assert_eq!(enabled_for(&rows, lookup), enabled);
    }
    // other clients are untouched
    let (_, rows) = app.get("/clientReport/get/2", Some(&manager)).await;
    assert!(!enabled_for(&rows, lookup));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn toggle_requires_role_and_house() {
    let app = spawn_app(Arc::new(FakeSigner::default())).await;
    let staff = app.user_with("staff@example.com", &["STAFF"], &["H1"]).await;
    let manager = app.user_with("mgr@example.com", &["MANAGER"], &["H1"]).await;
    let lookup = report_type_ids(&app, &manager).await[0];

    let (status, body) = app.post("/clientReport/toggle-report", Some(&staff), json!({
        "clientId": 1, "lookupId": lookup, "enabled": true,
    })).await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], json!("insufficient_role"));

    // client 3 lives in H2
    let (status, body) = app.post("/clientReport/toggle-report", Some(&manager), json!({
        "clientId": 3, "lookupId": lookup, "enabled": true,
    })).await;
    assert_eq!(status, 403);
    assert_eq!(body["code"], json!("house_access_denied"));
    assert_eq!(app.get("/clientReport/get/3", Some(&staff)).await.0, 403);

    let admin = app.admin_token().await;
    assert_eq!(app.post("/clientReport/toggle-report", Some(&admin), json!({
        "clientId": 3, "lookupId": lookup, "enabled": true,
    })).await.0, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn toggle_rejects_unknown_client_and_non_report_lookup() {
    let app = spawn_app(Arc::new(FakeSigner::default())).await;
    let admin = app.admin_token().await;

    let (status, body) = app.get("/clientReport/get/99", Some(&admin)).await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], json!(false));

    let (_, factors) = app.get("/lookup/factor", Some(&admin)).await;
    let factor_id = factors[0]["id"].as_i64().unwrap();
    let (status, body) = app.post("/clientReport/toggle-report", Some(&admin), json!({
        "clientId": 1, "lookupId": factor_id, "enabled": true,
    })).await;
    assert_eq!(status, 400);
    assert_eq!(body["field"], json!("lookupId"));
}
