//! Unit tests for the RPC handler: every JSON-RPC method dispatched by `handle_method`.
//!
//! These go through the same code path as the `research-assistant-rpc`
//! binary, with the query endpoint mocked and history kept in a temp directory.

use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use research_assistant::app::App;
use research_assistant::rpc_handler::handle_method;
use research_assistant::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use research_assistant::types::settings::{AppConfig, LocalStore};

const BODY: &str = "Searching...\n{\"query\":\"neural networks\",\"total_results\":1,\"articles\":[{\"title\":\"Deep Residual Learning\",\"url\":\"https://arxiv.org/abs/1512.03385\",\"snippet\":\"Residual nets.\"}]}\n";

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(BODY))
        .mount(&server)
        .await;
    server
}

fn config(server: &MockServer, tmp: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.backend.url = server.uri();
    config.export.output_dir = tmp.path().join("exports").to_string_lossy().to_string();
    config.history.local_store = LocalStore::Sqlite(tmp.path().join("history.db").to_string_lossy().to_string());
    config
}

async fn setup() -> (App, MockServer, TempDir) {
    let server = backend().await;
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let app = App::new(config(&server, &tmp)).expect("Failed to init App");
    (app, server, tmp)
}

async fn call(app: &App, method: &str, params: Value) -> Result<Value, String> {
    handle_method(app, method, &params).await
}

// ─── Misc ───

#[tokio::test]
async fn test_ping() {
    let (app, _server, _tmp) = setup().await;
    let res = call(&app, "ping", json!({})).await.unwrap();
    assert_eq!(res["pong"], json!(true));
}

#[tokio::test]
async fn test_unknown_method_returns_error() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "nonexistent.method", json!({})).await.unwrap_err();
    assert!(err.contains("unknown method"));
}

// ─── Session ───

#[tokio::test]
async fn test_session_starts_anonymous() {
    let (app, _server, _tmp) = setup().await;
    let res = call(&app, "session.get", json!({})).await.unwrap();
    assert_eq!(res["authenticated"], json!(false));
}

#[tokio::test]
async fn test_login_without_auth_service_fails() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "auth.login", json!({"email": "a@b.c", "password": "p"}))
        .await
        .unwrap_err();
    assert_eq!(err, "Authentication is not configured");
}

#[tokio::test]
async fn test_login_requires_params() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "auth.login", json!({"email": "a@b.c"})).await.unwrap_err();
    assert_eq!(err, "missing password");
}

// ─── Search ───

#[tokio::test]
async fn test_search_submit_records_history() {
    let (app, _server, _tmp) = setup().await;
    let res = call(&app, "search.submit", json!({"query": "neural networks"})).await.unwrap();
    assert_eq!(res["origin"], json!("live"));
    assert_eq!(res["articles"][0]["abstract"], json!("Residual nets."));

    let history = call(&app, "history.list", json!({})).await.unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["query"], json!("neural networks"));
    assert_eq!(history[0]["result_count"], json!(1));

    let view = call(&app, "search.results", json!({})).await.unwrap();
    assert_eq!(view["mode"]["mode"], json!("fresh"));
    assert_eq!(view["loading"], json!(false));
}

#[tokio::test]
async fn test_search_submit_rejects_blank_query() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "search.submit", json!({"query": "   "})).await.unwrap_err();
    assert_eq!(err, "Search query is empty");
}

// ─── History ───

#[tokio::test]
async fn test_history_survives_restart_in_local_store() {
    let server = backend().await;
    let tmp = TempDir::new().unwrap();
    {
        let app = App::new(config(&server, &tmp)).unwrap();
        let (_, mirror) = app
            .search
            .submit_tracked("neural networks", &app.session())
            .await
            .unwrap();
        mirror.wait().await;
    }

    let app = App::new(config(&server, &tmp)).unwrap();
    let res = call(&app, "history.load", json!({})).await.unwrap();
    let entries = res["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["query"], json!("neural networks"));
    assert!(res.get("error").is_none());
}

#[tokio::test]
async fn test_history_open_does_not_record() {
    let (app, _server, _tmp) = setup().await;
    call(&app, "search.submit", json!({"query": "neural networks"})).await.unwrap();

    let res = call(&app, "history.open", json!({"query": "Neural Networks"})).await.unwrap();
    assert_eq!(res["articles"].as_array().unwrap().len(), 1);
    let view = call(&app, "search.results", json!({})).await.unwrap();
    assert_eq!(view["mode"]["mode"], json!("replay"));
    assert_eq!(call(&app, "history.list", json!({})).await.unwrap().as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_history_delete_by_id() {
    let (app, _server, _tmp) = setup().await;
    let (_, mirror) = app
        .search
        .submit_tracked("neural networks", &app.session())
        .await
        .unwrap();
    mirror.wait().await;
    let id = app.history().entries()[0].id.clone();
    assert!(!id.starts_with("temp_"));

    let res = call(&app, "history.delete", json!({"id": id})).await.unwrap();
    assert_eq!(res["ok"], json!(true));
    assert!(res["entries"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_history_delete_unknown_entry() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "history.delete", json!({"id": "nope"})).await.unwrap_err();
    assert_eq!(err, "unknown history entry");
}

#[tokio::test]
async fn test_history_check_reports_local_store() {
    let (app, _server, _tmp) = setup().await;
    let res = call(&app, "history.check", json!({})).await.unwrap();
    assert_eq!(res["status"], json!("Database connection successful!"));
}

// ─── Summary ───

#[tokio::test]
async fn test_summary_generate() {
    let (app, _server, _tmp) = setup().await;
    let article = json!({"title": "Dropout", "url": "https://jmlr.org", "year": 2014, "citation_count": 40000});
    let res = call(&app, "summary.generate", json!({"article": article})).await.unwrap();
    let summary = res["summary"].as_str().unwrap();
    assert!(summary.starts_with("Research Summary: Dropout"));
    assert!(summary.contains("Published in 2014"));
    assert!(summary.contains("Cited by 40000 researchers"));
    assert!(res["html"].as_str().unwrap().contains("<h2"));
}

#[tokio::test]
async fn test_summary_export_writes_pdf() {
    let (app, _server, tmp) = setup().await;
    let article = json!({"title": "Dropout", "url": "https://jmlr.org"});
    let res = call(&app, "summary.export", json!({"article": article})).await.unwrap();
    assert_eq!(res["format"], json!("pdf"));
    let path = res["path"].as_str().unwrap();
    assert!(path.ends_with("dropout_summary.pdf"));
    assert!(path.starts_with(tmp.path().to_str().unwrap()));
}

#[tokio::test]
async fn test_summary_requires_article() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "summary.generate", json!({})).await.unwrap_err();
    assert_eq!(err, "missing article");
}

// ─── Settings ───

#[tokio::test]
async fn test_settings_get_masks_anon_key() {
    let server = backend().await;
    let tmp = TempDir::new().unwrap();
    let mut cfg = config(&server, &tmp);
    cfg.store.url = Some(server.uri());
    cfg.store.anon_key = Some("secret-anon".to_string());
    let app = App::new(cfg).unwrap();

    let res = call(&app, "settings.get", json!({})).await.unwrap();
    assert_eq!(res["store"]["anon_key"], json!("***"));
    assert!(!res.to_string().contains("secret-anon"));
}

#[tokio::test]
async fn test_settings_set_without_file_fails() {
    let (app, _server, _tmp) = setup().await;
    let err = call(&app, "settings.set", json!({"key": "export.line_width", "value": 72}))
        .await
        .unwrap_err();
    assert!(err.contains("not backed by a file"));
}

#[tokio::test]
async fn test_settings_set_persists() {
    let tmp = TempDir::new().unwrap();
    let settings_path = tmp.path().join("settings.json").to_string_lossy().to_string();
    let mut engine = SettingsEngine::new(Some(settings_path.clone()));
    engine.load().unwrap();
    let app = App::with_settings(engine).unwrap();

    let res = call(&app, "settings.set", json!({"key": "export.line_width", "value": 72}))
        .await
        .unwrap();
    assert_eq!(res["restart_required"], json!(true));
    let shown = call(&app, "settings.get", json!({})).await.unwrap();
    assert_eq!(shown["export"]["line_width"], json!(72));

    let mut reloaded = SettingsEngine::new(Some(settings_path));
    assert_eq!(reloaded.load().unwrap().export.line_width, 72);

    let err = call(&app, "settings.set", json!({"key": "export.bogus", "value": 1}))
        .await
        .unwrap_err();
    assert!(err.starts_with("Invalid settings key"));
}
