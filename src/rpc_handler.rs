//! RPC method handler for the research assistant's JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested without stdio.
//! `handle_method` dispatches a method name to the components held by [`App`].

use serde_json::{json, Value};

use crate::app::App;
use crate::services::settings_engine::SettingsEngineTrait;
use crate::services::summary::{generate_summary, render_html};
use crate::types::article::Article;
use crate::types::history::HistoryEntry;
use crate::types::settings::AppConfig;

fn str_param<'a>(params: &'a Value, key: &str) -> Result<&'a str, String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| format!("missing {}", key))
}

fn article_param(params: &Value) -> Result<Article, String> {
    let raw = params.get("article").cloned().ok_or("missing article")?;
    serde_json::from_value(raw).map_err(|e| format!("invalid article: {}", e))
}

/// Looks an entry up by `id`, falling back to `query`.
fn entry_param(app: &App, params: &Value) -> Result<HistoryEntry, String> {
    let history = app.history();
    if let Some(id) = params.get("id").and_then(|v| v.as_str()) {
        if let Some(entry) = history.find_by_id(id) {
            return Ok(entry);
        }
    }
    if let Some(query) = params.get("query").and_then(|v| v.as_str()) {
        if let Some(entry) = history.find_by_query(query) {
            return Ok(entry);
        }
    }
    Err("unknown history entry".to_string())
}

/// Config as shown to a UI: the anon key is masked.
fn redacted(mut config: AppConfig) -> Value {
    if config.store.anon_key.is_some() {
        config.store.anon_key = Some("***".to_string());
    }
    json!(config)
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with a message fit for display.
pub async fn handle_method(app: &App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true, "version": env!("CARGO_PKG_VERSION")})),

        // ─── Auth ───
        "auth.login" => {
            let email = str_param(params, "email")?;
            let password = str_param(params, "password")?;
            let summary = app.login(email, password).await.map_err(|e| e.to_string())?;
            Ok(json!(summary))
        }
        "auth.logout" => {
            app.logout().await;
            Ok(json!({"ok": true}))
        }
        "session.get" => Ok(json!(app.session().summary())),

        // ─── Search ───
        "search.submit" => {
            let query = params.get("query").and_then(|v| v.as_str()).unwrap_or("");
            let session = app.session();
            let outcome = app.search.submit(query, &session).await.map_err(|e| e.to_string())?;
            Ok(json!(outcome))
        }
        "search.results" => Ok(json!({
            "mode": app.search.mode(),
            "loading": app.search.is_loading(),
            "results": app.search.results(),
        })),

        // ─── History ───
        "history.load" => {
            let session = app.session();
            match app.history().load_history(&session).await {
                Ok(_) => Ok(json!({"entries": app.history().entries()})),
                Err(e) => Ok(json!({
                    "entries": [],
                    "error": {"condition": e.tag(), "message": e.to_string()},
                })),
            }
        }
        "history.list" => Ok(json!(app.history().entries())),
        "history.open" => {
            let entry = entry_param(app, params)?;
            let search_id = (!entry.is_placeholder()).then_some(entry.id.as_str());
            let session = app.session();
            let outcome = app
                .search
                .open_history(&entry.query, search_id, &session)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!(outcome))
        }
        "history.delete" => {
            let entry = entry_param(app, params)?;
            let session = app.session();
            app.history()
                .delete_entry(&session, &entry)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "entries": app.history().entries()}))
        }
        "history.check" => {
            let session = app.session();
            Ok(json!({"status": app.history().check_connection(&session).await}))
        }

        // ─── Summary ───
        "summary.generate" => {
            let article = article_param(params)?;
            let summary = generate_summary(&article);
            let html = render_html(&article, &summary);
            Ok(json!({"summary": summary, "html": html}))
        }
        "summary.export" => {
            let article = article_param(params)?;
            let summary = match params.get("summary").and_then(|v| v.as_str()) {
                Some(s) => s.to_string(),
                None => generate_summary(&article),
            };
            let file = app.exporter.export(&article, &summary).map_err(|e| e.to_string())?;
            Ok(json!(file))
        }

        // ─── Settings ───
        "settings.get" => match &app.settings {
            Some(engine) => {
                let engine = engine.lock().map_err(|e| e.to_string())?;
                Ok(redacted(engine.get_settings().clone()))
            }
            None => Ok(redacted(app.config.clone())),
        },
        "settings.set" => {
            let key = str_param(params, "key")?;
            let value = params.get("value").cloned().ok_or("missing value")?;
            let engine = app
                .settings
                .as_ref()
                .ok_or("settings are not backed by a file in this session")?;
            let mut engine = engine.lock().map_err(|e| e.to_string())?;
            engine.set_value(key, value).map_err(|e| e.to_string())?;
            Ok(json!({"ok": true, "restart_required": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
