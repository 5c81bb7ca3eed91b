//! Research Assistant RPC Server: JSON-RPC over stdin/stdout for UI shells.
//!
//! Protocol: one JSON object per line.
//! Request:  {"id":1, "method":"search.submit", "params":{"query":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr; stdout carries protocol messages only.

use std::io::{self, Write};
use std::time::Instant;

use anyhow::Context;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use research_assistant::app::App;
use research_assistant::rpc_handler::handle_method;
use research_assistant::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use research_assistant::telemetry;

/// Fixed-window rate limiter over all methods.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

fn emit(message: &Value) {
    let mut out = io::stdout().lock();
    if writeln!(out, "{}", message).and_then(|_| out.flush()).is_err() {
        tracing::error!("stdout closed, dropping message");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RESEARCH_ASSISTANT_CONFIG").ok();
    let mut settings = SettingsEngine::new(config_path);
    let loaded = settings.load();
    let filter = loaded
        .as_ref()
        .map(|c| c.logging.filter.clone())
        .unwrap_or_else(|_| "info".to_string());
    telemetry::init(&filter);
    if let Err(e) = loaded {
        tracing::warn!(error = %e, path = settings.get_config_path(), "using default configuration");
    }

    let app = App::with_settings(settings).context("failed to initialize research assistant")?;
    if let Err(e) = app.startup().await {
        tracing::warn!(condition = e.tag(), "{}", e);
    }

    emit(&json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));
    tracing::info!("rpc server ready");

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(&json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(&json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));
        tracing::debug!(method, "dispatching");

        let response = match handle_method(&app, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(&response);
    }

    tracing::info!("stdin closed, shutting down");
    Ok(())
}
