//! PostgREST-backed history repository.
//!
//! Talks to `{store}/rest/v1/search_history` with the project's public key
//! in `apikey` and the user's access token as bearer, so row-level policies
//! scope every request to the signed-in user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{HistoryRepository, UserScope};
use crate::types::article::Article;
use crate::types::errors::RepositoryError;
use crate::types::history::HistoryRow;

const HISTORY_COLUMNS: &str = "id,query,results_count,created_at";

/// Error body returned by PostgREST.
#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Row shape as returned over the wire; `id` may be an integer or a uuid.
#[derive(Debug, Deserialize)]
struct WireRow {
    id: Value,
    query: String,
    #[serde(default)]
    results_count: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<WireRow> for HistoryRow {
    fn from(row: WireRow) -> Self {
        HistoryRow {
            id: id_to_string(&row.id),
            query: row.query,
            results_count: row.results_count.unwrap_or(0).max(0) as u32,
            created_at: row.created_at,
        }
    }
}

fn id_to_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Maps a PostgREST failure onto the repository error kinds.
pub fn classify(status: StatusCode, body: &str) -> RepositoryError {
    let parsed: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .unwrap_or_else(|| body.trim().to_string());
    let detail = format!("HTTP {}: {}", status.as_u16(), message);

    match parsed.code.as_deref() {
        Some("42P01") | Some("PGRST205") => RepositoryError::TableMissing(detail),
        Some("42501") => RepositoryError::PermissionDenied(detail),
        // `.single()` with zero rows, or an id that cannot exist in this column type.
        Some("PGRST116") | Some("22P02") => RepositoryError::NotFound(detail),
        _ => match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::PermissionDenied(detail),
            StatusCode::NOT_FOUND => RepositoryError::TableMissing(detail),
            _ => RepositoryError::Unavailable(detail),
        },
    }
}

/// History repository speaking PostgREST over HTTP.
pub struct RestHistoryRepository {
    client: Client,
    rest_url: String,
    anon_key: String,
}

impl RestHistoryRepository {
    /// `store_url` is the project root, e.g. `https://xyz.supabase.co`.
    pub fn new(client: Client, store_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            rest_url: format!("{}/rest/v1", store_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}/{}", self.rest_url, name)
    }

    fn authorize(&self, req: RequestBuilder, scope: &UserScope) -> RequestBuilder {
        let bearer = scope.bearer().unwrap_or(&self.anon_key);
        req.header("apikey", &self.anon_key).bearer_auth(bearer)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, RepositoryError> {
        let resp = req
            .send()
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Err(classify(status, &body))
    }

    async fn rows(&self, req: RequestBuilder) -> Result<Vec<HistoryRow>, RepositoryError> {
        let resp = self.send(req).await?;
        let rows: Vec<WireRow> = resp
            .json()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(rows.into_iter().map(HistoryRow::from).collect())
    }

    async fn delete_where(&self, scope: &UserScope, column: &str, value: &str) -> Result<u64, RepositoryError> {
        let req = self
            .client
            .delete(self.table("search_history"))
            .query(&[
                ("user_id", format!("eq.{}", scope.user_id)),
                (column, format!("eq.{}", value)),
            ])
            .header("Prefer", "return=representation");
        let resp = self.send(self.authorize(req, scope)).await?;
        let deleted: Vec<Value> = resp.json().await.unwrap_or_default();
        Ok(deleted.len() as u64)
    }
}

#[async_trait]
impl HistoryRepository for RestHistoryRepository {
    fn name(&self) -> &'static str {
        "postgrest"
    }

    async fn health_check(&self, scope: &UserScope) -> Result<(), RepositoryError> {
        let req = self
            .client
            .get(self.table("search_history"))
            .query(&[("select", "id"), ("limit", "1")]);
        self.send(self.authorize(req, scope)).await.map(|_| ())
    }

    async fn list_recent(&self, scope: &UserScope, limit: usize) -> Result<Vec<HistoryRow>, RepositoryError> {
        let req = self.client.get(self.table("search_history")).query(&[
            ("select", HISTORY_COLUMNS.to_string()),
            ("user_id", format!("eq.{}", scope.user_id)),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
        ]);
        self.rows(self.authorize(req, scope)).await
    }

    async fn find_by_query(&self, scope: &UserScope, query: &str) -> Result<Option<HistoryRow>, RepositoryError> {
        let req = self.client.get(self.table("search_history")).query(&[
            ("select", HISTORY_COLUMNS.to_string()),
            ("user_id", format!("eq.{}", scope.user_id)),
            ("query", format!("eq.{}", query)),
            ("order", "created_at.desc".to_string()),
            ("limit", "1".to_string()),
        ]);
        match self.rows(self.authorize(req, scope)).await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_by_id(&self, scope: &UserScope, id: &str) -> Result<Option<HistoryRow>, RepositoryError> {
        let req = self.client.get(self.table("search_history")).query(&[
            ("select", HISTORY_COLUMNS.to_string()),
            ("user_id", format!("eq.{}", scope.user_id)),
            ("id", format!("eq.{}", id)),
        ]);
        match self.rows(self.authorize(req, scope)).await {
            Ok(rows) => Ok(rows.into_iter().next()),
            Err(RepositoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn insert(
        &self,
        scope: &UserScope,
        query: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<String, RepositoryError> {
        let req = self
            .client
            .post(self.table("search_history"))
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&json!({
                "user_id": scope.user_id,
                "query": query,
                "results_count": results_count,
                "created_at": created_at.to_rfc3339(),
            }));
        let resp = self.send(self.authorize(req, scope)).await?;
        let inserted: Vec<Value> = resp
            .json()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        inserted
            .first()
            .and_then(|row| row.get("id"))
            .map(id_to_string)
            .ok_or_else(|| RepositoryError::Decode("insert returned no id".to_string()))
    }

    async fn update(
        &self,
        scope: &UserScope,
        id: &str,
        results_count: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let req = self
            .client
            .patch(self.table("search_history"))
            .query(&[
                ("id", format!("eq.{}", id)),
                ("user_id", format!("eq.{}", scope.user_id)),
            ])
            .json(&json!({
                "results_count": results_count,
                "created_at": created_at.to_rfc3339(),
            }));
        self.send(self.authorize(req, scope)).await.map(|_| ())
    }

    async fn delete_by_id(&self, scope: &UserScope, id: &str) -> Result<u64, RepositoryError> {
        self.delete_where(scope, "id", id).await
    }

    async fn delete_by_query(&self, scope: &UserScope, query: &str) -> Result<u64, RepositoryError> {
        self.delete_where(scope, "query", query).await
    }

    async fn articles_for_search(&self, scope: &UserScope, search_id: &str) -> Result<Vec<Article>, RepositoryError> {
        let req = self.client.get(self.table("articles")).query(&[
            ("select", "title,url,snippet".to_string()),
            ("search_id", format!("eq.{}", search_id)),
            ("order", "created_at.desc".to_string()),
        ]);
        let resp = self.send(self.authorize(req, scope)).await?;
        resp.json::<Vec<Article>>()
            .await
            .map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}
