//! Client for the remote query endpoint.
//!
//! The endpoint streams plain text: progress lines followed by one JSON line
//! carrying the structured result. The body is decoded incrementally as
//! chunks arrive and only scanned once the stream ends.

use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::types::article::SearchResponse;
use crate::types::errors::SearchError;

/// Incremental UTF-8 decoder that carries incomplete trailing sequences over
/// to the next chunk. Invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
    text: String,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk of bytes.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid_up_to = e.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[..valid_up_to]));
                    match e.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid_up_to + bad);
                        }
                        None => {
                            // Incomplete sequence at the end; wait for more bytes.
                            self.pending.drain(..valid_up_to);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flushes any dangling bytes and returns the decoded text.
    pub fn finish(mut self) -> String {
        if !self.pending.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.pending));
        }
        self.text
    }
}

/// Finds the first line that parses as a JSON object with an `articles` array.
pub fn parse_response(body: &str) -> Option<SearchResponse> {
    body.lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str::<SearchResponse>(line).ok())
}

/// HTTP client for `POST {backend}/query`.
#[derive(Clone)]
pub struct QueryClient {
    client: Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl QueryClient {
    pub fn new(client: Client, backend_url: &str) -> Result<Self, SearchError> {
        let base = url::Url::parse(backend_url)
            .map_err(|e| SearchError::InvalidEndpoint(format!("{}: {}", backend_url, e)))?;
        if base.cannot_be_a_base() {
            return Err(SearchError::InvalidEndpoint(backend_url.to_string()));
        }
        Ok(Self {
            client,
            endpoint: format!("{}/query", backend_url.trim_end_matches('/')),
            timeout: None,
        })
    }

    /// Sets a per-request timeout. `0` keeps requests unbounded.
    pub fn with_timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends the query and drains the streamed body into text.
    pub async fn fetch(&self, query: &str, bearer: Option<&str>) -> Result<String, SearchError> {
        let mut req = self.client.post(&self.endpoint).json(&json!({ "query": query }));
        if let Some(token) = bearer {
            req = req.bearer_auth(token);
        }
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| SearchError::Network(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "query endpoint returned an error status");
            return Err(SearchError::Network(format!("HTTP {}", status.as_u16())));
        }

        let mut decoder = StreamDecoder::new();
        let mut stream = resp.bytes_stream();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| SearchError::Network(e.to_string()))?;
            decoder.push(&bytes);
            chunks += 1;
        }
        let body = decoder.finish();
        debug!(chunks, bytes = body.len(), "query stream drained");
        Ok(body)
    }
}
