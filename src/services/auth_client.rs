//! Password sign-in against the hosted auth service.

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::types::errors::AuthError;
use crate::types::session::{AccessToken, Session};

#[derive(Deserialize)]
struct TokenResponse {
    access_token: AccessToken,
    user: TokenUser,
}

#[derive(Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Error bodies come in a few shapes depending on the endpoint.
#[derive(Deserialize, Default)]
struct ErrorBody {
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self, status: u16) -> String {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
            .unwrap_or_else(|| format!("HTTP {}", status))
    }
}

/// Client for `{store}/auth/v1`.
#[derive(Clone)]
pub struct AuthClient {
    client: Client,
    base: String,
    anon_key: String,
}

impl AuthClient {
    pub fn new(client: Client, store_url: &str, anon_key: &str) -> Self {
        Self {
            client,
            base: format!("{}/auth/v1", store_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    /// Exchanges email and password for an authenticated session.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let resp = self
            .client
            .post(format!("{}/token", self.base))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            let message = body.into_message(status.as_u16());
            warn!(status = status.as_u16(), %message, "sign-in rejected");
            return Err(AuthError::Rejected(message));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Network(format!("malformed token response: {}", e)))?;
        info!(user = %token.user.id, "signed in");
        Ok(Session::Authenticated {
            user_id: token.user.id,
            email: token.user.email.or_else(|| Some(email.to_string())),
            token: token.access_token,
        })
    }

    /// Revokes the session's token. Anonymous sessions are a no-op.
    pub async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        let Some(bearer) = session.bearer() else {
            return Ok(());
        };
        let resp = self
            .client
            .post(format!("{}/logout", self.base))
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            info!("signed out");
            Ok(())
        } else {
            let body: ErrorBody = resp.json().await.unwrap_or_default();
            Err(AuthError::Rejected(body.into_message(status.as_u16())))
        }
    }
}
