use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Bearer token issued by the auth provider. Wiped from memory on drop and
/// never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

/// Who is using the application.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        user_id: String,
        email: Option<String>,
        token: AccessToken,
    },
}

impl Session {
    pub fn authenticated(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Session::Authenticated {
            user_id: user_id.into(),
            email: None,
            token: AccessToken::new(token),
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Session::Authenticated { user_id, .. } => Some(user_id),
            Session::Anonymous => None,
        }
    }

    pub fn bearer(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token.expose()),
            Session::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// Public view of the session, safe to hand to a UI.
    pub fn summary(&self) -> SessionSummary {
        match self {
            Session::Anonymous => SessionSummary {
                authenticated: false,
                user_id: None,
                email: None,
            },
            Session::Authenticated { user_id, email, .. } => SessionSummary {
                authenticated: true,
                user_id: Some(user_id.clone()),
                email: email.clone(),
            },
        }
    }
}

/// Serializable, token-free description of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}
