//! Persisted OAuth state and the token pair issued by the provider.

use serde::{Deserialize, Serialize};

/// Authorization page used when the record does not name one.
pub const DEFAULT_AUTHORIZE_URL: &str = "https://www.inoreader.com/oauth2/auth";

fn default_authorize_url() -> String {
    DEFAULT_AUTHORIZE_URL.to_string()
}

/// The `oauth` section of the credential store.
///
/// `bearer` and `refresh_token` are only ever written together through
/// [`Credential::apply`]. Keys this type does not know about (`home_url`,
/// the legacy fixed `csrf`, ...) are carried in `extra` so a rewrite leaves
/// them untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(default)]
    pub bearer: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Token exchange URL, used for both grants.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Redirect URI registered with the provider.
    #[serde(default)]
    pub callback: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for Credential {
    fn default() -> Self {
        Self {
            bearer: String::new(),
            refresh_token: String::new(),
            endpoint: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            callback: String::new(),
            scope: String::new(),
            authorize_url: default_authorize_url(),
            extra: serde_json::Map::new(),
        }
    }
}

impl Credential {
    /// True once an authorization has completed at least once.
    pub fn is_authorized(&self) -> bool {
        !self.bearer.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// Replace the token pair in one step.
    pub fn apply(&mut self, tokens: &TokenPair) {
        self.bearer = tokens.access_token.clone();
        self.refresh_token = tokens.refresh_token.clone();
    }

    /// Value for the `Authorization` header of feed API calls.
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.bearer)
    }
}

/// Access/refresh token pair returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}
