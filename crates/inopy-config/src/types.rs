//! Configuration document types.
//!
//! ```json
//! {
//!     "oauth": { "bearer": "", "refresh_token": "", "endpoint": "...", ... },
//!     "inoapi": { "unread_counts_url": "...", "feeds_list_url": "..." },
//!     "notification": { "summary": "...", "singular_article": "...", "plural_articles": "..." },
//!     "prod": { "status": "true", "browser_path": "/usr/bin/firefox", "host": "0.0.0.0", "port": "5000" }
//! }
//! ```
//!
//! Older files store booleans and ports as strings (`"true"`, `"5000"`);
//! both spellings are accepted.

use std::path::PathBuf;
use std::time::Duration;

use inopy_oauth::{Credential, ServerConfig, ServerMode};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ConfigError, Result};

/// Default notification icon.
pub const DEFAULT_ICON: &str = "/opt/chrome-apps-icons/inoreader.png";

/// Default browser for the embedded flow.
pub const DEFAULT_BROWSER: &str = "/usr/bin/firefox";

/// Root configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InopyConfig {
    /// OAuth credential; owned at runtime by the token store.
    #[serde(default)]
    pub oauth: Credential,

    #[serde(default)]
    pub inoapi: InoApiConfig,

    #[serde(default)]
    pub notification: NotificationConfig,

    #[serde(default)]
    pub prod: ProdConfig,

    /// Sections this version does not know about.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl InopyConfig {
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the fields the notifier cannot run without.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("oauth", "endpoint", self.oauth.endpoint.as_str()),
            ("oauth", "client_id", self.oauth.client_id.as_str()),
            ("oauth", "callback", self.oauth.callback.as_str()),
            ("inoapi", "unread_counts_url", self.inoapi.unread_counts_url.as_str()),
            ("inoapi", "feeds_list_url", self.inoapi.feeds_list_url.as_str()),
        ];
        for (section, field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                    section: section.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Feed API endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InoApiConfig {
    #[serde(default)]
    pub unread_counts_url: String,
    #[serde(default)]
    pub feeds_list_url: String,
}

/// Desktop notification text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Notification title.
    pub summary: String,
    /// Label used when a feed has exactly one unread article.
    pub singular_article: String,
    /// Label used otherwise.
    pub plural_articles: String,
    pub icon: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            summary: "Inoreader".to_string(),
            singular_article: "new article in".to_string(),
            plural_articles: "new articles in".to_string(),
            icon: DEFAULT_ICON.to_string(),
        }
    }
}

/// Local authorization listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProdConfig {
    /// `true` selects the embedded listener with a private browser profile,
    /// `false` the ephemeral one opened with the system browser.
    #[serde(deserialize_with = "bool_or_string")]
    pub status: bool,
    pub browser_path: PathBuf,
    pub host: String,
    #[serde(deserialize_with = "port_or_string")]
    pub port: u16,
    /// How long to wait for the browser flow.
    pub timeout_secs: u64,
    /// How long the embedded listener stays up after the flow.
    pub linger_secs: u64,
}

impl Default for ProdConfig {
    fn default() -> Self {
        Self {
            status: true,
            browser_path: PathBuf::from(DEFAULT_BROWSER),
            host: "0.0.0.0".to_string(),
            port: 5000,
            timeout_secs: 300,
            linger_secs: 60,
        }
    }
}

impl ProdConfig {
    pub fn server_mode(&self) -> ServerMode {
        if self.status {
            ServerMode::Embedded
        } else {
            ServerMode::Ephemeral
        }
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.host.clone(), self.port)
            .with_mode(self.server_mode())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_linger(Duration::from_secs(self.linger_secs))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flexible<T> {
    Native(T),
    Text(String),
}

fn bool_or_string<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Flexible::<bool>::deserialize(deserializer)? {
        Flexible::Native(value) => Ok(value),
        Flexible::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected a boolean, got '{other}'"
            ))),
        },
    }
}

fn port_or_string<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match Flexible::<u16>::deserialize(deserializer)? {
        Flexible::Native(value) => Ok(value),
        Flexible::Text(text) => text
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid port '{text}': {e}"))),
    }
}
