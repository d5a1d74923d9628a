//! Inoreader feed API: unread counters and the subscription list.

use std::time::Duration;

use inopy_oauth::FailureReason;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::{ClientError, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `GET unread-count` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnreadCounts {
    #[serde(default)]
    pub unreadcounts: Vec<UnreadCount>,
}

/// Counter for one stream (feed, folder or tag).
#[derive(Debug, Clone, Deserialize)]
pub struct UnreadCount {
    pub id: String,
    /// Sent as a string by the API; numbers are accepted too.
    #[serde(deserialize_with = "count_from_string_or_number")]
    pub count: u64,
}

/// `GET subscription/list` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Subscriptions {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
}

fn count_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s
            .trim()
            .parse()
            .map_err(|e| serde::de::Error::custom(format!("invalid count '{s}': {e}"))),
    }
}

/// Result of one authenticated request.
#[derive(Debug)]
pub enum Fetched<T> {
    Ok(T),
    /// The bearer token was refused with 401 or 403.
    Rejected {
        status: u16,
        reason: FailureReason,
        /// The URL that refused the token.
        url: String,
    },
}

/// Typed access to the two feed endpoints.
#[derive(Debug, Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    unread_counts_url: String,
    feeds_list_url: String,
}

impl FeedClient {
    pub fn new(unread_counts_url: impl Into<String>, feeds_list_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(http, unread_counts_url, feeds_list_url)
    }

    pub fn with_client(
        http: reqwest::Client,
        unread_counts_url: impl Into<String>,
        feeds_list_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            unread_counts_url: unread_counts_url.into(),
            feeds_list_url: feeds_list_url.into(),
        }
    }

    pub async fn unread_counts(&self, bearer: &str) -> Result<Fetched<UnreadCounts>> {
        self.get(&self.unread_counts_url, bearer).await
    }

    pub async fn subscriptions(&self, bearer: &str) -> Result<Fetched<Subscriptions>> {
        self.get(&self.feeds_list_url, bearer).await
    }

    /// GET `url` with the bearer token. 401/403 are reported as
    /// [`Fetched::Rejected`]; any other non-200 status is an error.
    async fn get<T: DeserializeOwned>(&self, url: &str, bearer: &str) -> Result<Fetched<T>> {
        let response = self
            .http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {bearer}"))
            .send()
            .await?;

        let status = response.status().as_u16();
        if let Some(reason) = FailureReason::from_status(status) {
            tracing::debug!(status, url, "API rejected the bearer token");
            return Ok(Fetched::Rejected {
                status,
                reason,
                url: url.to_string(),
            });
        }
        if status != 200 {
            tracing::warn!(status, url, "Unexpected API status");
            return Err(ClientError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(Fetched::Ok(serde_json::from_str(&body)?))
    }
}
