//! Authorization retry around feed API calls.

use std::future::Future;
use std::sync::Arc;

use inopy_oauth::CredentialManager;

use crate::error::{ClientError, Result};
use crate::feeds::{FeedClient, Fetched, Subscriptions, UnreadCounts};

/// Runs API calls with the stored bearer token. A 401/403 answer hands the
/// failure to the [`CredentialManager`] and the call is retried exactly once
/// with the recovered token.
#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    manager: Arc<CredentialManager>,
}

impl RequestOrchestrator {
    pub fn new(manager: Arc<CredentialManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &CredentialManager {
        &self.manager
    }

    /// Execute `request` with the current bearer, recovering once on rejection.
    pub async fn call<T, F, Fut>(&self, what: &str, mut request: F) -> Result<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<Fetched<T>>>,
    {
        let credential = self.manager.current()?;
        let reason = match request(credential.bearer).await? {
            Fetched::Ok(value) => return Ok(value),
            Fetched::Rejected { status, reason, .. } => {
                tracing::info!(status, request = what, "Bearer token rejected");
                reason
            }
        };

        let credential = self.manager.ensure_valid(reason).await?;
        match request(credential.bearer).await? {
            Fetched::Ok(value) => Ok(value),
            Fetched::Rejected { status, url, .. } => {
                tracing::error!(status, request = what, url = %url, "Token rejected again after recovery");
                Err(ClientError::UnexpectedStatus { status, url })
            }
        }
    }

    pub async fn unread_counts(&self, client: &FeedClient) -> Result<UnreadCounts> {
        self.call("unread_counts", |bearer| async move {
            client.unread_counts(&bearer).await
        })
        .await
    }

    pub async fn subscriptions(&self, client: &FeedClient) -> Result<Subscriptions> {
        self.call("subscriptions", |bearer| async move {
            client.subscriptions(&bearer).await
        })
        .await
    }
}
