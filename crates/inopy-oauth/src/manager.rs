//! Credential lifecycle: silent refresh with escalation to interactive
//! authorization.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::credential::Credential;
use crate::endpoint::RefreshClient;
use crate::error::{AuthError, Result};
use crate::oauth::generate_state;
use crate::server::{AuthorizationOutcome, Authorizer, RunningServer, ServerMode};
use crate::store::TokenStore;

/// Why the caller needs a new token, derived from the failed API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// HTTP 401: the token exists but expired. Refresh first.
    Unauthorized,
    /// HTTP 403: the token is absent or revoked. Go interactive.
    Forbidden,
}

impl FailureReason {
    /// Map an API status to a recovery path; other statuses have none.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(FailureReason::Unauthorized),
            403 => Some(FailureReason::Forbidden),
            _ => None,
        }
    }
}

// ============================================================================
// CredentialManager
// ============================================================================

/// Owns the credential record and every path that rewrites it.
///
/// Each successful path writes the store exactly once. Only one interactive
/// attempt may run at a time; a concurrent request fails fast with
/// [`AuthError::AlreadyInProgress`].
#[derive(Debug)]
pub struct CredentialManager {
    store: Arc<TokenStore>,
    refresher: Arc<dyn RefreshClient>,
    authorizer: Arc<dyn Authorizer>,
    browser: Arc<dyn BrowserLauncher>,
    /// Held for the whole interactive attempt. Keeps an embedded listener
    /// that lingers after success so the next attempt can stop it first.
    interactive: tokio::sync::Mutex<Option<RunningServer>>,
    last_state: Mutex<Option<String>>,
}

impl CredentialManager {
    pub fn new(
        store: Arc<TokenStore>,
        refresher: Arc<dyn RefreshClient>,
        authorizer: Arc<dyn Authorizer>,
    ) -> Self {
        Self {
            store,
            refresher,
            authorizer,
            browser: Arc::new(SystemBrowser),
            interactive: tokio::sync::Mutex::new(None),
            last_state: Mutex::new(None),
        }
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// The stored credential, as is. Never refreshes, never binds.
    pub fn current(&self) -> Result<Credential> {
        self.store.load()
    }

    /// Recover from a rejected API call.
    ///
    /// `Unauthorized` tries one silent refresh and, if that fails for any
    /// reason, falls through to a single interactive attempt. `Forbidden`
    /// goes straight to the interactive attempt.
    pub async fn ensure_valid(&self, reason: FailureReason) -> Result<Credential> {
        match reason {
            FailureReason::Unauthorized => match self.refresh().await {
                Ok(credential) => return Ok(credential),
                Err(e) => {
                    tracing::warn!(error = %e, "Silent refresh failed, escalating to interactive authorization");
                }
            },
            FailureReason::Forbidden => {
                tracing::info!("Token rejected, starting interactive authorization");
            }
        }
        self.authorize().await
    }

    /// Refresh-token grant only.
    pub async fn refresh(&self) -> Result<Credential> {
        let credential = self.store.load()?;
        if !credential.has_refresh_token() {
            return Err(AuthError::NotAuthorized);
        }

        tracing::info!("Token expired, refreshing...");
        let tokens = self
            .refresher
            .refresh(
                &credential.endpoint,
                &credential.client_id,
                &credential.client_secret,
                &credential.refresh_token,
            )
            .await?;

        let credential = self.store.store_tokens(&tokens)?;
        tracing::info!("Token refreshed successfully");
        Ok(credential)
    }

    /// Interactive authorization-code handshake through the local listener.
    pub async fn authorize(&self) -> Result<Credential> {
        let mut slot = self
            .interactive
            .try_lock()
            .map_err(|_| AuthError::AlreadyInProgress)?;

        if let Some(previous) = slot.take() {
            tracing::debug!("Stopping lingering authorization server");
            previous.shutdown().await;
        }

        let credential = self.store.load()?;
        let state = self.fresh_state();
        let server = self.authorizer.start(&credential, &state).await?;

        let home_url = server.home_url();
        tracing::info!(url = %home_url, "Waiting for interactive authorization");
        self.launch_browser(&home_url).await;

        let outcome = server.wait().await;
        let completed = matches!(outcome, AuthorizationOutcome::Completed(_));
        if completed && server.mode() == ServerMode::Embedded {
            *slot = Some(server);
        } else {
            server.shutdown().await;
        }

        let tokens = outcome.into_result()?;
        let credential = self.store.store_tokens(&tokens)?;
        tracing::info!("Interactive authorization completed");
        Ok(credential)
    }

    /// Browser launchers spawn processes and may wait on them, so they run on
    /// the blocking pool while the listener keeps serving.
    async fn launch_browser(&self, url: &str) {
        let browser = self.browser.clone();
        let target = url.to_string();
        match tokio::task::spawn_blocking(move || browser.launch(&target)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(error = %e, url = %url, "Could not open a browser, open the URL manually");
            }
            Err(e) => {
                tracing::warn!(error = %e, url = %url, "Browser launcher panicked, open the URL manually");
            }
        }
    }

    /// Shutdown URL of the embedded listener kept after the last success.
    pub async fn lingering_shutdown_url(&self) -> Option<String> {
        self.interactive
            .lock()
            .await
            .as_ref()
            .map(RunningServer::shutdown_url)
    }

    /// Let an embedded listener kept after a successful attempt serve out its
    /// linger period, or stop earlier when `/shutdown` is visited. Returns
    /// at once when nothing is lingering. Call before the process exits.
    pub async fn finish(&self) {
        let lingering = self.interactive.lock().await.take();
        if let Some(server) = lingering {
            tracing::info!(
                url = %server.shutdown_url(),
                linger = ?server.linger(),
                "Authorization server lingering until shutdown"
            );
            server.linger_out().await;
        }
    }

    /// A CSRF token never handed out before by this manager.
    fn fresh_state(&self) -> String {
        let mut last = self.last_state.lock();
        let mut state = generate_state();
        while last.as_deref() == Some(state.as_str()) {
            state = generate_state();
        }
        *last = Some(state.clone());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::HttpTokenEndpoint;
    use crate::server::{AuthorizationServer, ServerConfig};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::sync::Notify;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Real listener factory that records each start.
    #[derive(Debug)]
    struct CountingAuthorizer {
        inner: AuthorizationServer,
        starts: AtomicUsize,
        states: Mutex<Vec<String>>,
        started: Notify,
    }

    impl CountingAuthorizer {
        fn new(mode: ServerMode, timeout: Duration) -> Arc<Self> {
            Self::lingering(mode, timeout, Duration::from_secs(30))
        }

        fn lingering(mode: ServerMode, timeout: Duration, linger: Duration) -> Arc<Self> {
            let config = ServerConfig::new("127.0.0.1", 0)
                .with_mode(mode)
                .with_timeout(timeout)
                .with_linger(linger);
            Arc::new(Self {
                inner: AuthorizationServer::new(config, Arc::new(HttpTokenEndpoint::new())),
                starts: AtomicUsize::new(0),
                states: Mutex::new(Vec::new()),
                started: Notify::new(),
            })
        }

        fn starts(&self) -> usize {
            self.starts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authorizer for CountingAuthorizer {
        async fn start(&self, credential: &Credential, csrf_token: &str) -> Result<RunningServer> {
            let server = self.inner.start(credential, csrf_token).await?;
            self.starts.fetch_add(1, Ordering::SeqCst);
            self.states.lock().push(csrf_token.to_string());
            self.started.notify_one();
            Ok(server)
        }
    }

    /// What the simulated user does once the page opens.
    #[derive(Debug, Clone)]
    enum Reply {
        Approve(&'static str),
        WrongState,
        Deny(&'static str),
        Ignore,
    }

    /// Browser double that drives the local routes over HTTP.
    #[derive(Debug)]
    struct ScriptedBrowser {
        reply: Reply,
    }

    impl BrowserLauncher for ScriptedBrowser {
        fn launch(&self, url: &str) -> std::io::Result<()> {
            let reply = self.reply.clone();
            if matches!(reply, Reply::Ignore) {
                return Ok(());
            }
            tokio::spawn(drive(url.to_string(), reply));
            Ok(())
        }
    }

    /// Follow `GET /` to the provider page, then answer the callback.
    async fn drive(home: String, reply: Reply) {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();
        let redirect = client.get(&home).send().await.unwrap();
        let location = redirect.headers()[reqwest::header::LOCATION]
            .to_str()
            .unwrap()
            .to_string();
        let state = state_param(&location);

        let query = match reply {
            Reply::Approve(code) => format!("code={code}&state={state}"),
            Reply::WrongState => "code=ABC&state=bad".to_string(),
            Reply::Deny(error) => format!("state={state}&error={error}"),
            Reply::Ignore => return,
        };
        client
            .get(format!("{home}oauth-callback?{query}"))
            .send()
            .await
            .unwrap();
    }

    /// Browser double that does not return until the flow it started has
    /// finished, like a launcher waiting on a child process.
    #[derive(Debug, Default)]
    struct BlockingBrowser {
        starved: std::sync::atomic::AtomicBool,
    }

    impl BrowserLauncher for BlockingBrowser {
        fn launch(&self, url: &str) -> std::io::Result<()> {
            let (done_tx, done_rx) = std::sync::mpsc::channel();
            let home = url.to_string();
            tokio::spawn(async move {
                drive(home, Reply::Approve("ABC")).await;
                let _ = done_tx.send(());
            });
            if done_rx.recv_timeout(Duration::from_secs(5)).is_err() {
                self.starved.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    fn state_param(location: &str) -> String {
        location
            .split(['?', '&'])
            .find_map(|pair| pair.strip_prefix("state="))
            .unwrap()
            .to_string()
    }

    fn seed_store(dir: &TempDir, endpoint: &str, bearer: &str, refresh: &str) -> Arc<TokenStore> {
        let path = dir.path().join("config.json");
        let document = serde_json::json!({
            "oauth": {
                "bearer": bearer,
                "refresh_token": refresh,
                "endpoint": endpoint,
                "client_id": "cid",
                "client_secret": "secret",
                "callback": "http://localhost:5000/oauth-callback",
                "scope": "read",
            },
            "inoapi": {"unread_counts_url": "https://example.test/unread"},
        });
        std::fs::write(&path, serde_json::to_string(&document).unwrap()).unwrap();
        Arc::new(TokenStore::new(path))
    }

    fn raw(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    fn manager(
        store: Arc<TokenStore>,
        authorizer: Arc<CountingAuthorizer>,
        reply: Reply,
    ) -> CredentialManager {
        CredentialManager::new(store, Arc::new(HttpTokenEndpoint::new()), authorizer)
            .with_browser(Arc::new(ScriptedBrowser { reply }))
    }

    async fn token_endpoint(grant: &str, status: u16, body: serde_json::Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(format!("grant_type={grant}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_failure_reason_from_status() {
        assert_eq!(
            FailureReason::from_status(401),
            Some(FailureReason::Unauthorized)
        );
        assert_eq!(FailureReason::from_status(403), Some(FailureReason::Forbidden));
        assert_eq!(FailureReason::from_status(500), None);
        assert_eq!(FailureReason::from_status(200), None);
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_silently() {
        let provider = token_endpoint(
            "refresh_token",
            200,
            serde_json::json!({"access_token": "A2", "refresh_token": "R2"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "A1", "R1");
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(2));
        let manager = manager(store.clone(), authorizer.clone(), Reply::Ignore);

        let credential = manager.ensure_valid(FailureReason::Unauthorized).await.unwrap();
        assert_eq!(credential.bearer, "A2");
        assert_eq!(credential.refresh_token, "R2");

        let stored = store.load().unwrap();
        assert_eq!(stored.bearer, "A2");
        assert_eq!(stored.refresh_token, "R2");
        assert_eq!(authorizer.starts(), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_escalates_without_touching_store() {
        let provider = token_endpoint(
            "refresh_token",
            400,
            serde_json::json!({"error": "invalid_grant"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "A1", "R1");
        let before = raw(store.path());
        let authorizer =
            CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_millis(300));
        let manager = manager(store.clone(), authorizer.clone(), Reply::Ignore);

        let err = manager
            .ensure_valid(FailureReason::Unauthorized)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServerTimeout));
        assert_eq!(authorizer.starts(), 1);
        assert_eq!(raw(store.path()), before);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_escalates() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let authorizer =
            CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_millis(300));
        let manager = manager(store, authorizer.clone(), Reply::Ignore);

        assert!(matches!(
            manager.refresh().await,
            Err(AuthError::NotAuthorized)
        ));
        let err = manager
            .ensure_valid(FailureReason::Unauthorized)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServerTimeout));
        assert_eq!(authorizer.starts(), 1);
    }

    #[tokio::test]
    async fn test_forbidden_runs_interactive_flow() {
        let provider = token_endpoint(
            "authorization_code",
            200,
            serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(5));
        let manager = manager(store.clone(), authorizer.clone(), Reply::Approve("ABC"));

        let credential = manager.ensure_valid(FailureReason::Forbidden).await.unwrap();
        assert_eq!(credential.bearer, "A1");
        assert_eq!(credential.refresh_token, "R1");

        let stored = store.load().unwrap();
        assert_eq!(stored.bearer, "A1");
        assert_eq!(stored.refresh_token, "R1");
        assert_eq!(stored.client_id, "cid");
        assert_eq!(authorizer.starts(), 1);

        let document: serde_json::Value = serde_json::from_str(&raw(store.path())).unwrap();
        assert_eq!(
            document["inoapi"]["unread_counts_url"],
            "https://example.test/unread"
        );
    }

    #[tokio::test]
    async fn test_csrf_mismatch_never_exchanges() {
        let provider = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
            ))
            .expect(0)
            .mount(&provider)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let before = raw(store.path());
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(5));
        let manager = manager(store.clone(), authorizer, Reply::WrongState);

        let err = manager
            .ensure_valid(FailureReason::Forbidden)
            .await
            .unwrap_err();
        match err {
            AuthError::CsrfMismatch { got, .. } => assert_eq!(got.as_deref(), Some("bad")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(raw(store.path()), before);
        provider.verify().await;
    }

    #[tokio::test]
    async fn test_provider_denial_leaves_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let before = raw(store.path());
        let authorizer = CountingAuthorizer::new(ServerMode::Embedded, Duration::from_secs(5));
        let manager = manager(store.clone(), authorizer, Reply::Deny("access_denied"));

        let err = manager
            .ensure_valid(FailureReason::Forbidden)
            .await
            .unwrap_err();
        match err {
            AuthError::ProviderDenied { code, .. } => assert_eq!(code, "access_denied"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(raw(store.path()), before);
    }

    #[tokio::test]
    async fn test_timeout_is_server_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let authorizer =
            CountingAuthorizer::new(ServerMode::Embedded, Duration::from_millis(300));
        let manager = manager(store, authorizer, Reply::Ignore);

        let err = manager
            .ensure_valid(FailureReason::Forbidden)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::ServerTimeout));
        assert!(manager.interactive.try_lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_current_is_side_effect_free() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "A1", "R1");
        let before = raw(store.path());
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(1));
        let manager = manager(store.clone(), authorizer.clone(), Reply::Ignore);

        let credential = manager.current().unwrap();
        assert_eq!(credential.bearer, "A1");
        assert_eq!(authorizer.starts(), 0);
        assert_eq!(raw(store.path()), before);
    }

    #[tokio::test]
    async fn test_concurrent_interactive_attempts_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let authorizer =
            CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_millis(800));
        let manager = Arc::new(manager(store, authorizer.clone(), Reply::Ignore));

        let first = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.ensure_valid(FailureReason::Forbidden).await })
        };
        authorizer.started.notified().await;

        let second = manager.ensure_valid(FailureReason::Forbidden).await;
        assert!(matches!(second, Err(AuthError::AlreadyInProgress)));

        let first = first.await.unwrap();
        assert!(matches!(first, Err(AuthError::ServerTimeout)));
        assert_eq!(authorizer.starts(), 1);
    }

    #[tokio::test]
    async fn test_each_attempt_uses_a_new_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let authorizer =
            CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_millis(200));
        let manager = manager(store, authorizer.clone(), Reply::Ignore);

        for _ in 0..3 {
            let _ = manager.ensure_valid(FailureReason::Forbidden).await;
        }

        let states = authorizer.states.lock().clone();
        assert_eq!(states.len(), 3);
        assert_ne!(states[0], states[1]);
        assert_ne!(states[1], states[2]);
        assert_ne!(states[0], states[2]);
    }

    #[tokio::test]
    async fn test_manager_futures_are_send() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "", "");
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(1));
        let manager = manager(store, authorizer, Reply::Ignore);

        let ensure = manager.ensure_valid(FailureReason::Forbidden);
        assert_send(&ensure);
        let authorize = manager.authorize();
        assert_send(&authorize);
        let refresh = manager.refresh();
        assert_send(&refresh);
        let finish = manager.finish();
        assert_send(&finish);
    }

    #[tokio::test]
    async fn test_browser_launch_does_not_block_listener() {
        let provider = token_endpoint(
            "authorization_code",
            200,
            serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let authorizer = CountingAuthorizer::new(ServerMode::Ephemeral, Duration::from_secs(10));
        let browser = Arc::new(BlockingBrowser::default());
        let manager = CredentialManager::new(
            store.clone(),
            Arc::new(HttpTokenEndpoint::new()),
            authorizer,
        )
        .with_browser(browser.clone());

        // Single-threaded runtime: the callback is only served if the
        // launcher runs off the runtime thread.
        let credential = manager.authorize().await.unwrap();
        assert_eq!(credential.bearer, "A1");
        assert!(!browser.starved.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_finish_serves_out_linger_then_releases_port() {
        let provider = token_endpoint(
            "authorization_code",
            200,
            serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let authorizer = CountingAuthorizer::lingering(
            ServerMode::Embedded,
            Duration::from_secs(5),
            Duration::from_secs(1),
        );
        let manager = manager(store, authorizer, Reply::Approve("ABC"));

        manager.authorize().await.unwrap();
        let shutdown_url = manager
            .lingering_shutdown_url()
            .await
            .expect("embedded listener lingers after success");
        assert!(shutdown_url.ends_with("/shutdown"));
        let addr = manager
            .interactive
            .try_lock()
            .unwrap()
            .as_ref()
            .map(|server| server.local_addr())
            .unwrap();
        assert!(tokio::net::TcpStream::connect(addr).await.is_ok());

        tokio::time::timeout(Duration::from_secs(5), manager.finish())
            .await
            .expect("finish is bounded by the linger period");
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
        assert!(manager.lingering_shutdown_url().await.is_none());
    }

    #[tokio::test]
    async fn test_finish_returns_early_on_shutdown_visit() {
        let provider = token_endpoint(
            "authorization_code",
            200,
            serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let authorizer = CountingAuthorizer::lingering(
            ServerMode::Embedded,
            Duration::from_secs(5),
            Duration::from_secs(60),
        );
        let manager = manager(store, authorizer, Reply::Approve("ABC"));

        manager.authorize().await.unwrap();
        let shutdown_url = manager.lingering_shutdown_url().await.unwrap();

        let visit = tokio::spawn(async move {
            reqwest::get(shutdown_url).await.unwrap().text().await.unwrap()
        });
        tokio::time::timeout(Duration::from_secs(5), manager.finish())
            .await
            .expect("visiting /shutdown ends the linger");
        assert_eq!(visit.await.unwrap(), crate::server::SHUTDOWN_MESSAGE);
    }

    #[tokio::test]
    async fn test_finish_without_lingering_listener_returns_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, "http://127.0.0.1:1/token", "A1", "R1");
        let authorizer = CountingAuthorizer::new(ServerMode::Embedded, Duration::from_secs(1));
        let manager = manager(store, authorizer, Reply::Ignore);

        tokio::time::timeout(Duration::from_millis(200), manager.finish())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_embedded_listener_is_replaced_by_next_attempt() {
        let provider = token_endpoint(
            "authorization_code",
            200,
            serde_json::json!({"access_token": "A1", "refresh_token": "R1"}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();
        let store = seed_store(&dir, &format!("{}/token", provider.uri()), "", "");
        let authorizer = CountingAuthorizer::new(ServerMode::Embedded, Duration::from_secs(5));
        let manager = manager(store.clone(), authorizer.clone(), Reply::Approve("ABC"));

        manager.authorize().await.unwrap();
        let lingering = manager
            .interactive
            .try_lock()
            .unwrap()
            .as_ref()
            .map(|server| server.local_addr());
        let addr = lingering.expect("embedded listener lingers after success");

        manager.authorize().await.unwrap();
        assert_eq!(authorizer.starts(), 2);
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
        assert_eq!(store.load().unwrap().bearer, "A1");
    }
}
