//! Local HTTP listener for the interactive authorization-code handshake.
//!
//! Three routes only:
//! - `GET /` redirects to the provider's authorization page
//! - `GET /oauth-callback` validates `state`, then exchanges the code
//! - `GET /shutdown` stops the listener
//!
//! Progress is published through a `watch` channel. The channel keeps the
//! latest value, so a waiter that subscribes after the callback already
//! arrived still observes the terminal state.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router as AxumRouter,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

use crate::credential::{Credential, TokenPair};
use crate::endpoint::CodeExchange;
use crate::error::{AuthError, Result};
use crate::oauth::{build_authorization_url, state_matches};

/// Callback route registered as the redirect URI path.
pub const CALLBACK_PATH: &str = "/oauth-callback";

/// Shutdown route.
pub const SHUTDOWN_PATH: &str = "/shutdown";

/// Text returned by `/shutdown`.
pub const SHUTDOWN_MESSAGE: &str = "Close this browser to terminate the process!";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const DEFAULT_LINGER: Duration = Duration::from_secs(60);

const SUCCESS_HTML: &str = "<html><body><h1>Authorization successful</h1>\
<p>Inopy can now read your feeds. You may close this window or <a href=\"/shutdown\">stop the local server</a>.</p></body></html>";
const CSRF_HTML: &str = "<html><body><h1>Authorization rejected</h1>\
<p>The request did not originate from this authorization attempt (state mismatch).</p></body></html>";
const DENIED_HTML: &str = "<html><body><h1>Authorization failed</h1>\
<p>The provider did not grant access. You may close this window and retry.</p></body></html>";
const DONE_HTML: &str = "<html><body><h1>Authorization already handled</h1>\
<p>This attempt has already finished. You may close this window.</p></body></html>";

/// Startup/teardown policy of the listener. Route logic is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Fixed host/port; the page is opened in a dedicated browser profile and
    /// the listener lingers after the outcome so `/shutdown` can be visited.
    Embedded,
    /// Torn down as soon as the first terminal state is reached.
    Ephemeral,
}

/// Configuration for the authorization listener.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mode: ServerMode,
    /// How long to wait for the user to finish the flow.
    pub timeout: Duration,
    /// How long an embedded listener stays up after the outcome.
    pub linger: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            mode: ServerMode::Embedded,
            timeout: DEFAULT_TIMEOUT,
            linger: DEFAULT_LINGER,
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_mode(mut self, mode: ServerMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }
}

/// Terminal result of one interactive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Completed(TokenPair),
    CsrfMismatch {
        expected: String,
        got: Option<String>,
    },
    ProviderDenied {
        code: String,
        description: Option<String>,
    },
    /// Nobody completed the flow before the deadline.
    TimedOut,
    /// `/shutdown` was visited before any outcome.
    Abandoned,
}

impl AuthorizationOutcome {
    pub fn phase(&self) -> ServerPhase {
        match self {
            AuthorizationOutcome::Completed(_) => ServerPhase::Completed,
            AuthorizationOutcome::CsrfMismatch { .. } => ServerPhase::CsrfFailed,
            AuthorizationOutcome::ProviderDenied { .. } => ServerPhase::ProviderDenied,
            AuthorizationOutcome::TimedOut => ServerPhase::TimedOut,
            AuthorizationOutcome::Abandoned => ServerPhase::Abandoned,
        }
    }

    /// Abandonment is reported exactly like a timeout.
    pub fn into_result(self) -> Result<TokenPair> {
        match self {
            AuthorizationOutcome::Completed(tokens) => Ok(tokens),
            AuthorizationOutcome::CsrfMismatch { expected, got } => {
                Err(AuthError::CsrfMismatch { expected, got })
            }
            AuthorizationOutcome::ProviderDenied { code, description } => {
                Err(AuthError::ProviderDenied { code, description })
            }
            AuthorizationOutcome::TimedOut | AuthorizationOutcome::Abandoned => {
                Err(AuthError::ServerTimeout)
            }
        }
    }
}

/// Listener lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerPhase {
    Idle,
    Listening,
    AwaitingCallback,
    Completed,
    CsrfFailed,
    ProviderDenied,
    TimedOut,
    Abandoned,
    Stopped,
}

/// Snapshot published to waiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    pub phase: ServerPhase,
    pub outcome: Option<AuthorizationOutcome>,
}

impl ServerStatus {
    fn idle() -> Self {
        Self {
            phase: ServerPhase::Idle,
            outcome: None,
        }
    }
}

/// State of one interactive flow; lives exactly as long as its listener.
#[derive(Debug)]
pub struct AuthorizationAttempt {
    pub csrf_expected: String,
    pub authorization_code: Option<String>,
    /// `None` while pending.
    pub outcome: Option<AuthorizationOutcome>,
}

impl AuthorizationAttempt {
    pub fn new(csrf_expected: impl Into<String>) -> Self {
        Self {
            csrf_expected: csrf_expected.into(),
            authorization_code: None,
            outcome: None,
        }
    }
}

/// Query parameters of the provider redirect.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

struct ServerState {
    credential: Credential,
    authorization_url: String,
    mode: ServerMode,
    exchange: Arc<dyn CodeExchange>,
    attempt: Mutex<AuthorizationAttempt>,
    status: watch::Sender<ServerStatus>,
    stop: watch::Sender<bool>,
}

impl ServerState {
    /// Record the first terminal outcome. Later outcomes are ignored.
    fn finish(&self, attempt: &mut AuthorizationAttempt, outcome: AuthorizationOutcome) -> bool {
        if attempt.outcome.is_some() {
            return false;
        }
        tracing::info!(phase = ?outcome.phase(), "Authorization attempt finished");
        attempt.outcome = Some(outcome.clone());
        self.status.send_modify(|status| {
            status.phase = outcome.phase();
            status.outcome = Some(outcome);
        });
        if self.mode == ServerMode::Ephemeral {
            self.stop.send_replace(true);
        }
        true
    }
}

/// Starts authorization listeners. The seam the credential manager uses.
#[async_trait]
pub trait Authorizer: Send + Sync + std::fmt::Debug {
    /// Bind and start serving an attempt guarded by `csrf_token`.
    async fn start(&self, credential: &Credential, csrf_token: &str) -> Result<RunningServer>;
}

/// Factory for local authorization listeners.
#[derive(Debug, Clone)]
pub struct AuthorizationServer {
    config: ServerConfig,
    exchange: Arc<dyn CodeExchange>,
}

impl AuthorizationServer {
    pub fn new(config: ServerConfig, exchange: Arc<dyn CodeExchange>) -> Self {
        Self { config, exchange }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn state(&self, credential: &Credential, csrf_token: &str) -> Arc<ServerState> {
        let (status, _) = watch::channel(ServerStatus::idle());
        let (stop, _) = watch::channel(false);
        Arc::new(ServerState {
            credential: credential.clone(),
            authorization_url: build_authorization_url(credential, csrf_token),
            mode: self.config.mode,
            exchange: self.exchange.clone(),
            attempt: Mutex::new(AuthorizationAttempt::new(csrf_token)),
            status,
            stop,
        })
    }
}

#[async_trait]
impl Authorizer for AuthorizationServer {
    async fn start(&self, credential: &Credential, csrf_token: &str) -> Result<RunningServer> {
        let state = self.state(credential, csrf_token);
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| AuthError::ListenerBind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| AuthError::ListenerBind { addr, source })?;

        state.status.send_modify(|status| status.phase = ServerPhase::Listening);
        tracing::info!(addr = %local_addr, mode = ?self.config.mode, "Starting authorization server");

        let shutdown = shutdown_signal(&state, self.config.linger);
        let app = router(state.clone());
        let serve_state = state.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
            {
                tracing::error!(error = %e, "Authorization server failed");
            }
            serve_state
                .status
                .send_modify(|status| status.phase = ServerPhase::Stopped);
            tracing::info!("Authorization server stopped");
        });

        Ok(RunningServer {
            local_addr,
            timeout: self.config.timeout,
            linger: self.config.linger,
            mode: self.config.mode,
            state,
            handle,
        })
    }
}

/// Resolves when the listener should stop: an explicit stop, or the linger
/// period after the first terminal outcome.
fn shutdown_signal(
    state: &ServerState,
    linger: Duration,
) -> impl std::future::Future<Output = ()> + Send + 'static {
    let mut stop_rx = state.stop.subscribe();
    let mut status_rx = state.status.subscribe();
    async move {
        let lingered = async {
            if status_rx.wait_for(|s| s.outcome.is_some()).await.is_ok() {
                tokio::time::sleep(linger).await;
            } else {
                std::future::pending::<()>().await;
            }
        };
        tokio::select! {
            _ = stop_rx.wait_for(|stop| *stop) => {}
            _ = lingered => {}
        }
    }
}

/// Build the three-route router for one attempt.
fn router(state: Arc<ServerState>) -> AxumRouter {
    AxumRouter::new()
        .route("/", get(handle_index))
        .route(CALLBACK_PATH, get(handle_callback))
        .route(SHUTDOWN_PATH, get(handle_shutdown))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle GET /
async fn handle_index(State(state): State<Arc<ServerState>>) -> Response {
    state.status.send_if_modified(|status| {
        if status.phase == ServerPhase::Listening {
            status.phase = ServerPhase::AwaitingCallback;
            true
        } else {
            false
        }
    });
    tracing::info!("Redirecting to authorization URL");
    (
        StatusCode::FOUND,
        [(header::LOCATION, state.authorization_url.clone())],
    )
        .into_response()
}

/// Handle GET /oauth-callback
async fn handle_callback(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let mut attempt = state.attempt.lock().await;
    if attempt.outcome.is_some() {
        return (StatusCode::CONFLICT, Html(DONE_HTML)).into_response();
    }

    let outcome = evaluate_callback(&state, &mut attempt, params).await;
    let response = match &outcome {
        AuthorizationOutcome::Completed(_) => (StatusCode::OK, Html(SUCCESS_HTML)),
        AuthorizationOutcome::CsrfMismatch { .. } => (StatusCode::FORBIDDEN, Html(CSRF_HTML)),
        _ => (StatusCode::BAD_REQUEST, Html(DENIED_HTML)),
    };
    state.finish(&mut attempt, outcome);
    response.into_response()
}

/// Callback rules, in order: CSRF, provider error, code exchange.
async fn evaluate_callback(
    state: &ServerState,
    attempt: &mut AuthorizationAttempt,
    params: CallbackParams,
) -> AuthorizationOutcome {
    let received = params.state.as_deref().unwrap_or_default();
    if !state_matches(&attempt.csrf_expected, received) {
        tracing::warn!("CSRF validation failed");
        return AuthorizationOutcome::CsrfMismatch {
            expected: attempt.csrf_expected.clone(),
            got: params.state,
        };
    }

    if let Some(error) = params.error {
        tracing::warn!(error = %error, description = ?params.error_description, "Provider returned an error");
        return AuthorizationOutcome::ProviderDenied {
            code: error,
            description: params.error_description,
        };
    }

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return AuthorizationOutcome::ProviderDenied {
            code: "missing_code".to_string(),
            description: Some("callback carried neither code nor error".to_string()),
        };
    };
    attempt.authorization_code = Some(code.clone());

    match state.exchange.exchange_code(&state.credential, &code).await {
        Ok(tokens) => {
            tracing::info!("New token obtained");
            AuthorizationOutcome::Completed(tokens)
        }
        Err(AuthError::ProviderDenied { code, description }) => {
            AuthorizationOutcome::ProviderDenied { code, description }
        }
        Err(e) => AuthorizationOutcome::ProviderDenied {
            code: "exchange_failed".to_string(),
            description: Some(e.to_string()),
        },
    }
}

/// Handle GET /shutdown
async fn handle_shutdown(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    {
        let mut attempt = state.attempt.lock().await;
        state.finish(&mut attempt, AuthorizationOutcome::Abandoned);
    }
    tracing::info!("Shutdown requested");
    state.stop.send_replace(true);
    SHUTDOWN_MESSAGE
}

/// Handle to a listener serving one attempt.
pub struct RunningServer {
    local_addr: SocketAddr,
    timeout: Duration,
    linger: Duration,
    mode: ServerMode,
    state: Arc<ServerState>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for RunningServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningServer")
            .field("local_addr", &self.local_addr)
            .field("mode", &self.mode)
            .field("phase", &self.status().phase)
            .finish()
    }
}

impl RunningServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn mode(&self) -> ServerMode {
        self.mode
    }

    /// URL to open in the browser; starts the flow through `GET /`.
    pub fn home_url(&self) -> String {
        let ip = self.local_addr.ip();
        let host = if ip.is_unspecified() || ip.is_loopback() {
            "localhost".to_string()
        } else {
            ip.to_string()
        };
        format!("http://{}:{}/", host, self.local_addr.port())
    }

    pub fn authorization_url(&self) -> &str {
        &self.state.authorization_url
    }

    /// URL of the `/shutdown` route.
    pub fn shutdown_url(&self) -> String {
        format!("{}{}", self.home_url().trim_end_matches('/'), SHUTDOWN_PATH)
    }

    pub fn linger(&self) -> Duration {
        self.linger
    }

    pub fn status(&self) -> ServerStatus {
        self.state.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerStatus> {
        self.state.status.subscribe()
    }

    /// Wait for the first terminal outcome, bounded by the configured
    /// timeout. On expiry the attempt becomes `TimedOut` and the listener is
    /// told to stop.
    pub async fn wait(&self) -> AuthorizationOutcome {
        let mut status_rx = self.state.status.subscribe();
        let observed = match tokio::time::timeout(
            self.timeout,
            status_rx.wait_for(|status| status.outcome.is_some()),
        )
        .await
        {
            Ok(Ok(status)) => status.outcome.clone(),
            _ => None,
        };
        if let Some(outcome) = observed {
            return outcome;
        }

        tracing::warn!(timeout = ?self.timeout, "Authorization timed out");
        let mut attempt = self.state.attempt.lock().await;
        self.state.finish(&mut attempt, AuthorizationOutcome::TimedOut);
        self.state.stop.send_replace(true);
        attempt
            .outcome
            .clone()
            .unwrap_or(AuthorizationOutcome::TimedOut)
    }

    /// Ask the listener to stop without waiting for it.
    pub fn stop(&self) {
        self.state.stop.send_replace(true);
    }

    /// Stop the listener and wait until the port is released.
    pub async fn shutdown(self) {
        self.stop();
        self.stopped().await;
    }

    /// Wait until the listener has stopped on its own.
    pub async fn stopped(self) {
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Authorization server task failed");
        }
    }

    /// Keep serving until the linger period ends or `/shutdown` is visited,
    /// then wait for the port to be released. Never waits longer than the
    /// linger period.
    pub async fn linger_out(mut self) {
        match tokio::time::timeout(self.linger, &mut self.handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(error = %e, "Authorization server task failed"),
            Err(_) => {
                tracing::debug!(linger = ?self.linger, "Linger elapsed, stopping authorization server");
                self.shutdown().await;
            }
        }
    }
}
