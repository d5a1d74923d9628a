//! OAuth 2.0 credential lifecycle for the Inoreader API.
//!
//! Holds the bearer/refresh token pair, renews it silently when the API
//! answers 401 and falls back to an interactive authorization-code flow
//! served from a short-lived local listener when renewal is impossible.
//!
//! # Components
//!
//! - [`store`]: JSON credential record with atomic read-modify-write
//! - [`endpoint`]: refresh-token and authorization-code grants
//! - [`server`]: local listener with `/`, `/oauth-callback` and `/shutdown`
//! - [`manager`]: chooses refresh vs. interactive and persists the result
//! - [`browser`]: opens the local page in a user agent

pub mod browser;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod server;
pub mod store;

pub use browser::{BrowserLauncher, PrivateProfileBrowser, SystemBrowser};
pub use credential::{Credential, TokenPair};
pub use endpoint::{CodeExchange, HttpTokenEndpoint, RefreshClient};
pub use error::{AuthError, Result};
pub use manager::{CredentialManager, FailureReason};
pub use server::{
    AuthorizationOutcome, AuthorizationServer, Authorizer, RunningServer, ServerConfig, ServerMode,
    ServerPhase, ServerStatus,
};
pub use store::TokenStore;
