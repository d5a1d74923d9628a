//! CLI command handlers.

pub mod auth;
pub mod check;
pub mod config;
pub mod init;

use std::path::PathBuf;
use std::sync::Arc;

use inopy_config::LoadedConfig;
use inopy_oauth::{
    AuthorizationServer, BrowserLauncher, CredentialManager, HttpTokenEndpoint,
    PrivateProfileBrowser, ServerMode, SystemBrowser, TokenStore,
};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Config directory override (`--config-dir` / `INOPY_CONFIG_DIR`).
    pub config_dir: Option<PathBuf>,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    pub fn load_config(&self) -> anyhow::Result<LoadedConfig> {
        Ok(inopy_config::load_config(self.config_dir.as_deref())?)
    }
}

/// Wire the credential manager to the config file it rewrites.
pub fn credential_manager(loaded: &LoadedConfig) -> CredentialManager {
    let prod = &loaded.config.prod;
    let endpoint = Arc::new(HttpTokenEndpoint::new());
    let store = Arc::new(TokenStore::new(&loaded.path));
    let authorizer = Arc::new(AuthorizationServer::new(prod.server_config(), endpoint.clone()));

    let browser: Arc<dyn BrowserLauncher> = match prod.server_mode() {
        ServerMode::Embedded => Arc::new(PrivateProfileBrowser::new(&prod.browser_path)),
        ServerMode::Ephemeral => Arc::new(SystemBrowser),
    };

    CredentialManager::new(store, endpoint, authorizer).with_browser(browser)
}

/// Before exiting, let an embedded listener kept after a successful
/// authorization serve `/shutdown` until its linger period ends.
pub async fn release_listener(manager: &CredentialManager) {
    if let Some(url) = manager.lingering_shutdown_url().await {
        eprintln!("The local authorization server is still running. Visit {url} to stop it now.");
    }
    manager.finish().await;
}

/// Show the first and last four characters of a secret.
pub fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}
