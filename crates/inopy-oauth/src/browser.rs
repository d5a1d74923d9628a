//! Opening the local authorization page in a user agent.
//!
//! Launching is best effort: a failure is logged and the user can still
//! open the printed URL by hand.

use std::path::PathBuf;
use std::process::Command;

/// Opens the local server's home URL.
///
/// `launch` may block on child processes; the credential manager calls it
/// from the blocking thread pool.
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    fn launch(&self, url: &str) -> std::io::Result<()>;
}

/// Platform default opener (`xdg-open`, `open`, `start`).
#[derive(Debug, Default, Clone)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn launch(&self, url: &str) -> std::io::Result<()> {
        #[cfg(target_os = "macos")]
        {
            Command::new("open").arg(url).spawn()?;
        }
        #[cfg(target_os = "linux")]
        {
            Command::new("xdg-open").arg(url).spawn()?;
        }
        #[cfg(target_os = "windows")]
        {
            Command::new("cmd").args(["/C", "start", url]).spawn()?;
        }
        Ok(())
    }
}

/// Default profile name for the isolated browser session.
pub const DEFAULT_PROFILE: &str = "inopy_oauth";

/// A Firefox-style browser started on a dedicated, non-remote profile so the
/// authorization does not reuse the user's everyday session.
#[derive(Debug, Clone)]
pub struct PrivateProfileBrowser {
    browser_path: PathBuf,
    profile: String,
}

impl PrivateProfileBrowser {
    pub fn new(browser_path: impl Into<PathBuf>) -> Self {
        Self {
            browser_path: browser_path.into(),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    fn create_profile_args(&self) -> Vec<String> {
        vec![
            "-CreateProfile".to_string(),
            self.profile.clone(),
            "-no-remote".to_string(),
        ]
    }

    fn open_args(&self, url: &str) -> Vec<String> {
        vec![
            "-P".to_string(),
            self.profile.clone(),
            "-no-remote".to_string(),
            url.to_string(),
        ]
    }
}

impl BrowserLauncher for PrivateProfileBrowser {
    fn launch(&self, url: &str) -> std::io::Result<()> {
        // Creating an existing profile is harmless; the status is ignored.
        let status = Command::new(&self.browser_path)
            .args(self.create_profile_args())
            .status();
        if let Err(e) = status {
            tracing::debug!(error = %e, "Profile creation failed");
        }

        Command::new(&self.browser_path)
            .args(self.open_args(url))
            .spawn()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_profile_arguments() {
        let browser = PrivateProfileBrowser::new("/usr/bin/firefox").with_profile("p1");
        assert_eq!(browser.create_profile_args(), ["-CreateProfile", "p1", "-no-remote"]);
        assert_eq!(
            browser.open_args("http://localhost:5000/"),
            ["-P", "p1", "-no-remote", "http://localhost:5000/"]
        );
    }

    #[test]
    fn test_missing_browser_binary_is_error() {
        let browser = PrivateProfileBrowser::new("/nonexistent/inopy-browser");
        assert!(browser.launch("http://localhost:5000/").is_err());
    }
}
