//! First-run config creation.
//!
//! Asks for the OAuth client, the feed API endpoints and the notification
//! labels, then fills the remaining sections with the stock values the
//! notifier has always shipped with.

use std::io::{BufRead, Write};

use serde_json::Value;

use crate::{ConfigError, InopyConfig, Result};

pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.inoreader.com/oauth2/token";
pub const DEFAULT_CALLBACK: &str = "http://localhost:5000/oauth-callback";
pub const DEFAULT_HOME_URL: &str = "http://localhost:5000";
pub const DEFAULT_UNREAD_COUNTS_URL: &str = "https://www.inoreader.com/reader/api/0/unread-count";
pub const DEFAULT_FEEDS_LIST_URL: &str =
    "https://www.inoreader.com/reader/api/0/subscription/list";

/// Fixed state value older releases stored. Kept in the file for tools that
/// still read it; authorization attempts generate their own state.
const LEGACY_CSRF: &str = "4902358490258";

struct Prompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<R: BufRead, W: Write> Prompter<'_, R, W> {
    fn heading(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "\n{text}\n").map_err(ConfigError::Prompt)
    }

    /// Ask one question. An empty answer takes `default` when there is one.
    fn ask(&mut self, field: &str, question: &str, default: Option<&str>) -> Result<String> {
        let written = match default {
            Some(default) => write!(self.output, "{question} [{default}]: "),
            None => write!(self.output, "{question}: "),
        };
        written.map_err(ConfigError::Prompt)?;
        self.output.flush().map_err(ConfigError::Prompt)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(ConfigError::Prompt)?;
        let answer = line.trim();

        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        match default {
            Some(default) => Ok(default.to_string()),
            None if read == 0 => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "input ended before a value was entered".to_string(),
            }),
            None => Err(ConfigError::InvalidValue {
                field: field.to_string(),
                message: "a value is required".to_string(),
            }),
        }
    }
}

/// Run the interactive prompt and build a new configuration.
pub fn prompt_config<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<InopyConfig> {
    let mut config = InopyConfig::default();
    let mut prompt = Prompter { input, output };

    prompt.heading("Enter details about OAuth authentication:")?;
    config.oauth.endpoint = prompt.ask(
        "endpoint",
        "Enter OAuth endpoint",
        Some(DEFAULT_TOKEN_ENDPOINT),
    )?;
    config.oauth.client_id = prompt.ask("client_id", "Enter your client id", None)?;
    config.oauth.client_secret = prompt.ask("client_secret", "Enter your client secret", None)?;
    config.oauth.callback = prompt.ask(
        "callback",
        "Enter your callback URL",
        Some(DEFAULT_CALLBACK),
    )?;
    config.oauth.scope = prompt.ask(
        "scope",
        "Enter the API scope (e.g. read OR read write)",
        Some("read"),
    )?;
    config
        .oauth
        .extra
        .insert("csrf".to_string(), Value::from(LEGACY_CSRF));
    config
        .oauth
        .extra
        .insert("home_url".to_string(), Value::from(DEFAULT_HOME_URL));

    prompt.heading("Enter details about Inoreader API:")?;
    config.inoapi.unread_counts_url = prompt.ask(
        "unread_counts_url",
        "Enter URL for unread articles",
        Some(DEFAULT_UNREAD_COUNTS_URL),
    )?;
    config.inoapi.feeds_list_url = prompt.ask(
        "feeds_list_url",
        "Enter URL for feeds lists",
        Some(DEFAULT_FEEDS_LIST_URL),
    )?;

    prompt.heading("Enter details about notification message:")?;
    let defaults = config.notification.clone();
    config.notification.summary = prompt.ask(
        "summary",
        "Enter summary (title) for notification",
        Some(defaults.summary.as_str()),
    )?;
    config.notification.singular_article = prompt.ask(
        "singular_article",
        "Enter singular label if there is only one unread article",
        Some(defaults.singular_article.as_str()),
    )?;
    config.notification.plural_articles = prompt.ask(
        "plural_articles",
        "Enter plural label if there are many unread articles",
        Some(defaults.plural_articles.as_str()),
    )?;

    Ok(config)
}
