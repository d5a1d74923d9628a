//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration loading and saving.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file exists yet.
    #[error("config file '{path}' not found; run 'inopy init' to create it")]
    NotFound { path: String },

    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to write a config file.
    #[error("failed to write config file '{path}': {source}")]
    WriteFile {
        path: String,
        source: std::io::Error,
    },

    /// Failed to parse or serialize JSON.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Missing required field.
    #[error("missing required field '{field}' in [{section}]")]
    MissingField { field: String, section: String },

    /// A field holds a value we cannot use.
    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Reading answers from the terminal failed.
    #[error("failed to read input: {0}")]
    Prompt(#[source] std::io::Error),

    /// Home directory could not be determined.
    #[error("could not determine the home directory; set INOPY_CONFIG_DIR")]
    NoHomeDir,
}
