//! Configuration for the Inopy feed notifier.
//!
//! One JSON document holds everything: the OAuth credential (`oauth`), the
//! feed API endpoints (`inoapi`), notification text (`notification`) and the
//! local authorization listener (`prod`). The `oauth` section is rewritten at
//! runtime by [`inopy_oauth::TokenStore`]; the rest is read-only after
//! `inopy init` creates the file.

pub mod discovery;
pub mod error;
pub mod init;
pub mod types;

pub use discovery::{
    CONFIG_DIR_ENV, LoadedConfig, base_dir, config_dir, config_path, load_config,
    load_config_file, log_dir, save_config,
};
pub use error::{ConfigError, Result};
pub use init::prompt_config;
pub use types::*;
