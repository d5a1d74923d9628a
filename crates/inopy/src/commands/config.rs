//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::Value;

use super::{Context, mask};

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show configuration file path
    Path,

    /// Show the configuration with secrets masked
    Show,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Show => cmd_show(ctx),
    }
}

fn cmd_path(ctx: &Context) -> Result<()> {
    let path = inopy_config::config_path(ctx.config_dir.as_deref())?;
    println!("{}", path.display());
    Ok(())
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let mut document = serde_json::to_value(&loaded.config)?;
    mask_secrets(&mut document);

    println!("# {}", loaded.path.display());
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

const SECRET_KEYS: [&str; 3] = ["bearer", "refresh_token", "client_secret"];

fn mask_secrets(document: &mut Value) {
    let Some(oauth) = document.get_mut("oauth").and_then(Value::as_object_mut) else {
        return;
    };
    for key in SECRET_KEYS {
        if let Some(value) = oauth.get_mut(key)
            && let Some(secret) = value.as_str()
        {
            *value = Value::from(mask(secret));
        }
    }
}
