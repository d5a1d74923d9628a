//! Auth command - authorization management.

use anyhow::Result;
use clap::{Args, Subcommand};

use super::{Context, credential_manager, mask, release_listener};

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authorize Inopy in the browser (authorization-code flow)
    Login,

    /// Renew the bearer token with the stored refresh token
    Refresh,

    /// Show authorization status
    Status,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login => cmd_login(ctx).await,
        AuthCommand::Refresh => cmd_refresh(ctx).await,
        AuthCommand::Status => cmd_status(ctx),
    }
}

async fn cmd_login(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let manager = credential_manager(&loaded);
    let prod = &loaded.config.prod;

    println!("Inoreader Authorization");
    println!("=======================");
    println!();
    println!("Opening the authorization page served on {}:{}", prod.host, prod.port);
    println!("If no browser opens, visit it manually.");
    println!();

    match manager.authorize().await {
        Ok(credential) => {
            println!("Authorization successful!");
            println!("Bearer: {}", mask(&credential.bearer));
            release_listener(&manager).await;
            Ok(())
        }
        Err(e) if e.is_fatal() => Err(e.into()),
        Err(e) => {
            tracing::error!(error = %e, "Interactive authorization failed");
            eprintln!("Authorization failed: {e}");
            Ok(())
        }
    }
}

async fn cmd_refresh(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let manager = credential_manager(&loaded);

    match manager.refresh().await {
        Ok(credential) => {
            println!("Token refreshed.");
            println!("Bearer: {}", mask(&credential.bearer));
        }
        Err(e) => {
            tracing::error!(error = %e, "Token refresh failed");
            eprintln!("Token refresh failed: {e}");
        }
    }
    Ok(())
}

fn cmd_status(ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    let credential = &loaded.config.oauth;

    println!("Authorization Status");
    println!("--------------------");

    if credential.is_authorized() {
        println!("OAuth: authorized");
        println!("  Bearer: {}", mask(&credential.bearer));
        println!("  Refresh token: {}", mask(&credential.refresh_token));
    } else if credential.has_refresh_token() {
        println!("OAuth: refresh token only");
        println!("  Run 'inopy auth refresh' to obtain a bearer token");
    } else {
        println!("OAuth: not authorized");
        println!("  Run 'inopy auth login' to authorize Inopy");
    }

    if ctx.verbose {
        println!();
        println!("Client id: {}", credential.client_id);
        println!("Scope: {}", credential.scope);
        println!("Token endpoint: {}", credential.endpoint);
        println!("Config file: {}", loaded.path.display());
    }

    Ok(())
}
