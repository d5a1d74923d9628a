//! Init command - first-run config creation.

use anyhow::Result;
use clap::Args;

use super::Context;

/// Arguments for the init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

/// Run the init command.
pub async fn run(args: InitArgs, ctx: &Context) -> Result<()> {
    let path = inopy_config::config_path(ctx.config_dir.as_deref())?;
    if path.exists() && !args.force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to replace it.");
        return Ok(());
    }

    let stdin = std::io::stdin();
    let mut input = stdin.lock();
    let mut output = std::io::stdout();
    let config = inopy_config::prompt_config(&mut input, &mut output)?;

    inopy_config::save_config(&config, &path)?;
    println!();
    println!("Created config file at {}", path.display());
    println!("Run 'inopy auth login' to authorize Inopy.");
    Ok(())
}
