//! Check command - look for unread articles and notify.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use inopy_client::{
    ClientError, ConsoleNotifier, DesktopNotifier, FeedClient, Labels, Notifier,
    RequestOrchestrator, format_message,
};

use super::{Context, credential_manager, release_listener};

/// Arguments for the check command.
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Print the notification instead of sending it
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the check command.
///
/// Authorization and API failures end the cycle without a notification and
/// without a failing exit status; only listener bind and config errors do.
pub async fn run(args: CheckArgs, ctx: &Context) -> Result<()> {
    let loaded = ctx.load_config()?;
    loaded.config.validate()?;
    let config = &loaded.config;

    let manager = Arc::new(credential_manager(&loaded));
    let orchestrator = RequestOrchestrator::new(manager.clone());
    let client = FeedClient::new(
        &config.inoapi.unread_counts_url,
        &config.inoapi.feeds_list_url,
    );

    let fetched = fetch_message(&orchestrator, &client, config).await;
    release_listener(&manager).await;

    let message = match fetched {
        Ok(message) => message,
        Err(e) if e.is_fatal() => return Err(e.into()),
        Err(e) => {
            tracing::error!(error = %e, "Check failed, no notification sent");
            eprintln!("Error: {e}");
            return Ok(());
        }
    };

    if message.is_empty() {
        tracing::info!("No unread articles");
        return Ok(());
    }

    let notifier: Box<dyn Notifier> = if args.dry_run {
        Box::new(ConsoleNotifier)
    } else {
        Box::new(DesktopNotifier::new(&config.notification.icon))
    };
    if let Err(e) = notifier.notify(&config.notification.summary, &message).await {
        tracing::error!(error = %e, "Could not send notification");
        eprintln!("Error: {e}");
    }
    Ok(())
}

async fn fetch_message(
    orchestrator: &RequestOrchestrator,
    client: &FeedClient,
    config: &inopy_config::InopyConfig,
) -> Result<String, ClientError> {
    let counts = orchestrator.unread_counts(client).await?;
    if counts.unreadcounts.iter().all(|entry| entry.count == 0) {
        return Ok(String::new());
    }
    let subscriptions = orchestrator.subscriptions(client).await?;

    let labels = Labels::new(
        &config.notification.singular_article,
        &config.notification.plural_articles,
    );
    Ok(format_message(&counts, &subscriptions, &labels))
}
