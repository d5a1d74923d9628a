//! Inoreader feed API client for the Inopy notifier.
//!
//! [`FeedClient`] performs the raw authenticated calls,
//! [`RequestOrchestrator`] adds the single recover-and-retry step on
//! 401/403, [`format_message`] turns the results into notification text and
//! a [`Notifier`] shows it.

pub mod error;
pub mod feeds;
pub mod message;
pub mod notifier;
pub mod orchestrator;

pub use error::{ClientError, Result};
pub use feeds::{FeedClient, Fetched, Subscription, Subscriptions, UnreadCount, UnreadCounts};
pub use message::{Labels, feed_label, format_message};
pub use notifier::{ConsoleNotifier, DesktopNotifier, Notifier};
pub use orchestrator::RequestOrchestrator;
