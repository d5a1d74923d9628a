//! Notification body built from unread counters.

use crate::feeds::{Subscriptions, UnreadCounts};

/// Singular/plural wording placed between the count and the feed label.
#[derive(Debug, Clone)]
pub struct Labels {
    pub singular: String,
    pub plural: String,
}

impl Labels {
    pub fn new(singular: impl Into<String>, plural: impl Into<String>) -> Self {
        Self {
            singular: singular.into(),
            plural: plural.into(),
        }
    }

    fn for_count(&self, count: u64) -> &str {
        if count == 1 { &self.singular } else { &self.plural }
    }
}

/// Human-readable name of a stream.
///
/// The title of the subscription whose id equals or contains `id`, else the
/// last `/`-separated segment of the id.
pub fn feed_label<'a>(id: &'a str, subscriptions: &'a Subscriptions) -> &'a str {
    subscriptions
        .subscriptions
        .iter()
        .find(|sub| sub.id == id)
        .or_else(|| subscriptions.subscriptions.iter().find(|sub| sub.id.contains(id)))
        .map(|sub| sub.title.as_str())
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| id.rsplit('/').next().unwrap_or(id))
}

/// One line per stream with unread articles:
/// `"<count> <singular|plural> <label>\n"`. Empty when nothing is unread.
pub fn format_message(
    counts: &UnreadCounts,
    subscriptions: &Subscriptions,
    labels: &Labels,
) -> String {
    counts
        .unreadcounts
        .iter()
        .filter(|entry| entry.count > 0)
        .map(|entry| {
            format!(
                "{} {} {}\n",
                entry.count,
                labels.for_count(entry.count),
                feed_label(&entry.id, subscriptions)
            )
        })
        .collect()
}
