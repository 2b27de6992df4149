//! Persisted relay state.
//!
//! One record per deployment, shared between short-lived runs. JSON keys
//! match the `state.json` files already deployed, so an existing file keeps
//! working.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::Candidate;
use crate::utils::url::normalize;

/// How long a published link stays in the short-term window.
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// A link published within the recent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentEntry {
    pub url: String,
    pub ts: DateTime<Utc>,
}

/// Everything that survives between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedState {
    /// Every canonical link ever published, in publish order
    pub posted_urls: Vec<String>,

    /// Links published in the trailing 24 hours
    #[serde(rename = "recent_urls_24h", deserialize_with = "lenient_window")]
    pub recent_window: Vec<RecentEntry>,

    /// Local calendar date of the current quota day
    pub last_post_date: Option<NaiveDate>,

    /// Successful posts on `last_post_date`
    pub posts_today: u32,

    /// Number given to the next published link
    #[serde(rename = "line_seq")]
    pub sequence_counter: u64,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            posted_urls: Vec::new(),
            recent_window: Vec::new(),
            last_post_date: None,
            posts_today: 0,
            sequence_counter: 1,
        }
    }
}

/// Window entries that fail to parse are dropped one by one.
fn lenient_window<'de, D>(deserializer: D) -> Result<Vec<RecentEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => {
            log::warn!("Ignoring malformed recent window: {}", other);
            Vec::new()
        }
    };

    let total = items.len();
    let entries: Vec<RecentEntry> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if entries.len() < total {
        log::warn!(
            "Dropped {} unreadable recent window entries",
            total - entries.len()
        );
    }
    Ok(entries)
}

impl PersistedState {
    /// Drop window entries older than 24 hours. Returns how many were dropped.
    pub fn purge_recent(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
        let before = self.recent_window.len();
        self.recent_window.retain(|entry| entry.ts >= cutoff);
        before - self.recent_window.len()
    }

    /// Reset the daily counter when `today` differs from the stored date.
    /// Returns true when a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if self.last_post_date == Some(today) {
            return false;
        }
        self.last_post_date = Some(today);
        self.posts_today = 0;
        true
    }

    /// Canonical forms of everything published, permanently or recently.
    pub fn seen_set(&self) -> HashSet<String> {
        self.posted_urls
            .iter()
            .chain(self.recent_window.iter().map(|entry| &entry.url))
            .map(|url| normalize(url))
            .filter(|url| !url.is_empty())
            .collect()
    }

    /// Record a published batch.
    ///
    /// Every link joins the permanent list and the recent window, the daily
    /// counter goes up by one and the sequence counter by `batch_size`,
    /// however many links the batch actually carried.
    pub fn commit(&mut self, batch: &[Candidate], batch_size: usize, now: DateTime<Utc>) {
        for candidate in batch {
            let url = normalize(&candidate.canonical);
            if !self.posted_urls.contains(&url) {
                self.posted_urls.push(url.clone());
            }
            self.recent_window.push(RecentEntry { url, ts: now });
        }
        self.posts_today += 1;
        self.sequence_counter += batch_size as u64;
    }
}
