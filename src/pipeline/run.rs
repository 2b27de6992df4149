// src/pipeline/run.rs

//! One relay run: quota → collect → select → publish → commit.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, PersistedState};
use crate::publisher::{Post, Publisher};
use crate::services::{BrowserlessRenderer, Collector, HttpLinkProbe, LinkProbe, PageRenderer};
use crate::storage::StateStore;
use crate::utils::{Deadline, Fetcher, HttpFetcher};

use super::compose::{Composer, number_batch};
use super::quota::can_post_today;
use super::select::select_batch;

/// Everything one run needs, built once and passed down.
pub struct RunContext {
    pub config: Config,
    pub store: Arc<dyn StateStore>,
    pub collector: Collector,
    pub probe: Arc<dyn LinkProbe>,
    pub publisher: Arc<dyn Publisher>,
}

impl RunContext {
    /// Wire the HTTP-backed collaborators from configuration.
    pub fn from_config(
        config: Config,
        store: Arc<dyn StateStore>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.http)?);
        let renderer = BrowserlessRenderer::from_config(&config.http, &config.collector.render)?
            .map(|r| Arc::new(r) as Arc<dyn PageRenderer>);
        let collector = Collector::from_config(&config, fetcher, renderer)?;
        let probe = Arc::new(HttpLinkProbe::new(&config.http, &config.liveness)?);

        Ok(Self {
            config,
            store,
            collector,
            probe,
            publisher,
        })
    }

    /// A fresh deadline for the configured time budget.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(Duration::from_secs(self.config.run.time_budget_secs))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compose and hand to the publisher, but never write state
    pub dry_run: bool,
}

/// How a run ended. Everything but `Published` and `DryRun` is a
/// deliberate no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Published {
        post_id: String,
        first_number: u64,
        links: Vec<String>,
    },
    DryRun {
        text: String,
    },
    QuotaReached {
        posts_today: u32,
    },
    NotEnoughCandidates {
        found: usize,
    },
    NotEnoughLive {
        found: usize,
        tested: usize,
    },
    DeadlineExceeded,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published {
                post_id,
                first_number,
                links,
            } => write!(
                f,
                "published post {} with {} links starting at #{}",
                post_id,
                links.len(),
                first_number
            ),
            Self::DryRun { .. } => write!(f, "dry run, nothing saved"),
            Self::QuotaReached { posts_today } => {
                write!(f, "daily quota reached ({} posts today)", posts_today)
            }
            Self::NotEnoughCandidates { found } => {
                write!(f, "not enough fresh candidates ({} found)", found)
            }
            Self::NotEnoughLive { found, tested } => write!(
                f,
                "not enough live candidates ({} of {} probed)",
                found, tested
            ),
            Self::DeadlineExceeded => write!(f, "time budget exhausted"),
        }
    }
}

/// Persist purge/rollover on a graceful abort. Failures are only logged.
async fn checkpoint(store: &dyn StateStore, state: &PersistedState, options: RunOptions) {
    if options.dry_run {
        return;
    }
    if let Err(e) = store.save(state).await {
        log::warn!("Could not save state: {}", e);
    }
}

/// Run the pipeline once.
///
/// State is written at most once: on a graceful abort, or after a
/// successful publish. Only publishing and the commit after it can fail.
pub async fn run_once(
    ctx: &RunContext,
    now_utc: DateTime<Utc>,
    deadline: &Deadline,
    options: RunOptions,
) -> Result<RunOutcome> {
    let quota = &ctx.config.quota;
    let offset = quota
        .posting_offset()
        .ok_or_else(|| AppError::validation("quota.utc_offset_hours is out of range"))?;
    let store = ctx.store.as_ref();

    let mut state = store.load().await;
    let purged = state.purge_recent(now_utc);
    if purged > 0 {
        log::info!("Purged {} links older than the recent window", purged);
    }

    if !can_post_today(&mut state, now_utc.with_timezone(&offset), quota.daily_limit) {
        checkpoint(store, &state, options).await;
        return Ok(RunOutcome::QuotaReached {
            posts_today: state.posts_today,
        });
    }

    let seen = state.seen_set();
    log::info!(
        "{} links already published, {} posts today",
        seen.len(),
        state.posts_today
    );

    let candidates = ctx.collector.collect(&seen, deadline).await.into_candidates();
    if candidates.len() < quota.batch_size {
        checkpoint(store, &state, options).await;
        return Ok(if candidates.is_empty() && deadline.expired() {
            RunOutcome::DeadlineExceeded
        } else {
            RunOutcome::NotEnoughCandidates {
                found: candidates.len(),
            }
        });
    }

    let selection = select_batch(
        &candidates,
        &seen,
        quota.batch_size,
        deadline,
        ctx.probe.as_ref(),
    )
    .await;
    if !selection.is_complete(quota.batch_size) {
        checkpoint(store, &state, options).await;
        return Ok(if selection.deadline_hit {
            RunOutcome::DeadlineExceeded
        } else {
            RunOutcome::NotEnoughLive {
                found: selection.batch.len(),
                tested: selection.tested,
            }
        });
    }

    let first_number = state.sequence_counter;
    let numbered = number_batch(&selection.batch, first_number);
    let composed = Composer::new(&ctx.config.publisher).compose(&numbered);
    let post = Post {
        text: composed.text,
        community_id: ctx.config.publisher.community_id.clone(),
        share_with_followers: ctx.config.publisher.share_with_followers,
    };

    let post_id = ctx.publisher.publish(&post).await?;
    if options.dry_run {
        return Ok(RunOutcome::DryRun { text: post.text });
    }

    let published = &selection.batch[..composed.included];
    state.commit(published, quota.batch_size, now_utc);
    store.save(&state).await?;

    Ok(RunOutcome::Published {
        post_id,
        first_number,
        links: published.iter().map(|c| c.canonical.clone()).collect(),
    })
}
