//! HTML listing strategy: plain `?page=N` pages fetched over HTTP.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{DiscoveryStrategy, Harvest, StopReason, fetch_text};
use crate::error::Result;
use crate::models::{ListingConfig, StrategyKind};
use crate::services::LinkExtractor;
use crate::utils::url::page_url;
use crate::utils::{Deadline, Fetcher};

pub struct ListingStrategy {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<LinkExtractor>,
    config: ListingConfig,
    timeout: Duration,
}

impl ListingStrategy {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<LinkExtractor>,
        config: ListingConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            config,
            timeout,
        }
    }

    /// Fetch a page, retrying with exponential backoff that never sleeps
    /// past the deadline.
    async fn fetch_with_retry(
        &self,
        url: &str,
        deadline: &Deadline,
        harvest: &mut Harvest,
    ) -> Result<String> {
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            harvest.requests += 1;
            match fetch_text(self.fetcher.as_ref(), url, self.timeout, deadline).await {
                Ok(html) => return Ok(html),
                Err(e) if attempt >= attempts || deadline.expired() => return Err(e),
                Err(e) => {
                    let backoff =
                        Duration::from_millis(self.config.backoff_ms << (attempt - 1).min(16));
                    log::debug!(
                        "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                        attempt,
                        attempts,
                        url,
                        e,
                        backoff
                    );
                    tokio::time::sleep(deadline.clamp(backoff)).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl DiscoveryStrategy for ListingStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Listing
    }

    async fn collect(
        &self,
        excluded: &HashSet<String>,
        deadline: &Deadline,
        cap: usize,
    ) -> Harvest {
        let mut harvest = Harvest::new(self.kind(), cap);
        let delay = Duration::from_millis(self.config.page_delay_ms);

        for page in 1..=self.config.max_pages {
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }

            let url = page_url(&self.config.url_template, page);
            match self.fetch_with_retry(&url, deadline, &mut harvest).await {
                Ok(html) => {
                    let before = harvest.candidates.len();
                    let links = self
                        .extractor
                        .extract(&html, &url, self.fetcher.as_ref(), deadline)
                        .await;
                    let full = harvest.offer_all(links, excluded);
                    log::info!(
                        "Listing page {}: {} new links (total {})",
                        page,
                        harvest.candidates.len() - before,
                        harvest.candidates.len()
                    );
                    if full {
                        return harvest.finish(StopReason::CapReached);
                    }
                }
                Err(e) => harvest.fail(e),
            }

            if page < self.config.max_pages && !delay.is_zero() {
                tokio::time::sleep(deadline.clamp(delay)).await;
            }
        }

        harvest.finish(StopReason::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkConfig;
    use crate::test_support::StubFetcher;

    fn strategy(fetcher: StubFetcher, max_pages: u32) -> (ListingStrategy, Arc<StubFetcher>) {
        let fetcher = Arc::new(fetcher);
        let strategy = ListingStrategy::new(
            fetcher.clone(),
            Arc::new(LinkExtractor::new(&LinkConfig::default()).unwrap()),
            ListingConfig {
                url_template: "https://gofilelab.com/newest?page={page}".into(),
                max_pages,
                max_attempts: 2,
                backoff_ms: 1,
                page_delay_ms: 0,
            },
            Duration::from_secs(5),
        );
        (strategy, fetcher)
    }

    fn open() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_failed_page_is_retried_then_skipped() {
        let fetcher = StubFetcher::default()
            .with_page("https://gofilelab.com/newest?page=1", 503, "busy")
            .with_page(
                "https://gofilelab.com/newest?page=2",
                200,
                r#"<a href="https://gofile.io/d/two">x</a>"#,
            );
        let (strategy, fetcher) = strategy(fetcher, 2);

        let harvest = strategy.collect(&HashSet::new(), &open(), 10).await;

        assert_eq!(harvest.candidates.len(), 1);
        assert_eq!(harvest.failures.len(), 1);
        assert_eq!(
            fetcher.requests(),
            vec![
                "GET https://gofilelab.com/newest?page=1",
                "GET https://gofilelab.com/newest?page=1",
                "GET https://gofilelab.com/newest?page=2",
            ]
        );
    }

    #[tokio::test]
    async fn test_links_keep_page_order_across_pages() {
        let fetcher = StubFetcher::default()
            .with_page(
                "https://gofilelab.com/newest?page=1",
                200,
                r#"<a href="https://gofile.io/d/b">b</a><a href="https://gofile.io/d/a">a</a>"#,
            )
            .with_page(
                "https://gofilelab.com/newest?page=2",
                200,
                r#"<a href="https://gofile.io/d/a">a</a><a href="https://gofile.io/d/c">c</a>"#,
            );
        let (strategy, _) = strategy(fetcher, 2);

        let harvest = strategy.collect(&HashSet::new(), &open(), 10).await;

        let links: Vec<_> = harvest.candidates.iter().map(|c| c.canonical.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://gofile.io/d/b",
                "https://gofile.io/d/a",
                "https://gofile.io/d/c"
            ]
        );
    }

    #[tokio::test]
    async fn test_expired_deadline_issues_no_request() {
        let (strategy, fetcher) = strategy(StubFetcher::default(), 3);

        let harvest = strategy
            .collect(&HashSet::new(), &Deadline::expired_now(), 10)
            .await;

        assert_eq!(harvest.stop, StopReason::Deadline);
        assert!(fetcher.requests().is_empty());
    }
}
