//! Multi-strategy link collection.
//!
//! Strategies are tried in priority order and the first one that yields any
//! candidate wins; results are never merged across strategies. Every
//! strategy checks the run deadline at each page/resource boundary, absorbs
//! per-resource failures into its [`Harvest`], and caps accepted results.

mod api;
mod harvest;
mod listing;
mod render;
mod sitemap;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Candidate, Config, StrategyKind};
use crate::services::{LinkExtractor, PageRenderer};
use crate::utils::{Deadline, Fetcher};

pub use api::ApiStrategy;
pub use harvest::{Harvest, StopReason};
pub use listing::ListingStrategy;
pub use render::RenderStrategy;
pub use sitemap::SitemapStrategy;

/// A way of discovering candidate links.
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Collect up to `cap` candidates not in `excluded` before `deadline`.
    async fn collect(
        &self,
        excluded: &HashSet<String>,
        deadline: &Deadline,
        cap: usize,
    ) -> Harvest;
}

/// Outcome of a collection pass.
#[derive(Debug)]
pub struct Collection {
    /// Every strategy tried, in order; the last one is the winner if it found anything
    pub attempts: Vec<Harvest>,
}

impl Collection {
    pub fn winner(&self) -> Option<&Harvest> {
        self.attempts.last().filter(|h| !h.candidates.is_empty())
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.attempts
            .into_iter()
            .last()
            .map(|h| h.candidates)
            .unwrap_or_default()
    }
}

/// Ordered list of strategies sharing a result ceiling.
pub struct Collector {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
    max_results: usize,
}

impl Collector {
    pub fn new(strategies: Vec<Box<dyn DiscoveryStrategy>>, max_results: usize) -> Self {
        Self {
            strategies,
            max_results,
        }
    }

    /// Build the configured strategies in priority order.
    ///
    /// The rendered crawl is left out when no renderer is available.
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Result<Self> {
        let extractor = Arc::new(LinkExtractor::new(&config.links)?);
        let timeout = Duration::from_secs(config.http.timeout_secs);
        let collector = &config.collector;

        let mut strategies: Vec<Box<dyn DiscoveryStrategy>> = Vec::new();
        for kind in &collector.strategies {
            match kind {
                StrategyKind::Sitemap => strategies.push(Box::new(SitemapStrategy::new(
                    Arc::clone(&fetcher),
                    Arc::clone(&extractor),
                    collector.sitemap.clone(),
                    timeout,
                ))),
                StrategyKind::Api => strategies.push(Box::new(ApiStrategy::new(
                    Arc::clone(&fetcher),
                    Arc::clone(&extractor),
                    collector.api.clone(),
                    timeout,
                ))),
                StrategyKind::Listing => strategies.push(Box::new(ListingStrategy::new(
                    Arc::clone(&fetcher),
                    Arc::clone(&extractor),
                    collector.listing.clone(),
                    timeout,
                ))),
                StrategyKind::Render => match &renderer {
                    Some(renderer) => strategies.push(Box::new(RenderStrategy::new(
                        Arc::clone(renderer),
                        Arc::clone(&fetcher),
                        Arc::clone(&extractor),
                        collector.render.clone(),
                    )?)),
                    None => log::warn!("No renderer endpoint configured; render strategy disabled"),
                },
            }
        }

        Ok(Self::new(strategies, collector.max_results))
    }

    pub fn kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    /// Run strategies in order until one yields candidates.
    pub async fn collect(&self, excluded: &HashSet<String>, deadline: &Deadline) -> Collection {
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            log::info!("Trying {:?} strategy", strategy.kind());
            let harvest = strategy.collect(excluded, deadline, self.max_results).await;
            let found = !harvest.candidates.is_empty();
            attempts.push(harvest);

            if found {
                break;
            }
            if deadline.expired() {
                log::warn!("Deadline passed during collection");
                break;
            }
        }

        Collection { attempts }
    }
}

/// GET a resource within the deadline and return its body on success.
pub(crate) async fn fetch_text(
    fetcher: &dyn Fetcher,
    url: &str,
    timeout: Duration,
    deadline: &Deadline,
) -> Result<String> {
    fetcher
        .get(url, deadline.clamp(timeout))
        .await?
        .into_success()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubFetcher;

    struct FixedStrategy {
        kind: StrategyKind,
        links: Vec<&'static str>,
    }

    #[async_trait]
    impl DiscoveryStrategy for FixedStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        async fn collect(
            &self,
            excluded: &HashSet<String>,
            deadline: &Deadline,
            cap: usize,
        ) -> Harvest {
            let mut harvest = Harvest::new(self.kind, cap);
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }
            harvest.offer_all(&self.links, excluded);
            harvest.finish(StopReason::Exhausted)
        }
    }

    fn fixed(kind: StrategyKind, links: Vec<&'static str>) -> Box<dyn DiscoveryStrategy> {
        Box::new(FixedStrategy { kind, links })
    }

    #[tokio::test]
    async fn test_first_non_empty_strategy_wins() {
        let collector = Collector::new(
            vec![
                fixed(StrategyKind::Sitemap, vec![]),
                fixed(StrategyKind::Api, vec!["https://gofile.io/d/api1"]),
                fixed(StrategyKind::Listing, vec!["https://gofile.io/d/list1"]),
            ],
            10,
        );

        let collection = collector
            .collect(&HashSet::new(), &Deadline::after(Duration::from_secs(60)))
            .await;

        assert_eq!(collection.attempts.len(), 2);
        assert_eq!(collection.winner().unwrap().strategy, StrategyKind::Api);
        let candidates = collection.into_candidates();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].canonical, "https://gofile.io/d/api1");
    }

    #[tokio::test]
    async fn test_strategy_with_only_seen_links_falls_through() {
        let collector = Collector::new(
            vec![
                fixed(StrategyKind::Api, vec!["https://gofile.io/d/old"]),
                fixed(StrategyKind::Listing, vec!["https://gofile.io/d/new"]),
            ],
            10,
        );
        let excluded = HashSet::from(["https://gofile.io/d/old".to_string()]);

        let collection = collector
            .collect(&excluded, &Deadline::after(Duration::from_secs(60)))
            .await;

        assert_eq!(collection.winner().unwrap().strategy, StrategyKind::Listing);
    }

    #[tokio::test]
    async fn test_expired_deadline_stops_after_first_attempt() {
        let collector = Collector::new(
            vec![
                fixed(StrategyKind::Api, vec!["https://gofile.io/d/a"]),
                fixed(StrategyKind::Listing, vec!["https://gofile.io/d/b"]),
            ],
            10,
        );

        let collection = collector
            .collect(&HashSet::new(), &Deadline::expired_now())
            .await;

        assert_eq!(collection.attempts.len(), 1);
        assert_eq!(collection.attempts[0].stop, StopReason::Deadline);
        assert!(collection.winner().is_none());
    }

    #[test]
    fn test_from_config_skips_render_without_renderer() {
        let config = Config::default();
        let fetcher: Arc<dyn Fetcher> = Arc::new(StubFetcher::default());
        let collector = Collector::from_config(&config, fetcher, None).unwrap();

        assert_eq!(
            collector.kinds(),
            vec![StrategyKind::Sitemap, StrategyKind::Api, StrategyKind::Listing]
        );
    }
}
