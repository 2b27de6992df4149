//! Rendered-page strategy: listing pages and their articles through a
//! headless browser, for content the plain fetchers cannot see.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use super::{DiscoveryStrategy, Harvest, StopReason};
use crate::error::Result;
use crate::models::{RenderConfig, StrategyKind};
use crate::services::{LinkExtractor, PageRenderer};
use crate::utils::url::{get_domain, page_url, resolve_url};
use crate::utils::{Deadline, Fetcher};

pub struct RenderStrategy {
    renderer: Arc<dyn PageRenderer>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<LinkExtractor>,
    article: Regex,
    config: RenderConfig,
}

impl RenderStrategy {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<LinkExtractor>,
        config: RenderConfig,
    ) -> Result<Self> {
        Ok(Self {
            renderer,
            fetcher,
            extractor,
            article: Regex::new(&config.article_pattern)?,
            config,
        })
    }

    fn navigation_timeout(&self, deadline: &Deadline) -> Duration {
        deadline.clamp(Duration::from_secs(self.config.navigation_timeout_secs))
    }

    /// Same-host article links of a rendered listing page, first-seen order.
    fn article_links(&self, html: &str, page_url: &str) -> Vec<String> {
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };
        let Ok(anchor) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        let host = get_domain(page_url);
        let document = Html::parse_document(html);

        let mut seen = HashSet::new();
        document
            .select(&anchor)
            .filter_map(|a| a.value().attr("href"))
            .map(|href| resolve_url(&base, href.trim()))
            .filter(|link| {
                Url::parse(link).is_ok_and(|u| {
                    u.host_str().map(|h| h.to_lowercase()) == host
                        && self.article.is_match(u.path())
                })
            })
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }
}

#[async_trait]
impl DiscoveryStrategy for RenderStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Render
    }

    async fn collect(
        &self,
        excluded: &HashSet<String>,
        deadline: &Deadline,
        cap: usize,
    ) -> Harvest {
        let mut harvest = Harvest::new(self.kind(), cap);
        let mut visited = HashSet::new();
        let mut articles_rendered = 0;

        for page in 1..=self.config.max_pages {
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }

            let url = page_url(&self.config.list_url_template, page);
            harvest.requests += 1;
            let html = match self
                .renderer
                .render(&url, self.navigation_timeout(deadline))
                .await
            {
                Ok(html) => html,
                Err(e) => {
                    harvest.fail(e);
                    break;
                }
            };

            let direct = self
                .extractor
                .extract(&html, &url, self.fetcher.as_ref(), deadline)
                .await;
            if harvest.offer_all(direct, excluded) {
                return harvest.finish(StopReason::CapReached);
            }

            let articles = self.article_links(&html, &url);
            log::info!("Rendered listing page {}: {} articles", page, articles.len());
            if articles.is_empty() {
                break;
            }

            for article in articles {
                if !visited.insert(article.clone()) {
                    continue;
                }
                if articles_rendered >= self.config.max_articles {
                    return harvest.finish(StopReason::Exhausted);
                }
                if deadline.expired() {
                    return harvest.finish(StopReason::Deadline);
                }

                articles_rendered += 1;
                harvest.requests += 1;
                let html = match self
                    .renderer
                    .render(&article, self.navigation_timeout(deadline))
                    .await
                {
                    Ok(html) => html,
                    Err(e) => {
                        harvest.fail(e);
                        continue;
                    }
                };

                let links = self
                    .extractor
                    .extract(&html, &article, self.fetcher.as_ref(), deadline)
                    .await;
                if harvest.offer_all(links, excluded) {
                    return harvest.finish(StopReason::CapReached);
                }
            }
        }

        harvest.finish(StopReason::Exhausted)
    }
}
