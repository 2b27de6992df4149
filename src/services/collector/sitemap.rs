//! Structured-feed strategy: sitemap index → documents → embedded links.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{DiscoveryStrategy, Harvest, StopReason, fetch_text};
use crate::models::{SitemapConfig, StrategyKind};
use crate::services::LinkExtractor;
use crate::services::extract::sitemap_locations;
use crate::utils::{Deadline, Fetcher};

pub struct SitemapStrategy {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<LinkExtractor>,
    config: SitemapConfig,
    timeout: Duration,
}

impl SitemapStrategy {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<LinkExtractor>,
        config: SitemapConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            config,
            timeout,
        }
    }

    fn is_sitemap(location: &str) -> bool {
        let path = location.split(['?', '#']).next().unwrap_or(location);
        path.to_lowercase().ends_with(".xml")
    }

    /// Split sitemap locations into nested sitemaps and documents, taking
    /// direct target links straight into the harvest.
    fn sort_locations(
        &self,
        locations: Vec<String>,
        harvest: &mut Harvest,
        excluded: &HashSet<String>,
        children: &mut Vec<String>,
        documents: &mut Vec<String>,
    ) -> bool {
        for location in locations {
            if let Some(target) = self.extractor.match_target(&location) {
                if harvest.offer(&target, excluded) {
                    return true;
                }
            } else if Self::is_sitemap(&location) {
                children.push(location);
            } else if !documents.contains(&location) {
                documents.push(location);
            }
        }
        false
    }
}

#[async_trait]
impl DiscoveryStrategy for SitemapStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sitemap
    }

    async fn collect(
        &self,
        excluded: &HashSet<String>,
        deadline: &Deadline,
        cap: usize,
    ) -> Harvest {
        let mut harvest = Harvest::new(self.kind(), cap);
        if deadline.expired() {
            return harvest.finish(StopReason::Deadline);
        }

        harvest.requests += 1;
        let index = match fetch_text(
            self.fetcher.as_ref(),
            &self.config.index_url,
            self.timeout,
            deadline,
        )
        .await
        {
            Ok(xml) => xml,
            Err(e) => {
                harvest.fail(e);
                return harvest.finish(StopReason::Exhausted);
            }
        };

        let mut children = Vec::new();
        let mut documents = Vec::new();
        if self.sort_locations(
            sitemap_locations(&index),
            &mut harvest,
            excluded,
            &mut children,
            &mut documents,
        ) {
            return harvest.finish(StopReason::CapReached);
        }

        for child in children.into_iter().take(self.config.max_child_sitemaps) {
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }
            harvest.requests += 1;
            match fetch_text(self.fetcher.as_ref(), &child, self.timeout, deadline).await {
                Ok(xml) => {
                    let mut ignored = Vec::new();
                    if self.sort_locations(
                        sitemap_locations(&xml),
                        &mut harvest,
                        excluded,
                        &mut ignored,
                        &mut documents,
                    ) {
                        return harvest.finish(StopReason::CapReached);
                    }
                }
                Err(e) => harvest.fail(e),
            }
        }

        log::debug!("Sitemap lists {} documents", documents.len());

        for document in documents.into_iter().take(self.config.max_documents) {
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }
            harvest.requests += 1;
            let html =
                match fetch_text(self.fetcher.as_ref(), &document, self.timeout, deadline).await {
                    Ok(html) => html,
                    Err(e) => {
                        harvest.fail(e);
                        continue;
                    }
                };

            let links = self
                .extractor
                .extract(&html, &document, self.fetcher.as_ref(), deadline)
                .await;
            if harvest.offer_all(links, excluded) {
                return harvest.finish(StopReason::CapReached);
            }
        }

        harvest.finish(StopReason::Exhausted)
    }
}
