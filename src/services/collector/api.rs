//! Paged-API strategy: numbered JSON listing pages.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{DiscoveryStrategy, Harvest, StopReason};
use crate::error::AppError;
use crate::models::{ApiConfig, StrategyKind};
use crate::services::LinkExtractor;
use crate::utils::url::page_url;
use crate::utils::{Deadline, Fetcher};

pub struct ApiStrategy {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<LinkExtractor>,
    config: ApiConfig,
    timeout: Duration,
}

impl ApiStrategy {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<LinkExtractor>,
        config: ApiConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            config,
            timeout,
        }
    }

    /// The item array of a page: the root itself, or under one of the
    /// configured keys, at most one object deep.
    fn items<'a>(&self, page: &'a Value) -> &'a [Value] {
        fn find<'a>(value: &'a Value, keys: &[String], depth: usize) -> Option<&'a [Value]> {
            match value {
                Value::Array(items) => Some(items.as_slice()),
                Value::Object(map) if depth > 0 => keys
                    .iter()
                    .filter_map(|key| map.get(key))
                    .find_map(|inner| find(inner, keys, depth - 1)),
                _ => None,
            }
        }
        find(page, &self.config.items_keys, 2).unwrap_or(&[])
    }
}

/// Every string inside a JSON value, depth first.
fn string_fields(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| string_fields(v, out)),
        Value::Object(map) => map.values().for_each(|v| string_fields(v, out)),
        _ => {}
    }
}

#[async_trait]
impl DiscoveryStrategy for ApiStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Api
    }

    async fn collect(
        &self,
        excluded: &HashSet<String>,
        deadline: &Deadline,
        cap: usize,
    ) -> Harvest {
        let mut harvest = Harvest::new(self.kind(), cap);

        for page in 1..=self.config.max_pages {
            if deadline.expired() {
                return harvest.finish(StopReason::Deadline);
            }

            let url = page_url(&self.config.url_template, page);
            harvest.requests += 1;
            let fetched = match self.fetcher.get(&url, deadline.clamp(self.timeout)).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    harvest.fail(e);
                    break;
                }
            };
            if !fetched.is_success() {
                harvest.fail(AppError::fetch(&url, format!("status {}", fetched.status)));
                break;
            }

            let body: Value = match serde_json::from_str(&fetched.body) {
                Ok(body) => body,
                Err(e) => {
                    harvest.fail(AppError::fetch(&url, e));
                    break;
                }
            };

            let items = self.items(&body);
            if items.is_empty() {
                log::debug!("API page {} is empty, stopping", page);
                break;
            }

            let mut fields = Vec::new();
            items.iter().for_each(|item| string_fields(item, &mut fields));

            for field in fields {
                if deadline.expired() {
                    return harvest.finish(StopReason::Deadline);
                }
                let links = self
                    .extractor
                    .extract_text(&field, &url, self.fetcher.as_ref(), deadline)
                    .await;
                if harvest.offer_all(links, excluded) {
                    return harvest.finish(StopReason::CapReached);
                }
            }

            log::info!(
                "API page {}: {} items (total {} candidates)",
                page,
                items.len(),
                harvest.candidates.len()
            );
        }

        harvest.finish(StopReason::Exhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinkConfig;
    use crate::test_support::StubFetcher;

    fn strategy(fetcher: StubFetcher) -> (ApiStrategy, Arc<StubFetcher>) {
        let fetcher = Arc::new(fetcher);
        let strategy = ApiStrategy::new(
            fetcher.clone(),
            Arc::new(LinkExtractor::new(&LinkConfig::default()).unwrap()),
            ApiConfig {
                url_template: "https://gofilelab.com/api/newest?page={page}".into(),
                max_pages: 5,
                ..ApiConfig::default()
            },
            Duration::from_secs(5),
        );
        (strategy, fetcher)
    }

    fn open() -> Deadline {
        Deadline::after(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_pages_until_empty() {
        let fetcher = StubFetcher::default()
            .with_page(
                "https://gofilelab.com/api/newest?page=1",
                200,
                r#"{"items": [
                    {"title": "a", "content": "dl: https://gofile.io/d/p1a"},
                    {"title": "b", "links": ["https://gofile.io/d/p1b"]}
                ]}"#,
            )
            .with_page(
                "https://gofilelab.com/api/newest?page=2",
                200,
                r#"{"data": {"items": [{"body": "<a href=\"https://gofile.io/d/p2\">x</a>"}]}}"#,
            )
            .with_page("https://gofilelab.com/api/newest?page=3", 200, r#"{"items": []}"#);
        let (strategy, fetcher) = strategy(fetcher);

        let harvest = strategy.collect(&HashSet::new(), &open(), 10).await;

        let links: Vec<_> = harvest.candidates.iter().map(|c| c.canonical.as_str()).collect();
        assert_eq!(
            links,
            vec![
                "https://gofile.io/d/p1a",
                "https://gofile.io/d/p1b",
                "https://gofile.io/d/p2"
            ]
        );
        assert_eq!(fetcher.requests().len(), 3);
        assert!(harvest.failures.is_empty());
    }

    #[tokio::test]
    async fn test_non_success_stops_and_keeps_partial() {
        let fetcher = StubFetcher::default()
            .with_page(
                "https://gofilelab.com/api/newest?page=1",
                200,
                r#"[{"url": "https://gofile.io/d/first"}]"#,
            )
            .with_page("https://gofilelab.com/api/newest?page=2", 429, "slow down");
        let (strategy, fetcher) = strategy(fetcher);

        let harvest = strategy.collect(&HashSet::new(), &open(), 10).await;

        assert_eq!(harvest.candidates.len(), 1);
        assert_eq!(harvest.failures.len(), 1);
        assert_eq!(fetcher.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_failure() {
        let fetcher = StubFetcher::default().with_page(
            "https://gofilelab.com/api/newest?page=1",
            200,
            "<html>challenge</html>",
        );
        let (strategy, _) = strategy(fetcher);

        let harvest = strategy.collect(&HashSet::new(), &open(), 10).await;

        assert!(harvest.candidates.is_empty());
        assert!(matches!(harvest.failures[0], AppError::Fetch { .. }));
    }
}
