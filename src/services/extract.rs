//! Target link extraction.
//!
//! Finds publishable links in HTML and free text: anchors, copy-button
//! `data-*` attributes and the raw markup (scripts included). Intermediate
//! short links on the index site are resolved once each.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::LinkConfig;
use crate::utils::url::{fix_scheme, host_matches, query_param, resolve_url};
use crate::utils::{Deadline, Fetcher};

/// Something found in a document before any network work.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Found {
    Target(String),
    Intermediate(String),
}

/// Recognizes target links and resolves intermediate ones.
pub struct LinkExtractor {
    target: Regex,
    intermediate_path: Regex,
    config: LinkConfig,
}

impl LinkExtractor {
    pub fn new(config: &LinkConfig) -> Result<Self> {
        Ok(Self {
            target: Regex::new(&config.target_pattern)?,
            intermediate_path: Regex::new(&config.intermediate_path_pattern)?,
            config: config.clone(),
        })
    }

    /// Every target link in `text`, in order of appearance.
    pub fn find_targets(&self, text: &str) -> Vec<String> {
        let text = text.replace("htps://", "https://");
        self.target
            .find_iter(&text)
            .map(|m| fix_scheme(m.as_str().trim()))
            .collect()
    }

    /// The first target link in `text`.
    pub fn match_target(&self, text: &str) -> Option<String> {
        self.find_targets(text).into_iter().next()
    }

    /// Whether `url` is a short link on the index site that points elsewhere.
    pub fn is_intermediate(&self, url: &str) -> bool {
        if !host_matches(url, &self.config.intermediate_host) {
            return false;
        }
        if query_param(url, &self.config.redirect_params).is_some() {
            return true;
        }
        Url::parse(url).is_ok_and(|u| self.intermediate_path.is_match(u.path()))
    }

    /// Resolve an intermediate link to a target link, one hop at most.
    ///
    /// Tries, in order: a target embedded in a redirect query parameter, the
    /// `Location` of a single no-body request, and finally the string itself.
    pub async fn resolve(
        &self,
        url: &str,
        fetcher: &dyn Fetcher,
        deadline: &Deadline,
    ) -> Option<String> {
        let url = fix_scheme(url.trim());

        if let Some(embedded) = query_param(&url, &self.config.redirect_params) {
            if let Some(target) = self.match_target(&embedded) {
                return Some(target);
            }
        }

        if !deadline.expired() {
            let timeout = deadline.clamp(std::time::Duration::from_secs(
                self.config.resolve_timeout_secs,
            ));
            match fetcher.redirect_location(&url, timeout).await {
                Ok(Some(location)) => {
                    if let Some(target) = self.match_target(&location) {
                        log::debug!("Resolved {} -> {}", url, target);
                        return Some(target);
                    }
                }
                Ok(None) => {}
                Err(e) => log::debug!("Resolution request for {} failed: {}", url, e),
            }
        }

        self.match_target(&url)
    }

    /// Extract target links from an HTML document, resolving intermediates.
    ///
    /// Results are deduplicated in first-seen order. Once the deadline has
    /// passed, unresolved intermediates are skipped and what was found
    /// directly is still returned.
    pub async fn extract(
        &self,
        html: &str,
        base_url: &str,
        fetcher: &dyn Fetcher,
        deadline: &Deadline,
    ) -> Vec<String> {
        let found = self.scan_html(html, base_url);
        self.settle(found, fetcher, deadline).await
    }

    /// Extract target links from a plain string value, resolving it if it is
    /// itself an intermediate link.
    pub async fn extract_text(
        &self,
        text: &str,
        base_url: &str,
        fetcher: &dyn Fetcher,
        deadline: &Deadline,
    ) -> Vec<String> {
        if text.contains("<a") {
            return self.extract(text, base_url, fetcher, deadline).await;
        }
        let mut found: Vec<Found> = self.find_targets(text).into_iter().map(Found::Target).collect();
        let trimmed = text.trim();
        if found.is_empty() && self.is_intermediate(trimmed) {
            found.push(Found::Intermediate(trimmed.to_string()));
        }
        self.settle(found, fetcher, deadline).await
    }

    async fn settle(
        &self,
        found: Vec<Found>,
        fetcher: &dyn Fetcher,
        deadline: &Deadline,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut resolved: HashMap<String, Option<String>> = HashMap::new();
        let mut links = Vec::new();

        for item in found {
            let link = match item {
                Found::Target(link) => Some(link),
                Found::Intermediate(url) => {
                    if let Some(cached) = resolved.get(&url) {
                        cached.clone()
                    } else if deadline.expired() {
                        log::debug!("Deadline passed, not resolving {}", url);
                        continue;
                    } else {
                        let target = self.resolve(&url, fetcher, deadline).await;
                        resolved.insert(url, target.clone());
                        target
                    }
                }
            };

            if let Some(link) = link {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }
        links
    }

    fn scan_html(&self, html: &str, base_url: &str) -> Vec<Found> {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();
        let mut found = Vec::new();

        if let Ok(anchor) = Selector::parse("a") {
            for element in document.select(&anchor) {
                let href = element.value().attr("href").unwrap_or("").trim();
                if !href.is_empty() {
                    let absolute = match &base {
                        Some(base) => resolve_url(base, href),
                        None => href.to_string(),
                    };
                    if let Some(target) = self.match_target(href) {
                        found.push(Found::Target(target));
                    } else if self.is_intermediate(&absolute) {
                        found.push(Found::Intermediate(absolute));
                    }
                }

                for attr in &self.config.data_attributes {
                    if let Some(value) = element.value().attr(attr) {
                        found.extend(self.find_targets(value).into_iter().map(Found::Target));
                    }
                }
            }
        }

        found.extend(self.find_targets(html).into_iter().map(Found::Target));
        found
    }
}

static SITEMAP_LOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<loc>\s*(.*?)\s*</loc>").expect("sitemap loc pattern"));

/// `<loc>` entries of a sitemap document.
pub fn sitemap_locations(xml: &str) -> Vec<String> {
    SITEMAP_LOC
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            m.as_str()
                .trim_start_matches("<![CDATA[")
                .trim_end_matches("]]>")
                .replace("&amp;", "&")
        })
        .filter(|s| !s.is_empty())
        .collect()
}
