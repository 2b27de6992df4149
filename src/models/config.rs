//! Application configuration structures.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Run-level budget and state location
    #[serde(default)]
    pub run: RunConfig,

    /// Daily quota and batch sizing
    #[serde(default)]
    pub quota: QuotaConfig,

    /// HTTP client settings shared by every fetcher
    #[serde(default)]
    pub http: HttpConfig,

    /// What a target link looks like and how intermediates are resolved
    #[serde(default)]
    pub links: LinkConfig,

    /// Discovery strategies
    #[serde(default)]
    pub collector: CollectorConfig,

    /// Liveness probing
    #[serde(default)]
    pub liveness: LivenessConfig,

    /// Publishing target
    #[serde(default)]
    pub publisher: PublisherConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(limit) = get("RELAY_DAILY_LIMIT").and_then(|v| v.parse().ok()) {
            self.quota.daily_limit = limit;
        }
        if let Some(size) = get("RELAY_BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.quota.batch_size = size;
        }
        if let Some(secs) = get("RELAY_TIME_BUDGET_SECS").and_then(|v| v.parse().ok()) {
            self.run.time_budget_secs = secs;
        }
        if let Some(id) = get("X_COMMUNITY_ID") {
            self.publisher.community_id = Some(id);
        }
        if let Some(flag) = get("X_SHARE_WITH_FOLLOWERS") {
            self.publisher.share_with_followers =
                matches!(flag.to_lowercase().as_str(), "1" | "true" | "yes");
        }
        if let Some(endpoint) = get("BROWSERLESS_URL") {
            self.collector.render.endpoint = Some(endpoint);
        }
        if let Some(token) = get("BROWSERLESS_TOKEN") {
            self.collector.render.token = Some(token);
        }
        if self.http.proxy.is_none() {
            self.http.proxy = get("HTTPS_PROXY")
                .or_else(|| get("https_proxy"))
                .or_else(|| get("HTTP_PROXY"))
                .or_else(|| get("http_proxy"));
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.quota.daily_limit == 0 {
            return Err(AppError::validation("quota.daily_limit must be > 0"));
        }
        if self.quota.batch_size == 0 {
            return Err(AppError::validation("quota.batch_size must be > 0"));
        }
        if self.quota.posting_offset().is_none() {
            return Err(AppError::validation(
                "quota.utc_offset_hours must be within -23..=23",
            ));
        }
        if self.run.time_budget_secs == 0 {
            return Err(AppError::validation("run.time_budget_secs must be > 0"));
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        if let Err(e) = regex::Regex::new(&self.links.target_pattern) {
            return Err(AppError::validation(format!(
                "links.target_pattern is invalid: {e}"
            )));
        }
        if let Err(e) = regex::Regex::new(&self.links.intermediate_path_pattern) {
            return Err(AppError::validation(format!(
                "links.intermediate_path_pattern is invalid: {e}"
            )));
        }
        if self.collector.strategies.is_empty() {
            return Err(AppError::validation("collector.strategies is empty"));
        }
        if self.collector.max_results < self.quota.batch_size {
            return Err(AppError::validation(
                "collector.max_results must be >= quota.batch_size",
            ));
        }
        if !self.collector.api.url_template.contains("{page}") {
            return Err(AppError::validation(
                "collector.api.url_template must contain {page}",
            ));
        }
        if !self.collector.listing.url_template.contains("{page}") {
            return Err(AppError::validation(
                "collector.listing.url_template must contain {page}",
            ));
        }
        if !self.collector.render.list_url_template.contains("{page}") {
            return Err(AppError::validation(
                "collector.render.list_url_template must contain {page}",
            ));
        }
        if let Err(e) = regex::Regex::new(&self.collector.render.article_pattern) {
            return Err(AppError::validation(format!(
                "collector.render.article_pattern is invalid: {e}"
            )));
        }
        if self.liveness.request_timeout_ms == 0 {
            return Err(AppError::validation(
                "liveness.request_timeout_ms must be > 0",
            ));
        }
        if self.liveness.probe_budget_ms < self.liveness.request_timeout_ms {
            return Err(AppError::validation(
                "liveness.probe_budget_ms must be >= liveness.request_timeout_ms",
            ));
        }
        if self.publisher.tweet_limit == 0 {
            return Err(AppError::validation("publisher.tweet_limit must be > 0"));
        }
        Ok(())
    }
}

/// Run-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Wall-clock budget for the whole run
    #[serde(default = "defaults::time_budget")]
    pub time_budget_secs: u64,

    /// State file name, relative to the storage directory
    #[serde(default = "defaults::state_file")]
    pub state_file: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: defaults::time_budget(),
            state_file: defaults::state_file(),
        }
    }
}

/// Daily quota settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaConfig {
    /// Successful posts allowed per local calendar day
    #[serde(default = "defaults::daily_limit")]
    pub daily_limit: u32,

    /// Links per post
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    /// Offset of the timezone that defines a "day"
    #[serde(default = "defaults::utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl QuotaConfig {
    /// The fixed offset used for day rollover, if the configured hours are valid.
    pub fn posting_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours.checked_mul(3600)?)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            daily_limit: defaults::daily_limit(),
            batch_size: defaults::batch_size(),
            utc_offset_hours: defaults::utc_offset_hours(),
        }
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Referer header sent to the index site
    #[serde(default = "defaults::referer")]
    pub referer: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Explicit proxy for every request
    #[serde(default)]
    pub proxy: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            accept: defaults::accept(),
            accept_language: defaults::accept_language(),
            referer: defaults::referer(),
            timeout_secs: defaults::timeout(),
            proxy: None,
        }
    }
}

/// Target link recognition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Pattern a publishable link must match
    #[serde(default = "defaults::target_pattern")]
    pub target_pattern: String,

    /// Host suffix of the index site's intermediate links
    #[serde(default = "defaults::intermediate_host")]
    pub intermediate_host: String,

    /// Path pattern of intermediate short links on that host
    #[serde(default = "defaults::intermediate_path_pattern")]
    pub intermediate_path_pattern: String,

    /// Query parameters that may carry the redirect target
    #[serde(default = "defaults::redirect_params")]
    pub redirect_params: Vec<String>,

    /// Anchor attributes that may carry a copyable link
    #[serde(default = "defaults::data_attributes")]
    pub data_attributes: Vec<String>,

    /// Timeout for the single no-body resolution request
    #[serde(default = "defaults::resolve_timeout")]
    pub resolve_timeout_secs: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            target_pattern: defaults::target_pattern(),
            intermediate_host: defaults::intermediate_host(),
            intermediate_path_pattern: defaults::intermediate_path_pattern(),
            redirect_params: defaults::redirect_params(),
            data_attributes: defaults::data_attributes(),
            resolve_timeout_secs: defaults::resolve_timeout(),
        }
    }
}

/// Discovery strategy variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Sitemap index and its documents
    Sitemap,
    /// Paged JSON listing endpoint
    Api,
    /// Plain HTML listing pages
    Listing,
    /// Headless-browser crawl
    Render,
}

/// Collector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Strategies in priority order
    #[serde(default = "defaults::strategies")]
    pub strategies: Vec<StrategyKind>,

    /// Ceiling on accepted candidates per strategy
    #[serde(default = "defaults::max_results")]
    pub max_results: usize,

    #[serde(default)]
    pub sitemap: SitemapConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub render: RenderConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            strategies: defaults::strategies(),
            max_results: defaults::max_results(),
            sitemap: SitemapConfig::default(),
            api: ApiConfig::default(),
            listing: ListingConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

/// Sitemap strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Top-level sitemap index
    #[serde(default = "defaults::sitemap_url")]
    pub index_url: String,

    /// Nested sitemaps followed from the index
    #[serde(default = "defaults::max_child_sitemaps")]
    pub max_child_sitemaps: usize,

    /// Documents fetched and scanned for links
    #[serde(default = "defaults::max_documents")]
    pub max_documents: usize,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            index_url: defaults::sitemap_url(),
            max_child_sitemaps: defaults::max_child_sitemaps(),
            max_documents: defaults::max_documents(),
        }
    }
}

/// Paged API strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Endpoint with a `{page}` placeholder
    #[serde(default = "defaults::api_url")]
    pub url_template: String,

    #[serde(default = "defaults::api_max_pages")]
    pub max_pages: u32,

    /// Keys under which a page's item array may live
    #[serde(default = "defaults::items_keys")]
    pub items_keys: Vec<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url_template: defaults::api_url(),
            max_pages: defaults::api_max_pages(),
            items_keys: defaults::items_keys(),
        }
    }
}

/// HTML listing strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Listing page with a `{page}` placeholder
    #[serde(default = "defaults::listing_url")]
    pub url_template: String,

    #[serde(default = "defaults::listing_max_pages")]
    pub max_pages: u32,

    /// Attempts per page before giving up on it
    #[serde(default = "defaults::listing_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, doubled each time
    #[serde(default = "defaults::listing_backoff")]
    pub backoff_ms: u64,

    /// Pause between pages
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            url_template: defaults::listing_url(),
            max_pages: defaults::listing_max_pages(),
            max_attempts: defaults::listing_attempts(),
            backoff_ms: defaults::listing_backoff(),
            page_delay_ms: defaults::page_delay(),
        }
    }
}

/// Rendered crawl settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Browserless base URL; the strategy is disabled without it
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Browserless token
    #[serde(default)]
    pub token: Option<String>,

    /// List page with a `{page}` placeholder
    #[serde(default = "defaults::listing_url")]
    pub list_url_template: String,

    #[serde(default = "defaults::render_max_pages")]
    pub max_pages: u32,

    /// Articles rendered across all list pages
    #[serde(default = "defaults::max_articles")]
    pub max_articles: usize,

    /// Path pattern of article links on the index site
    #[serde(default = "defaults::article_pattern")]
    pub article_pattern: String,

    /// Navigation timeout inside the browser
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Wait after the page settles before reading the DOM
    #[serde(default = "defaults::settle")]
    pub settle_ms: u64,

    /// Consent controls, tried in order; the first present one is clicked
    #[serde(default = "defaults::consent_selectors")]
    pub consent_selectors: Vec<String>,

    /// Page text that indicates an age gate
    #[serde(default = "defaults::age_gate_markers")]
    pub age_gate_markers: Vec<String>,

    /// localStorage entries written to pass the age gate
    #[serde(default = "defaults::storage_flags")]
    pub storage_flags: BTreeMap<String, String>,

    /// localStorage key that receives the current time in epoch millis
    #[serde(default = "defaults::timestamp_flag")]
    pub timestamp_flag: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            list_url_template: defaults::listing_url(),
            max_pages: defaults::render_max_pages(),
            max_articles: defaults::max_articles(),
            article_pattern: defaults::article_pattern(),
            navigation_timeout_secs: defaults::navigation_timeout(),
            settle_ms: defaults::settle(),
            consent_selectors: defaults::consent_selectors(),
            age_gate_markers: defaults::age_gate_markers(),
            storage_flags: defaults::storage_flags(),
            timestamp_flag: defaults::timestamp_flag(),
        }
    }
}

/// Liveness probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessConfig {
    /// Timeout of each individual request
    #[serde(default = "defaults::request_timeout")]
    pub request_timeout_ms: u64,

    /// Hard cap on one probe, retry included
    #[serde(default = "defaults::probe_budget")]
    pub probe_budget_ms: u64,

    /// Retries after a transport failure
    #[serde(default = "defaults::retries")]
    pub retries: u32,

    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,

    /// Body prefix searched for death phrases
    #[serde(default = "defaults::body_limit")]
    pub body_limit_bytes: usize,

    /// Status codes that mean the link is gone
    #[serde(default = "defaults::dead_statuses")]
    pub dead_statuses: Vec<u16>,

    /// Phrases that mean the content was removed
    #[serde(default = "defaults::death_phrases")]
    pub death_phrases: Vec<String>,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: defaults::request_timeout(),
            probe_budget_ms: defaults::probe_budget(),
            retries: defaults::retries(),
            retry_delay_ms: defaults::retry_delay(),
            body_limit_bytes: defaults::body_limit(),
            dead_statuses: defaults::dead_statuses(),
            death_phrases: defaults::death_phrases(),
        }
    }
}

/// Publisher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Post creation endpoint
    #[serde(default = "defaults::publish_endpoint")]
    pub endpoint: String,

    /// Community to post into
    #[serde(default)]
    pub community_id: Option<String>,

    /// Also show a community post to followers
    #[serde(default)]
    pub share_with_followers: bool,

    /// Maximum weighted post length
    #[serde(default = "defaults::tweet_limit")]
    pub tweet_limit: usize,

    /// Weight of every URL in the post length
    #[serde(default = "defaults::url_weight")]
    pub url_weight: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::publish_endpoint(),
            community_id: None,
            share_with_followers: false,
            tweet_limit: defaults::tweet_limit(),
            url_weight: defaults::url_weight(),
        }
    }
}

mod defaults {
    use super::StrategyKind;
    use std::collections::BTreeMap;

    // Run defaults
    pub fn time_budget() -> u64 {
        180
    }
    pub fn state_file() -> String {
        "state.json".into()
    }

    // Quota defaults
    pub fn daily_limit() -> u32 {
        3
    }
    pub fn batch_size() -> usize {
        3
    }
    pub fn utc_offset_hours() -> i32 {
        9
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
            .into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8".into()
    }
    pub fn accept_language() -> String {
        "ja-JP,ja;q=0.9,en-US;q=0.8,en;q=0.7".into()
    }
    pub fn referer() -> String {
        "https://gofilelab.com/newest".into()
    }
    pub fn timeout() -> u64 {
        12
    }

    // Link defaults
    pub fn target_pattern() -> String {
        r"(?i)https?://gofile\.io/d/[A-Za-z0-9]+".into()
    }
    pub fn intermediate_host() -> String {
        "gofilelab.com".into()
    }
    pub fn intermediate_path_pattern() -> String {
        r"^/(?:out|redirect|go|r)(?:/|$)".into()
    }
    pub fn redirect_params() -> Vec<String> {
        vec!["url".into(), "u".into(), "target".into()]
    }
    pub fn data_attributes() -> Vec<String> {
        vec![
            "data-url".into(),
            "data-clipboard-text".into(),
            "data-href".into(),
        ]
    }
    pub fn resolve_timeout() -> u64 {
        8
    }

    // Collector defaults
    pub fn strategies() -> Vec<StrategyKind> {
        vec![
            StrategyKind::Sitemap,
            StrategyKind::Api,
            StrategyKind::Listing,
            StrategyKind::Render,
        ]
    }
    pub fn max_results() -> usize {
        60
    }
    pub fn sitemap_url() -> String {
        "https://gofilelab.com/sitemap.xml".into()
    }
    pub fn max_child_sitemaps() -> usize {
        3
    }
    pub fn max_documents() -> usize {
        40
    }
    pub fn api_url() -> String {
        "https://gofilelab.com/api/newest?page={page}".into()
    }
    pub fn api_max_pages() -> u32 {
        20
    }
    pub fn items_keys() -> Vec<String> {
        vec![
            "items".into(),
            "data".into(),
            "posts".into(),
            "results".into(),
        ]
    }
    pub fn listing_url() -> String {
        "https://gofilelab.com/newest?page={page}".into()
    }
    pub fn listing_max_pages() -> u32 {
        100
    }
    pub fn listing_attempts() -> u32 {
        3
    }
    pub fn listing_backoff() -> u64 {
        700
    }
    pub fn page_delay() -> u64 {
        800
    }
    pub fn render_max_pages() -> u32 {
        5
    }
    pub fn max_articles() -> usize {
        40
    }
    pub fn article_pattern() -> String {
        r"^/(?:posts?|articles?|entry|v)/[^/?#]+".into()
    }
    pub fn navigation_timeout() -> u64 {
        20
    }
    pub fn settle() -> u64 {
        1200
    }
    pub fn consent_selectors() -> Vec<String> {
        vec![
            "::-p-text(はい)".into(),
            "::-p-text(同意)".into(),
            "::-p-text(Enter)".into(),
            "::-p-text(I Agree)".into(),
            "::-p-text(Agree)".into(),
            "button::-p-text(はい)".into(),
            "button::-p-text(同意)".into(),
            "button::-p-text(Enter)".into(),
            "button::-p-text(I Agree)".into(),
            "[data-testid='age-accept']".into(),
        ]
    }
    pub fn age_gate_markers() -> Vec<String> {
        vec!["年齢確認".into(), "I am over".into(), "Agree".into()]
    }
    pub fn storage_flags() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("ageVerified".into(), "1".into()),
            ("adult".into(), "true".into()),
            ("age_verified".into(), "true".into()),
        ])
    }
    pub fn timestamp_flag() -> Option<String> {
        Some("age_verified_at".into())
    }

    // Liveness defaults
    pub fn request_timeout() -> u64 {
        800
    }
    pub fn probe_budget() -> u64 {
        2000
    }
    pub fn retries() -> u32 {
        1
    }
    pub fn retry_delay() -> u64 {
        250
    }
    pub fn body_limit() -> usize {
        4096
    }
    pub fn dead_statuses() -> Vec<u16> {
        vec![404, 410, 451]
    }
    pub fn death_phrases() -> Vec<String> {
        vec![
            "This content does not exist".into(),
            "The content you are looking for could not be found".into(),
            "has been automatically removed".into(),
            "has been deleted by the owner".into(),
        ]
    }

    // Publisher defaults
    pub fn publish_endpoint() -> String {
        "https://api.twitter.com/2/tweets".into()
    }
    pub fn tweet_limit() -> usize {
        280
    }
    pub fn url_weight() -> usize {
        23
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch() {
        let mut config = Config::default();
        config.quota.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_target_pattern() {
        let mut config = Config::default();
        config.links.target_pattern = "([".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_template_without_page() {
        let mut config = Config::default();
        config.collector.api.url_template = "https://example.com/api".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [quota]
            daily_limit = 5

            [collector]
            strategies = ["api", "render"]
            "#,
        )
        .unwrap();

        assert_eq!(config.quota.daily_limit, 5);
        assert_eq!(config.quota.batch_size, 3);
        assert_eq!(
            config.collector.strategies,
            vec![StrategyKind::Api, StrategyKind::Render]
        );
        assert_eq!(config.liveness.dead_statuses, vec![404, 410, 451]);
    }

    #[test]
    fn overrides_apply_from_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RELAY_DAILY_LIMIT", "2"),
            ("X_COMMUNITY_ID", " 12345 "),
            ("X_SHARE_WITH_FOLLOWERS", "Yes"),
            ("BROWSERLESS_URL", "http://chrome:3000"),
            ("HTTP_PROXY", "http://proxy:8080"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.quota.daily_limit, 2);
        assert_eq!(config.publisher.community_id.as_deref(), Some("12345"));
        assert!(config.publisher.share_with_followers);
        assert_eq!(
            config.collector.render.endpoint.as_deref(),
            Some("http://chrome:3000")
        );
        assert_eq!(config.http.proxy.as_deref(), Some("http://proxy:8080"));
    }

    #[test]
    fn overrides_ignore_unparsable_numbers() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "RELAY_DAILY_LIMIT").then(|| "lots".to_string()));
        assert_eq!(config.quota.daily_limit, 3);
    }

    #[test]
    fn posting_offset_is_tokyo_by_default() {
        let offset = QuotaConfig::default().posting_offset().unwrap();
        assert_eq!(offset.local_minus_utc(), 9 * 3600);
    }
}
