//! Headless page rendering through a Browserless instance.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{HttpConfig, RenderConfig};

const AGE_GATE_SCRIPT: &str = include_str!("age_gate.js");

/// Something that turns a URL into the HTML a browser would end up showing.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScriptContext<'a> {
    url: &'a str,
    navigation_timeout_ms: u64,
    settle_ms: u64,
    consent_selectors: &'a [String],
    age_gate_markers: &'a [String],
    storage_flags: &'a BTreeMap<String, String>,
    timestamp_flag: Option<&'a str>,
    user_agent: &'a str,
}

#[derive(Debug, Serialize)]
struct FunctionRequest<'a> {
    code: &'a str,
    context: ScriptContext<'a>,
}

/// Renders pages with the `/function` API, passing the age-gate script
/// that sets consent flags and clicks through interstitials.
pub struct BrowserlessRenderer {
    client: Client,
    endpoint: Url,
    token: Option<String>,
    user_agent: String,
    config: RenderConfig,
}

impl BrowserlessRenderer {
    pub fn new(endpoint: &str, http: &HttpConfig, config: &RenderConfig) -> Result<Self> {
        let base = endpoint.trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/function"))?;
        let client = Client::builder().no_proxy().build()?;

        Ok(Self {
            client,
            endpoint,
            token: config.token.clone(),
            user_agent: http.user_agent.clone(),
            config: config.clone(),
        })
    }

    /// Build a renderer when an endpoint is configured.
    pub fn from_config(http: &HttpConfig, config: &RenderConfig) -> Result<Option<Self>> {
        config
            .endpoint
            .as_deref()
            .map(|endpoint| Self::new(endpoint, http, config))
            .transpose()
    }

    fn request_url(&self, timeout: Duration) -> Url {
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(token) = &self.token {
                query.append_pair("token", token);
            }
            query.append_pair("timeout", &timeout.as_millis().to_string());
        }
        url
    }

    fn request_body<'a>(&'a self, url: &'a str, timeout: Duration) -> FunctionRequest<'a> {
        FunctionRequest {
            code: AGE_GATE_SCRIPT,
            context: ScriptContext {
                url,
                navigation_timeout_ms: timeout.as_millis() as u64,
                settle_ms: self.config.settle_ms,
                consent_selectors: &self.config.consent_selectors,
                age_gate_markers: &self.config.age_gate_markers,
                storage_flags: &self.config.storage_flags,
                timestamp_flag: self.config.timestamp_flag.as_deref(),
                user_agent: &self.user_agent,
            },
        }
    }
}

#[async_trait]
impl PageRenderer for BrowserlessRenderer {
    async fn render(&self, url: &str, timeout: Duration) -> Result<String> {
        let settle = Duration::from_millis(self.config.settle_ms);
        let response = self
            .client
            .post(self.request_url(timeout))
            .timeout(timeout + settle + Duration::from_secs(5))
            .json(&self.request_body(url, timeout))
            .send()
            .await
            .map_err(|e| AppError::render(url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AppError::render(url, e))?;
        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(AppError::render(
                url,
                format!("renderer returned {}: {}", status.as_u16(), snippet),
            ));
        }

        log::debug!("Rendered {} ({} bytes)", url, body.len());
        Ok(body)
    }
}
