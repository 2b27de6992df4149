// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, LOCATION, REFERER};
use reqwest::{Client, Proxy, redirect};

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// A fetched resource, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl FetchedPage {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body, or a fetch error naming the status.
    pub fn into_success(self) -> Result<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(AppError::fetch(self.url, format!("status {}", self.status)))
        }
    }
}

/// Network access used by the discovery strategies.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET a resource, following redirects.
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage>;

    /// Issue a no-body request without following redirects and return the
    /// `Location` it points to, if any.
    async fn redirect_location(&self, url: &str, timeout: Duration) -> Result<Option<String>>;
}

/// Build a client with the configured headers, timeout and proxy.
pub fn create_client(config: &HttpConfig) -> Result<Client> {
    builder(config)?.build().map_err(AppError::from)
}

/// Build a client that reports redirects instead of following them.
pub fn create_no_redirect_client(config: &HttpConfig) -> Result<Client> {
    builder(config)?
        .redirect(redirect::Policy::none())
        .build()
        .map_err(AppError::from)
}

fn builder(config: &HttpConfig) -> Result<reqwest::ClientBuilder> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, header_value(&config.accept)?);
    headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
    headers.insert(REFERER, header_value(&config.referer)?);

    let mut builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .no_proxy();

    if let Some(proxy) = &config.proxy {
        builder = builder.proxy(Proxy::all(proxy)?);
    }
    Ok(builder)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid header value '{value}': {e}")))
}

/// `Fetcher` backed by reqwest.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    no_redirect: Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(config)?,
            no_redirect: create_no_redirect_client(config)?,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FetchedPage> {
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(FetchedPage {
            url: url.to_string(),
            status,
            body,
        })
    }

    async fn redirect_location(&self, url: &str, timeout: Duration) -> Result<Option<String>> {
        let response = self.no_redirect.head(url).timeout(timeout).send().await?;
        if !response.status().is_redirection() {
            return Ok(None);
        }
        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string()))
    }
}
