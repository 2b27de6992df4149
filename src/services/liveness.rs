//! Link liveness probing.
//!
//! A probe never fails: transport trouble, throttling and server errors are
//! reported as [`Verdict::Unknown`], which is still postable. Only a fatal
//! status or a removal phrase in the page, whatever its status, marks a
//! link dead.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};

use crate::error::Result;
use crate::models::{HttpConfig, LivenessConfig};
use crate::utils::http::create_client;

/// What proved a link dead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathSignal {
    Status(u16),
    Phrase(String),
}

impl fmt::Display for DeathSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status {status}"),
            Self::Phrase(phrase) => write!(f, "page says \"{phrase}\""),
        }
    }
}

/// Result of probing one link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Alive,
    Dead(DeathSignal),
    /// The probe could not decide; the reason is informational
    Unknown(String),
}

impl Verdict {
    pub fn is_postable(&self) -> bool {
        !matches!(self, Self::Dead(_))
    }
}

#[async_trait]
pub trait LinkProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Verdict;
}

/// Statuses and page phrases that mean the content is gone.
#[derive(Debug, Clone)]
pub struct FatalSignals {
    statuses: Vec<u16>,
    phrases: Vec<String>,
}

impl FatalSignals {
    pub fn new(config: &LivenessConfig) -> Self {
        Self {
            statuses: config.dead_statuses.clone(),
            phrases: config.death_phrases.clone(),
        }
    }

    pub fn classify_status(&self, status: u16) -> Option<DeathSignal> {
        self.statuses
            .contains(&status)
            .then_some(DeathSignal::Status(status))
    }

    /// Case-insensitive search for a removal phrase.
    pub fn classify_body(&self, body: &str) -> Option<DeathSignal> {
        let body = body.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| body.contains(&phrase.to_lowercase()))
            .map(|phrase| DeathSignal::Phrase(phrase.clone()))
    }
}

/// HEAD first, then a GET reading only the start of the body.
pub struct HttpLinkProbe {
    client: Client,
    signals: FatalSignals,
    request_timeout: Duration,
    budget: Duration,
    retries: u32,
    retry_delay: Duration,
    body_limit: usize,
}

impl HttpLinkProbe {
    pub fn new(http: &HttpConfig, config: &LivenessConfig) -> Result<Self> {
        Ok(Self {
            client: create_client(http)?,
            signals: FatalSignals::new(config),
            request_timeout: Duration::from_millis(config.request_timeout_ms),
            budget: Duration::from_millis(config.probe_budget_ms),
            retries: config.retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            body_limit: config.body_limit_bytes,
        })
    }

    /// Send a request, retrying transport failures only.
    async fn send(&self, request: RequestBuilder) -> reqwest::Result<Response> {
        let request = request.timeout(self.request_timeout);
        let mut attempt = 0;
        loop {
            let Some(this) = request.try_clone() else {
                return request.send().await;
            };
            match this.send().await {
                Ok(response) => return Ok(response),
                Err(e) if attempt >= self.retries => return Err(e),
                Err(e) => {
                    log::debug!("Probe request failed ({}), retrying", e);
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
            }
        }
    }

    /// Read at most `body_limit` bytes of the body.
    async fn body_prefix(&self, mut response: Response) -> String {
        let mut buf = Vec::new();
        while buf.len() < self.body_limit {
            match response.chunk().await {
                Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
                Ok(None) => break,
                Err(e) => {
                    log::debug!("Probe body read failed: {}", e);
                    break;
                }
            }
        }
        buf.truncate(self.body_limit);
        String::from_utf8_lossy(&buf).into_owned()
    }

    async fn check(&self, url: &str) -> Verdict {
        match self.send(self.client.head(url)).await {
            Ok(response) => {
                if let Some(signal) = self.signals.classify_status(response.status().as_u16()) {
                    return Verdict::Dead(signal);
                }
            }
            Err(e) => log::debug!("HEAD {} failed: {}", url, e),
        }

        let response = match self.send(self.client.get(url)).await {
            Ok(response) => response,
            Err(e) => return Verdict::Unknown(format!("transport: {e}")),
        };

        let status = response.status();
        if let Some(signal) = self.signals.classify_status(status.as_u16()) {
            return Verdict::Dead(signal);
        }

        // Error pages can still carry a removal notice.
        let body = self.body_prefix(response).await;
        match self.signals.classify_body(&body) {
            Some(signal) => Verdict::Dead(signal),
            None if status.is_success() => Verdict::Alive,
            None => Verdict::Unknown(format!("status {}", status.as_u16())),
        }
    }
}

#[async_trait]
impl LinkProbe for HttpLinkProbe {
    async fn probe(&self, url: &str) -> Verdict {
        let verdict = match tokio::time::timeout(self.budget, self.check(url)).await {
            Ok(verdict) => verdict,
            Err(_) => Verdict::Unknown("probe budget exceeded".into()),
        };
        log::debug!("Probe {} -> {:?}", url, verdict);
        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    async fn serve(status: u16, body: &'static str, delay: Duration) -> String {
        format!("{}/d/abc", test_support::serve(status, body, delay).await)
    }

    fn probe(config: LivenessConfig) -> HttpLinkProbe {
        HttpLinkProbe::new(&HttpConfig::default(), &config).unwrap()
    }

    fn fast() -> LivenessConfig {
        LivenessConfig {
            request_timeout_ms: 1000,
            probe_budget_ms: 3000,
            retry_delay_ms: 10,
            ..LivenessConfig::default()
        }
    }

    #[test]
    fn test_classify_status() {
        let signals = FatalSignals::new(&LivenessConfig::default());
        assert_eq!(signals.classify_status(404), Some(DeathSignal::Status(404)));
        assert_eq!(signals.classify_status(451), Some(DeathSignal::Status(451)));
        assert_eq!(signals.classify_status(429), None);
        assert_eq!(signals.classify_status(503), None);
    }

    #[test]
    fn test_classify_body_ignores_case() {
        let signals = FatalSignals::new(&LivenessConfig::default());
        assert!(matches!(
            signals.classify_body("<p>THIS CONTENT DOES NOT EXIST</p>"),
            Some(DeathSignal::Phrase(_))
        ));
        assert_eq!(signals.classify_body("<p>Download ready</p>"), None);
    }

    #[test]
    fn test_only_dead_is_not_postable() {
        assert!(Verdict::Alive.is_postable());
        assert!(Verdict::Unknown("timeout".into()).is_postable());
        assert!(!Verdict::Dead(DeathSignal::Status(410)).is_postable());
    }

    #[tokio::test]
    async fn test_not_found_is_dead() {
        let url = serve(404, "gone", Duration::ZERO).await;
        assert_eq!(
            probe(fast()).probe(&url).await,
            Verdict::Dead(DeathSignal::Status(404))
        );
    }

    #[tokio::test]
    async fn test_server_error_is_postable_unknown() {
        let url = serve(503, "busy", Duration::ZERO).await;
        let verdict = probe(fast()).probe(&url).await;
        assert!(matches!(verdict, Verdict::Unknown(_)));
        assert!(verdict.is_postable());
    }

    #[tokio::test]
    async fn test_removal_phrase_on_error_status_is_dead() {
        let url = serve(403, "<p>This content does not exist</p>", Duration::ZERO).await;
        assert_eq!(
            probe(fast()).probe(&url).await,
            Verdict::Dead(DeathSignal::Phrase("This content does not exist".into()))
        );
    }

    #[tokio::test]
    async fn test_removal_phrase_is_dead() {
        let url = serve(
            200,
            "<html><body>This file has been deleted by the owner.</body></html>",
            Duration::ZERO,
        )
        .await;
        assert!(matches!(
            probe(fast()).probe(&url).await,
            Verdict::Dead(DeathSignal::Phrase(_))
        ));
    }

    #[tokio::test]
    async fn test_healthy_page_is_alive() {
        let url = serve(200, "<html><body>files</body></html>", Duration::ZERO).await;
        assert_eq!(probe(fast()).probe(&url).await, Verdict::Alive);
    }

    #[tokio::test]
    async fn test_slow_server_hits_budget() {
        let url = serve(200, "late", Duration::from_secs(5)).await;
        let config = LivenessConfig {
            request_timeout_ms: 2000,
            probe_budget_ms: 300,
            ..LivenessConfig::default()
        };

        let started = std::time::Instant::now();
        let verdict = probe(config).probe(&url).await;

        assert!(matches!(verdict, Verdict::Unknown(_)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
