//! X (Twitter) API v2 publisher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};

use super::{Post, Publisher};
use crate::error::{AppError, Result};
use crate::models::{HttpConfig, PublisherConfig};

/// Environment variable holding the user-context bearer token.
pub const TOKEN_ENV: &str = "X_BEARER_TOKEN";

#[derive(Debug, Serialize)]
struct CreatePost<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    community_id: Option<&'a str>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    share_with_followers: bool,
}

impl<'a> From<&'a Post> for CreatePost<'a> {
    fn from(post: &'a Post) -> Self {
        let community_id = post.community_id.as_deref();
        Self {
            text: &post.text,
            community_id,
            share_with_followers: community_id.is_some() && post.share_with_followers,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Created {
    data: CreatedData,
}

#[derive(Debug, Deserialize)]
struct CreatedData {
    id: String,
}

pub struct XPublisher {
    client: Client,
    endpoint: String,
    token: String,
}

impl XPublisher {
    pub fn new(
        config: &PublisherConfig,
        http: &HttpConfig,
        token: impl Into<String>,
    ) -> Result<Self> {
        let mut builder = Client::builder().timeout(Duration::from_secs(20)).no_proxy();
        if let Some(proxy) = &http.proxy {
            builder = builder.proxy(Proxy::all(proxy)?);
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: token.into(),
        })
    }

    /// Build from the token in the environment.
    pub fn from_env(config: &PublisherConfig, http: &HttpConfig) -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::config(format!("{TOKEN_ENV} is not set")))?;
        Self::new(config, http, token)
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, post: &Post) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&CreatePost::from(post))
            .send()
            .await
            .map_err(AppError::publish)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(AppError::publish)?;

        match status {
            401 | 403 => Err(AppError::Unauthorized {
                status,
                message: body,
            }),
            200..=299 => {
                let created: Created = serde_json::from_str(&body)
                    .map_err(|e| AppError::publish(format!("unexpected response: {e}")))?;
                log::info!("Published post {}", created.data.id);
                Ok(created.data.id)
            }
            _ => Err(AppError::publish(format!("status {status}: {body}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve;

    fn post(community: Option<&str>, share: bool) -> Post {
        Post {
            text: "1. https://gofile.io/d/a".into(),
            community_id: community.map(String::from),
            share_with_followers: share,
        }
    }

    fn publisher(endpoint: String) -> XPublisher {
        let config = PublisherConfig {
            endpoint,
            ..PublisherConfig::default()
        };
        XPublisher::new(&config, &HttpConfig::default(), "token").unwrap()
    }

    #[test]
    fn test_plain_post_body() {
        let post = post(None, true);
        let body = serde_json::to_value(CreatePost::from(&post)).unwrap();
        assert_eq!(body, serde_json::json!({"text": "1. https://gofile.io/d/a"}));
    }

    #[test]
    fn test_community_post_body() {
        let post = post(Some("1234"), true);
        let body = serde_json::to_value(CreatePost::from(&post)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "text": "1. https://gofile.io/d/a",
                "community_id": "1234",
                "share_with_followers": true
            })
        );
    }

    #[tokio::test]
    async fn test_created_post_returns_id() {
        let base = serve(
            201,
            r#"{"data":{"id":"1790","text":"1. https://t.co/x"}}"#,
            Duration::ZERO,
        )
        .await;
        let id = publisher(format!("{base}/2/tweets"))
            .publish(&post(None, false))
            .await
            .unwrap();
        assert_eq!(id, "1790");
    }

    #[tokio::test]
    async fn test_forbidden_is_unauthorized() {
        let base = serve(403, r#"{"title":"Forbidden"}"#, Duration::ZERO).await;
        let err = publisher(format!("{base}/2/tweets"))
            .publish(&post(None, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized { status: 403, .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_server_error_is_publish_error() {
        let base = serve(500, "oops", Duration::ZERO).await;
        let err = publisher(format!("{base}/2/tweets"))
            .publish(&post(None, false))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Publish(_)));
    }
}
