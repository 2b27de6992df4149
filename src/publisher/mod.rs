//! Publishing targets.

pub mod x;

use async_trait::async_trait;

use crate::error::Result;

pub use x::XPublisher;

/// One post, ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub text: String,
    pub community_id: Option<String>,
    pub share_with_followers: bool,
}

/// A destination for finished posts.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish and return the platform's id for the new post.
    async fn publish(&self, post: &Post) -> Result<String>;
}

/// Logs the post instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunPublisher;

#[async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, post: &Post) -> Result<String> {
        log::info!("[dry-run] would publish:\n{}", post.text);
        if let Some(community) = &post.community_id {
            log::info!(
                "[dry-run] community {} (share with followers: {})",
                community,
                post.share_with_followers
            );
        }
        Ok("dry-run".to_string())
    }
}
