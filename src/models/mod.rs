// src/models/mod.rs

//! Domain models for the relay.

mod candidate;
mod config;
mod state;

// Re-export all public types
pub use candidate::Candidate;
pub use config::{
    ApiConfig, CollectorConfig, Config, HttpConfig, LinkConfig, ListingConfig, LivenessConfig,
    PublisherConfig, QuotaConfig, RenderConfig, RunConfig, SitemapConfig, StrategyKind,
};
pub use state::{PersistedState, RECENT_WINDOW_HOURS, RecentEntry};
