//! Storage abstractions for relay state.
//!
//! The state is a single small JSON record read once per run and written
//! back whole at checkpoints.

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::PersistedState;

// Re-export for convenience
pub use local::LocalStateStore;

/// Trait for state storage backends.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state. A missing or unreadable record yields a fresh state.
    async fn load(&self) -> PersistedState;

    /// Replace the stored record atomically.
    async fn save(&self, state: &PersistedState) -> Result<()>;
}
