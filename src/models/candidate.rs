//! A discovered link on its way through the pipeline.

use serde::{Deserialize, Serialize};

use crate::utils::url::normalize;

/// A link found by a strategy, not yet known to be fresh or alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// As discovered
    pub raw: String,
    /// Canonical form used for comparisons
    pub canonical: String,
}

impl Candidate {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let canonical = normalize(&raw);
        Self { raw, canonical }
    }
}

impl From<&str> for Candidate {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
