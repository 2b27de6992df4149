//! Accumulated results of one discovery strategy.

use std::collections::HashSet;

use crate::error::AppError;
use crate::models::{Candidate, StrategyKind};

/// Why a strategy stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Ran out of pages/resources
    Exhausted,
    /// Hit the result ceiling
    CapReached,
    /// The run deadline passed
    Deadline,
}

/// Candidates found by one strategy, plus what went wrong along the way.
#[derive(Debug)]
pub struct Harvest {
    pub strategy: StrategyKind,
    /// Accepted candidates in first-seen order
    pub candidates: Vec<Candidate>,
    /// Per-resource failures that were absorbed
    pub failures: Vec<AppError>,
    /// Links dropped because they were already published
    pub skipped_seen: usize,
    /// Resources requested
    pub requests: usize,
    pub stop: StopReason,
    cap: usize,
    accepted: HashSet<String>,
}

impl Harvest {
    pub fn new(strategy: StrategyKind, cap: usize) -> Self {
        Self {
            strategy,
            candidates: Vec::new(),
            failures: Vec::new(),
            skipped_seen: 0,
            requests: 0,
            stop: StopReason::Exhausted,
            cap,
            accepted: HashSet::new(),
        }
    }

    /// Offer a discovered link. Duplicates and links in `excluded` are
    /// dropped. Returns true once the harvest is full.
    pub fn offer(&mut self, raw: &str, excluded: &HashSet<String>) -> bool {
        if self.is_full() {
            return true;
        }
        let candidate = Candidate::new(raw);
        if candidate.canonical.is_empty() {
            return false;
        }
        if excluded.contains(&candidate.canonical) {
            if self.accepted.insert(candidate.canonical) {
                self.skipped_seen += 1;
            }
            return false;
        }
        if self.accepted.insert(candidate.canonical.clone()) {
            self.candidates.push(candidate);
        }
        self.is_full()
    }

    /// Offer several links, stopping as soon as the harvest is full.
    pub fn offer_all<I, S>(&mut self, links: I, excluded: &HashSet<String>) -> bool
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for link in links {
            if self.offer(link.as_ref(), excluded) {
                return true;
            }
        }
        self.is_full()
    }

    pub fn is_full(&self) -> bool {
        self.candidates.len() >= self.cap
    }

    /// Record an absorbed failure.
    pub fn fail(&mut self, error: AppError) {
        log::warn!("[{:?}] {}", self.strategy, error);
        self.failures.push(error);
    }

    pub fn finish(mut self, stop: StopReason) -> Self {
        self.stop = stop;
        log::info!(
            "[{:?}] stopped ({:?}): {} candidates, {} already seen, {} requests, {} failures",
            self.strategy,
            stop,
            self.candidates.len(),
            self.skipped_seen,
            self.requests,
            self.failures.len()
        );
        self
    }
}
