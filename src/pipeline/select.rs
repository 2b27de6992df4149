// src/pipeline/select.rs

//! Batch selection: freshness filter plus liveness probing.

use std::collections::HashSet;

use crate::models::Candidate;
use crate::services::{DeathSignal, LinkProbe, Verdict};
use crate::utils::Deadline;
use crate::utils::url::normalize;

/// Candidates chosen for one post.
#[derive(Debug, Default)]
pub struct Selection {
    /// Postable candidates in discovery order
    pub batch: Vec<Candidate>,
    /// Candidates actually probed
    pub tested: usize,
    pub rejected: Vec<(Candidate, DeathSignal)>,
    /// Selection stopped because the deadline passed
    pub deadline_hit: bool,
}

impl Selection {
    pub fn is_complete(&self, batch_size: usize) -> bool {
        self.batch.len() >= batch_size
    }
}

/// Walk `candidates` in order, probing fresh ones until `batch_size` are
/// postable, the list runs out or the deadline passes.
pub async fn select_batch(
    candidates: &[Candidate],
    already_seen: &HashSet<String>,
    batch_size: usize,
    deadline: &Deadline,
    probe: &dyn LinkProbe,
) -> Selection {
    let mut selection = Selection::default();
    let mut chosen = HashSet::new();

    for candidate in candidates {
        if selection.batch.len() >= batch_size {
            break;
        }
        if deadline.expired() {
            log::warn!(
                "Deadline passed after probing {} candidates",
                selection.tested
            );
            selection.deadline_hit = true;
            break;
        }

        let canonical = normalize(&candidate.canonical);
        if canonical.is_empty() || already_seen.contains(&canonical) || chosen.contains(&canonical)
        {
            continue;
        }

        selection.tested += 1;
        match probe.probe(&canonical).await {
            Verdict::Dead(signal) => {
                log::info!("Dropping dead link {} ({})", canonical, signal);
                selection.rejected.push((candidate.clone(), signal));
            }
            verdict => {
                if let Verdict::Unknown(reason) = &verdict {
                    log::debug!("Keeping {} despite inconclusive probe: {}", canonical, reason);
                }
                chosen.insert(canonical);
                selection.batch.push(candidate.clone());
            }
        }
    }

    selection
}
