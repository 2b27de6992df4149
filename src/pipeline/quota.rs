// src/pipeline/quota.rs

//! Daily posting quota.

use chrono::{DateTime, FixedOffset};

use crate::models::PersistedState;

/// Roll the daily counter over if the local date changed, then report
/// whether another post fits under `daily_limit` today.
pub fn can_post_today(
    state: &mut PersistedState,
    now_local: DateTime<FixedOffset>,
    daily_limit: u32,
) -> bool {
    let today = now_local.date_naive();
    if state.roll_over(today) {
        log::info!("New posting day {}, counter reset", today);
    }
    state.posts_today < daily_limit
}
