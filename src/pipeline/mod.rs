//! Pipeline entry points for relay operations.
//!
//! - `run_once`: one full quota → collect → select → publish → commit pass
//! - `select_batch`, `can_post_today`, `Composer`: the stages it is made of

pub mod compose;
pub mod quota;
pub mod run;
pub mod select;

pub use compose::{Composed, Composer, NumberedLink, number_batch};
pub use quota::can_post_today;
pub use run::{RunContext, RunOptions, RunOutcome, run_once};
pub use select::{Selection, select_batch};
