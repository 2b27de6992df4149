// src/lib.rs

//! gofile-relay library: discovers file-share links on an index site,
//! filters out dead and already-published ones and posts fresh batches.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod publisher;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;
