//! Utility functions and helpers.

pub mod deadline;
pub mod http;
pub mod url;

pub use deadline::Deadline;
pub use http::{FetchedPage, Fetcher, HttpFetcher};
