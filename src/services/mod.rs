//! Service layer for the relay.
//!
//! This module contains the business logic for:
//! - Link extraction and intermediate resolution (`LinkExtractor`)
//! - Multi-strategy discovery (`Collector`)
//! - Headless rendering (`BrowserlessRenderer`)
//! - Liveness probing (`HttpLinkProbe`)

pub mod collector;
pub mod extract;
pub mod liveness;
pub mod renderer;

pub use collector::{Collection, Collector, DiscoveryStrategy, Harvest, StopReason};
pub use extract::LinkExtractor;
pub use liveness::{DeathSignal, FatalSignals, HttpLinkProbe, LinkProbe, Verdict};
pub use renderer::{BrowserlessRenderer, PageRenderer};
