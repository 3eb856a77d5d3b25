//! lnroute routing: turns a caller-chosen channel sequence into a complete
//! forwarding schedule.
//!
//! This crate provides:
//! - [`accumulate`]: the backward walk from receiver to sender computing
//!   per-hop amounts, fees and relative expiries.
//! - [`Route`] / [`RouteHop`]: the resulting schedule and its totals.
//! - [`RouteBuilder`]: pairs the walk with a [`BlockHeightSource`] to produce
//!   absolute expiries.

pub mod accumulator;
pub mod builder;
pub mod error;
pub mod route;

// Re-exports for convenience.
pub use accumulator::accumulate;
pub use builder::{BlockHeightSource, FixedHeight, NodeHeightSource, RouteBuilder, RouteBuilderConfig};
pub use error::RouteError;
pub use route::{Route, RouteHop};
