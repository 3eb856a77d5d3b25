//! lnroute graph: the live channel graph cache and everything that keeps it
//! current.
//!
//! This crate provides:
//! - [`ChannelGraph`]: a concurrent edge cache backed by DashMap, with
//!   tombstones for closed channels.
//! - [`LightningClient`]: the boundary to the Lightning node (snapshot, point
//!   lookups, update subscription, chain height).
//! - [`adapters`]: an LND REST client and an in-memory client.
//! - [`GraphSync`]: the subscription reader and single cache writer tasks.

pub mod adapters;
pub mod cache;
pub mod client;
pub mod error;
pub mod events;
pub mod sync;

// Re-exports for convenience.
pub use adapters::{InMemoryClient, LndRestClient, LndRestConfig};
pub use cache::{ChannelGraph, GraphStats, PolicyOutcome};
pub use client::{GraphUpdateStream, LightningClient, LocalChannel, NodeInfo};
pub use error::{ClientError, GraphError};
pub use events::{ChannelEdgeUpdate, ClosedChannelUpdate, GraphEvent, GraphTopologyUpdate};
pub use sync::{load_snapshot, GraphSync, GraphSyncConfig, GraphSyncHandle};
