//! lnroute core: passive data model shared by the graph cache and the route
//! accumulator.
//!
//! - [`Edge`] / [`RoutingPolicy`]: one public channel and its per-direction terms.
//! - [`Side`]: which endpoint of an edge a node occupies.
//! - [`ChannelId`] / [`NodeId`]: identifiers, parsed and displayed the way LND does.
//! - [`units`]: satoshi / millisatoshi conversions.

pub mod edge;
pub mod error;
pub mod serde_helpers;
pub mod types;
pub mod units;

pub use edge::{Edge, RoutingPolicy, Side};
pub use error::CoreError;
pub use types::{ChannelId, NodeId};
