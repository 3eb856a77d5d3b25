pub mod lnd_rest;
pub mod memory;

pub use lnd_rest::{LndRestClient, LndRestConfig};
pub use memory::InMemoryClient;
