use lnroute_core::{ChannelId, NodeId};
use serde::{Deserialize, Serialize};

use crate::error::RouteError;

/// One forwarding step of a route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteHop {
    pub chan_id: ChannelId,
    /// Capacity of the channel, in satoshis.
    pub chan_capacity: u64,
    /// The node this hop delivers to.
    pub pub_key: NodeId,
    pub amt_to_forward: u64,
    pub amt_to_forward_msat: u64,
    pub fee: u64,
    pub fee_msat: u64,
    /// CLTV expiry of the HTLC on this hop.
    pub expiry: u32,
}

/// A complete forwarding schedule, hops ordered from sender to receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub hops: Vec<RouteHop>,
    pub total_time_lock: u32,
    pub total_fees: u64,
    pub total_fees_msat: u64,
    pub total_amt: u64,
    pub total_amt_msat: u64,
}

impl Route {
    /// Number of hops in this route.
    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Channel ids in sender → receiver order.
    pub fn channel_ids(&self) -> Vec<ChannelId> {
        self.hops.iter().map(|h| h.chan_id).collect()
    }

    /// Sum of the fees collected by every hop, in msat.
    pub fn hop_fees_msat(&self) -> u64 {
        self.hops.iter().map(|h| h.fee_msat).sum()
    }

    /// Amount that reaches the receiver, in msat.
    pub fn delivered_msat(&self) -> u64 {
        self.hops.last().map_or(0, |h| h.amt_to_forward_msat)
    }

    /// Shift every expiry by `height`, turning relative CLTV values into
    /// absolute block heights.
    pub fn anchor_at(mut self, height: u32) -> Result<Self, RouteError> {
        for hop in &mut self.hops {
            hop.expiry = hop
                .expiry
                .checked_add(height)
                .ok_or(RouteError::TimeLockOverflow { chan_id: hop.chan_id })?;
        }
        let last_chan = self.hops.last().map_or(ChannelId(0), |h| h.chan_id);
        self.total_time_lock = self
            .total_time_lock
            .checked_add(height)
            .ok_or(RouteError::TimeLockOverflow { chan_id: last_chan })?;
        Ok(self)
    }
}
