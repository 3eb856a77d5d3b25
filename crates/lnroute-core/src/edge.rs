use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::serde_helpers::{u32_from_str_or_num, u64_from_str_or_num};
use crate::types::{ChannelId, NodeId};
use crate::units::FEE_RATE_DENOMINATOR;

/// Which endpoint of a channel a node occupies, using the graph's fixed
/// `node1` / `node2` roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Node1,
    Node2,
}

impl Side {
    /// The other endpoint.
    pub fn opposite(self) -> Side {
        match self {
            Side::Node1 => Side::Node2,
            Side::Node2 => Side::Node1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Node1 => write!(f, "node1"),
            Side::Node2 => write!(f, "node2"),
        }
    }
}

/// One node's advertised forwarding terms for one direction of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingPolicy {
    /// Flat fee, in millisatoshis.
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub fee_base_msat: u64,
    /// Proportional fee in parts per million of the forwarded amount.
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub fee_rate_milli_msat: u64,
    /// CLTV delta this node adds when forwarding.
    #[serde(default, deserialize_with = "u32_from_str_or_num")]
    pub time_lock_delta: u32,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub min_htlc: u64,
    #[serde(default, deserialize_with = "u64_from_str_or_num")]
    pub max_htlc_msat: u64,
    #[serde(default)]
    pub disabled: bool,
    /// Unix seconds of the announcing channel_update.
    #[serde(default, deserialize_with = "u32_from_str_or_num")]
    pub last_update: u32,
}

impl RoutingPolicy {
    /// A policy with only the fields that matter for fee and CLTV accounting.
    pub fn new(fee_base_msat: u64, fee_rate_milli_msat: u64, time_lock_delta: u32) -> Self {
        Self {
            fee_base_msat,
            fee_rate_milli_msat,
            time_lock_delta,
            min_htlc: 0,
            max_htlc_msat: 0,
            disabled: false,
            last_update: 0,
        }
    }

    /// Fee charged for forwarding `amount_msat`:
    /// `amount_msat * fee_rate_milli_msat / 1_000_000 + fee_base_msat`, truncated.
    pub fn fee_for(&self, amount_msat: u64) -> Result<u64, CoreError> {
        let proportional =
            amount_msat as u128 * self.fee_rate_milli_msat as u128 / FEE_RATE_DENOMINATOR;
        let fee = proportional + self.fee_base_msat as u128;
        u64::try_from(fee).map_err(|_| {
            CoreError::AmountOverflow(format!(
                "fee for {} msat at base {} rate {}",
                amount_msat, self.fee_base_msat, self.fee_rate_milli_msat
            ))
        })
    }
}

/// A public channel as known to the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub channel_id: ChannelId,
    /// Funding outpoint, `txid:index`.
    #[serde(default)]
    pub chan_point: String,
    #[serde(default, deserialize_with = "u32_from_str_or_num")]
    pub last_update: u32,
    pub node1_pub: NodeId,
    pub node2_pub: NodeId,
    /// Capacity in satoshis.
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub capacity: u64,
    #[serde(default)]
    pub node1_policy: Option<RoutingPolicy>,
    #[serde(default)]
    pub node2_policy: Option<RoutingPolicy>,
}

impl Edge {
    /// A channel with no policies advertised yet.
    pub fn new(channel_id: ChannelId, node1_pub: NodeId, node2_pub: NodeId, capacity: u64) -> Self {
        Self {
            channel_id,
            chan_point: String::new(),
            last_update: 0,
            node1_pub,
            node2_pub,
            capacity,
            node1_policy: None,
            node2_policy: None,
        }
    }

    /// Which side `node` sits on, if it is an endpoint of this channel.
    pub fn side_of(&self, node: &NodeId) -> Option<Side> {
        if *node == self.node1_pub {
            Some(Side::Node1)
        } else if *node == self.node2_pub {
            Some(Side::Node2)
        } else {
            None
        }
    }

    /// Public key of the endpoint on `side`.
    pub fn pub_key(&self, side: Side) -> &NodeId {
        match side {
            Side::Node1 => &self.node1_pub,
            Side::Node2 => &self.node2_pub,
        }
    }

    /// Policy advertised by the endpoint on `side`.
    pub fn policy(&self, side: Side) -> Option<&RoutingPolicy> {
        match side {
            Side::Node1 => self.node1_policy.as_ref(),
            Side::Node2 => self.node2_policy.as_ref(),
        }
    }

    /// Replace the policy on `side`, returning the previous one.
    pub fn set_policy(&mut self, side: Side, policy: RoutingPolicy) -> Option<RoutingPolicy> {
        let slot = match side {
            Side::Node1 => &mut self.node1_policy,
            Side::Node2 => &mut self.node2_policy,
        };
        slot.replace(policy)
    }
}
