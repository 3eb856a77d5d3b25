//! Backward route accumulation.
//!
//! Walks the hop sequence from the receiver towards the sender. Every
//! upstream hop must forward enough to cover the fees of all hops after it
//! and carry an expiry tall enough for their CLTV deltas, so both totals are
//! built up in reverse. Hops are emitted in the caller's sender → receiver
//! order.

use std::collections::VecDeque;

use lnroute_core::units::{msat_to_sat, sat_to_msat};
use lnroute_core::{ChannelId, CoreError, NodeId};
use lnroute_graph::ChannelGraph;

use crate::error::RouteError;
use crate::route::{Route, RouteHop};

/// Build the forwarding schedule for `hops` delivering `amount_sat` to the
/// receiver.
///
/// `starting_node` is where the backward walk begins: the receiver-side
/// endpoint of the last channel in `hops`. Expiries in the returned route are
/// relative; see [`Route::anchor_at`].
///
/// At each channel the policy used is the one advertised by the endpoint
/// opposite the node currently reached by the walk, i.e. the upstream node
/// forwarding through that channel.
pub fn accumulate(
    graph: &ChannelGraph,
    hops: &[ChannelId],
    amount_sat: u64,
    starting_node: &NodeId,
) -> Result<Route, RouteError> {
    if hops.is_empty() {
        return Err(RouteError::EmptyRoute);
    }

    let target_msat = sat_to_msat(amount_sat)?;
    let mut amount_msat = target_msat;
    let mut node = starting_node.clone();
    let mut accumulated_time_lock: u32 = 0;
    let mut pending_time_lock_delta: u32 = 0;
    let mut pending_fee_msat: u64 = 0;
    let mut route_hops: VecDeque<RouteHop> = VecDeque::with_capacity(hops.len());

    for (hop_index, &chan_id) in hops.iter().enumerate().rev() {
        let edge = graph
            .lookup(chan_id)
            .ok_or(RouteError::UnknownChannel { chan_id, hop_index })?;

        let Some(side) = edge.side_of(&node) else {
            tracing::warn!(
                %chan_id,
                node = %node,
                node1 = %edge.node1_pub,
                node2 = %edge.node2_pub,
                "route walk reached a channel the current node is not part of"
            );
            return Err(RouteError::EndpointMismatch {
                chan_id,
                node,
                node1: edge.node1_pub.clone(),
                node2: edge.node2_pub.clone(),
            });
        };

        let upstream = side.opposite();
        let upstream_node = edge.pub_key(upstream).clone();
        let policy = edge
            .policy(upstream)
            .ok_or_else(|| RouteError::MissingPolicy {
                chan_id,
                node: upstream_node.clone(),
            })?;

        route_hops.push_front(RouteHop {
            chan_id,
            chan_capacity: edge.capacity,
            pub_key: node,
            amt_to_forward: msat_to_sat(amount_msat),
            amt_to_forward_msat: amount_msat,
            fee: msat_to_sat(pending_fee_msat),
            fee_msat: pending_fee_msat,
            expiry: accumulated_time_lock,
        });

        accumulated_time_lock = accumulated_time_lock
            .checked_add(pending_time_lock_delta)
            .ok_or(RouteError::TimeLockOverflow { chan_id })?;
        pending_time_lock_delta = policy.time_lock_delta;

        amount_msat = amount_msat.checked_add(pending_fee_msat).ok_or_else(|| {
            CoreError::AmountOverflow(format!("forwarded amount at channel {}", chan_id))
        })?;
        pending_fee_msat = policy.fee_for(amount_msat)?;

        node = upstream_node;
    }

    let first_chan = hops[0];
    let total_time_lock = accumulated_time_lock
        .checked_add(pending_time_lock_delta)
        .ok_or(RouteError::TimeLockOverflow { chan_id: first_chan })?;
    let total_fees_msat = amount_msat - target_msat;

    tracing::debug!(
        hops = route_hops.len(),
        sender = %node,
        total_fees_msat,
        total_time_lock,
        "route accumulated"
    );

    Ok(Route {
        hops: route_hops.into(),
        total_time_lock,
        total_fees: msat_to_sat(total_fees_msat),
        total_fees_msat,
        total_amt: msat_to_sat(amount_msat),
        total_amt_msat: amount_msat,
    })
}
