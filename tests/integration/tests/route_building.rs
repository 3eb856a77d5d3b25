//! Integration test: route construction over a graph kept in sync from a
//! node-side client.
//!
//! Exercises lnroute-graph (snapshot, sync) and lnroute-routing (accumulator,
//! height anchoring) together.

use lnroute_core::{ChannelId, RoutingPolicy};
use lnroute_integration_tests::*;
use lnroute_routing::{accumulate, RouteError};

// =========================================================================
// Fee and time-lock accumulation
// =========================================================================

#[tokio::test]
async fn test_two_hop_route_from_snapshot() {
    let harness = Harness::with_topology().await;

    let route = harness
        .builder
        .build_route(&[CHAN_AB, CHAN_BC], 100_000, &key(CAROL))
        .await
        .expect("route should build");

    assert_eq!(route.hop_count(), 2);
    assert_eq!(route.channel_ids(), vec![CHAN_AB, CHAN_BC]);

    let (ab, bc) = (&route.hops[0], &route.hops[1]);
    assert_eq!(ab.pub_key, key(BOB));
    assert_eq!(ab.amt_to_forward_msat, 100_000_000);
    assert_eq!(ab.fee_msat, 1_100);
    assert_eq!(bc.pub_key, key(CAROL));
    assert_eq!(bc.amt_to_forward_msat, 100_000_000);
    assert_eq!(bc.fee_msat, 0);

    assert_eq!(route.total_fees_msat, 1_100);
    assert_eq!(route.total_amt_msat, 100_001_100);
    assert_eq!(route.total_time_lock, BLOCK_HEIGHT + 49);
    assert_eq!(ab.expiry, BLOCK_HEIGHT);
    assert_eq!(bc.expiry, BLOCK_HEIGHT);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_three_hop_route_accumulates_downstream_fees() {
    let harness = Harness::with_topology().await;

    let route = harness
        .builder
        .build_route(&[CHAN_AB, CHAN_BC, CHAN_CD], 100_000, &key(DAVE))
        .await
        .expect("route should build");

    // Carol: 500 + 100_000_000 * 100 / 1e6 = 10_500
    // Bob:   1_000 + 100_010_500 * 1 / 1e6 = 1_100
    let fees: Vec<u64> = route.hops.iter().map(|h| h.fee_msat).collect();
    assert_eq!(fees, vec![1_100, 10_500, 0]);
    let forwards: Vec<u64> = route.hops.iter().map(|h| h.amt_to_forward_msat).collect();
    assert_eq!(forwards, vec![100_010_500, 100_000_000, 100_000_000]);

    assert_eq!(route.total_fees_msat, 11_600);
    assert_eq!(route.hop_fees_msat(), route.total_fees_msat);
    assert_eq!(route.total_amt_msat - 100_000 * 1000, route.total_fees_msat);
    assert_eq!(route.delivered_msat(), 100_000_000);

    let expiries: Vec<u32> = route.hops.iter().map(|h| h.expiry - BLOCK_HEIGHT).collect();
    assert_eq!(expiries, vec![18, 0, 0]);
    assert_eq!(route.total_time_lock, BLOCK_HEIGHT + 67);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_expiries_match_relative_route() {
    let harness = Harness::with_topology().await;
    let hops = [CHAN_AB, CHAN_BC, CHAN_CD];

    let relative = accumulate(&harness.graph, &hops, 42_000, &key(DAVE)).unwrap();
    let anchored = harness
        .builder
        .build_route(&hops, 42_000, &key(DAVE))
        .await
        .unwrap();

    for (a, r) in anchored.hops.iter().zip(&relative.hops) {
        assert_eq!(a.expiry, r.expiry + BLOCK_HEIGHT);
    }
    // never decreasing walking from the receiver back to the sender
    for pair in anchored.hops.windows(2) {
        assert!(pair[0].expiry >= pair[1].expiry);
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_build_route_is_idempotent() {
    let harness = Harness::with_topology().await;
    let hops = [CHAN_AB, CHAN_BC, CHAN_CD];

    let first = harness.builder.build_route(&hops, 5_000, &key(DAVE)).await.unwrap();
    let second = harness.builder.build_route(&hops, 5_000, &key(DAVE)).await.unwrap();
    assert_eq!(first, second);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_height_change_moves_expiries_only() {
    let harness = Harness::with_topology().await;
    let hops = [CHAN_AB, CHAN_BC];

    let before = harness.builder.build_route(&hops, 1_000, &key(CAROL)).await.unwrap();
    harness.client.set_block_height(BLOCK_HEIGHT + 6);
    let after = harness.builder.build_route(&hops, 1_000, &key(CAROL)).await.unwrap();

    assert_eq!(after.total_time_lock, before.total_time_lock + 6);
    assert_eq!(after.total_fees_msat, before.total_fees_msat);

    harness.shutdown().await;
}

// =========================================================================
// Live updates feeding route construction
// =========================================================================

#[tokio::test]
async fn test_policy_update_changes_next_route() {
    let harness = Harness::with_topology().await;
    let hops = [CHAN_AB, CHAN_BC];

    let before = harness.builder.build_route(&hops, 100_000, &key(CAROL)).await.unwrap();
    assert_eq!(before.total_fees_msat, 1_100);

    harness.client.announce_policy(policy_update(
        CHAN_BC,
        BOB,
        CAROL,
        RoutingPolicy::new(2_000, 10, 80),
    ));
    assert!(
        eventually(|| harness
            .graph
            .lookup(CHAN_BC)
            .and_then(|e| e.node1_policy)
            .map_or(false, |p| p.fee_base_msat == 2_000))
        .await
    );

    let after = harness.builder.build_route(&hops, 100_000, &key(CAROL)).await.unwrap();
    // 2_000 + 100_000_000 * 10 / 1e6
    assert_eq!(after.total_fees_msat, 3_000);
    assert_eq!(after.total_time_lock, BLOCK_HEIGHT + 80 + 9);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_route_over_channel_learned_from_stream() {
    let harness = Harness::with_topology().await;
    let chan_de = ChannelId(700_003 << 40 | 4 << 16);
    let eve = 5;

    // the node learns a channel the cache has never seen, then announces it
    harness.client.insert_edge(channel(
        chan_de,
        DAVE,
        eve,
        RoutingPolicy::new(100, 0, 12),
        RoutingPolicy::new(0, 0, 0),
    ));
    harness.client.announce_policy(policy_update(
        chan_de,
        DAVE,
        eve,
        RoutingPolicy::new(100, 0, 12),
    ));
    assert!(eventually(|| harness.graph.contains(chan_de)).await);
    assert_eq!(harness.client.chan_info_calls(), 1);

    let route = harness
        .builder
        .build_route(&[CHAN_CD, chan_de], 10, &key(eve))
        .await
        .unwrap();
    assert_eq!(route.hops[0].fee_msat, 100);
    assert_eq!(route.hops[1].pub_key, key(eve));

    harness.shutdown().await;
}

// =========================================================================
// Failures
// =========================================================================

#[tokio::test]
async fn test_unknown_channel_yields_no_route() {
    let harness = Harness::with_topology().await;

    let err = harness
        .builder
        .build_route(&[CHAN_AB, ChannelId(12_345), CHAN_CD], 1_000, &key(DAVE))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RouteError::UnknownChannel { chan_id: ChannelId(12_345), hop_index: 1 }
    ));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_wrong_starting_node_is_rejected() {
    let harness = Harness::with_topology().await;

    let err = harness
        .builder
        .build_route(&[CHAN_AB, CHAN_BC], 1_000, &key(DAVE))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::EndpointMismatch { chan_id, .. } if chan_id == CHAN_BC));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_height_unavailable_aborts_route() {
    let harness = Harness::with_topology().await;
    harness.client.set_unavailable(true);

    let err = harness
        .builder
        .build_route(&[CHAN_AB, CHAN_BC], 1_000, &key(CAROL))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::HeightUnavailable(_)));

    harness.client.set_unavailable(false);
    harness.shutdown().await;
}
