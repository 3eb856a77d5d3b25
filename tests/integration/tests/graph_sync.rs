//! Integration test: keeping the channel graph cache in step with the node.
//!
//! Covers snapshot loading from a `describegraph` dump, the closure
//! tombstone, and recovery after the subscription drops.

use std::time::Duration;

use lnroute_core::{ChannelId, RoutingPolicy};
use lnroute_graph::{GraphError, GraphSync, InMemoryClient};
use lnroute_integration_tests::*;
use lnroute_routing::RouteError;

/// A one-channel `lncli describegraph` dump between nodes 2 and 3, with
/// uint64 fields as strings the way lnd emits them.
fn describe_graph_json() -> String {
    format!(
        r#"{{
  "nodes": [],
  "edges": [
    {{
      "channel_id": "769658524237971457",
      "chan_point": "d0c2a3f0b8b6e6f4c1e5b1a9e5a3c7d2f0a1b2c3d4e5f60718293a4b5c6d7e8f:1",
      "last_update": 1700000000,
      "node1_pub": "{}",
      "node2_pub": "{}",
      "capacity": "2000000",
      "node1_policy": {{
        "time_lock_delta": 40,
        "min_htlc": "1000",
        "fee_base_msat": "1000",
        "fee_rate_milli_msat": "1",
        "disabled": false,
        "max_htlc_msat": "1980000000",
        "last_update": 1700000000
      }},
      "node2_policy": null
    }}
  ]
}}"#,
        key(2),
        key(3)
    )
}

#[tokio::test]
async fn test_describe_graph_dump_feeds_routes() {
    let client = InMemoryClient::from_describe_graph_json(&describe_graph_json(), "offline", 820_000)
        .expect("dump should parse");
    let harness = Harness::start(client, fast_sync_config()).await;

    let chan_id = ChannelId(769_658_524_237_971_457);
    assert_eq!(harness.graph.len(), 1);
    let edge = harness.graph.lookup(chan_id).unwrap();
    assert_eq!(edge.capacity, 2_000_000);

    let route = harness
        .builder
        .build_route(&[chan_id], 50_000, &key(3))
        .await
        .unwrap();
    assert_eq!(route.total_time_lock, 820_040);
    assert_eq!(route.hops[0].chan_capacity, 2_000_000);

    // node2 never advertised, so nothing can forward towards node1
    let err = harness
        .builder
        .build_route(&[chan_id], 50_000, &key(2))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::MissingPolicy { .. }));

    harness.shutdown().await;
}

#[tokio::test]
async fn test_closure_then_stale_update_stays_closed() {
    let harness = Harness::with_topology().await;

    harness.client.announce_closure(CHAN_BC, 800_001);
    assert!(eventually(|| !harness.graph.contains(CHAN_BC)).await);

    // a late policy update for the closed channel: the node still answers
    // point lookups for it, so only the tombstone keeps it out
    harness.client.insert_edge(channel(
        CHAN_BC,
        BOB,
        CAROL,
        RoutingPolicy::new(1_000, 1, 40),
        RoutingPolicy::new(2, 2, 2),
    ));
    harness.client.announce_policy(policy_update(
        CHAN_BC,
        BOB,
        CAROL,
        RoutingPolicy::new(9, 9, 9),
    ));
    // a later update to a live channel proves the stale one was processed
    harness.client.announce_policy(policy_update(
        CHAN_AB,
        ALICE,
        BOB,
        RoutingPolicy::new(77, 0, 9),
    ));
    assert!(
        eventually(|| harness
            .graph
            .lookup(CHAN_AB)
            .and_then(|e| e.node1_policy)
            .map_or(false, |p| p.fee_base_msat == 77))
        .await
    );
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!harness.graph.contains(CHAN_BC));
    assert!(harness.graph.is_closed(CHAN_BC));
    assert_eq!(harness.client.chan_info_calls(), 0);

    let err = harness
        .builder
        .build_route(&[CHAN_AB, CHAN_BC], 1_000, &key(CAROL))
        .await
        .unwrap_err();
    assert!(matches!(err, RouteError::UnknownChannel { hop_index: 1, .. }));

    let stats = harness.graph.stats();
    assert_eq!(stats.closures, 1);
    assert_eq!(stats.closed_channels, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_reconnect_recovers_missed_changes() {
    let harness = Harness::with_topology().await;

    harness.client.disconnect_subscribers();
    // changed while nobody is listening
    harness.client.remove_edge(CHAN_CD);
    let chan_x = ChannelId(42);
    harness.client.insert_edge(channel(
        chan_x,
        ALICE,
        DAVE,
        RoutingPolicy::new(1, 1, 1),
        RoutingPolicy::new(1, 1, 1),
    ));

    assert!(eventually(|| harness.graph.contains(chan_x)).await);
    harness.wait_for_subscription(2).await;

    // the resync snapshot replaces the cache, dropping what the node dropped
    assert!(!harness.graph.contains(CHAN_CD));
    assert!(!harness.graph.is_closed(CHAN_CD));
    assert_eq!(harness.graph.len(), 3);

    // and the new subscription delivers updates again
    harness.client.announce_policy(policy_update(
        chan_x,
        DAVE,
        ALICE,
        RoutingPolicy::new(5, 5, 5),
    ));
    assert!(
        eventually(|| harness
            .graph
            .lookup(chan_x)
            .and_then(|e| e.node2_policy)
            .map_or(false, |p| p.fee_base_msat == 5))
        .await
    );

    harness.shutdown().await;
}

#[tokio::test]
async fn test_sync_gives_up_after_configured_attempts() {
    let client = std::sync::Arc::new(InMemoryClient::with_edges("me", BLOCK_HEIGHT, topology()));
    client.fail_next_subscriptions(100);
    let graph = std::sync::Arc::new(lnroute_graph::ChannelGraph::new());
    lnroute_graph::load_snapshot(client.as_ref(), &graph)
        .await
        .unwrap();

    let mut config = fast_sync_config();
    config.max_reconnect_attempts = Some(2);
    let mut handle = GraphSync::spawn(client.clone(), graph.clone(), config);

    let result = tokio::time::timeout(Duration::from_secs(5), handle.finished())
        .await
        .expect("sync should give up");
    assert!(matches!(result, Err(GraphError::StreamTerminated { attempts: 3, .. })));

    // the cache keeps serving the last known graph
    assert_eq!(graph.len(), 3);
    handle.shutdown().await.unwrap();
}
