use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use lnroute_core::{ChannelId, Edge, Side};
use serde::Serialize;

use crate::events::ChannelEdgeUpdate;

/// Result of applying a policy update to the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Stored into the slot for `side`.
    Applied { side: Side },
    /// The channel is not cached yet; the caller should fetch it.
    UnknownChannel,
    /// The channel was closed; the update is stale and was ignored.
    Closed,
    /// The advertising node is neither endpoint; the update was dropped.
    AdvertiserMismatch,
}

/// Point-in-time cache counters for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub edges: usize,
    pub closed_channels: usize,
    pub policy_updates: u64,
    pub closures: u64,
    pub fetched_edges: u64,
    pub snapshot_loaded_at: Option<DateTime<Utc>>,
}

/// The live channel graph: channel id → edge.
///
/// Reads are lock-free apart from DashMap's shard locks. All mutation is
/// expected to come from a single writer (see [`crate::sync`]); the map is
/// still safe under concurrent writers, it just makes no ordering promises
/// between them.
///
/// Closures are final. A closed channel id is tombstoned and every later
/// update, fetch result or snapshot entry for it is ignored until the
/// tombstone is pruned, by which time the closure is buried deep enough that
/// the node no longer reports the channel.
pub struct ChannelGraph {
    edges: DashMap<ChannelId, Edge>,
    /// Tombstones: closed channel id → closing block height.
    closed: DashMap<ChannelId, u32>,
    policy_updates: AtomicU64,
    closures: AtomicU64,
    fetched_edges: AtomicU64,
    /// Unix millis of the last snapshot, 0 if none.
    snapshot_loaded_at: AtomicI64,
}

impl ChannelGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            edges: DashMap::new(),
            closed: DashMap::new(),
            policy_updates: AtomicU64::new(0),
            closures: AtomicU64::new(0),
            fetched_edges: AtomicU64::new(0),
            snapshot_loaded_at: AtomicI64::new(0),
        }
    }

    /// Replace the cached edges with a full snapshot. Channels already closed
    /// are skipped. Returns the number of edges now cached.
    ///
    /// New entries are inserted before stale ones are dropped, so concurrent
    /// readers never observe an empty map mid-reload.
    pub fn load_snapshot(&self, edges: Vec<Edge>) -> usize {
        let mut fresh = HashSet::with_capacity(edges.len());
        let mut skipped = 0usize;

        for edge in edges {
            if self.closed.contains_key(&edge.channel_id) {
                skipped += 1;
                continue;
            }
            fresh.insert(edge.channel_id);
            self.edges.insert(edge.channel_id, edge);
        }
        self.edges.retain(|id, _| fresh.contains(id));

        self.snapshot_loaded_at
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
        tracing::info!(
            edges = self.edges.len(),
            skipped_closed = skipped,
            "graph snapshot loaded"
        );
        self.edges.len()
    }

    /// Store a policy update into the slot of the advertising endpoint.
    pub fn apply_policy_update(&self, update: &ChannelEdgeUpdate) -> PolicyOutcome {
        if self.closed.contains_key(&update.chan_id) {
            return PolicyOutcome::Closed;
        }

        let Some(mut entry) = self.edges.get_mut(&update.chan_id) else {
            return PolicyOutcome::UnknownChannel;
        };
        let edge = entry.value_mut();

        let Some(side) = edge.side_of(&update.advertising_node) else {
            tracing::warn!(
                chan_id = %update.chan_id,
                advertising_node = %update.advertising_node,
                node1 = %edge.node1_pub,
                node2 = %edge.node2_pub,
                "policy update from a node that is not a channel endpoint, dropping"
            );
            return PolicyOutcome::AdvertiserMismatch;
        };

        edge.set_policy(side, update.routing_policy.clone());
        edge.last_update = edge.last_update.max(update.routing_policy.last_update);
        self.policy_updates.fetch_add(1, Ordering::Relaxed);
        PolicyOutcome::Applied { side }
    }

    /// Insert an edge obtained by a point fetch. Returns `false` if the
    /// channel was closed in the meantime.
    pub fn insert_fetched(&self, edge: Edge) -> bool {
        if self.closed.contains_key(&edge.channel_id) {
            tracing::debug!(chan_id = %edge.channel_id, "discarding fetched edge for closed channel");
            return false;
        }
        self.edges.insert(edge.channel_id, edge);
        self.fetched_edges.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Remove a closed channel and tombstone its id. Idempotent; returns
    /// whether an edge was actually removed.
    pub fn apply_closure(&self, chan_id: ChannelId, closed_height: u32) -> bool {
        self.closed.entry(chan_id).or_insert(closed_height);
        self.closures.fetch_add(1, Ordering::Relaxed);
        self.edges.remove(&chan_id).is_some()
    }

    /// Forget tombstones for channels closed below `height`. Returns how many
    /// were dropped.
    pub fn prune_tombstones(&self, height: u32) -> usize {
        let before = self.closed.len();
        self.closed.retain(|_, closed_height| *closed_height >= height);
        before.saturating_sub(self.closed.len())
    }

    /// Whether `chan_id` has been seen closing.
    pub fn is_closed(&self, chan_id: ChannelId) -> bool {
        self.closed.contains_key(&chan_id)
    }

    /// Look up a single edge.
    pub fn lookup(&self, chan_id: ChannelId) -> Option<Edge> {
        self.edges.get(&chan_id).map(|e| e.value().clone())
    }

    /// Whether `chan_id` is cached.
    pub fn contains(&self, chan_id: ChannelId) -> bool {
        self.edges.contains_key(&chan_id)
    }

    /// All cached edges, ordered by channel id.
    pub fn edges(&self) -> Vec<Edge> {
        let mut all: Vec<Edge> = self.edges.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|e| e.channel_id);
        all
    }

    /// Number of cached edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if no edges are cached.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn stats(&self) -> GraphStats {
        let loaded = self.snapshot_loaded_at.load(Ordering::Relaxed);
        GraphStats {
            edges: self.edges.len(),
            closed_channels: self.closed.len(),
            policy_updates: self.policy_updates.load(Ordering::Relaxed),
            closures: self.closures.load(Ordering::Relaxed),
            fetched_edges: self.fetched_edges.load(Ordering::Relaxed),
            snapshot_loaded_at: (loaded != 0)
                .then(|| Utc.timestamp_millis_opt(loaded).single())
                .flatten(),
        }
    }
}

impl Default for ChannelGraph {
    fn default() -> Self {
        Self::new()
    }
}
