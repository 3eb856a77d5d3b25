//! Keeps a [`ChannelGraph`] current.
//!
//! Two long-lived tasks cooperate over a bounded mpsc channel:
//!
//! - the **subscription reader** owns the node's graph update stream, turns
//!   each batch into [`GraphEvent`]s and reconnects when the stream drops;
//! - the **cache writer** is the only task that mutates the graph. It applies
//!   events in arrival order and spawns point fetches for channels it has not
//!   seen yet. Fetch results come back through the same channel, so inserts
//!   never race with policy updates or closures.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use lnroute_core::ChannelId;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cache::{ChannelGraph, PolicyOutcome};
use crate::client::LightningClient;
use crate::error::{ClientError, GraphError};
use crate::events::{ChannelEdgeUpdate, GraphEvent};

/// Tuning for [`GraphSync`].
#[derive(Debug, Clone)]
pub struct GraphSyncConfig {
    /// Pause between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Consecutive failed attempts tolerated before giving up. `None` retries
    /// forever.
    pub max_reconnect_attempts: Option<u32>,
    /// Reload the full graph after a reconnect, since updates sent while
    /// disconnected are lost.
    pub resync_on_reconnect: bool,
    /// Timeout for each point fetch of an unknown channel.
    pub fetch_timeout: Duration,
    /// Capacity of the reader → writer channel.
    pub event_buffer: usize,
    /// Limit on opening the subscription. Expiry counts as a failed attempt.
    pub subscribe_timeout: Duration,
    /// Treat an open stream that yields nothing for this long as dropped.
    /// `None` waits forever.
    pub idle_timeout: Option<Duration>,
    /// Blocks a closed channel stays tombstoned, counted back from the highest
    /// closure height seen. `None` keeps tombstones forever.
    pub tombstone_depth: Option<u32>,
}

impl Default for GraphSyncConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: None,
            resync_on_reconnect: true,
            fetch_timeout: Duration::from_secs(10),
            event_buffer: 1024,
            subscribe_timeout: Duration::from_secs(30),
            idle_timeout: None,
            tombstone_depth: Some(2016),
        }
    }
}

/// Fetch the full graph and load it into `graph`.
///
/// Returns the number of cached edges. On failure the graph is left as it was.
pub async fn load_snapshot(
    client: &dyn LightningClient,
    graph: &ChannelGraph,
) -> Result<usize, GraphError> {
    let edges = client.describe_graph().await?;
    Ok(graph.load_snapshot(edges))
}

/// Entry point for starting the sync tasks.
pub struct GraphSync;

impl GraphSync {
    /// Spawn the reader and writer tasks. The graph should already hold the
    /// startup snapshot; the reader does not load one before its first
    /// subscription.
    pub fn spawn(
        client: Arc<dyn LightningClient>,
        graph: Arc<ChannelGraph>,
        config: GraphSyncConfig,
    ) -> GraphSyncHandle {
        let (event_tx, event_rx) = mpsc::channel(config.event_buffer.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let writer = tokio::spawn(run_writer(
            Arc::clone(&client),
            graph,
            event_rx,
            event_tx.downgrade(),
            config.fetch_timeout,
            config.tombstone_depth,
        ));
        let reader = tokio::spawn(run_reader(client, event_tx, shutdown_rx, config));

        GraphSyncHandle {
            shutdown_tx,
            reader: Some(reader),
            writer: Some(writer),
        }
    }
}

/// Handle to the running sync tasks.
pub struct GraphSyncHandle {
    shutdown_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<Result<(), GraphError>>>,
    writer: Option<JoinHandle<()>>,
}

impl GraphSyncHandle {
    /// Wait for the reader to finish. Resolves with
    /// [`GraphError::StreamTerminated`] when reconnects are exhausted and with
    /// `Ok(())` after a requested shutdown.
    pub async fn finished(&mut self) -> Result<(), GraphError> {
        match self.reader.take() {
            Some(reader) => join_reader(reader).await,
            None => std::future::pending().await,
        }
    }

    /// Stop the reader, let the writer drain queued events, and wait for both.
    pub async fn shutdown(mut self) -> Result<(), GraphError> {
        let _ = self.shutdown_tx.send(true);
        let result = match self.reader.take() {
            Some(reader) => join_reader(reader).await,
            None => Ok(()),
        };
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.await {
                tracing::error!(error = %e, "graph writer task panicked");
            }
        }
        tracing::info!("graph sync stopped");
        result
    }
}

async fn join_reader(reader: JoinHandle<Result<(), GraphError>>) -> Result<(), GraphError> {
    reader
        .await
        .map_err(|e| GraphError::TaskFailed(e.to_string()))?
}

async fn run_reader(
    client: Arc<dyn LightningClient>,
    events: mpsc::Sender<GraphEvent>,
    mut shutdown: watch::Receiver<bool>,
    config: GraphSyncConfig,
) -> Result<(), GraphError> {
    let mut failures: u32 = 0;

    loop {
        if *shutdown.borrow() {
            return Ok(());
        }

        let subscribed = tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            result = tokio::time::timeout(config.subscribe_timeout, client.subscribe_graph()) => {
                result.unwrap_or(Err(ClientError::Timeout(config.subscribe_timeout)))
            }
        };

        let reason = match subscribed {
            Ok(mut stream) => {
                tracing::info!(backend = client.backend_name(), "graph subscription established");
                loop {
                    let next = async {
                        match config.idle_timeout {
                            Some(idle) => tokio::time::timeout(idle, stream.next()).await.ok(),
                            None => Some(stream.next().await),
                        }
                    };
                    let item = tokio::select! {
                        _ = shutdown.changed() => return Ok(()),
                        item = next => item,
                    };
                    let Some(item) = item else {
                        tracing::warn!(
                            idle_ms = config.idle_timeout.map_or(0, |d| d.as_millis() as u64),
                            "graph update stream idle, reconnecting"
                        );
                        break "stream idle".to_string();
                    };
                    match item {
                        Some(Ok(update)) => {
                            failures = 0;
                            for event in update.into_events() {
                                if events.send(event).await.is_err() {
                                    tracing::warn!("graph writer gone, stopping subscription");
                                    return Ok(());
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "graph update stream failed");
                            break e.to_string();
                        }
                        None => {
                            tracing::warn!("graph update stream ended");
                            break "stream ended".to_string();
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "graph subscription failed");
                e.to_string()
            }
        };

        failures += 1;
        if let Some(max) = config.max_reconnect_attempts {
            if failures > max {
                tracing::error!(
                    attempts = failures,
                    %reason,
                    "giving up on graph updates, cache is now stale"
                );
                return Err(GraphError::StreamTerminated {
                    attempts: failures,
                    reason,
                });
            }
        }

        tracing::info!(
            attempt = failures,
            delay_ms = config.reconnect_delay.as_millis() as u64,
            "reconnecting graph subscription"
        );
        tokio::select! {
            _ = shutdown.changed() => return Ok(()),
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }

        if config.resync_on_reconnect {
            match client.describe_graph().await {
                Ok(edges) => {
                    if events.send(GraphEvent::Snapshot(edges)).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => tracing::warn!(error = %e, "graph resync failed, keeping cached graph"),
            }
        }
    }
}

async fn run_writer(
    client: Arc<dyn LightningClient>,
    graph: Arc<ChannelGraph>,
    mut events: mpsc::Receiver<GraphEvent>,
    loopback: mpsc::WeakSender<GraphEvent>,
    fetch_timeout: Duration,
    tombstone_depth: Option<u32>,
) {
    // Updates for channels whose point fetch is still in flight.
    let mut pending: HashMap<ChannelId, Vec<ChannelEdgeUpdate>> = HashMap::new();
    let mut tip: u32 = 0;

    while let Some(event) = events.recv().await {
        tracing::trace!(kind = event.kind(), "applying graph event");
        match event {
            GraphEvent::PolicyUpdate(update) => {
                if let Some(buffered) = pending.get_mut(&update.chan_id) {
                    buffered.push(update);
                    continue;
                }
                let chan_id = update.chan_id;
                match graph.apply_policy_update(&update) {
                    PolicyOutcome::Applied { side } => {
                        tracing::debug!(%chan_id, %side, "policy updated");
                    }
                    PolicyOutcome::UnknownChannel => {
                        tracing::debug!(%chan_id, "update for uncached channel, fetching");
                        pending.insert(chan_id, vec![update]);
                        spawn_fetch(Arc::clone(&client), chan_id, loopback.clone(), fetch_timeout);
                    }
                    PolicyOutcome::Closed => {
                        tracing::debug!(%chan_id, "ignoring update for closed channel");
                    }
                    PolicyOutcome::AdvertiserMismatch => {}
                }
            }
            GraphEvent::Closure(closed) => {
                pending.remove(&closed.chan_id);
                let removed = graph.apply_closure(closed.chan_id, closed.closed_height);
                tracing::debug!(
                    chan_id = %closed.chan_id,
                    closed_height = closed.closed_height,
                    removed,
                    "channel closed"
                );
                if closed.closed_height > tip {
                    tip = closed.closed_height;
                    if let Some(depth) = tombstone_depth {
                        let pruned = graph.prune_tombstones(tip.saturating_sub(depth));
                        if pruned > 0 {
                            tracing::debug!(pruned, tip, "pruned channel tombstones");
                        }
                    }
                }
            }
            GraphEvent::Snapshot(edges) => {
                graph.load_snapshot(edges);
            }
            GraphEvent::EdgeFetched(edge) => {
                let chan_id = edge.channel_id;
                let buffered = pending.remove(&chan_id).unwrap_or_default();
                if graph.insert_fetched(edge) {
                    for update in &buffered {
                        graph.apply_policy_update(update);
                    }
                    tracing::debug!(%chan_id, replayed = buffered.len(), "fetched channel cached");
                }
            }
            GraphEvent::FetchFailed { chan_id, reason } => {
                let dropped = pending.remove(&chan_id).map_or(0, |b| b.len());
                tracing::warn!(%chan_id, %reason, dropped, "could not fetch channel info");
            }
        }
    }

    tracing::debug!("graph writer exiting");
}

/// Fetch one channel in the background and post the result to the writer.
fn spawn_fetch(
    client: Arc<dyn LightningClient>,
    chan_id: ChannelId,
    loopback: mpsc::WeakSender<GraphEvent>,
    fetch_timeout: Duration,
) {
    tokio::spawn(async move {
        let result = tokio::time::timeout(fetch_timeout, client.get_chan_info(chan_id))
            .await
            .unwrap_or(Err(ClientError::Timeout(fetch_timeout)));
        let event = match result {
            Ok(edge) => GraphEvent::EdgeFetched(edge),
            Err(e) => GraphEvent::FetchFailed {
                chan_id,
                reason: e.to_string(),
            },
        };
        // The writer may have shut down while we were waiting.
        if let Some(tx) = loopback.upgrade() {
            let _ = tx.send(event).await;
        }
    });
}
