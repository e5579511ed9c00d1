//! The live graph service.
//!
//! One tokio task owns the graph state for a repository together with the
//! set of subscribed viewers. Everything that mutates the graph arrives as a
//! command on a single queue and is applied strictly one at a time, in
//! arrival order, so a full rebuild never interleaves with an incremental
//! merge and two merges never race.
//!
//! Readers never touch the state: every committed change is published as an
//! immutable `Arc<GraphSnapshot>` through a `watch` channel and pushed to
//! each subscriber. Delivery is best effort: a subscriber whose buffer is
//! full misses that update, and one whose channel is gone is dropped from
//! the registry. Either way the update carries on.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::DevGraphConfig;
use crate::error::{GraphError, Result};
use crate::graph::{build_graph, merge_incremental, GraphSnapshot, GraphState, Layout};

const COMMAND_QUEUE: usize = 64;
/// Updates buffered per subscriber before new ones are dropped.
const SUBSCRIBER_BUFFER: usize = 16;

/// Identifies one subscribed viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered viewer: its id and the stream of full graph updates.
pub struct Subscription {
    pub id: SubscriberId,
    pub updates: mpsc::Receiver<Arc<GraphSnapshot>>,
}

type Reply = oneshot::Sender<Result<Arc<GraphSnapshot>>>;

enum Command {
    Rebuild { reply: Option<Reply> },
    Merge { changed: Vec<String>, reply: Option<Reply> },
    Subscribe { reply: oneshot::Sender<Subscription> },
    Unsubscribe { id: SubscriberId },
    SubscriberCount { reply: oneshot::Sender<usize> },
}

/// Cheap, cloneable access to a running [`GraphService`].
#[derive(Clone)]
pub struct GraphHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Arc<GraphSnapshot>>,
}

impl GraphHandle {
    /// The most recently committed graph. Never a partially merged state.
    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        self.snapshot.borrow().clone()
    }

    /// Replace the graph with a full build and wait for it.
    pub async fn rebuild(&self) -> Result<Arc<GraphSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Rebuild { reply: Some(reply) }).await?;
        rx.await.map_err(|_| GraphError::ServiceClosed)?
    }

    /// Merge the given repo-relative paths and wait for the updated graph.
    pub async fn merge(&self, changed: Vec<String>) -> Result<Arc<GraphSnapshot>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Merge {
            changed,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| GraphError::ServiceClosed)?
    }

    /// Queue a merge without waiting for it to finish.
    pub async fn request_merge(&self, changed: Vec<String>) -> Result<()> {
        self.send(Command::Merge {
            changed,
            reply: None,
        })
        .await
    }

    /// Queue a merge from a plain thread. Must not be called from async code.
    pub fn request_merge_blocking(&self, changed: Vec<String>) -> Result<()> {
        self.commands
            .blocking_send(Command::Merge {
                changed,
                reply: None,
            })
            .map_err(|_| GraphError::ServiceClosed)
    }

    pub async fn subscribe(&self) -> Result<Subscription> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Subscribe { reply }).await?;
        rx.await.map_err(|_| GraphError::ServiceClosed)
    }

    pub async fn unsubscribe(&self, id: SubscriberId) -> Result<()> {
        self.send(Command::Unsubscribe { id }).await
    }

    pub async fn subscriber_count(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SubscriberCount { reply }).await?;
        rx.await.map_err(|_| GraphError::ServiceClosed)
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| GraphError::ServiceClosed)
    }
}

/// Owns the graph state and subscriber registry for one repository.
pub struct GraphService {
    root: PathBuf,
    config: Arc<DevGraphConfig>,
    /// Only this task's blocking jobs lock it, one at a time.
    state: Arc<Mutex<GraphState>>,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Arc<GraphSnapshot>>>,
    published: watch::Sender<Arc<GraphSnapshot>>,
}

impl GraphService {
    /// Start a service with an empty graph. Call [`GraphHandle::rebuild`]
    /// to populate it. Must be called within a tokio runtime.
    pub fn spawn(root: PathBuf, config: DevGraphConfig) -> GraphHandle {
        let state = GraphState::new(Layout::new(config.layout.extent));
        Self::spawn_with_state(root, config, state)
    }

    /// Start a service around an already built (or restored) graph.
    pub fn spawn_with_state(root: PathBuf, config: DevGraphConfig, state: GraphState) -> GraphHandle {
        let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
        let (published, snapshot) = watch::channel(Arc::new(state.snapshot()));

        let service = GraphService {
            root,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(state)),
            subscribers: HashMap::new(),
            published,
        };
        tokio::spawn(service.run(rx));

        GraphHandle { commands, snapshot }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!(root = %self.root.display(), "graph service started");

        while let Some(command) = commands.recv().await {
            match command {
                Command::Rebuild { reply } => {
                    let result = self.rebuild().await;
                    self.finish(result, reply);
                }
                Command::Merge { changed, reply } => {
                    let result = self.merge(changed).await;
                    self.finish(result, reply);
                }
                Command::Subscribe { reply } => {
                    let (tx, updates) = mpsc::channel(SUBSCRIBER_BUFFER);
                    let id = SubscriberId::new();
                    self.subscribers.insert(id, tx);
                    debug!(subscriber = %id, total = self.subscribers.len(), "subscriber added");
                    if reply.send(Subscription { id, updates }).is_err() {
                        self.subscribers.remove(&id);
                    }
                }
                Command::Unsubscribe { id } => {
                    if self.subscribers.remove(&id).is_some() {
                        debug!(subscriber = %id, "subscriber removed");
                    }
                }
                Command::SubscriberCount { reply } => {
                    let _ = reply.send(self.subscribers.len());
                }
            }
        }

        info!(root = %self.root.display(), "graph service stopped");
    }

    async fn rebuild(&self) -> Result<Arc<GraphSnapshot>> {
        let root = self.root.clone();
        let config = Arc::clone(&self.config);
        let state = Arc::clone(&self.state);

        task::spawn_blocking(move || {
            let fresh = build_graph(&root, &config);
            let snapshot = fresh.snapshot();
            *state.lock().unwrap_or_else(PoisonError::into_inner) = fresh;
            Arc::new(snapshot)
        })
        .await
        .map_err(|e| GraphError::Join(e.to_string()))
    }

    async fn merge(&self, changed: Vec<String>) -> Result<Arc<GraphSnapshot>> {
        let root = self.root.clone();
        let config = Arc::clone(&self.config);
        let state = Arc::clone(&self.state);

        task::spawn_blocking(move || {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::new(merge_incremental(&mut state, &root, &changed, &config.scan))
        })
        .await
        .map_err(|e| GraphError::Join(e.to_string()))
    }

    fn finish(&mut self, result: Result<Arc<GraphSnapshot>>, reply: Option<Reply>) {
        match &result {
            Ok(snapshot) => self.publish(snapshot),
            Err(e) => error!(error = %e, "graph update failed"),
        }
        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    fn publish(&mut self, snapshot: &Arc<GraphSnapshot>) {
        self.published.send_replace(Arc::clone(snapshot));

        let before = self.subscribers.len();
        let mut skipped = 0;
        self.subscribers.retain(|id, tx| match tx.try_send(Arc::clone(snapshot)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                debug!(subscriber = %id, "subscriber is behind, skipping update");
                skipped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!(subscriber = %id, "subscriber gone, dropping");
                false
            }
        });
        debug!(
            delivered = self.subscribers.len() - skipped,
            skipped,
            dropped = before - self.subscribers.len(),
            "graph update published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_rebuild_publishes_snapshot() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "def main():\n    pass\n");
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());
        assert!(handle.snapshot().nodes.is_empty());

        let built = handle.rebuild().await.unwrap();
        assert!(built.node("a.py::main").is_some());
        assert_eq!(handle.snapshot(), built);
    }

    #[tokio::test]
    async fn test_merges_apply_in_arrival_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "\n");
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());
        handle.rebuild().await.unwrap();

        write(dir.path(), "b.py", "def one():\n    pass\n");
        write(dir.path(), "c.py", "def two():\n    pass\n");
        handle.request_merge(vec!["b.py".to_string()]).await.unwrap();
        let last = handle.merge(vec!["c.py".to_string()]).await.unwrap();

        // the queued merge completed before the awaited one
        assert!(last.node("b.py::one").is_some());
        assert!(last.node("c.py::two").is_some());
        let ids: Vec<_> = last.nodes.iter().map(|n| n.id.as_str()).collect();
        let b = ids.iter().position(|id| *id == "b.py").unwrap();
        let c = ids.iter().position(|id| *id == "c.py").unwrap();
        assert!(b < c);
    }

    #[tokio::test]
    async fn test_subscribers_receive_updates() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.ts", "function run() {\n}\n");
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());

        let mut sub = handle.subscribe().await.unwrap();
        handle.rebuild().await.unwrap();
        let update = sub.updates.recv().await.unwrap();
        assert!(update.node("a.ts::run").is_some());
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_dropped_without_affecting_others() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "\n");
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());

        let mut alive = handle.subscribe().await.unwrap();
        let gone = handle.subscribe().await.unwrap();
        assert_eq!(handle.subscriber_count().await.unwrap(), 2);
        drop(gone);

        handle.rebuild().await.unwrap();
        assert_eq!(handle.subscriber_count().await.unwrap(), 1);
        assert!(alive.updates.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_slow_subscriber_buffer_is_bounded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "\n");
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());

        let mut idle = handle.subscribe().await.unwrap();
        let mut active = handle.subscribe().await.unwrap();
        for _ in 0..SUBSCRIBER_BUFFER + 4 {
            handle.rebuild().await.unwrap();
            assert!(active.updates.recv().await.is_some());
        }

        // still registered, holding only what fits in its buffer
        assert_eq!(handle.subscriber_count().await.unwrap(), 2);
        let mut buffered = 0;
        while idle.updates.try_recv().is_ok() {
            buffered += 1;
        }
        assert_eq!(buffered, SUBSCRIBER_BUFFER);

        // once drained it receives updates again
        handle.rebuild().await.unwrap();
        assert!(idle.updates.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let dir = TempDir::new().unwrap();
        let handle = GraphService::spawn(dir.path().to_path_buf(), DevGraphConfig::default());
        let sub = handle.subscribe().await.unwrap();
        handle.unsubscribe(sub.id).await.unwrap();
        assert_eq!(handle.subscriber_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_with_existing_state() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.py", "import os\n");
        let config = DevGraphConfig::default();
        let state = build_graph(dir.path(), &config);
        let original = state.node("os").cloned().unwrap();

        let handle = GraphService::spawn_with_state(dir.path().to_path_buf(), config, state);
        let merged = handle.merge(vec!["a.py".to_string()]).await.unwrap();
        assert_eq!(merged.node("os"), Some(&original));
    }
}
