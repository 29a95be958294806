//! Workspace Model and Event Bus
//!
//! The model owns the current workspace and the named condition sets, and
//! publishes changes to both over broadcast channels. Subscribers get the
//! current state together with a receiver, so nothing published after the
//! subscription is missed.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use intercept_common::{ConditionSet, Workspace};

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Workspace lifecycle notification
#[derive(Clone)]
pub enum WorkspaceEvent {
    Opened(Arc<dyn Workspace>),
    Closed,
    Reset(Arc<dyn Workspace>),
}

impl fmt::Debug for WorkspaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceEvent::Opened(ws) => write!(f, "Opened({})", ws.name()),
            WorkspaceEvent::Closed => write!(f, "Closed"),
            WorkspaceEvent::Reset(ws) => write!(f, "Reset({})", ws.name()),
        }
    }
}

/// A named condition set was replaced or removed
#[derive(Debug, Clone)]
pub struct ConditionSetChanged {
    pub name: String,
    pub set: Option<Arc<dyn ConditionSet>>,
}

pub struct Model {
    current_workspace: RwLock<Option<Arc<dyn Workspace>>>,
    condition_sets: DashMap<String, Arc<dyn ConditionSet>>,
    workspace_tx: broadcast::Sender<WorkspaceEvent>,
    condition_tx: broadcast::Sender<ConditionSetChanged>,
}

impl Model {
    pub fn new() -> Arc<Self> {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        let (workspace_tx, _) = broadcast::channel(capacity);
        let (condition_tx, _) = broadcast::channel(capacity);
        Arc::new(Self {
            current_workspace: RwLock::new(None),
            condition_sets: DashMap::new(),
            workspace_tx,
            condition_tx,
        })
    }

    pub fn current_workspace(&self) -> Option<Arc<dyn Workspace>> {
        self.current_workspace.read().clone()
    }

    pub fn open_workspace(&self, workspace: Arc<dyn Workspace>) {
        info!("Opening workspace '{}'", workspace.name());
        *self.current_workspace.write() = Some(workspace.clone());
        let _ = self.workspace_tx.send(WorkspaceEvent::Opened(workspace));
    }

    pub fn close_workspace(&self) {
        if let Some(ws) = self.current_workspace.write().take() {
            info!("Closing workspace '{}'", ws.name());
        }
        let _ = self.workspace_tx.send(WorkspaceEvent::Closed);
    }

    pub fn reset_workspace(&self, workspace: Arc<dyn Workspace>) {
        info!("Resetting workspace '{}'", workspace.name());
        *self.current_workspace.write() = Some(workspace.clone());
        let _ = self.workspace_tx.send(WorkspaceEvent::Reset(workspace));
    }

    pub fn condition_set(&self, name: &str) -> Option<Arc<dyn ConditionSet>> {
        self.condition_sets.get(name).map(|entry| entry.value().clone())
    }

    /// Replace (or with `None`, remove) a named condition set and notify trackers
    pub fn set_condition_set(&self, name: &str, set: Option<Arc<dyn ConditionSet>>) {
        match &set {
            Some(s) => {
                self.condition_sets.insert(name.to_string(), s.clone());
            }
            None => {
                self.condition_sets.remove(name);
            }
        }
        let _ = self.condition_tx.send(ConditionSetChanged {
            name: name.to_string(),
            set,
        });
    }

    pub fn subscribe_workspace(self: &Arc<Self>) -> (Option<Arc<dyn Workspace>>, WorkspaceListener) {
        let rx = self.workspace_tx.subscribe();
        let current = self.current_workspace();
        (
            current,
            WorkspaceListener {
                model: self.clone(),
                rx,
            },
        )
    }

    pub fn track_condition_set(
        self: &Arc<Self>,
        name: &str,
    ) -> (Option<Arc<dyn ConditionSet>>, ConditionSetTracker) {
        let rx = self.condition_tx.subscribe();
        let current = self.condition_set(name);
        (
            current,
            ConditionSetTracker {
                model: self.clone(),
                name: name.to_string(),
                rx,
            },
        )
    }
}

/// Receives workspace lifecycle events
pub struct WorkspaceListener {
    model: Arc<Model>,
    rx: broadcast::Receiver<WorkspaceEvent>,
}

impl WorkspaceListener {
    /// Next lifecycle event. After a lag the current state is replayed as a
    /// reset (or close) so the subscriber converges.
    pub async fn recv(&mut self) -> Option<WorkspaceEvent> {
        match self.rx.recv().await {
            Ok(event) => Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Workspace listener lagged by {} events, resynchronising", skipped);
                Some(match self.model.current_workspace() {
                    Some(ws) => WorkspaceEvent::Reset(ws),
                    None => WorkspaceEvent::Closed,
                })
            }
            Err(RecvError::Closed) => None,
        }
    }
}

/// Receives changes for one named condition set
pub struct ConditionSetTracker {
    model: Arc<Model>,
    name: String,
    rx: broadcast::Receiver<ConditionSetChanged>,
}

impl ConditionSetTracker {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next replacement of the tracked set (`None` inside means removed)
    pub async fn changed(&mut self) -> Option<Option<Arc<dyn ConditionSet>>> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.name == self.name => return Some(event.set),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "Condition set tracker '{}' lagged by {} events, resynchronising",
                        self.name, skipped
                    );
                    return Some(self.model.condition_set(&self.name));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
