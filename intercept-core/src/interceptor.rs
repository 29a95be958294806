//! HTTP Interceptor
//!
//! Decides per direction whether an in-flight transaction is held for manual
//! review, keeps held transactions in an insertion-ordered queue, and
//! re-evaluates that queue whenever a level, a breakpoint set or the
//! workspace changes.
//!
//! All state sits behind one mutex. Condition-set evaluation and the
//! workspace property write run inside it; `forward()` calls and observer
//! callbacks always run after it has been released.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::InterceptorConfig;
use crate::log_intercept_event;
use crate::model::{Model, WorkspaceEvent};
use crate::observer::InterceptorObserver;
use crate::stats::{InterceptorStats, StatsSnapshot};
use intercept_common::{
    ConditionSet, Direction, InterceptionLevel, PendingOwner, PropertyStore, Transaction,
    TransactionId, Workspace,
};

enum Notification {
    Queued(Arc<dyn Transaction>),
    Released(Arc<dyn Transaction>),
}

#[derive(Default)]
struct InterceptorState {
    request_level: InterceptionLevel,
    response_level: InterceptionLevel,
    request_breakpoints: Option<Arc<dyn ConditionSet>>,
    response_breakpoints: Option<Arc<dyn ConditionSet>>,
    queue: VecDeque<Arc<dyn Transaction>>,
    observer: Option<Arc<dyn InterceptorObserver>>,
    workspace: Option<Arc<dyn Workspace>>,
    /// Observer notifications in the order the state changed
    outbox: VecDeque<(Arc<dyn InterceptorObserver>, Notification)>,
}

impl InterceptorState {
    fn level(&self, direction: Direction) -> InterceptionLevel {
        match direction {
            Direction::Request => self.request_level,
            Direction::Response => self.response_level,
        }
    }

    fn set_level(&mut self, direction: Direction, level: InterceptionLevel) {
        match direction {
            Direction::Request => self.request_level = level,
            Direction::Response => self.response_level = level,
        }
    }

    fn breakpoints(&self, direction: Direction) -> Option<&Arc<dyn ConditionSet>> {
        match direction {
            Direction::Request => self.request_breakpoints.as_ref(),
            Direction::Response => self.response_breakpoints.as_ref(),
        }
    }

    fn set_breakpoints(&mut self, direction: Direction, set: Option<Arc<dyn ConditionSet>>) {
        match direction {
            Direction::Request => self.request_breakpoints = set,
            Direction::Response => self.response_breakpoints = set,
        }
    }

    fn should_intercept(&self, transaction: &dyn Transaction) -> bool {
        let direction = transaction.direction();
        qualifies(self.level(direction), self.breakpoints(direction), transaction)
    }

    /// Reload both levels from the bound workspace; absent or unknown values
    /// fall back to `Disabled`.
    fn load_levels(&mut self, config: &InterceptorConfig) {
        let Some(ws) = self.workspace.clone() else {
            return;
        };
        for direction in Direction::ALL {
            let stored = ws.get_integer_property(config.level_key(direction));
            let level = match InterceptionLevel::from_value(stored) {
                Some(level) => level,
                None => {
                    if let Some(value) = stored {
                        warn!(
                            "Ignoring unrecognised {} level {} in workspace '{}'",
                            direction,
                            value,
                            ws.name()
                        );
                    }
                    InterceptionLevel::Disabled
                }
            };
            self.set_level(direction, level);
        }
        info!(
            "Loaded interceptor levels from workspace '{}': request={}, response={}",
            ws.name(),
            self.request_level,
            self.response_level
        );
    }

    /// Remove every held transaction of `direction` that no longer qualifies,
    /// preserving queue order for both the removed and the kept entries.
    fn take_released(&mut self, direction: Direction) -> Vec<Arc<dyn Transaction>> {
        let level = self.level(direction);
        if level == InterceptionLevel::EnabledAll {
            return Vec::new();
        }
        let breakpoints = self.breakpoints(direction).cloned();

        let mut released = Vec::new();
        self.queue.retain(|transaction| {
            if transaction.direction() != direction
                || qualifies(level, breakpoints.as_ref(), transaction.as_ref())
            {
                return true;
            }
            released.push(transaction.clone());
            false
        });

        if let Some(observer) = self.observer.clone() {
            for transaction in &released {
                self.outbox
                    .push_back((observer.clone(), Notification::Released(transaction.clone())));
            }
        }
        released
    }
}

fn qualifies(
    level: InterceptionLevel,
    breakpoints: Option<&Arc<dyn ConditionSet>>,
    transaction: &dyn Transaction,
) -> bool {
    match level {
        InterceptionLevel::Disabled => false,
        InterceptionLevel::EnabledAll => true,
        InterceptionLevel::EnabledOnBreakpoints => breakpoints.map_or(false, |set| {
            let request = transaction.request();
            let response = transaction.response();
            set.matches(&request, response.as_deref())
        }),
    }
}

struct Inner {
    config: InterceptorConfig,
    state: Mutex<InterceptorState>,
    /// Held by whichever thread is delivering the outbox
    dispatch: Mutex<()>,
    stats: InterceptorStats,
    weak_self: Weak<Inner>,
}

impl Inner {
    fn owner(&self) -> Weak<dyn PendingOwner> {
        self.weak_self.clone()
    }

    fn remove_handled(&self, id: TransactionId) {
        let removed = {
            let mut state = self.state.lock();
            match state.queue.iter().position(|t| t.id() == id) {
                Some(idx) => state.queue.remove(idx),
                None => None,
            }
        };
        match removed {
            Some(transaction) => {
                self.stats.handled.fetch_add(1, Ordering::Relaxed);
                log_intercept_event!(debug, id, transaction.direction(), "handled");
            }
            None => debug!("Transaction {} not queued, ignoring handled notice", id),
        }
    }

    /// Forward released transactions oldest first, then deliver notifications.
    fn release(&self, released: Vec<Arc<dyn Transaction>>) {
        for transaction in released {
            log_intercept_event!(debug, transaction.id(), transaction.direction(), "released");
            transaction.forward();
            self.stats.released_by_sweep.fetch_add(1, Ordering::Relaxed);
        }
        self.drain_outbox();
    }

    /// Deliver pending observer notifications outside the state lock.
    ///
    /// Only one thread delivers at a time, which keeps delivery in state
    /// order. A thread that finds delivery in progress leaves its entries to
    /// the active deliverer, so an observer may re-enter the interceptor.
    fn drain_outbox(&self) {
        loop {
            let Some(guard) = self.dispatch.try_lock() else {
                return;
            };
            loop {
                let next = self.state.lock().outbox.pop_front();
                match next {
                    Some((observer, Notification::Queued(t))) => observer.transaction_queued(t),
                    Some((observer, Notification::Released(t))) => observer.transaction_released(t),
                    None => break,
                }
            }
            drop(guard);
            if self.state.lock().outbox.is_empty() {
                return;
            }
        }
    }
}

impl PendingOwner for Inner {
    fn notify_handled(&self, id: TransactionId) {
        self.remove_handled(id);
    }
}

/// Interception decision engine and held-transaction queue
#[derive(Clone)]
pub struct HttpInterceptor {
    inner: Arc<Inner>,
}

impl HttpInterceptor {
    /// Create an interceptor with no workspace bound; both levels start `Disabled`.
    pub fn new(config: InterceptorConfig) -> Self {
        let inner = Arc::new_cyclic(|weak_self| Inner {
            config,
            state: Mutex::new(InterceptorState::default()),
            dispatch: Mutex::new(()),
            stats: InterceptorStats::default(),
            weak_self: weak_self.clone(),
        });
        Self { inner }
    }

    /// Create an interceptor bound to `model`.
    ///
    /// Levels are loaded from the model's current workspace and the
    /// breakpoint sets are tracked by name. Must be called from within a
    /// tokio runtime; the listener task stops when the returned
    /// [`Subscriptions`] is dropped or detached.
    pub fn attach(model: &Arc<Model>, config: InterceptorConfig) -> (Self, Subscriptions) {
        let interceptor = Self::new(config);
        let config = &interceptor.inner.config;

        let (workspace, mut workspace_listener) = model.subscribe_workspace();
        let (request_set, mut request_tracker) =
            model.track_condition_set(config.breakpoint_set(Direction::Request));
        let (response_set, mut response_tracker) =
            model.track_condition_set(config.breakpoint_set(Direction::Response));

        {
            let mut state = interceptor.inner.state.lock();
            state.workspace = workspace;
            state.load_levels(config);
            state.request_breakpoints = request_set;
            state.response_breakpoints = response_set;
        }

        let weak = Arc::downgrade(&interceptor.inner);
        let model = model.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = workspace_listener.recv() => {
                        let Some(event) = event else { break };
                        let Some(inner) = weak.upgrade() else { break };
                        let interceptor = HttpInterceptor { inner };
                        let refresh = !matches!(event, WorkspaceEvent::Closed);
                        interceptor.handle_workspace_event(&event);
                        if refresh {
                            for direction in Direction::ALL {
                                let name = interceptor.inner.config.breakpoint_set(direction);
                                interceptor.condition_set_changed(direction, model.condition_set(name));
                            }
                        }
                    }
                    change = request_tracker.changed() => {
                        let Some(set) = change else { break };
                        let Some(inner) = weak.upgrade() else { break };
                        HttpInterceptor { inner }.condition_set_changed(Direction::Request, set);
                    }
                    change = response_tracker.changed() => {
                        let Some(set) = change else { break };
                        let Some(inner) = weak.upgrade() else { break };
                        HttpInterceptor { inner }.condition_set_changed(Direction::Response, set);
                    }
                }
            }
            debug!("Interceptor model listener stopped");
        });

        (interceptor, Subscriptions { handle: Some(handle) })
    }

    pub fn config(&self) -> &InterceptorConfig {
        &self.inner.config
    }

    pub fn set_observer(&self, observer: Arc<dyn InterceptorObserver>) {
        self.inner.state.lock().observer = Some(observer);
    }

    /// Without an observer nothing is held.
    pub fn clear_observer(&self) {
        self.inner.state.lock().observer = None;
    }

    /// Returns `true` if the transaction was held and queued, `false` if it
    /// should pass through immediately.
    pub fn submit(&self, transaction: Arc<dyn Transaction>) -> bool {
        self.inner.stats.submitted.fetch_add(1, Ordering::Relaxed);
        let held = {
            let mut state = self.inner.state.lock();
            let Some(observer) = state.observer.clone() else {
                return false;
            };
            if !state.should_intercept(transaction.as_ref()) {
                false
            } else if let Err(e) = transaction.mark_pending(self.inner.owner()) {
                warn!("Passing through transaction that cannot be held: {}", e);
                false
            } else {
                state.queue.push_back(transaction.clone());
                state
                    .outbox
                    .push_back((observer, Notification::Queued(transaction.clone())));
                true
            }
        };

        if held {
            self.inner.stats.held.fetch_add(1, Ordering::Relaxed);
            log_intercept_event!(debug, transaction.id(), transaction.direction(), "held");
            self.inner.drain_outbox();
        } else {
            log_intercept_event!(trace, transaction.id(), transaction.direction(), "passed");
        }
        held
    }

    /// Remove a handled transaction from the queue. Unknown ids are ignored.
    pub fn notify_handled(&self, id: TransactionId) {
        self.inner.remove_handled(id);
    }

    pub fn set_level(&self, direction: Direction, level: InterceptionLevel) {
        let released = {
            let mut state = self.inner.state.lock();
            state.set_level(direction, level);
            match &state.workspace {
                Some(ws) => ws.set_integer_property(
                    self.inner.config.level_key(direction),
                    level.serialize_value(),
                ),
                None => debug!("No workspace bound, {} level not persisted", direction),
            }
            state.take_released(direction)
        };
        info!("Interceptor {} level set to {}", direction, level);
        self.inner.release(released);
    }

    pub fn level(&self, direction: Direction) -> InterceptionLevel {
        self.inner.state.lock().level(direction)
    }

    pub fn breakpoints(&self, direction: Direction) -> Option<Arc<dyn ConditionSet>> {
        self.inner.state.lock().breakpoints(direction).cloned()
    }

    /// Swap in a new breakpoint set (or none) and re-qualify held transactions.
    pub fn condition_set_changed(&self, direction: Direction, set: Option<Arc<dyn ConditionSet>>) {
        let released = {
            let mut state = self.inner.state.lock();
            state.set_breakpoints(direction, set);
            state.take_released(direction)
        };
        debug!(
            "Breakpoint set for {} changed, releasing {} transaction(s)",
            direction,
            released.len()
        );
        self.inner.release(released);
    }

    pub fn handle_workspace_event(&self, event: &WorkspaceEvent) {
        let config = &self.inner.config;
        let released = {
            let mut state = self.inner.state.lock();
            match event {
                WorkspaceEvent::Opened(ws) => {
                    state.workspace = Some(ws.clone());
                    if config.reload_levels_on_open {
                        state.load_levels(config);
                    }
                }
                WorkspaceEvent::Reset(ws) => {
                    state.workspace = Some(ws.clone());
                    state.load_levels(config);
                }
                WorkspaceEvent::Closed => {
                    state.workspace = None;
                    if config.reset_levels_on_close {
                        for direction in Direction::ALL {
                            state.set_level(direction, InterceptionLevel::Disabled);
                            state.set_breakpoints(direction, None);
                        }
                    }
                }
            }
            let mut released = state.take_released(Direction::Request);
            released.extend(state.take_released(Direction::Response));
            released
        };
        info!("Interceptor handled workspace event {:?}", event);
        self.inner.release(released);
    }

    pub fn workspace(&self) -> Option<Arc<dyn Workspace>> {
        self.inner.state.lock().workspace.clone()
    }

    pub fn queue_size(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// The queue may shrink between `queue_size` and this call, so an
    /// out-of-range index yields `None`.
    pub fn queue_at(&self, index: usize) -> Option<Arc<dyn Transaction>> {
        self.inner.state.lock().queue.get(index).cloned()
    }

    pub fn queue_snapshot(&self) -> Vec<Arc<dyn Transaction>> {
        self.inner.state.lock().queue.iter().cloned().collect()
    }

    pub fn stats(&self) -> StatsSnapshot {
        let queued = self.queue_size();
        self.inner.stats.snapshot(queued)
    }
}

impl std::fmt::Debug for HttpInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("HttpInterceptor")
            .field("request_level", &state.request_level)
            .field("response_level", &state.response_level)
            .field("queued", &state.queue.len())
            .finish()
    }
}

/// Keeps the model listener alive; dropping it unsubscribes.
pub struct Subscriptions {
    handle: Option<JoinHandle<()>>,
}

impl Subscriptions {
    pub fn detach(mut self) {
        self.abort();
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        self.abort();
    }
}
