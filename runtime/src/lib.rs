//! # Todoshub Runtime
//!
//! Runtime implementation for the Todoshub state layer.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling for one controller.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Cancellation Registry**: Tracks delayed actions that a newer action may replace
//! - **Snapshots**: A `watch` channel carrying a copy of the state after every action
//!
//! ## Example
//!
//! ```ignore
//! use todoshub_runtime::Store;
//!
//! let store = Store::new(ListingState::default(), ListingReducer::new(), env);
//!
//! // Send an action
//! store.send(ListingAction::FetchRequested).await?;
//!
//! // Observe state
//! let mut snapshots = store.subscribe_state();
//! snapshots.changed().await?;
//! let state = snapshots.borrow().clone();
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use todoshub_core::effect::{Effect, EffectId};
use todoshub_core::reducer::Reducer;
use tokio::sync::{Notify, RwLock, watch};
use tokio::task::AbortHandle;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for terminal action
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is received.
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Configuration for Store instances
///
/// # Example
///
/// ```ignore
/// let config = StoreConfig::default()
///     .with_broadcast_capacity(64)
///     .with_shutdown_timeout(Duration::from_secs(5));
///
/// let store = Store::with_config(state, reducer, env, config);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Number of effect-produced actions buffered for slow observers
    pub broadcast_capacity: usize,
    /// Default timeout for graceful shutdown
    pub default_shutdown_timeout: Duration,
}

impl StoreConfig {
    /// Create a new configuration with custom values
    #[must_use]
    pub const fn new(broadcast_capacity: usize, default_shutdown_timeout: Duration) -> Self {
        Self {
            broadcast_capacity,
            default_shutdown_timeout,
        }
    }

    /// Set the action broadcast capacity
    #[must_use]
    pub const fn with_broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    /// Set the default shutdown timeout
    #[must_use]
    pub const fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.default_shutdown_timeout = timeout;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 16,
            default_shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects of one
/// action to complete. Effects produced by feedback actions are not tracked.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait_with_timeout(Duration::from_secs(5)).await?;
/// // All effects from Action::Start are now complete
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    /// Create a new effect handle together with its tracking side
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: tx,
        };

        (handle, tracking)
    }

    /// Create a handle that's already complete
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        let _ = tx.send(());

        Self {
            effects: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Number of effects still running for this action
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all effects to complete
    ///
    /// A debounced effect that gets replaced by a newer one counts as complete.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait for all effects to complete with a timeout
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the timeout expires before all effects complete.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: Effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl EffectTracking {
    /// Increment the effect counter (effect started)
    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the effect counter (effect completed)
    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            // Counter reached zero, notify waiters
            let _ = self.notifier.send(());
        }
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs when an effect task finishes, panics, or is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: one delayed task registered under an [`EffectId`]
struct PendingEffect {
    token: u64,
    abort: AbortHandle,
}

/// Registry of cancellable delayed tasks, at most one per [`EffectId`]
#[derive(Clone, Default)]
struct CancellationRegistry {
    pending: Arc<Mutex<HashMap<EffectId, PendingEffect>>>,
    next_token: Arc<AtomicU64>,
}

impl CancellationRegistry {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<EffectId, PendingEffect>> {
        self.pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn next_token(&self) -> u64 {
        self.next_token.fetch_add(1, Ordering::Relaxed)
    }

    /// Abort the task pending under `id`; returns whether one was pending
    fn cancel(&self, id: EffectId) -> bool {
        self.lock().remove(&id).is_some_and(|pending| {
            pending.abort.abort();
            true
        })
    }

    /// Abort every pending task; returns how many were pending
    fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.lock().drain().collect();
        for (_, pending) in &drained {
            pending.abort.abort();
        }
        drained.len()
    }

    /// Forget `id` if it still refers to the task identified by `token`
    fn release(&self, id: EffectId, token: u64) {
        let mut pending = self.lock();
        if pending.get(&id).is_some_and(|entry| entry.token == token) {
            pending.remove(&id);
        }
    }

    fn is_pending(&self, id: EffectId) -> bool {
        self.lock().contains_key(&id)
    }
}

/// Store module - The runtime for reducers
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellationRegistry, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, Notify, Ordering,
        PendingEffect, Reducer, RwLock, StoreConfig, StoreError,
    };
    use crate::metrics::{EffectMetrics, StoreMetrics};
    use tokio::sync::{broadcast, watch};

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock`; the reducer runs under the write lock)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop)
    /// 5. A snapshot channel re-published after every action
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        /// Wakes `send_and_wait_for` callers when shutdown starts.
        shutdown_notify: Arc<Notify>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancellationRegistry,
        default_shutdown_timeout: Duration,
        /// Actions produced by effects, published after the reducer processed them.
        action_broadcast: broadcast::Sender<A>,
        /// Latest state, replaced after every reducer run.
        snapshots: watch::Sender<S>,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Sync + Clone + std::fmt::Debug + 'static,
        S: Clone + Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        ///
        /// Uses [`StoreConfig::default()`].
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_config(initial_state, reducer, environment, StoreConfig::default())
        }

        /// Create a new Store with custom configuration
        #[must_use]
        pub fn with_config(
            initial_state: S,
            reducer: R,
            environment: E,
            config: StoreConfig,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(config.broadcast_capacity.max(1));
            let (snapshots, _) = watch::channel(initial_state.clone());

            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                shutdown_notify: Arc::new(Notify::new()),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: CancellationRegistry::default(),
                default_shutdown_timeout: config.default_shutdown_timeout,
                action_broadcast,
                snapshots,
            }
        }

        /// Timeout used by callers that do not pick their own for [`Store::shutdown`]
        #[must_use]
        pub const fn default_shutdown_timeout(&self) -> Duration {
            self.default_shutdown_timeout
        }

        /// Number of effect tasks currently running in this store
        #[must_use]
        pub fn pending_effects(&self) -> usize {
            self.pending_effects.load(Ordering::Acquire)
        }

        /// Whether a cancellable effect is pending under `id`
        #[must_use]
        pub fn is_pending(&self, id: EffectId) -> bool {
            self.cancellations.is_pending(id)
        }

        /// Whether [`Store::shutdown`] has been initiated
        #[must_use]
        pub fn is_shutting_down(&self) -> bool {
            self.shutdown.load(Ordering::Acquire)
        }

        /// Abort every pending cancellable effect
        ///
        /// Returns how many were pending. In-flight futures and plain delays
        /// are not affected.
        pub fn cancel_pending(&self) -> usize {
            let cancelled = self.cancellations.cancel_all();
            if cancelled > 0 {
                EffectMetrics::record_cancelled(cancelled);
                tracing::debug!(cancelled, "Cancelled pending effects");
            }
            cancelled
        }

        /// Initiate graceful shutdown of the store
        ///
        /// This method:
        /// 1. Sets the shutdown flag (rejecting new actions, including
        ///    actions produced by effects that are still running)
        /// 2. Ends every [`Store::send_and_wait_for`] still waiting
        /// 3. Cancels pending cancellable effects
        /// 4. Waits for the remaining effects to complete (with timeout)
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            StoreMetrics::record_shutdown("initiated");

            self.shutdown.store(true, Ordering::Release);
            self.shutdown_notify.notify_waiters();
            self.cancel_pending();

            let start = tokio::time::Instant::now();
            let poll_interval = Duration::from_millis(10);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    StoreMetrics::record_shutdown("completed");
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(
                        pending_effects = pending,
                        "Shutdown timeout: {} effects still running", pending
                    );
                    StoreMetrics::record_shutdown("timeout");
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::trace!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Publishes a snapshot of the new state
        /// 4. Starts the returned effects (they may produce more actions)
        ///
        /// `send()` returns after starting effect execution, not completion.
        /// Use the returned [`EffectHandle`] to wait for the effects.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action), name = "store_send")]
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!(?action, "Rejected action: store is shutting down");
                StoreMetrics::record_rejected();
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!(?action, "Processing action");

            let (handle, tracking) = EffectHandle::new();

            let effects = {
                let mut state = self.state.write().await;

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                StoreMetrics::record_action(start.elapsed());

                self.snapshots.send_replace((*state).clone());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());
                effects
            };

            for effect in effects {
                self.execute_effect_internal(effect, tracking.clone());
            }

            Ok(handle)
        }

        /// Send an action and wait for a matching result action
        ///
        /// Subscribes to the action broadcast BEFORE sending, then returns the
        /// first effect-produced action matching the predicate. Because
        /// actions are broadcast after the reducer ran, the state already
        /// reflects the returned action when this method returns.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: Timeout expired before matching action received
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down, or
        ///   shutdown started while waiting
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            tokio::time::timeout(timeout, self.send_and_wait(action, predicate))
                .await
                .map_err(|_| StoreError::Timeout)?
        }

        /// Send an action and wait, without a time limit, for a matching result action
        ///
        /// Same as [`Store::send_and_wait_for`], but only a matching action or
        /// shutdown ends the wait.
        ///
        /// # Errors
        ///
        /// - [`StoreError::ChannelClosed`]: Action broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: Store is shutting down, or
        ///   shutdown started while waiting
        pub async fn send_and_wait<F>(&self, action: A, predicate: F) -> Result<A, StoreError>
        where
            R: Clone,
            E: Clone,
            F: Fn(&A) -> bool,
        {
            // Subscribe BEFORE sending to avoid race condition
            let mut rx = self.action_broadcast.subscribe();
            let shutdown = self.shutdown_notify.notified();
            tokio::pin!(shutdown);
            shutdown.as_mut().enable();

            self.send(action).await?;

            loop {
                tokio::select! {
                    received = rx.recv() => match received {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {},
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged, {} actions skipped", skipped);
                        },
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        },
                    },
                    () = &mut shutdown => return Err(StoreError::ShutdownInProgress),
                }
            }
        }

        /// Subscribe to all actions produced by effects
        ///
        /// Actions sent directly through [`Store::send`] are not broadcast.
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.action_broadcast.subscribe()
        }

        /// Subscribe to state snapshots
        ///
        /// The receiver starts at the current state and is marked changed after
        /// every action the reducer processes.
        #[must_use]
        pub fn subscribe_state(&self) -> watch::Receiver<S> {
            self.snapshots.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let loading = store.state(|s| s.is_loading).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Spawn an effect task with per-action and store-wide tracking
        fn spawn_tracked<F>(&self, tracking: &EffectTracking, task: F) -> tokio::task::JoinHandle<()>
        where
            F: std::future::Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            let guard = DecrementGuard(tracking.clone());

            self.pending_effects.fetch_add(1, Ordering::SeqCst);
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                task.await;
            })
        }

        /// Feed an effect-produced action back into the store, then broadcast it
        ///
        /// Actions the store rejects are not broadcast.
        async fn feed_back(&self, action: A)
        where
            R: Clone,
            E: Clone,
        {
            match self.send(action.clone()).await {
                Ok(_) => {
                    let _ = self.action_broadcast.send(action);
                },
                Err(error) => {
                    tracing::debug!(%error, ?action, "Effect produced an action the store did not accept");
                },
            }
        }

        /// Execute an effect with tracking
        ///
        /// # Effect Types
        ///
        /// - `None`: No-op
        /// - `Future`: Executes async computation, sends resulting action if `Some`
        /// - `Delay`: Waits for duration, then sends action
        /// - `Debounce`: Aborts the task pending under the id, then behaves like `Delay`
        /// - `Cancel`: Aborts the task pending under the id
        /// - `Parallel`: Executes effects concurrently
        /// - `Sequential`: Executes effects in order, waiting for each to complete
        #[allow(clippy::needless_pass_by_value)] // tracking is cloned per spawned task
        #[allow(clippy::too_many_lines)]
        fn execute_effect_internal(&self, effect: Effect<A>, tracking: EffectTracking)
        where
            R: Clone,
            E: Clone,
        {
            EffectMetrics::record_execution(effect.kind());

            match effect {
                Effect::None => {
                    tracing::trace!("Executing Effect::None (no-op)");
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            store.feed_back(action).await;
                        } else {
                            tracing::trace!("Effect::Future completed with no action");
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!("Executing Effect::Delay (duration: {:?})", duration);
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        tokio::time::sleep(duration).await;
                        tracing::trace!("Effect::Delay completed, sending action");
                        store.feed_back(*action).await;
                    });
                },
                Effect::Debounce {
                    id,
                    duration,
                    action,
                } => {
                    tracing::trace!(%id, "Executing Effect::Debounce (duration: {:?})", duration);

                    // Hold the registry lock across spawn + insert so the task
                    // cannot release its slot before it is registered.
                    let mut pending = self.cancellations.lock();
                    if let Some(previous) = pending.remove(&id) {
                        previous.abort.abort();
                        EffectMetrics::record_cancelled(1);
                        tracing::trace!(%id, "Replaced pending debounced action");
                    }

                    let token = self.cancellations.next_token();
                    let store = self.clone();
                    let join = self.spawn_tracked(&tracking, async move {
                        tokio::time::sleep(duration).await;
                        store.cancellations.release(id, token);
                        tracing::trace!(%id, "Quiet period elapsed, sending action");
                        store.feed_back(*action).await;
                    });

                    pending.insert(
                        id,
                        PendingEffect {
                            token,
                            abort: join.abort_handle(),
                        },
                    );
                },
                Effect::Cancel(id) => {
                    if self.cancellations.cancel(id) {
                        EffectMetrics::record_cancelled(1);
                        tracing::trace!(%id, "Cancelled pending action");
                    }
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    for effect in effects {
                        self.execute_effect_internal(effect, tracking.clone());
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    let store = self.clone();

                    self.spawn_tracked(&tracking, async move {
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!(
                                "Executing sequential effect {} of {}",
                                idx + 1,
                                effect_count
                            );

                            let (mut sub_handle, sub_tracking) = EffectHandle::new();
                            store.execute_effect_internal(effect, sub_tracking);
                            sub_handle.wait().await;
                        }
                        tracing::trace!("Effect::Sequential completed");
                    });
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                shutdown_notify: Arc::clone(&self.shutdown_notify),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: self.cancellations.clone(),
                default_shutdown_timeout: self.default_shutdown_timeout,
                action_broadcast: self.action_broadcast.clone(),
                snapshots: self.snapshots.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;

#[cfg(test)]
mod tests {
    use super::*;
    use todoshub_core::{smallvec, SmallVec};

    const SLOT: EffectId = EffectId::new("slot");

    #[derive(Debug, Clone)]
    struct TestState {
        value: i32,
        applied: Vec<i32>,
    }

    #[derive(Debug, Clone, PartialEq)]
    enum TestAction {
        Increment,
        Decrement,
        NoOp,
        ProduceEffect,
        ProduceDelayedAction,
        ProduceParallelEffects,
        ProduceSequentialEffects,
        Schedule(i32),
        Apply(i32),
        CancelScheduled,
    }

    #[derive(Debug, Clone)]
    struct TestEnv;

    #[derive(Debug, Clone)]
    struct TestReducer;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.value += 1;
                    smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.value -= 1;
                    smallvec![Effect::None]
                },
                TestAction::NoOp => smallvec![Effect::None],
                TestAction::ProduceEffect => {
                    smallvec![Effect::Future(Box::pin(async {
                        Some(TestAction::Increment)
                    }))]
                },
                TestAction::ProduceDelayedAction => {
                    smallvec![Effect::Delay {
                        duration: Duration::from_millis(10),
                        action: Box::new(TestAction::Increment),
                    }]
                },
                TestAction::ProduceParallelEffects => {
                    smallvec![Effect::Parallel(vec![
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                    ])]
                },
                TestAction::ProduceSequentialEffects => {
                    smallvec![Effect::Sequential(vec![
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(TestAction::Increment) })),
                        Effect::Future(Box::pin(async { Some(TestAction::Decrement) })),
                    ])]
                },
                TestAction::Schedule(value) => {
                    smallvec![Effect::Debounce {
                        id: SLOT,
                        duration: Duration::from_millis(500),
                        action: Box::new(TestAction::Apply(value)),
                    }]
                },
                TestAction::Apply(value) => {
                    state.applied.push(value);
                    SmallVec::new()
                },
                TestAction::CancelScheduled => smallvec![Effect::Cancel(SLOT)],
            }
        }
    }

    fn new_store() -> Store<TestState, TestAction, TestEnv, TestReducer> {
        Store::new(
            TestState {
                value: 0,
                applied: Vec::new(),
            },
            TestReducer,
            TestEnv,
        )
    }

    #[tokio::test]
    async fn test_send_action() {
        let store = new_store();

        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Increment).await;
        let _ = store.send(TestAction::Decrement).await;
        let _ = store.send(TestAction::NoOp).await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_future_effect_feeds_back() {
        let store = new_store();

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 1);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn test_delay_effect() {
        let store = new_store();

        let mut handle = store.send(TestAction::ProduceDelayedAction).await.unwrap();
        assert_eq!(store.state(|s| s.value).await, 0);

        handle
            .wait_with_timeout(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test]
    async fn test_parallel_effects() {
        let store = new_store();

        let mut handle = store.send(TestAction::ProduceParallelEffects).await.unwrap();
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 3);
    }

    #[tokio::test]
    async fn test_sequential_effects() {
        let store = new_store();

        let mut handle = store
            .send(TestAction::ProduceSequentialEffects)
            .await
            .unwrap();
        handle.wait().await;

        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_keeps_only_last_action() {
        let store = new_store();

        let _ = store.send(TestAction::Schedule(1)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = store.send(TestAction::Schedule(2)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut last = store.send(TestAction::Schedule(3)).await.unwrap();
        assert!(store.is_pending(SLOT));

        last.wait().await;

        assert_eq!(store.state(|s| s.applied.clone()).await, vec![3]);
        assert!(!store.is_pending(SLOT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_fires_once_per_quiet_period() {
        let store = new_store();

        let mut first = store.send(TestAction::Schedule(1)).await.unwrap();
        first.wait().await;
        let mut second = store.send(TestAction::Schedule(2)).await.unwrap();
        second.wait().await;

        assert_eq!(store.state(|s| s.applied.clone()).await, vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_effect_drops_pending_action() {
        let store = new_store();

        let mut scheduled = store.send(TestAction::Schedule(7)).await.unwrap();
        let _ = store.send(TestAction::CancelScheduled).await;

        // Cancelled tasks count as complete for their handle
        scheduled.wait().await;
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(store.state(|s| s.applied.is_empty()).await);
        assert_eq!(store.pending_effects(), 0);
    }

    #[tokio::test]
    async fn test_snapshots_follow_every_action() {
        let store = new_store();
        let mut snapshots = store.subscribe_state();
        assert_eq!(snapshots.borrow().value, 0);

        let _ = store.send(TestAction::Increment).await;
        snapshots.changed().await.unwrap();
        assert_eq!(snapshots.borrow_and_update().value, 1);

        let mut handle = store.send(TestAction::ProduceEffect).await.unwrap();
        handle.wait().await;
        assert_eq!(snapshots.borrow().value, 2);
    }

    #[tokio::test]
    async fn test_send_and_wait_for_sees_updated_state() {
        let store = new_store();

        let action = store
            .send_and_wait_for(
                TestAction::ProduceEffect,
                |a| matches!(a, TestAction::Increment),
                Duration::from_secs(1),
            )
            .await
            .unwrap();

        assert_eq!(action, TestAction::Increment);
        assert_eq!(store.state(|s| s.value).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_and_wait_for_times_out() {
        let store = new_store();

        let result = store
            .send_and_wait_for(
                TestAction::NoOp,
                |a| matches!(a, TestAction::Increment),
                Duration::from_millis(100),
            )
            .await;

        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_and_wait_outlasts_slow_effects() {
        let store = new_store();
        let start = tokio::time::Instant::now();

        let action = store
            .send_and_wait(TestAction::Schedule(5), |a| matches!(a, TestAction::Apply(_)))
            .await
            .unwrap();

        assert_eq!(action, TestAction::Apply(5));
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(store.state(|s| s.applied.clone()).await, vec![5]);
    }

    #[test]
    fn test_default_shutdown_timeout_comes_from_config() {
        let store = Store::with_config(
            TestState {
                value: 0,
                applied: Vec::new(),
            },
            TestReducer,
            TestEnv,
            StoreConfig::default().with_shutdown_timeout(Duration::from_secs(3)),
        );
        assert_eq!(store.default_shutdown_timeout(), Duration::from_secs(3));
        assert_eq!(
            new_store().default_shutdown_timeout(),
            StoreConfig::default().default_shutdown_timeout
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_and_rejects_actions() {
        let store = new_store();

        let _ = store.send(TestAction::Schedule(1)).await;
        let _ = store.send(TestAction::ProduceDelayedAction).await;

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        assert!(store.is_shutting_down());
        assert!(!store.is_pending(SLOT));
        assert!(store.state(|s| s.applied.is_empty()).await);
        assert!(matches!(
            store.send(TestAction::Increment).await,
            Err(StoreError::ShutdownInProgress)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_waiting_callers() {
        let store = new_store();

        let waiter = {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .send_and_wait_for(
                        TestAction::ProduceDelayedAction,
                        |a| matches!(a, TestAction::Increment),
                        Duration::from_secs(60),
                    )
                    .await
            })
        };
        tokio::task::yield_now().await;

        store.shutdown(Duration::from_secs(1)).await.unwrap();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
        // The delayed Increment arrived after shutdown and was rejected
        assert_eq!(store.state(|s| s.value).await, 0);
    }

    #[tokio::test]
    async fn test_completed_handle() {
        let mut handle = EffectHandle::completed();
        assert_eq!(handle.pending(), 0);
        tokio_test::assert_ok!(handle.wait_with_timeout(Duration::from_millis(10)).await);
    }
}
