//! # Todoshub Testing
//!
//! Testing utilities and helpers for the Todoshub state layer.
//!
//! This crate provides:
//! - [`ReducerTest`]: Given/When/Then builder for pure reducer tests
//! - [`assertions`]: Effect assertion helpers
//! - [`probes`]: Callback probes that count how often a completion callback ran
//! - [`snapshots`]: Helpers for waiting on store snapshots
//! - [`init_test_tracing`]: Opt-in log output for tests
//!
//! ## Example
//!
//! ```ignore
//! use todoshub_testing::probes::CallbackProbe;
//!
//! #[tokio::test(start_paused = true)]
//! async fn submit_reports_success() {
//!     let controller = CreationController::new(repository, &TodoConfig::default());
//!     let success = CallbackProbe::new();
//!     let failure = CallbackProbe::new();
//!
//!     controller.on_todo_value_change("Buy milk").await?;
//!     controller.submit(success.callback(), failure.callback()).await?;
//!
//!     assert_eq!(success.calls(), 1);
//!     assert_eq!(failure.calls(), 0);
//! }
//! ```


pub use reducer_test::{assertions, ReducerTest};

/// Callback probes
///
/// Controllers report completion through `FnOnce` callbacks. A probe hands
/// out such callbacks and counts how many of them were invoked.
pub mod probes {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts invocations of the callbacks it hands out
    ///
    /// # Example
    ///
    /// ```
    /// use todoshub_testing::probes::CallbackProbe;
    ///
    /// let probe = CallbackProbe::new();
    /// let callback = probe.callback();
    /// assert_eq!(probe.calls(), 0);
    ///
    /// callback();
    /// assert_eq!(probe.calls(), 1);
    /// ```
    #[derive(Debug, Clone, Default)]
    pub struct CallbackProbe {
        calls: Arc<AtomicUsize>,
    }

    impl CallbackProbe {
        /// Create a probe with no recorded calls
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A callback that records one call on this probe when invoked
        #[must_use]
        pub fn callback(&self) -> impl FnOnce() + Send + 'static {
            let calls = Arc::clone(&self.calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        }

        /// Number of callbacks invoked so far
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Whether any callback has been invoked
        #[must_use]
        pub fn was_called(&self) -> bool {
            self.calls() > 0
        }
    }
}

/// Helpers for observing store snapshots in tests
pub mod snapshots {
    use std::time::Duration;
    use todoshub_runtime::StoreError;
    use tokio::sync::watch;

    /// Wait until the latest snapshot satisfies `predicate` and return a copy
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if no matching snapshot arrives in time
    /// - [`StoreError::ChannelClosed`] if the store was dropped
    pub async fn wait_for_snapshot<S, F>(
        receiver: &mut watch::Receiver<S>,
        predicate: F,
        timeout: Duration,
    ) -> Result<S, StoreError>
    where
        S: Clone,
        F: FnMut(&S) -> bool,
    {
        match tokio::time::timeout(timeout, receiver.wait_for(predicate)).await {
            Ok(Ok(state)) => Ok(state.clone()),
            Ok(Err(_)) => Err(StoreError::ChannelClosed),
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

/// Install a `tracing` subscriber that writes through the test harness
///
/// Honours `RUST_LOG`; defaults to `warn`. Safe to call from every test,
/// only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::probes::CallbackProbe;
    use super::snapshots::wait_for_snapshot;
    use std::time::Duration;
    use tokio::sync::watch;

    #[test]
    fn probe_counts_each_callback_once() {
        let probe = CallbackProbe::new();
        let first = probe.callback();
        let second = probe.callback();

        first();
        assert_eq!(probe.calls(), 1);
        second();
        assert_eq!(probe.calls(), 2);
        assert!(probe.was_called());
    }

    #[tokio::test]
    async fn wait_for_snapshot_returns_matching_value() {
        let (tx, mut rx) = watch::channel(0_u32);

        tokio::spawn(async move {
            for value in 1..=3 {
                let _ = tx.send(value);
            }
        });

        let value = wait_for_snapshot(&mut rx, |v| *v == 3, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_snapshot_times_out() {
        let (_tx, mut rx) = watch::channel(0_u32);

        let result = wait_for_snapshot(&mut rx, |v| *v > 0, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(todoshub_runtime::StoreError::Timeout)));
    }

    #[test]
    fn init_test_tracing_is_idempotent() {
        super::init_test_tracing();
        super::init_test_tracing();
    }
}
