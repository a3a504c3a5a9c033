//! Prometheus metrics for observability and monitoring.
//!
//! Metric names recorded by the store runtime and by feature crates:
//! - Reducer execution (actions processed, duration)
//! - Effect execution and cancellation
//! - Store lifecycle (rejected actions, shutdown)
//! - Todo persistence (fetches, submissions by outcome)
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed.
//!
//! # Example
//!
//! ```rust,no_run
//! use todoshub_runtime::metrics::MetricsRecorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let recorder = MetricsRecorder::install()?;
//!
//! // ... run controllers ...
//!
//! if let Some(text) = recorder.render() {
//!     println!("{text}");
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Process-wide Prometheus recorder.
///
/// Installs the exporter as the global `metrics` recorder and renders the
/// collected values in Prometheus text format on demand.
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a recorder is already installed (e.g., by another test), the
    /// returned recorder has no handle and [`MetricsRecorder::render`]
    /// returns `None`; values are still recorded by the existing recorder.
    pub fn install() -> Result<Self, MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.000_01, 0.000_1, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                tracing::info!("Prometheus metrics recorder installed");
                Ok(Self {
                    handle: Some(handle),
                })
            },
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                    Ok(Self { handle: None })
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            },
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if this instance did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    // Reducer Metrics
    describe_counter!(
        "store_actions_processed_total",
        "Total number of actions processed by reducers"
    );
    describe_histogram!(
        "reducer_execution_duration_seconds",
        "Time taken to execute reducers"
    );
    describe_counter!(
        "store_actions_rejected_total",
        "Actions rejected because the store was shutting down"
    );
    describe_counter!(
        "store_shutdown_total",
        "Store shutdown phases, labelled by phase"
    );

    // Effect Metrics
    describe_counter!(
        "effects_executed_total",
        "Total number of effects executed, labelled by kind"
    );
    describe_counter!(
        "effects_cancelled_total",
        "Delayed effects aborted before they fired"
    );

    // Todo Metrics
    describe_counter!(
        "todo_fetches_total",
        "Todo list fetches, labelled by outcome"
    );
    describe_counter!(
        "todo_submissions_total",
        "Todo submissions, labelled by outcome"
    );
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an action processed by the reducer.
    pub fn record_action(duration: Duration) {
        counter!("store_actions_processed_total").increment(1);
        histogram!("reducer_execution_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an action rejected during shutdown.
    pub fn record_rejected() {
        counter!("store_actions_rejected_total").increment(1);
    }

    /// Record a shutdown phase (`initiated`, `completed`, `timeout`).
    pub fn record_shutdown(phase: &'static str) {
        counter!("store_shutdown_total", "phase" => phase).increment(1);
    }
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record an effect execution.
    pub fn record_execution(kind: &'static str) {
        counter!("effects_executed_total", "kind" => kind).increment(1);
    }

    /// Record aborted delayed effects.
    pub fn record_cancelled(count: usize) {
        counter!("effects_cancelled_total").increment(count as u64);
    }
}
