//! Controller timing and failure-sentinel configuration.
//!
//! Defaults: a 2 second search quiet period, a 3 second simulated processing
//! delay after a successful write, and the literal draft `"error"` forcing a
//! failure.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable for the search quiet period in milliseconds
pub const SEARCH_DEBOUNCE_VAR: &str = "TODO_SEARCH_DEBOUNCE_MS";
/// Environment variable for the post-write delay in milliseconds
pub const SUBMIT_DELAY_VAR: &str = "TODO_SUBMIT_DELAY_MS";
/// Environment variable for how long teardown waits for running work in milliseconds
pub const TEARDOWN_TIMEOUT_VAR: &str = "TODO_TEARDOWN_TIMEOUT_MS";
/// Environment variable for the failure sentinel; empty disables it
pub const FAILURE_SENTINEL_VAR: &str = "TODO_FAILURE_SENTINEL";

/// Configuration shared by both controllers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoConfig {
    /// Quiet period before a search query is applied
    pub search_debounce: Duration,
    /// Simulated processing time after a successful write
    pub submit_delay: Duration,
    /// How long `teardown` waits for fetches and submissions still running
    pub teardown_timeout: Duration,
    /// Draft text that forces a submission failure (case-insensitive)
    pub failure_sentinel: Option<String>,
}

impl Default for TodoConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(2000),
            submit_delay: Duration::from_millis(3000),
            teardown_timeout: Duration::from_secs(30),
            failure_sentinel: Some("error".to_string()),
        }
    }
}

impl TodoConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMillis`] if a duration variable is set
    /// but is not a whole number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMillis`] if a duration variable is set
    /// but is not a whole number.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let millis = |name: &'static str, default: Duration| -> Result<Duration, ConfigError> {
            lookup(name).map_or(Ok(default), |value| {
                value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|_| ConfigError::InvalidMillis { name, value })
            })
        };

        let failure_sentinel = match lookup(FAILURE_SENTINEL_VAR) {
            None => defaults.failure_sentinel,
            Some(value) if value.is_empty() => None,
            Some(value) => Some(value),
        };

        Ok(Self {
            search_debounce: millis(SEARCH_DEBOUNCE_VAR, defaults.search_debounce)?,
            submit_delay: millis(SUBMIT_DELAY_VAR, defaults.submit_delay)?,
            teardown_timeout: millis(TEARDOWN_TIMEOUT_VAR, defaults.teardown_timeout)?,
            failure_sentinel,
        })
    }

    /// Set the search quiet period
    #[must_use]
    pub const fn with_search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = debounce;
        self
    }

    /// Set the simulated processing delay
    #[must_use]
    pub const fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = delay;
        self
    }

    /// Set how long `teardown` waits for running work
    #[must_use]
    pub const fn with_teardown_timeout(mut self, timeout: Duration) -> Self {
        self.teardown_timeout = timeout;
        self
    }

    /// Set or disable the failure sentinel
    #[must_use]
    pub fn with_failure_sentinel(mut self, sentinel: Option<&str>) -> Self {
        self.failure_sentinel = sentinel.map(str::to_string);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn unset_variables_keep_defaults() {
        let config = TodoConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TodoConfig::default());
        assert_eq!(config.search_debounce, Duration::from_millis(2000));
        assert_eq!(config.submit_delay, Duration::from_millis(3000));
        assert_eq!(config.failure_sentinel.as_deref(), Some("error"));
    }

    #[test]
    fn variables_override_defaults() {
        let config = TodoConfig::from_lookup(lookup(&[
            (SEARCH_DEBOUNCE_VAR, "250"),
            (SUBMIT_DELAY_VAR, " 10 "),
            (TEARDOWN_TIMEOUT_VAR, "5000"),
            (FAILURE_SENTINEL_VAR, "boom"),
        ]))
        .unwrap();

        assert_eq!(config.search_debounce, Duration::from_millis(250));
        assert_eq!(config.submit_delay, Duration::from_millis(10));
        assert_eq!(config.teardown_timeout, Duration::from_secs(5));
        assert_eq!(config.failure_sentinel.as_deref(), Some("boom"));
    }

    #[test]
    fn empty_sentinel_disables_it() {
        let config = TodoConfig::from_lookup(lookup(&[(FAILURE_SENTINEL_VAR, "")])).unwrap();
        assert!(config.failure_sentinel.is_none());
    }

    #[test]
    fn malformed_duration_is_rejected() {
        let error = TodoConfig::from_lookup(lookup(&[(SUBMIT_DELAY_VAR, "3s")])).unwrap_err();
        assert_eq!(
            error,
            ConfigError::InvalidMillis {
                name: SUBMIT_DELAY_VAR,
                value: "3s".to_string(),
            }
        );
    }

    #[test]
    fn builders_replace_fields() {
        let config = TodoConfig::default()
            .with_search_debounce(Duration::from_millis(1))
            .with_submit_delay(Duration::ZERO)
            .with_teardown_timeout(Duration::from_secs(1))
            .with_failure_sentinel(None);

        assert_eq!(config.search_debounce, Duration::from_millis(1));
        assert_eq!(config.submit_delay, Duration::ZERO);
        assert_eq!(config.teardown_timeout, Duration::from_secs(1));
        assert!(config.failure_sentinel.is_none());
    }
}
