//! Screen-level controllers.
//!
//! A controller owns one store for the lifetime of a screen visit. The
//! presentation layer calls its operations and renders the snapshots from
//! [`ListingController::subscribe`] / [`CreationController::subscribe`].
//! After `teardown` the store rejects further operations with
//! [`StoreError::ShutdownInProgress`].

use crate::config::TodoConfig;
use crate::creation::{
    CreationAction, CreationEnvironment, CreationReducer, CreationState, SubmitOutcome,
};
use crate::listing::{ListingAction, ListingEnvironment, ListingReducer, ListingState};
use crate::repository::TodoRepository;
use crate::types::SubmissionId;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use todoshub_runtime::{EffectHandle, Store, StoreConfig, StoreError};
use tokio::sync::watch;

type ListingStore = Store<ListingState, ListingAction, ListingEnvironment, ListingReducer>;
type CreationStore = Store<CreationState, CreationAction, CreationEnvironment, CreationReducer>;

fn store_config(config: &TodoConfig) -> StoreConfig {
    StoreConfig::default().with_shutdown_timeout(config.teardown_timeout)
}

/// Controller for the listing screen
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use todo::{InMemoryTodoRepository, ListingController, TodoConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let repository = Arc::new(InMemoryTodoRepository::seeded(["Walk 10 mins"]));
/// let listing = ListingController::new(repository, &TodoConfig::default());
///
/// listing.fetch_all().await?.wait().await;
/// listing.on_search_query_change("walk").await?.wait().await;
///
/// let state = listing.snapshot().await;
/// assert_eq!(state.visible_items.map(|items| items.len()), Some(1));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ListingController {
    store: ListingStore,
}

impl ListingController {
    /// Creates a controller with default listing state
    #[must_use]
    pub fn new(repository: Arc<dyn TodoRepository>, config: &TodoConfig) -> Self {
        let environment = ListingEnvironment::new(repository, config.search_debounce);
        Self {
            store: Store::with_config(
                ListingState::default(),
                ListingReducer::new(),
                environment,
                store_config(config),
            ),
        }
    }

    /// Load the list, applying the current search query to the result
    ///
    /// The returned handle completes once the first emission (or failure)
    /// has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after teardown.
    pub async fn fetch_all(&self) -> Result<EffectHandle, StoreError> {
        self.store.send(ListingAction::FetchRequested).await
    }

    /// Record a keystroke and schedule the filter for after the quiet period
    ///
    /// The returned handle completes when the filter ran or a newer keystroke
    /// replaced it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after teardown.
    pub async fn on_search_query_change(
        &self,
        text: impl Into<String>,
    ) -> Result<EffectHandle, StoreError> {
        self.store
            .send(ListingAction::SearchQueryChanged { text: text.into() })
            .await
    }

    /// Show the error popup
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after teardown.
    pub async fn show_error_popup(&self) -> Result<(), StoreError> {
        self.store.send(ListingAction::ShowErrorPopup).await.map(drop)
    }

    /// Hide the error popup
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after teardown.
    pub async fn dismiss_error_popup(&self) -> Result<(), StoreError> {
        self.store.send(ListingAction::DismissErrorPopup).await.map(drop)
    }

    /// Snapshots of the listing state, starting with the current one
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ListingState> {
        self.store.subscribe_state()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> ListingState {
        self.store.state(Clone::clone).await
    }

    /// Cancel the pending search and wait for in-flight fetches
    ///
    /// Waits at most [`TodoConfig::teardown_timeout`]. Calling it again is
    /// harmless.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if fetches are still running
    /// when the timeout elapses.
    pub async fn teardown(&self) -> Result<(), StoreError> {
        tracing::info!("Tearing down listing controller");
        if let Err(error) = self.store.send(ListingAction::SearchCancelled).await {
            tracing::debug!(%error, "Listing already shutting down");
        }
        self.store.shutdown(self.store.default_shutdown_timeout()).await
    }
}

impl std::fmt::Debug for ListingController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListingController")
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}

/// Controller for the creation screen
#[derive(Clone)]
pub struct CreationController {
    store: CreationStore,
    next_submission: Arc<AtomicU64>,
}

impl CreationController {
    /// Creates a controller with an empty draft
    #[must_use]
    pub fn new(repository: Arc<dyn TodoRepository>, config: &TodoConfig) -> Self {
        let environment = CreationEnvironment::new(
            repository,
            config.submit_delay,
            config.failure_sentinel.clone(),
        );
        Self {
            store: Store::with_config(
                CreationState::default(),
                CreationReducer::new(),
                environment,
                store_config(config),
            ),
            next_submission: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Replace the draft text
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after teardown.
    pub async fn on_todo_value_change(&self, text: impl Into<String>) -> Result<(), StoreError> {
        self.store
            .send(CreationAction::DraftChanged { text: text.into() })
            .await
            .map(drop)
    }

    /// Submit the current draft and wait for the outcome
    ///
    /// At most one callback runs: `on_success` for
    /// [`SubmitOutcome::Succeeded`], `on_failure` for
    /// [`SubmitOutcome::Failed`]. Empty drafts and submissions made while
    /// another one is in flight run neither. There is no time limit: a slow
    /// write only delays the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after or during teardown; no
    /// callback runs in that case.
    pub async fn submit<S, F>(&self, on_success: S, on_failure: F) -> Result<SubmitOutcome, StoreError>
    where
        S: FnOnce(),
        F: FnOnce(),
    {
        let submission = SubmissionId::new(self.next_submission.fetch_add(1, Ordering::Relaxed));

        let terminal = self
            .store
            .send_and_wait(CreationAction::Submit { submission }, move |action| {
                action.terminal_submission() == Some(submission)
            })
            .await?;

        let outcome = terminal.into_outcome().ok_or(StoreError::ChannelClosed)?;
        metrics::counter!("todo_submissions_total", "outcome" => outcome.label()).increment(1);
        tracing::debug!(%submission, outcome = outcome.label(), "Submission finished");

        match &outcome {
            SubmitOutcome::Succeeded(_) => on_success(),
            SubmitOutcome::Failed(_) => on_failure(),
            SubmitOutcome::Invalid | SubmitOutcome::Rejected => {},
        }

        Ok(outcome)
    }

    /// Snapshots of the creation state, starting with the current one
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CreationState> {
        self.store.subscribe_state()
    }

    /// Copy of the current state
    pub async fn snapshot(&self) -> CreationState {
        self.store.state(Clone::clone).await
    }

    /// Stop accepting input and wait for running effects
    ///
    /// A `submit` still waiting for its outcome returns
    /// [`StoreError::ShutdownInProgress`] without running a callback.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if a submission is still
    /// running after [`TodoConfig::teardown_timeout`].
    pub async fn teardown(&self) -> Result<(), StoreError> {
        tracing::info!("Tearing down creation controller");
        self.store.shutdown(self.store.default_shutdown_timeout()).await
    }
}

impl std::fmt::Debug for CreationController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreationController")
            .field("pending_effects", &self.store.pending_effects())
            .finish_non_exhaustive()
    }
}
