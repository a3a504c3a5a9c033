//! Listing screen: fetched todos with a debounced search filter.
//!
//! Search runs through a single debounce slot, [`SEARCH_DEBOUNCE`]. Every
//! keystroke updates `search_query` right away and replaces the pending
//! filter action, so only the text from the last quiet period is applied.
//!
//! Fetches are never cancelled. Each one carries a generation number and a
//! completion for anything but the latest generation is dropped, so the most
//! recent request always wins regardless of completion order.

use crate::error::StorageError;
use crate::repository::TodoRepository;
use crate::types::TodoRecord;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use todoshub_core::effect::{Effect, EffectId};
use todoshub_core::reducer::Reducer;
use todoshub_core::{async_effect, debounce, smallvec, SmallVec};

/// Debounce slot for the search filter
pub const SEARCH_DEBOUNCE: EffectId = EffectId::new("listing.search");

/// Observable state of the listing screen
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingState {
    /// A fetch is in flight
    pub is_loading: bool,
    /// Latest text typed into the search field
    pub search_query: String,
    /// What the list shows; `None` until a fetch has completed
    pub visible_items: Option<Vec<TodoRecord>>,
    /// The error popup is showing
    pub is_error_visible: bool,
    all_todos: Option<Vec<TodoRecord>>,
    fetch_generation: u64,
}

impl ListingState {
    /// Full result of the last applied fetch
    #[must_use]
    pub fn all_todos(&self) -> Option<&[TodoRecord]> {
        self.all_todos.as_deref()
    }

    /// Generation of the most recent fetch request
    #[must_use]
    pub const fn fetch_generation(&self) -> u64 {
        self.fetch_generation
    }
}

/// Inputs of the listing reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListingAction {
    /// Load the list from the repository
    FetchRequested,
    /// First emission (or failure) of a fetch
    FetchCompleted {
        /// Generation of the request this answers
        generation: u64,
        /// Full list, or why none was obtained
        result: Result<Vec<TodoRecord>, StorageError>,
    },
    /// A keystroke in the search field
    SearchQueryChanged {
        /// Full text of the field
        text: String,
    },
    /// The search field has been quiet for the debounce period
    SearchSettled {
        /// Text to filter by
        text: String,
    },
    /// Drop the pending search filter, if any
    SearchCancelled,
    /// Show the error popup
    ShowErrorPopup,
    /// Hide the error popup
    DismissErrorPopup,
}

/// Dependencies of the listing reducer
#[derive(Clone)]
pub struct ListingEnvironment {
    /// Where todos are read from
    pub repository: Arc<dyn TodoRepository>,
    /// Quiet period before a search is applied
    pub search_debounce: Duration,
}

impl ListingEnvironment {
    /// Creates a `ListingEnvironment`
    #[must_use]
    pub fn new(repository: Arc<dyn TodoRepository>, search_debounce: Duration) -> Self {
        Self {
            repository,
            search_debounce,
        }
    }
}

/// Todos whose description contains `query`, ignoring case
///
/// An empty query keeps everything. Order is preserved.
#[must_use]
pub fn filter_todos(todos: &[TodoRecord], query: &str) -> Vec<TodoRecord> {
    if query.is_empty() {
        return todos.to_vec();
    }

    let needle = query.to_lowercase();
    todos
        .iter()
        .filter(|todo| todo.matches_lowercase(&needle))
        .cloned()
        .collect()
}

/// Reducer for the listing screen
#[derive(Clone, Debug, Default)]
pub struct ListingReducer;

impl ListingReducer {
    /// Creates a new `ListingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Subscribe now, take the first emission in an effect
    fn fetch(repository: &dyn TodoRepository, generation: u64) -> Effect<ListingAction> {
        let mut sequence = repository.fetch_all();
        async_effect! {
            let result = sequence.next().await.unwrap_or(Err(StorageError::SequenceEnded));

            let outcome = if result.is_ok() { "success" } else { "failure" };
            metrics::counter!("todo_fetches_total", "outcome" => outcome).increment(1);

            Some(ListingAction::FetchCompleted { generation, result })
        }
    }
}

impl Reducer for ListingReducer {
    type State = ListingState;
    type Action = ListingAction;
    type Environment = ListingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            ListingAction::FetchRequested => {
                state.is_loading = true;
                state.fetch_generation += 1;
                smallvec![Self::fetch(env.repository.as_ref(), state.fetch_generation)]
            },
            ListingAction::FetchCompleted { generation, result } => {
                if generation != state.fetch_generation {
                    tracing::debug!(
                        generation,
                        latest = state.fetch_generation,
                        "Ignoring superseded fetch"
                    );
                    return SmallVec::new();
                }

                state.is_loading = false;
                match result {
                    Ok(todos) => {
                        tracing::debug!(count = todos.len(), "Fetched todos");
                        state.visible_items = Some(filter_todos(&todos, &state.search_query));
                        state.all_todos = Some(todos);
                    },
                    Err(error) => {
                        tracing::warn!(%error, generation, "Fetching todos failed");
                    },
                }
                SmallVec::new()
            },
            ListingAction::SearchQueryChanged { text } => {
                state.search_query.clone_from(&text);
                smallvec![debounce! {
                    id: SEARCH_DEBOUNCE,
                    duration: env.search_debounce,
                    action: ListingAction::SearchSettled { text }
                }]
            },
            ListingAction::SearchSettled { text } => {
                match &state.all_todos {
                    Some(todos) => state.visible_items = Some(filter_todos(todos, &text)),
                    None => tracing::trace!("Search settled before any fetch completed"),
                }
                SmallVec::new()
            },
            ListingAction::SearchCancelled => smallvec![Effect::Cancel(SEARCH_DEBOUNCE)],
            ListingAction::ShowErrorPopup => {
                state.is_error_visible = true;
                SmallVec::new()
            },
            ListingAction::DismissErrorPopup => {
                state.is_error_visible = false;
                SmallVec::new()
            },
        }
    }
}
