//! Creation screen: a single draft field submitted to the repository.
//!
//! Every `Submit` ends in exactly one terminal action carrying the same
//! [`SubmissionId`]: [`CreationAction::SubmitSucceeded`],
//! [`CreationAction::SubmitFailed`], [`CreationAction::SubmitInvalid`] or
//! [`CreationAction::SubmitRejected`]. Terminal actions are produced by
//! effects so the controller can wait for them on the store's action stream.

use crate::error::SubmitError;
use crate::repository::TodoRepository;
use crate::types::{NewTodo, SubmissionId, TodoRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use todoshub_core::effect::Effect;
use todoshub_core::reducer::Reducer;
use todoshub_core::{async_effect, delay, smallvec, SmallVec};

/// Observable state of the creation screen
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationState {
    /// Text in the draft field
    pub draft_text: String,
    /// A submission is in flight
    pub is_submitting: bool,
    /// The last submit found an empty draft
    pub is_validation_error: bool,
}

/// Inputs of the creation reducer
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationAction {
    /// The draft field changed
    DraftChanged {
        /// Full text of the field
        text: String,
    },
    /// Submit the current draft
    Submit {
        /// Correlation id of this submission
        submission: SubmissionId,
    },
    /// The repository stored the draft; the processing delay is running
    Inserted {
        /// Correlation id of this submission
        submission: SubmissionId,
        /// What was stored
        record: TodoRecord,
    },
    /// Terminal: the draft was stored and processed
    SubmitSucceeded {
        /// Correlation id of this submission
        submission: SubmissionId,
        /// What was stored
        record: TodoRecord,
    },
    /// Terminal: the submission failed
    SubmitFailed {
        /// Correlation id of this submission
        submission: SubmissionId,
        /// Why it failed
        error: SubmitError,
    },
    /// Terminal: the draft was empty
    SubmitInvalid {
        /// Correlation id of this submission
        submission: SubmissionId,
    },
    /// Terminal: another submission was still in flight
    SubmitRejected {
        /// Correlation id of this submission
        submission: SubmissionId,
    },
}

impl CreationAction {
    /// The submission this action ends, if it is terminal
    #[must_use]
    pub const fn terminal_submission(&self) -> Option<SubmissionId> {
        match self {
            Self::SubmitSucceeded { submission, .. }
            | Self::SubmitFailed { submission, .. }
            | Self::SubmitInvalid { submission }
            | Self::SubmitRejected { submission } => Some(*submission),
            Self::DraftChanged { .. } | Self::Submit { .. } | Self::Inserted { .. } => None,
        }
    }

    /// The outcome this action reports, if it is terminal
    #[must_use]
    pub fn into_outcome(self) -> Option<SubmitOutcome> {
        match self {
            Self::SubmitSucceeded { record, .. } => Some(SubmitOutcome::Succeeded(record)),
            Self::SubmitFailed { error, .. } => Some(SubmitOutcome::Failed(error)),
            Self::SubmitInvalid { .. } => Some(SubmitOutcome::Invalid),
            Self::SubmitRejected { .. } => Some(SubmitOutcome::Rejected),
            Self::DraftChanged { .. } | Self::Submit { .. } | Self::Inserted { .. } => None,
        }
    }
}

/// Dependencies of the creation reducer
#[derive(Clone)]
pub struct CreationEnvironment {
    /// Where todos are written
    pub repository: Arc<dyn TodoRepository>,
    /// Simulated processing time after a successful write
    pub submit_delay: Duration,
    /// Draft text that forces a failure, compared ignoring case
    pub failure_sentinel: Option<String>,
}

impl CreationEnvironment {
    /// Creates a `CreationEnvironment`
    #[must_use]
    pub fn new(
        repository: Arc<dyn TodoRepository>,
        submit_delay: Duration,
        failure_sentinel: Option<String>,
    ) -> Self {
        Self {
            repository,
            submit_delay,
            failure_sentinel,
        }
    }

    fn is_sentinel(&self, draft: &str) -> bool {
        self.failure_sentinel
            .as_deref()
            .is_some_and(|sentinel| draft.to_lowercase() == sentinel.to_lowercase())
    }
}

/// Reducer for the creation screen
#[derive(Clone, Debug, Default)]
pub struct CreationReducer;

impl CreationReducer {
    /// Creates a new `CreationReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Effect that immediately emits `action`
    fn emit(action: CreationAction) -> Effect<CreationAction> {
        async_effect! { Some(action) }
    }

    fn insert(
        repository: Arc<dyn TodoRepository>,
        submission: SubmissionId,
        todo: NewTodo,
    ) -> Effect<CreationAction> {
        async_effect! {
            match repository.insert(todo).await {
                Ok(record) => Some(CreationAction::Inserted { submission, record }),
                Err(error) => Some(CreationAction::SubmitFailed {
                    submission,
                    error: SubmitError::Storage(error),
                }),
            }
        }
    }
}

impl Reducer for CreationReducer {
    type State = CreationState;
    type Action = CreationAction;
    type Environment = CreationEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CreationAction::DraftChanged { text } => {
                state.draft_text = text;
                state.is_validation_error = false;
                SmallVec::new()
            },
            CreationAction::Submit { submission } => {
                if state.is_submitting {
                    tracing::debug!(%submission, "Submission already in flight, rejecting");
                    return smallvec![Self::emit(CreationAction::SubmitRejected { submission })];
                }

                if state.draft_text.is_empty() {
                    state.is_validation_error = true;
                    return smallvec![Self::emit(CreationAction::SubmitInvalid { submission })];
                }

                state.is_submitting = true;

                if env.is_sentinel(&state.draft_text) {
                    tracing::debug!(%submission, "Draft matches failure sentinel");
                    return smallvec![Self::emit(CreationAction::SubmitFailed {
                        submission,
                        error: SubmitError::SimulatedFailure,
                    })];
                }

                state.is_validation_error = false;
                let todo = NewTodo::new(state.draft_text.clone());
                smallvec![Self::insert(Arc::clone(&env.repository), submission, todo)]
            },
            CreationAction::Inserted { submission, record } => {
                tracing::debug!(%submission, id = %record.id, "Todo stored, processing");
                smallvec![delay! {
                    duration: env.submit_delay,
                    action: CreationAction::SubmitSucceeded { submission, record }
                }]
            },
            CreationAction::SubmitSucceeded { .. } => {
                state.is_submitting = false;
                state.is_validation_error = false;
                state.draft_text.clear();
                SmallVec::new()
            },
            CreationAction::SubmitFailed { submission, error } => {
                if matches!(error, SubmitError::Storage(_)) {
                    tracing::warn!(%submission, %error, "Storing todo failed");
                }
                state.is_submitting = false;
                SmallVec::new()
            },
            CreationAction::SubmitInvalid { .. } | CreationAction::SubmitRejected { .. } => {
                SmallVec::new()
            },
        }
    }
}

/// Outcome of one `submit` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Stored and processed; the success callback ran
    Succeeded(TodoRecord),
    /// Failed; the failure callback ran
    Failed(SubmitError),
    /// The draft was empty; no callback ran
    Invalid,
    /// Another submission was in flight; no callback ran
    Rejected,
}

impl SubmitOutcome {
    /// Label used for metrics and logs
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Succeeded(_) => "succeeded",
            Self::Failed(SubmitError::SimulatedFailure) => "simulated_failure",
            Self::Failed(SubmitError::Storage(_)) => "storage_failure",
            Self::Invalid => "invalid",
            Self::Rejected => "rejected",
        }
    }
}
