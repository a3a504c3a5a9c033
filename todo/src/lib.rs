//! Todo listing and creation controllers.
//!
//! Two screens share one repository of todos:
//!
//! - **Listing**: fetches the list once per request and filters it by a
//!   search query applied after a quiet period
//! - **Creation**: edits a single draft and submits it with validation, a
//!   failure sentinel and a simulated processing delay
//!
//! Each screen is a reducer driven by a `todoshub_runtime::Store`, wrapped in
//! a controller that the presentation layer calls and observes.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use todo::{CreationController, InMemoryTodoRepository, SubmitOutcome, TodoConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repository = Arc::new(InMemoryTodoRepository::new());
//! let creation = CreationController::new(repository.clone(), &TodoConfig::default());
//!
//! creation.on_todo_value_change("Buy milk").await?;
//! let outcome = creation
//!     .submit(|| println!("saved"), || println!("failed"))
//!     .await?;
//!
//! assert!(matches!(outcome, SubmitOutcome::Succeeded(_)));
//! assert_eq!(repository.records().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod creation;
pub mod error;
pub mod listing;
pub mod navigation;
pub mod repository;
pub mod types;

// Re-export commonly used types
pub use config::TodoConfig;
pub use controller::{CreationController, ListingController};
pub use creation::{CreationAction, CreationReducer, CreationState, SubmitOutcome};
pub use error::{ConfigError, StorageError, SubmitError};
pub use listing::{filter_todos, ListingAction, ListingReducer, ListingState, SEARCH_DEBOUNCE};
pub use navigation::FailureSignal;
pub use repository::{InMemoryTodoRepository, TodoRepository};
pub use todoshub_runtime::StoreError;
pub use types::{NewTodo, SubmissionId, TodoId, TodoRecord};
