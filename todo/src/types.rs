//! Domain types shared by the listing and creation controllers.

use serde::{Deserialize, Serialize};

/// Identifier assigned to a todo by storage
///
/// Ids are unique and increase monotonically in insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(u64);

impl TodoId {
    /// Creates a `TodoId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TodoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted todo
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoRecord {
    /// Storage-assigned identifier
    pub id: TodoId,
    /// Free text entered by the user
    pub description: String,
}

impl TodoRecord {
    /// Creates a record
    #[must_use]
    pub fn new(id: TodoId, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }

    /// Whether the description contains `needle`, ignoring case
    ///
    /// `needle` is expected to be lowercase already.
    #[must_use]
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        self.description.to_lowercase().contains(needle)
    }
}

/// A todo that has not been stored yet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTodo {
    /// Free text entered by the user
    pub description: String,
}

impl NewTodo {
    /// Creates an unsaved todo
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    /// Attach the id storage assigned
    #[must_use]
    pub fn into_record(self, id: TodoId) -> TodoRecord {
        TodoRecord {
            id,
            description: self.description,
        }
    }
}

/// Correlates one `submit` call with the action that ends it
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(u64);

impl SubmissionId {
    /// Creates a `SubmissionId` from its raw value
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission-{}", self.0)
    }
}
