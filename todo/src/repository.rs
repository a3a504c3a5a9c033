//! Persistence collaborator for todos.
//!
//! The controllers only see the [`TodoRepository`] trait. Writes are single
//! async calls; reads are an observable sequence of full lists, of which the
//! listing controller only ever takes the first emission.
//!
//! [`InMemoryTodoRepository`] is the local store used by the demo binary and
//! the tests. It can be told to fail reads or writes, or to answer reads
//! slowly, so every controller path can be exercised deterministically.

use crate::error::StorageError;
use crate::types::{NewTodo, TodoId, TodoRecord};
use futures::stream::BoxStream;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// Storage for todos
///
/// Uses explicit `Pin<Box<dyn Future>>` returns so controllers can hold an
/// `Arc<dyn TodoRepository>`.
pub trait TodoRepository: Send + Sync {
    /// Persist a todo and return it with its assigned id
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InsertFailed`] or [`StorageError::Unavailable`]
    /// if the write did not happen.
    fn insert(
        &self,
        todo: NewTodo,
    ) -> Pin<Box<dyn Future<Output = Result<TodoRecord, StorageError>> + Send + '_>>;

    /// Observe the full list of todos
    ///
    /// The sequence emits the list as it is at subscription time and again
    /// after every change. Dropping the stream unsubscribes.
    fn fetch_all(&self) -> BoxStream<'static, Result<Vec<TodoRecord>, StorageError>>;
}

/// How the next reads behave
#[derive(Clone, Debug)]
enum FetchMode {
    Live,
    Fail(StorageError),
    EndEmpty,
}

struct Inner {
    next_id: u64,
    fetch_mode: FetchMode,
    fetch_latency: Duration,
    insert_latency: Duration,
    insert_fault: Option<StorageError>,
}

/// In-process todo storage backed by a `watch` channel
///
/// Ids start at 1. Clones share the same storage.
///
/// # Example
///
/// ```
/// use todo::{InMemoryTodoRepository, NewTodo, TodoRepository};
///
/// # tokio_test::block_on(async {
/// let repository = InMemoryTodoRepository::new();
/// let record = repository.insert(NewTodo::new("Buy milk")).await.unwrap();
/// assert_eq!(record.id.get(), 1);
/// assert_eq!(repository.records(), vec![record]);
/// # });
/// ```
#[derive(Clone)]
pub struct InMemoryTodoRepository {
    inner: Arc<Mutex<Inner>>,
    todos: Arc<watch::Sender<Vec<TodoRecord>>>,
    insert_calls: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
}

impl InMemoryTodoRepository {
    /// Creates an empty repository
    #[must_use]
    pub fn new() -> Self {
        let (todos, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                next_id: 1,
                fetch_mode: FetchMode::Live,
                fetch_latency: Duration::ZERO,
                insert_latency: Duration::ZERO,
                insert_fault: None,
            })),
            todos: Arc::new(todos),
            insert_calls: Arc::new(AtomicUsize::new(0)),
            fetch_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates a repository already holding `descriptions`, ids assigned in order
    #[must_use]
    pub fn seeded<I, S>(descriptions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let repository = Self::new();
        {
            let mut inner = repository.lock();
            repository.todos.send_modify(|todos| {
                for description in descriptions {
                    todos.push(TodoRecord::new(TodoId::new(inner.next_id), description));
                    inner.next_id += 1;
                }
            });
        }
        repository
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Everything stored so far, in id order
    #[must_use]
    pub fn records(&self) -> Vec<TodoRecord> {
        self.todos.borrow().clone()
    }

    /// How many times `insert` was called, failed calls included
    #[must_use]
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.load(Ordering::SeqCst)
    }

    /// How many times `fetch_all` was called
    #[must_use]
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent inserts fail with `error`
    pub fn fail_inserts(&self, error: StorageError) {
        self.lock().insert_fault = Some(error);
    }

    /// Make subsequent reads emit `error` and end
    pub fn fail_fetches(&self, error: StorageError) {
        self.lock().fetch_mode = FetchMode::Fail(error);
    }

    /// Make subsequent reads end without emitting anything
    pub fn end_fetches_empty(&self) {
        self.lock().fetch_mode = FetchMode::EndEmpty;
    }

    /// Delay the first emission of subsequent reads
    ///
    /// The emitted list is still the one captured when `fetch_all` was called.
    pub fn set_fetch_latency(&self, latency: Duration) {
        self.lock().fetch_latency = latency;
    }

    /// Make subsequent inserts take `latency` before they store anything
    pub fn set_insert_latency(&self, latency: Duration) {
        self.lock().insert_latency = latency;
    }

    /// Clear every injected fault and latency
    pub fn heal(&self) {
        let mut inner = self.lock();
        inner.fetch_mode = FetchMode::Live;
        inner.fetch_latency = Duration::ZERO;
        inner.insert_latency = Duration::ZERO;
        inner.insert_fault = None;
    }
}

impl Default for InMemoryTodoRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryTodoRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryTodoRepository")
            .field("todos", &self.todos.borrow().len())
            .field("insert_calls", &self.insert_calls())
            .field("fetch_calls", &self.fetch_calls())
            .finish_non_exhaustive()
    }
}

impl TodoRepository for InMemoryTodoRepository {
    fn insert(
        &self,
        todo: NewTodo,
    ) -> Pin<Box<dyn Future<Output = Result<TodoRecord, StorageError>> + Send + '_>> {
        Box::pin(async move {
            self.insert_calls.fetch_add(1, Ordering::SeqCst);

            let latency = self.lock().insert_latency;
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            let mut inner = self.lock();
            if let Some(error) = inner.insert_fault.clone() {
                tracing::debug!(%error, "Injected insert failure");
                return Err(error);
            }

            let record = todo.into_record(TodoId::new(inner.next_id));
            inner.next_id += 1;
            self.todos.send_modify(|todos| todos.push(record.clone()));

            tracing::debug!(id = %record.id, "Stored todo");
            Ok(record)
        })
    }

    fn fetch_all(&self) -> BoxStream<'static, Result<Vec<TodoRecord>, StorageError>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let (mode, latency) = {
            let inner = self.lock();
            (inner.fetch_mode.clone(), inner.fetch_latency)
        };
        let mut receiver = self.todos.subscribe();
        let initial = receiver.borrow_and_update().clone();

        let stream = async_stream::stream! {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }

            match mode {
                FetchMode::Live => {
                    yield Ok(initial);
                    while receiver.changed().await.is_ok() {
                        let current = receiver.borrow_and_update().clone();
                        yield Ok(current);
                    }
                },
                FetchMode::Fail(error) => yield Err(error),
                FetchMode::EndEmpty => {},
            }
        };

        Box::pin(stream)
    }
}
