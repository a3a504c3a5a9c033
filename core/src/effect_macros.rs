//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants inside
//! reducers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use todoshub_core::async_effect;
///
/// async_effect! {
///     let outcome = repository.insert(todo).await;
///     Some(CreationAction::Inserted { outcome })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use todoshub_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(3),
///     action: CreationAction::ProcessingFinished
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create an `Effect::Debounce` that replaces the action pending under `id`
///
/// # Example
///
/// ```rust,ignore
/// use todoshub_core::debounce;
/// use std::time::Duration;
///
/// debounce! {
///     id: SEARCH_DEBOUNCE,
///     duration: Duration::from_millis(2000),
///     action: ListingAction::SearchSettled { query }
/// }
/// ```
#[macro_export]
macro_rules! debounce {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Debounce {
            id: $id,
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
