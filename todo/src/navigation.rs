//! Failure hand-off from the creation screen back to the listing screen.

use crate::controller::ListingController;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use todoshub_runtime::StoreError;

/// One-shot flag carried back to the listing screen after a failed submission
///
/// The creation screen raises it from its failure callback. When the listing
/// screen is shown again it calls [`FailureSignal::deliver_to`], which shows
/// the error popup once and resets the flag. Clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct FailureSignal {
    raised: Arc<AtomicBool>,
}

impl FailureSignal {
    /// Creates a lowered signal
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    /// A callback that raises this signal, for use as a failure callback
    #[must_use]
    pub fn raiser(&self) -> impl FnOnce() + Send + 'static {
        let signal = self.clone();
        move || signal.raise()
    }

    /// Whether the signal is raised and not yet delivered
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Lower the signal, returning whether it was raised
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }

    /// Show the listing error popup if the signal was raised
    ///
    /// Returns whether the popup was shown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the listing controller
    /// was torn down; the signal stays raised in that case.
    pub async fn deliver_to(&self, listing: &ListingController) -> Result<bool, StoreError> {
        if !self.take() {
            return Ok(false);
        }

        if let Err(error) = listing.show_error_popup().await {
            self.raise();
            return Err(error);
        }
        tracing::debug!("Delivered failure signal to listing");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TodoConfig;
    use crate::repository::InMemoryTodoRepository;

    fn listing() -> ListingController {
        ListingController::new(
            Arc::new(InMemoryTodoRepository::new()),
            &TodoConfig::default(),
        )
    }

    #[test]
    fn raiser_sets_shared_flag() {
        let signal = FailureSignal::new();
        let clone = signal.clone();

        (signal.raiser())();

        assert!(clone.is_raised());
        assert!(clone.take());
        assert!(!signal.is_raised());
    }

    #[tokio::test]
    async fn delivery_shows_popup_once() {
        let listing = listing();
        let signal = FailureSignal::new();
        signal.raise();

        assert!(signal.deliver_to(&listing).await.unwrap());
        assert!(listing.snapshot().await.is_error_visible);

        listing.dismiss_error_popup().await.unwrap();
        assert!(!signal.deliver_to(&listing).await.unwrap());
        assert!(!listing.snapshot().await.is_error_visible);
    }

    #[tokio::test]
    async fn delivery_to_torn_down_listing_keeps_signal() {
        let listing = listing();
        listing.teardown().await.unwrap();

        let signal = FailureSignal::new();
        signal.raise();

        let result = signal.deliver_to(&listing).await;
        assert!(matches!(result, Err(StoreError::ShutdownInProgress)));
        assert!(signal.is_raised());
    }
}
