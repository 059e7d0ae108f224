//! Storefront-wide notifications.
//!
//! Components that need to react to cart or auth changes (badges, nav
//! bars, CLI prompts) subscribe to the [`EventBus`] instead of polling.

use crafted_roots_core::SessionIdentity;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Something other components may want to react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorefrontEvent {
    /// The server-side cart changed.
    CartUpdated,
    /// The logged-in user changed. `None` means logged out.
    AuthChanged { identity: Option<SessionIdentity> },
    /// The session could not be recovered; the user has to log in again.
    LoginRequired { redirect_to: String },
}

/// Broadcast channel for [`StorefrontEvent`]s.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StorefrontEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StorefrontEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: StorefrontEvent) {
        tracing::debug!(?event, "Publishing storefront event");
        // Err only means there are no subscribers
        let _ = self.sender.send(event);
    }
}
