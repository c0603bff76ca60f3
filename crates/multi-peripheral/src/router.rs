//! Shared demultiplexer for the radio engine's event stream

use crate::event::{EventCategory, RadioEvent};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Handler invoked for every raw event of the category it was registered for
pub type EventHandler = Arc<dyn Fn(&RadioEvent) + Send + Sync>;

/// Unique registration identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Receipt for a router registration, needed to release it
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: SubscriptionId,
    category: EventCategory,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn category(&self) -> EventCategory {
        self.category
    }
}

struct Registration {
    category: EventCategory,
    handler: EventHandler,
}

/// Event router shared by every session of a host.
///
/// Handlers see every event of their category regardless of session id; filtering
/// is the subscriber's job. Handlers run in registration order, synchronously,
/// with the registration table unlocked.
pub struct EventRouter {
    registrations: Mutex<BTreeMap<SubscriptionId, Registration>>,
    next_subscription: AtomicU64,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            registrations: Mutex::new(BTreeMap::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    /// Create the engine -> router event stream
    pub fn channel(capacity: usize) -> (mpsc::Sender<RadioEvent>, mpsc::Receiver<RadioEvent>) {
        mpsc::channel(capacity.max(1))
    }

    /// Register a handler for one event category
    pub fn subscribe<F>(&self, category: EventCategory, handler: F) -> SubscriptionHandle
    where
        F: Fn(&RadioEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.registrations.lock().insert(
            id,
            Registration {
                category,
                handler: Arc::new(handler),
            },
        );

        trace!("Router subscription {:?} added for {}", id, category);
        SubscriptionHandle { id, category }
    }

    /// Remove a registration.
    ///
    /// Returns `false` if the handle was already released; that is not an error.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let removed = self.registrations.lock().remove(&handle.id).is_some();
        if removed {
            trace!("Router subscription {:?} removed", handle.id);
        }
        removed
    }

    /// Deliver one event to every handler of its category.
    ///
    /// Returns the number of handlers invoked.
    pub fn dispatch(&self, event: &RadioEvent) -> usize {
        let category = event.category();
        let handlers: Vec<EventHandler> = self
            .registrations
            .lock()
            .values()
            .filter(|registration| registration.category == category)
            .map(|registration| Arc::clone(&registration.handler))
            .collect();

        trace!(
            "Dispatching {} for session {} to {} handlers",
            category,
            event.id,
            handlers.len()
        );

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Drain an engine event stream, dispatching in arrival order.
    ///
    /// Returns once every sender has been dropped.
    pub async fn run(&self, mut events: mpsc::Receiver<RadioEvent>) {
        info!("Event router listening for radio events");

        while let Some(event) = events.recv().await {
            self.dispatch(&event);
        }

        debug!("Radio event stream closed, router pump exiting");
    }

    /// Number of live registrations
    pub fn len(&self) -> usize {
        self.registrations.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.lock().is_empty()
    }

    /// Number of live registrations for one category
    pub fn subscriber_count(&self, category: EventCategory) -> usize {
        self.registrations
            .lock()
            .values()
            .filter(|registration| registration.category == category)
            .count()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
