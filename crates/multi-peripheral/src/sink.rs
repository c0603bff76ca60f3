//! Per-session publish/subscribe surface

use crate::event::{SessionEvent, SessionEventKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Callback registered on a session for one notification kind
pub type Listener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Identifier returned by [`EventSink::on`], used to remove the listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    kind: SessionEventKind,
    listener: Listener,
}

/// Listener table local to one session
pub struct EventSink {
    listeners: Mutex<Vec<Entry>>,
    next_listener: AtomicU64,
}

impl EventSink {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn on<F>(&self, kind: SessionEventKind, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push(Entry {
            id,
            kind,
            listener: Arc::new(listener),
        });
        id
    }

    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|entry| entry.id != id);
        listeners.len() != before
    }

    /// Invoke every listener registered for the event's kind, in registration
    /// order. Returns the number of listeners invoked.
    pub fn emit(&self, event: &SessionEvent) -> usize {
        let kind = event.kind();
        let matching: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        for listener in &matching {
            listener(event);
        }
        matching.len()
    }

    pub fn listener_count(&self, kind: SessionEventKind) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|entry| entry.kind == kind)
            .count()
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_only_matching_kind() {
        let sink = EventSink::new();
        let ready = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ready);
        sink.on(SessionEventKind::Ready, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(sink.emit(&SessionEvent::Destroy), 0);
        assert_eq!(sink.emit(&SessionEvent::Ready), 1);
        assert_eq!(ready.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_off_removes_listener() {
        let sink = EventSink::new();
        let id = sink.on(SessionEventKind::Destroy, |_| {});
        assert_eq!(sink.listener_count(SessionEventKind::Destroy), 1);

        assert!(sink.off(id));
        assert!(!sink.off(id));
        assert_eq!(sink.emit(&SessionEvent::Destroy), 0);
    }
}
