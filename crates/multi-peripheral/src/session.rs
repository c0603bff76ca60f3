//! Peripheral session lifecycle and command wrapping

use crate::codec;
use crate::engine::RadioEngine;
use crate::error::{EngineError, PeripheralError, PeripheralResult};
use crate::event::{EventCategory, SessionEvent, SessionEventKind};
use crate::host::{PeripheralHost, SessionDirectory};
use crate::id::SessionId;
use crate::router::{EventRouter, SubscriptionHandle};
use crate::sink::{EventSink, ListenerId};
use crate::types::{Advertisement, Permissions, Properties, RadioState};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a peripheral session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the engine to create the native peripheral
    Initializing,
    Ready,
    /// The engine rejected creation; commands still pass through
    Failed,
    /// Terminal; no further events reach the session. Also reachable straight
    /// from `Initializing` when destroyed before creation resolves.
    Destroyed,
}

/// State reachable from the router through a weak reference
pub(crate) struct SessionShared {
    id: SessionId,
    state: watch::Sender<SessionState>,
    failure: Mutex<Option<EngineError>>,
    sink: EventSink,
    subscriptions: Mutex<Option<Vec<SubscriptionHandle>>>,
    destroyed: AtomicBool,
}

impl SessionShared {
    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Move out of `Initializing`; `on_leave` runs under the state lock, before
    /// any waiter observes the new state
    fn leave_initializing<F: FnOnce()>(&self, next: SessionState, on_leave: F) -> bool {
        self.state.send_if_modified(|state| {
            if *state == SessionState::Initializing {
                on_leave();
                *state = next;
                true
            } else {
                false
            }
        })
    }

    fn finish_create(&self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => {
                if self.leave_initializing(SessionState::Ready, || {}) {
                    info!("Peripheral session {} ready", self.id);
                    self.sink.emit(&SessionEvent::Ready);
                } else {
                    debug!(
                        "Peripheral session {} created after leaving Initializing, ignoring",
                        self.id
                    );
                }
            }
            Err(err) => {
                let recorded = err.clone();
                if self.leave_initializing(SessionState::Failed, || {
                    *self.failure.lock() = Some(recorded);
                }) {
                    warn!("Peripheral session {} failed to initialize: {}", self.id, err);
                    self.sink.emit(&SessionEvent::Error(err));
                } else {
                    debug!(
                        "Peripheral session {} creation rejected after leaving Initializing: {}",
                        self.id, err
                    );
                }
            }
        }
    }

    fn release_subscriptions(&self, router: &EventRouter) {
        if let Some(handles) = self.subscriptions.lock().take() {
            for handle in &handles {
                router.unsubscribe(handle);
            }
            debug!(
                "Released {} router subscriptions for session {}",
                handles.len(),
                self.id
            );
        }
    }

    /// Teardown after the engine confirmed destruction. Runs at most once.
    fn handle_destroyed(&self, router: &EventRouter, directory: &SessionDirectory) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            debug!("Peripheral session {} already destroyed", self.id);
            return;
        }

        self.release_subscriptions(router);
        self.state.send_replace(SessionState::Destroyed);
        directory.remove(&self.id);

        info!("Peripheral session {} destroyed", self.id);
        self.sink.emit(&SessionEvent::Destroy);
    }
}

/// One logical BLE peripheral multiplexed over the shared radio engine.
///
/// Construction registers the session with the event router and asks the engine
/// to allocate a native peripheral. The outcome arrives as a `ready` or `error`
/// notification; [`settled`](Self::settled) lets callers await it instead.
///
/// # Example
///
/// ```rust,ignore
/// let session = host.create_session()?;
/// session.on(SessionEventKind::Write, |event| {
///     if let SessionEvent::Write(write) = event {
///         println!("{} wrote {}", write.device, write.value);
///     }
/// });
/// if session.settled().await == SessionState::Ready {
///     session.add_service("180D", true).await?;
/// }
/// ```
pub struct PeripheralSession {
    shared: Arc<SessionShared>,
    engine: Arc<dyn RadioEngine>,
    router: Arc<EventRouter>,
    directory: SessionDirectory,
}

impl PeripheralSession {
    /// Create a session on the host's engine.
    ///
    /// Fails synchronously with [`PeripheralError::EngineNotLinked`] when the host
    /// has no engine, and with [`PeripheralError::NoRuntime`] outside a tokio
    /// runtime. Neither case allocates an id.
    ///
    /// On a multi-threaded runtime creation may finish before this returns, so a
    /// listener added afterwards can miss `ready`/`error`. Use
    /// [`with_setup`](Self::with_setup) to register listeners first.
    pub fn new(host: &PeripheralHost) -> PeripheralResult<Self> {
        Self::with_setup(host, |_| {})
    }

    /// Create a session, running `setup` before the engine is asked to create the
    /// native peripheral. Listeners registered in `setup` see `ready` or `error`.
    pub fn with_setup<F>(host: &PeripheralHost, setup: F) -> PeripheralResult<Self>
    where
        F: FnOnce(&PeripheralSession),
    {
        let engine = match host.engine() {
            Some(engine) => Arc::clone(engine),
            None => {
                error!("Cannot create peripheral session: no radio engine linked");
                return Err(PeripheralError::EngineNotLinked);
            }
        };
        let runtime = Handle::try_current().map_err(|_| PeripheralError::NoRuntime)?;

        let id = SessionId::next();
        let (state, _) = watch::channel(SessionState::Initializing);
        let shared = Arc::new(SessionShared {
            id,
            state,
            failure: Mutex::new(None),
            sink: EventSink::new(),
            subscriptions: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        });

        let router = Arc::clone(host.router());
        let handles: Vec<SubscriptionHandle> = EventCategory::ALL
            .iter()
            .map(|&category| {
                let weak: Weak<SessionShared> = Arc::downgrade(&shared);
                router.subscribe(category, move |event| {
                    if event.id != id {
                        return;
                    }
                    if let Some(shared) = weak.upgrade() {
                        if !shared.destroyed.load(Ordering::SeqCst) {
                            shared.sink.emit(&event.to_session_event());
                        }
                    }
                })
            })
            .collect();
        *shared.subscriptions.lock() = Some(handles);

        let directory = host.directory();
        directory.insert(id, Arc::downgrade(&shared));

        let session = Self {
            shared,
            engine,
            router,
            directory,
        };
        setup(&session);

        info!("Creating peripheral session {}", id);
        let create_engine = Arc::clone(&session.engine);
        let create_shared = Arc::clone(&session.shared);
        runtime.spawn(async move {
            let result = create_engine.create_peripheral(id).await;
            create_shared.finish_create(result);
        });

        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.destroyed.load(Ordering::SeqCst)
    }

    /// Cause of a failed creation, if the session is (or was) `Failed`
    pub fn failure(&self) -> Option<EngineError> {
        self.shared.failure.lock().clone()
    }

    /// Wait until the session has left `Initializing`
    pub async fn settled(&self) -> SessionState {
        let mut states = self.shared.state.subscribe();
        let outcome = states
            .wait_for(|state| *state != SessionState::Initializing)
            .await
            .map(|state| *state);
        outcome.unwrap_or_else(|_| self.state())
    }

    /// Register a listener for one notification kind
    pub fn on<F>(&self, kind: SessionEventKind, listener: F) -> ListenerId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        self.shared.sink.on(kind, listener)
    }

    pub fn off(&self, listener: ListenerId) -> bool {
        self.shared.sink.off(listener)
    }

    pub fn listener_count(&self, kind: SessionEventKind) -> usize {
        self.shared.sink.listener_count(kind)
    }

    pub async fn check_state(&self) -> PeripheralResult<RadioState> {
        let raw = self.engine.check_state(self.id()).await?;
        debug!("Session {} radio state: {}", self.id(), raw);
        Ok(RadioState::from(raw))
    }

    /// Begin advertising; service data and manufacturer data are encoded first
    pub async fn start_advertising(&self, advertisement: &Advertisement) -> PeripheralResult<()> {
        let (services, options) = advertisement.encode();
        info!(
            "Session {} starting advertising with {} services",
            self.id(),
            services.as_ref().map_or(0, |services| services.len())
        );
        self.engine
            .start_advertising(self.id(), services, options)
            .await?;
        Ok(())
    }

    pub async fn stop_advertising(&self) -> PeripheralResult<()> {
        info!("Session {} stopping advertising", self.id());
        self.engine.stop_advertising(self.id()).await?;
        Ok(())
    }

    pub async fn add_service(&self, uuid: &str, primary: bool) -> PeripheralResult<()> {
        debug!("Session {} adding service {} (primary: {})", self.id(), uuid, primary);
        self.engine.add_service(self.id(), uuid, primary).await?;
        Ok(())
    }

    pub async fn add_characteristic(
        &self,
        service_uuid: &str,
        uuid: &str,
        properties: Properties,
        permissions: Permissions,
    ) -> PeripheralResult<()> {
        debug!(
            "Session {} adding characteristic {} to {} (properties: {:#04x}, permissions: {:#04x})",
            self.id(),
            uuid,
            service_uuid,
            properties.bits(),
            permissions.bits()
        );
        self.engine
            .add_characteristic(self.id(), service_uuid, uuid, properties, permissions)
            .await?;
        Ok(())
    }

    pub async fn update_value(
        &self,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: &[u8],
    ) -> PeripheralResult<()> {
        debug!(
            "Session {} updating {}/{} ({} bytes)",
            self.id(),
            service_uuid,
            characteristic_uuid,
            value.len()
        );
        self.engine
            .update_value(self.id(), service_uuid, characteristic_uuid, codec::encode(value))
            .await?;
        Ok(())
    }

    /// Push a value to subscribed centrals, as an indication when `is_indication`
    pub async fn send_notification(
        &self,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: &[u8],
        is_indication: bool,
    ) -> PeripheralResult<()> {
        debug!(
            "Session {} sending {} on {}/{} ({} bytes)",
            self.id(),
            if is_indication { "indication" } else { "notification" },
            service_uuid,
            characteristic_uuid,
            value.len()
        );
        self.engine
            .send_notification(
                self.id(),
                service_uuid,
                characteristic_uuid,
                codec::encode(value),
                is_indication,
            )
            .await?;
        Ok(())
    }

    pub async fn notify(
        &self,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: &[u8],
    ) -> PeripheralResult<()> {
        self.send_notification(service_uuid, characteristic_uuid, value, false)
            .await
    }

    /// Complete a pending read or write request from `device`
    pub async fn send_response(
        &self,
        device: &str,
        request_id: u32,
        status: u8,
        offset: u32,
        value: &[u8],
    ) -> PeripheralResult<()> {
        debug!(
            "Session {} responding to request {} from {} with status {}",
            self.id(),
            request_id,
            device,
            status
        );
        self.engine
            .send_response(
                self.id(),
                device,
                request_id,
                status,
                offset,
                codec::encode(value),
            )
            .await?;
        Ok(())
    }

    /// Tear down the native peripheral, then release router subscriptions and
    /// emit `destroy`.
    ///
    /// Calling this again forwards to the engine again but the cleanup and the
    /// `destroy` notification happen only once. If the engine rejects, the
    /// session is left as it was.
    pub async fn destroy(&self) -> PeripheralResult<()> {
        info!("Destroying peripheral session {}", self.id());
        self.engine.destroy_peripheral(self.id()).await?;
        self.shared.handle_destroyed(&self.router, &self.directory);
        Ok(())
    }
}

impl Drop for PeripheralSession {
    fn drop(&mut self) {
        if !self.is_destroyed() {
            warn!(
                "Peripheral session {} dropped without destroy; native peripheral left to the engine",
                self.id()
            );
            self.shared.release_subscriptions(&self.router);
            self.directory.remove(&self.shared.id);
        }
    }
}

impl std::fmt::Debug for PeripheralSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralSession")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
