//! Composition root: one radio engine, one router, many sessions

use crate::config::PeripheralConfig;
use crate::engine::RadioEngine;
use crate::error::{PeripheralError, PeripheralResult};
use crate::event::RadioEvent;
use crate::id::SessionId;
use crate::router::EventRouter;
use crate::session::{PeripheralSession, SessionShared, SessionState};
use dashmap::DashMap;
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Live sessions by id. Holds weak references only; never handed to the engine.
pub(crate) type SessionDirectory = Arc<DashMap<SessionId, Weak<SessionShared>>>;

/// Owner of the shared radio engine and event router.
///
/// Every session created from one host shares its engine and router. A host built
/// with [`PeripheralHost::unlinked`] models a binary without an engine: creating a
/// session from it fails with [`PeripheralError::EngineNotLinked`].
pub struct PeripheralHost {
    engine: Option<Arc<dyn RadioEngine>>,
    router: Arc<EventRouter>,
    sessions: SessionDirectory,
    config: PeripheralConfig,
}

impl PeripheralHost {
    pub fn new(engine: Arc<dyn RadioEngine>) -> Self {
        Self::with_config(Some(engine), PeripheralConfig::default())
    }

    /// A host with no radio engine linked
    pub fn unlinked() -> Self {
        Self::with_config(None, PeripheralConfig::default())
    }

    pub fn with_config(engine: Option<Arc<dyn RadioEngine>>, config: PeripheralConfig) -> Self {
        info!(
            "Initializing peripheral host (engine linked: {}, event buffer: {})",
            engine.is_some(),
            config.event_buffer
        );

        Self {
            engine,
            router: Arc::new(EventRouter::new()),
            sessions: Arc::new(DashMap::new()),
            config,
        }
    }

    /// Build a host with configuration read from the environment
    pub fn from_env(engine: Arc<dyn RadioEngine>) -> PeripheralResult<Self> {
        let config =
            PeripheralConfig::from_env().map_err(|e| PeripheralError::Config(e.to_string()))?;
        Ok(Self::with_config(Some(engine), config))
    }

    pub fn is_linked(&self) -> bool {
        self.engine.is_some()
    }

    pub(crate) fn engine(&self) -> Option<&Arc<dyn RadioEngine>> {
        self.engine.as_ref()
    }

    pub(crate) fn directory(&self) -> SessionDirectory {
        Arc::clone(&self.sessions)
    }

    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    pub fn config(&self) -> &PeripheralConfig {
        &self.config
    }

    /// Engine -> router channel sized by the configured event buffer
    pub fn event_channel(&self) -> (mpsc::Sender<RadioEvent>, mpsc::Receiver<RadioEvent>) {
        EventRouter::channel(self.config.event_buffer)
    }

    /// Spawn the router pump for an engine event stream
    pub fn listen(&self, events: mpsc::Receiver<RadioEvent>) -> PeripheralResult<JoinHandle<()>> {
        let runtime = Handle::try_current().map_err(|_| PeripheralError::NoRuntime)?;
        let router = Arc::clone(&self.router);
        Ok(runtime.spawn(async move { router.run(events).await }))
    }

    pub fn create_session(&self) -> PeripheralResult<PeripheralSession> {
        PeripheralSession::new(self)
    }

    /// Create a session with listeners registered before creation starts
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let session = host.create_session_with(|session| {
    ///     session.on(SessionEventKind::Ready, |_| info!("advertiser ready"));
    /// })?;
    /// ```
    pub fn create_session_with<F>(&self, setup: F) -> PeripheralResult<PeripheralSession>
    where
        F: FnOnce(&PeripheralSession),
    {
        PeripheralSession::with_setup(self, setup)
    }

    /// Ids of sessions created here and not yet destroyed or dropped, ascending
    pub fn live_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().strong_count() > 0)
            .map(|entry| *entry.key())
            .collect();
        ids.sort();
        ids
    }

    /// Look up the state of a live session by id
    pub fn session_state(&self, id: SessionId) -> Option<SessionState> {
        self.sessions
            .get(&id)
            .and_then(|entry| entry.value().upgrade())
            .map(|shared| shared.state())
    }

    /// Set the advertised name of the shared device; not scoped to any session
    pub async fn set_device_name(&self, name: &str) -> PeripheralResult<()> {
        let engine = self.engine.as_ref().ok_or(PeripheralError::EngineNotLinked)?;
        info!("Setting device name to {:?}", name);
        engine.set_device_name(name).await?;
        Ok(())
    }

    /// Push the configured device name, if any. Returns whether a name was applied.
    pub async fn apply_configured_name(&self) -> PeripheralResult<bool> {
        match self.config.device_name.clone() {
            Some(name) => {
                self.set_device_name(&name).await?;
                Ok(true)
            }
            None => {
                debug!("No device name configured");
                Ok(false)
            }
        }
    }
}

impl Drop for PeripheralHost {
    fn drop(&mut self) {
        let live = self.live_sessions();
        if !live.is_empty() {
            warn!("Peripheral host dropped with {} live sessions", live.len());
        }
    }
}
