// Shared test doubles for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use multi_ble_peripheral::{
    EncodedAdvertiseOptions, EncodedServices, EngineError, EngineResult, Permissions, Properties,
    RadioEngine, SessionEvent, SessionEventKind, SessionId, PeripheralSession,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// One call received by the scripted engine
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(SessionId),
    SetDeviceName(String),
    CheckState(SessionId),
    StartAdvertising {
        id: SessionId,
        services: Option<EncodedServices>,
        options: EncodedAdvertiseOptions,
    },
    StopAdvertising(SessionId),
    SendResponse {
        id: SessionId,
        device: String,
        request_id: u32,
        status: u8,
        offset: u32,
        value: String,
    },
    AddService {
        id: SessionId,
        uuid: String,
        primary: bool,
    },
    AddCharacteristic {
        id: SessionId,
        service_uuid: String,
        uuid: String,
        properties: Properties,
        permissions: Permissions,
    },
    UpdateValue {
        id: SessionId,
        service_uuid: String,
        characteristic_uuid: String,
        value: String,
    },
    SendNotification {
        id: SessionId,
        service_uuid: String,
        characteristic_uuid: String,
        value: String,
        is_indication: bool,
    },
    Destroy(SessionId),
}

/// In-memory radio engine with scriptable outcomes
pub struct ScriptedEngine {
    calls: Mutex<Vec<Call>>,
    create_error: Mutex<Option<EngineError>>,
    command_error: Mutex<Option<EngineError>>,
    destroy_failures: AtomicUsize,
    create_gate: Option<Semaphore>,
    state: Mutex<String>,
}

impl ScriptedEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::build(None))
    }

    /// Creation stays pending until `release_create` is called
    pub fn holding_create() -> Arc<Self> {
        Arc::new(Self::build(Some(Semaphore::new(0))))
    }

    fn build(create_gate: Option<Semaphore>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            create_error: Mutex::new(None),
            command_error: Mutex::new(None),
            destroy_failures: AtomicUsize::new(0),
            create_gate,
            state: Mutex::new("poweredOn".to_string()),
        }
    }

    pub fn fail_create_with(&self, err: EngineError) {
        *self.create_error.lock() = Some(err);
    }

    pub fn fail_commands_with(&self, err: EngineError) {
        *self.command_error.lock() = Some(err);
    }

    pub fn fail_next_destroys(&self, count: usize) {
        self.destroy_failures.store(count, Ordering::SeqCst);
    }

    pub fn set_state(&self, state: &str) {
        *self.state.lock() = state.to_string();
    }

    pub fn release_create(&self, permits: usize) {
        if let Some(gate) = &self.create_gate {
            gate.add_permits(permits);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn destroy_calls(&self, id: SessionId) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| **call == Call::Destroy(id))
            .count()
    }

    fn record(&self, call: Call) -> EngineResult<()> {
        self.calls.lock().push(call);
        match self.command_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RadioEngine for ScriptedEngine {
    async fn create_peripheral(&self, id: SessionId) -> EngineResult<()> {
        self.calls.lock().push(Call::Create(id));
        if let Some(gate) = &self.create_gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        match self.create_error.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn set_device_name(&self, name: &str) -> EngineResult<()> {
        self.record(Call::SetDeviceName(name.to_string()))
    }

    async fn check_state(&self, id: SessionId) -> EngineResult<String> {
        self.record(Call::CheckState(id))?;
        Ok(self.state.lock().clone())
    }

    async fn start_advertising(
        &self,
        id: SessionId,
        services: Option<EncodedServices>,
        options: EncodedAdvertiseOptions,
    ) -> EngineResult<()> {
        self.record(Call::StartAdvertising {
            id,
            services,
            options,
        })
    }

    async fn stop_advertising(&self, id: SessionId) -> EngineResult<()> {
        self.record(Call::StopAdvertising(id))
    }

    async fn send_response(
        &self,
        id: SessionId,
        device: &str,
        request_id: u32,
        status: u8,
        offset: u32,
        value: String,
    ) -> EngineResult<()> {
        self.record(Call::SendResponse {
            id,
            device: device.to_string(),
            request_id,
            status,
            offset,
            value,
        })
    }

    async fn add_service(&self, id: SessionId, uuid: &str, primary: bool) -> EngineResult<()> {
        self.record(Call::AddService {
            id,
            uuid: uuid.to_string(),
            primary,
        })
    }

    async fn add_characteristic(
        &self,
        id: SessionId,
        service_uuid: &str,
        uuid: &str,
        properties: Properties,
        permissions: Permissions,
    ) -> EngineResult<()> {
        self.record(Call::AddCharacteristic {
            id,
            service_uuid: service_uuid.to_string(),
            uuid: uuid.to_string(),
            properties,
            permissions,
        })
    }

    async fn update_value(
        &self,
        id: SessionId,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: String,
    ) -> EngineResult<()> {
        self.record(Call::UpdateValue {
            id,
            service_uuid: service_uuid.to_string(),
            characteristic_uuid: characteristic_uuid.to_string(),
            value,
        })
    }

    async fn send_notification(
        &self,
        id: SessionId,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: String,
        is_indication: bool,
    ) -> EngineResult<()> {
        self.record(Call::SendNotification {
            id,
            service_uuid: service_uuid.to_string(),
            characteristic_uuid: characteristic_uuid.to_string(),
            value,
            is_indication,
        })
    }

    async fn destroy_peripheral(&self, id: SessionId) -> EngineResult<()> {
        self.calls.lock().push(Call::Destroy(id));
        let remaining = self.destroy_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.destroy_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::new("destroy rejected"));
        }
        Ok(())
    }
}

/// Collected notifications of one session
pub type Recorded = Arc<Mutex<Vec<SessionEvent>>>;

/// Record every notification of the given kinds published by `session`
pub fn record(session: &PeripheralSession, kinds: &[SessionEventKind]) -> Recorded {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    for &kind in kinds {
        let sink = Arc::clone(&recorded);
        session.on(kind, move |event| sink.lock().push(event.clone()));
    }
    recorded
}

pub const ALL_KINDS: [SessionEventKind; 7] = [
    SessionEventKind::Ready,
    SessionEventKind::Error,
    SessionEventKind::Write,
    SessionEventKind::Read,
    SessionEventKind::Subscribe,
    SessionEventKind::Unsubscribe,
    SessionEventKind::Destroy,
];

/// Let spawned tasks on the current-thread test runtime make progress
pub async fn settle_tasks() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}
