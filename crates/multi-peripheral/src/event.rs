//! Inbound radio events and the notifications a session publishes

use crate::codec;
use crate::error::{EngineError, PeripheralResult};
use crate::id::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A remote central wrote to a characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteEvent {
    pub service: String,
    pub characteristic: String,
    /// Written value exactly as the engine delivered it (base64 text)
    pub value: String,
    pub device: String,
    pub request_id: u32,
}

impl WriteEvent {
    /// Decoded bytes of the written value
    pub fn bytes(&self) -> PeripheralResult<Vec<u8>> {
        codec::decode(&self.value)
    }
}

/// A remote central is reading a characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadEvent {
    pub service: String,
    pub characteristic: String,
    pub offset: u32,
    pub device: String,
    pub request_id: u32,
}

/// A remote central subscribed to or unsubscribed from a characteristic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionEvent {
    pub service_uuid: String,
    pub characteristic_uuid: String,
}

/// The four event categories the engine emits on its shared stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Write,
    Read,
    Subscribe,
    Unsubscribe,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Write,
        EventCategory::Read,
        EventCategory::Subscribe,
        EventCategory::Unsubscribe,
    ];

    /// Name of the category on the engine's event stream
    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Write => "onWrite",
            EventCategory::Read => "onRead",
            EventCategory::Subscribe => "onSubscribe",
            EventCategory::Unsubscribe => "onUnsubscribe",
        }
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category-specific payload of a raw radio event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category")]
pub enum RadioEventKind {
    #[serde(rename = "onWrite")]
    Write(WriteEvent),
    #[serde(rename = "onRead")]
    Read(ReadEvent),
    #[serde(rename = "onSubscribe")]
    Subscribe(SubscriptionEvent),
    #[serde(rename = "onUnsubscribe")]
    Unsubscribe(SubscriptionEvent),
}

/// One event from the engine's shared stream, tagged with the target session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadioEvent {
    pub id: SessionId,
    #[serde(flatten)]
    pub kind: RadioEventKind,
}

impl RadioEvent {
    pub fn write(id: SessionId, event: WriteEvent) -> Self {
        Self {
            id,
            kind: RadioEventKind::Write(event),
        }
    }

    pub fn read(id: SessionId, event: ReadEvent) -> Self {
        Self {
            id,
            kind: RadioEventKind::Read(event),
        }
    }

    pub fn subscribe(id: SessionId, event: SubscriptionEvent) -> Self {
        Self {
            id,
            kind: RadioEventKind::Subscribe(event),
        }
    }

    pub fn unsubscribe(id: SessionId, event: SubscriptionEvent) -> Self {
        Self {
            id,
            kind: RadioEventKind::Unsubscribe(event),
        }
    }

    /// Parse an event in the native bridge's JSON shape,
    /// e.g. `{"category":"onSubscribe","id":3,"serviceUuid":"..","characteristicUuid":".."}`
    pub fn from_json(raw: &str) -> PeripheralResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn category(&self) -> EventCategory {
        match self.kind {
            RadioEventKind::Write(_) => EventCategory::Write,
            RadioEventKind::Read(_) => EventCategory::Read,
            RadioEventKind::Subscribe(_) => EventCategory::Subscribe,
            RadioEventKind::Unsubscribe(_) => EventCategory::Unsubscribe,
        }
    }

    /// The notification a session publishes for this event
    pub fn to_session_event(&self) -> SessionEvent {
        match &self.kind {
            RadioEventKind::Write(event) => SessionEvent::Write(event.clone()),
            RadioEventKind::Read(event) => SessionEvent::Read(event.clone()),
            RadioEventKind::Subscribe(event) => SessionEvent::Subscribe(event.clone()),
            RadioEventKind::Unsubscribe(event) => SessionEvent::Unsubscribe(event.clone()),
        }
    }
}

/// Notification kinds a session publishes to its listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEventKind {
    Ready,
    Error,
    Write,
    Read,
    Subscribe,
    Unsubscribe,
    Destroy,
}

/// A notification published on a session's local event sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The engine created the native peripheral
    Ready,
    /// The engine rejected creation of the native peripheral
    Error(EngineError),
    Write(WriteEvent),
    Read(ReadEvent),
    Subscribe(SubscriptionEvent),
    Unsubscribe(SubscriptionEvent),
    /// The session was torn down
    Destroy,
}

impl SessionEvent {
    pub fn kind(&self) -> SessionEventKind {
        match self {
            SessionEvent::Ready => SessionEventKind::Ready,
            SessionEvent::Error(_) => SessionEventKind::Error,
            SessionEvent::Write(_) => SessionEventKind::Write,
            SessionEvent::Read(_) => SessionEventKind::Read,
            SessionEvent::Subscribe(_) => SessionEventKind::Subscribe,
            SessionEvent::Unsubscribe(_) => SessionEventKind::Unsubscribe,
            SessionEvent::Destroy => SessionEventKind::Destroy,
        }
    }
}
