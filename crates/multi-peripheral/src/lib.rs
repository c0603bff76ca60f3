//! Multiple BLE peripheral sessions over one shared radio engine
//!
//! Each [`PeripheralSession`] advertises its own GATT services and receives only its
//! own read/write/subscribe/unsubscribe events. Sessions are correlated with the
//! engine purely by [`SessionId`]; a shared [`EventRouter`] demultiplexes the
//! engine's single event stream.

pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod host;
pub mod id;
pub mod logging;
pub mod router;
pub mod session;
pub mod sink;
pub mod types;

// Re-export main types
pub use config::PeripheralConfig;
pub use engine::RadioEngine;
pub use error::{EngineError, EngineResult, PeripheralError, PeripheralResult};
pub use event::{
    EventCategory, RadioEvent, RadioEventKind, ReadEvent, SessionEvent, SessionEventKind,
    SubscriptionEvent, WriteEvent,
};
pub use host::PeripheralHost;
pub use id::SessionId;
pub use router::{EventRouter, SubscriptionHandle};
pub use session::{PeripheralSession, SessionState};
pub use sink::ListenerId;
pub use types::{
    AdvertiseMode, AdvertiseOptions, AdvertiseServices, Advertisement, EncodedAdvertiseOptions,
    EncodedServices, Permissions, Properties, RadioState, TxPowerLevel,
};
