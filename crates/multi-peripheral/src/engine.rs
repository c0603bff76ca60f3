//! Radio engine abstraction.
//!
//! The engine is the platform component that owns the BLE hardware, builds the GATT
//! server and advertises. This crate never talks to the radio directly; every
//! session command is forwarded here keyed by [`SessionId`], and inbound activity
//! comes back as [`RadioEvent`](crate::event::RadioEvent)s on one shared stream.

use crate::error::EngineResult;
use crate::id::SessionId;
use crate::types::{EncodedAdvertiseOptions, EncodedServices, Permissions, Properties};
use async_trait::async_trait;

/// Trait for the platform-native peripheral engine
#[async_trait]
pub trait RadioEngine: Send + Sync {
    /// Allocate a native peripheral for this session
    async fn create_peripheral(&self, id: SessionId) -> EngineResult<()>;

    /// Set the advertised name of the shared device
    async fn set_device_name(&self, name: &str) -> EngineResult<()>;

    /// Current radio/permission state, as the platform names it
    async fn check_state(&self, id: SessionId) -> EngineResult<String>;

    /// Begin advertising; payload fields are already base64 text
    async fn start_advertising(
        &self,
        id: SessionId,
        services: Option<EncodedServices>,
        options: EncodedAdvertiseOptions,
    ) -> EngineResult<()>;

    async fn stop_advertising(&self, id: SessionId) -> EngineResult<()>;

    /// Complete a pending read or write request
    async fn send_response(
        &self,
        id: SessionId,
        device: &str,
        request_id: u32,
        status: u8,
        offset: u32,
        value: String,
    ) -> EngineResult<()>;

    async fn add_service(&self, id: SessionId, uuid: &str, primary: bool) -> EngineResult<()>;

    async fn add_characteristic(
        &self,
        id: SessionId,
        service_uuid: &str,
        uuid: &str,
        properties: Properties,
        permissions: Permissions,
    ) -> EngineResult<()>;

    async fn update_value(
        &self,
        id: SessionId,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: String,
    ) -> EngineResult<()>;

    async fn send_notification(
        &self,
        id: SessionId,
        service_uuid: &str,
        characteristic_uuid: &str,
        value: String,
        is_indication: bool,
    ) -> EngineResult<()>;

    /// Tear down the native peripheral for this session
    async fn destroy_peripheral(&self, id: SessionId) -> EngineResult<()>;
}
