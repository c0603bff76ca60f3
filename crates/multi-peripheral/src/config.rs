use serde::Deserialize;
use std::env;

/// Default capacity of the engine -> router event channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeripheralConfig {
    /// Capacity of the engine -> router event channel (default: 256)
    pub event_buffer: usize,
    /// Device name pushed by `PeripheralHost::apply_configured_name`
    pub device_name: Option<String>,
    /// Emit JSON logs instead of pretty output (default: false)
    pub log_json: bool,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            device_name: None,
            log_json: false,
        }
    }
}

impl PeripheralConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables take defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(PeripheralConfig {
            event_buffer: lookup("BLE_PERIPHERAL_EVENT_BUFFER")
                .unwrap_or_else(|| DEFAULT_EVENT_BUFFER.to_string())
                .parse()?,
            device_name: lookup("BLE_PERIPHERAL_DEVICE_NAME").filter(|name| !name.is_empty()),
            log_json: lookup("BLE_PERIPHERAL_LOG_JSON")
                .unwrap_or_else(|| "false".to_string())
                .parse()?,
        })
    }
}
