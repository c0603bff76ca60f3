//! Wire-safe text encoding for payloads crossing the engine boundary

use crate::error::PeripheralResult;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encode raw bytes as standard padded base64
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode base64 text back into raw bytes
pub fn decode(text: &str) -> PeripheralResult<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}
