//! GATT vocabulary and advertising parameters

use crate::codec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

macro_rules! gatt_flags {
    (
        $(#[$meta:meta])*
        pub struct $name:ident {
            $(const $flag:ident = $value:expr;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            $(pub const $flag: Self = Self($value);)+

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn from_bits(bits: u8) -> Self {
                Self(bits)
            }

            pub const fn bits(self) -> u8 {
                self.0
            }

            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl From<$name> for u8 {
            fn from(flags: $name) -> u8 {
                flags.0
            }
        }
    };
}

gatt_flags! {
    /// Characteristic properties advertised to centrals
    pub struct Properties {
        const BROADCAST = 1;
        const READ = 2;
        const WRITE_NO_RESPONSE = 4;
        const WRITE = 8;
        const NOTIFY = 16;
        const INDICATE = 32;
        const SIGNED_WRITE = 64;
        const EXTENDED_PROPS = 128;
    }
}

gatt_flags! {
    /// Attribute access permissions
    pub struct Permissions {
        const READABLE = 0x01;
        const WRITEABLE = 0x10;
    }
}

/// Out-of-range discriminant for an integer-coded GATT enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownDiscriminant(pub u8);

impl fmt::Display for UnknownDiscriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown discriminant {}", self.0)
    }
}

/// Advertising transmit power
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TxPowerLevel {
    UltraLow = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl From<TxPowerLevel> for u8 {
    fn from(level: TxPowerLevel) -> u8 {
        level as u8
    }
}

impl TryFrom<u8> for TxPowerLevel {
    type Error = UnknownDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TxPowerLevel::UltraLow),
            1 => Ok(TxPowerLevel::Low),
            2 => Ok(TxPowerLevel::Medium),
            3 => Ok(TxPowerLevel::High),
            other => Err(UnknownDiscriminant(other)),
        }
    }
}

/// Advertising interval trade-off
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum AdvertiseMode {
    LowLatency = 0,
    LowPower = 1,
    Balanced = 2,
}

impl From<AdvertiseMode> for u8 {
    fn from(mode: AdvertiseMode) -> u8 {
        mode as u8
    }
}

impl TryFrom<u8> for AdvertiseMode {
    type Error = UnknownDiscriminant;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(AdvertiseMode::LowLatency),
            1 => Ok(AdvertiseMode::LowPower),
            2 => Ok(AdvertiseMode::Balanced),
            other => Err(UnknownDiscriminant(other)),
        }
    }
}

/// Service UUIDs to advertise, each with optional service data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertiseServices(BTreeMap<String, Option<Vec<u8>>>);

/// Advertised services after payload encoding
pub type EncodedServices = BTreeMap<String, Option<String>>;

impl AdvertiseServices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a service UUID without service data
    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.0.insert(uuid.into(), None);
        self
    }

    /// Advertise a service UUID carrying service data
    pub fn with_data(mut self, uuid: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.0.insert(uuid.into(), Some(data.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn encode(&self) -> EncodedServices {
        self.0
            .iter()
            .map(|(uuid, data)| (uuid.clone(), data.as_deref().map(codec::encode)))
            .collect()
    }
}

/// Advertising options; every field left `None` is up to the engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertiseOptions {
    pub mode: Option<AdvertiseMode>,
    pub tx_power_level: Option<TxPowerLevel>,
    pub connectable: Option<bool>,
    pub include_device_name: Option<bool>,
    pub include_tx_power_level: Option<bool>,
    pub manufacturer_id: Option<u16>,
    pub manufacturer_data: Option<Vec<u8>>,
}

impl AdvertiseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: AdvertiseMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn tx_power_level(mut self, level: TxPowerLevel) -> Self {
        self.tx_power_level = Some(level);
        self
    }

    pub fn connectable(mut self, connectable: bool) -> Self {
        self.connectable = Some(connectable);
        self
    }

    pub fn include_device_name(mut self, include: bool) -> Self {
        self.include_device_name = Some(include);
        self
    }

    pub fn include_tx_power_level(mut self, include: bool) -> Self {
        self.include_tx_power_level = Some(include);
        self
    }

    pub fn manufacturer(mut self, id: u16, data: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_id = Some(id);
        self.manufacturer_data = Some(data.into());
        self
    }

    pub fn encode(&self) -> EncodedAdvertiseOptions {
        EncodedAdvertiseOptions {
            mode: self.mode,
            tx_power_level: self.tx_power_level,
            connectable: self.connectable,
            include_device_name: self.include_device_name,
            include_tx_power_level: self.include_tx_power_level,
            manufacturer_id: self.manufacturer_id,
            manufacturer_data: self.manufacturer_data.as_deref().map(codec::encode),
        }
    }
}

/// Advertising options in engine wire form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedAdvertiseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<AdvertiseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_power_level: Option<TxPowerLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_device_name: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_tx_power_level: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_id: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_data: Option<String>,
}

/// Everything `start_advertising` needs.
///
/// Services and options are separate named fields; `services: None` tells the
/// engine to advertise without a service list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advertisement {
    pub services: Option<AdvertiseServices>,
    pub options: AdvertiseOptions,
}

impl Advertisement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_services(mut self, services: AdvertiseServices) -> Self {
        self.services = Some(services);
        self
    }

    pub fn with_options(mut self, options: AdvertiseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn encode(&self) -> (Option<EncodedServices>, EncodedAdvertiseOptions) {
        (
            self.services.as_ref().map(AdvertiseServices::encode),
            self.options.encode(),
        )
    }
}

/// Radio or permission state reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioState {
    Unknown,
    Resetting,
    Unsupported,
    Unauthorized,
    PoweredOff,
    PoweredOn,
    /// A state string this crate does not recognise, kept verbatim
    Other(String),
}

impl RadioState {
    pub fn is_powered_on(&self) -> bool {
        matches!(self, RadioState::PoweredOn)
    }
}

impl From<String> for RadioState {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "unknown" => RadioState::Unknown,
            "resetting" => RadioState::Resetting,
            "unsupported" => RadioState::Unsupported,
            "unauthorized" => RadioState::Unauthorized,
            "poweredoff" | "off" => RadioState::PoweredOff,
            "poweredon" | "on" => RadioState::PoweredOn,
            _ => RadioState::Other(raw),
        }
    }
}

impl fmt::Display for RadioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RadioState::Unknown => "unknown",
            RadioState::Resetting => "resetting",
            RadioState::Unsupported => "unsupported",
            RadioState::Unauthorized => "unauthorized",
            RadioState::PoweredOff => "poweredOff",
            RadioState::PoweredOn => "poweredOn",
            RadioState::Other(raw) => raw,
        };
        f.write_str(name)
    }
}
