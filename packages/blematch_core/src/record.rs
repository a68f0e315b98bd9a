//! Discovered peripheral records
//!
//! A `DiscoveredPeripheralRecord` is what the scanning subsystem hands us for
//! one advertisement event. Nothing in it is trusted: the name may be empty or
//! truncated, the service list may be partial, and the platform identifier
//! rotates across scans on some platforms, so it is carried for the caller's
//! benefit only and never consulted during matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::uuid16;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Invalid record JSON: {0}")]
    InvalidJson(String),
}

// AD structure types (Bluetooth Core Supplement, Part A, 1.x).
const AD_INCOMPLETE_UUID16: u8 = 0x02;
const AD_COMPLETE_UUID16: u8 = 0x03;
const AD_INCOMPLETE_UUID32: u8 = 0x04;
const AD_COMPLETE_UUID32: u8 = 0x05;
const AD_INCOMPLETE_UUID128: u8 = 0x06;
const AD_COMPLETE_UUID128: u8 = 0x07;
const AD_SHORTENED_NAME: u8 = 0x08;
const AD_COMPLETE_NAME: u8 = 0x09;
const AD_MANUFACTURER_DATA: u8 = 0xFF;

/// One advertisement as seen by the scanner.
///
/// Empty names and empty manufacturer data are stored as absent, so the
/// accessors and the matcher see the same thing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredPeripheralRecord {
    /// Advertised local name (complete or shortened).
    #[serde(
        default,
        rename = "name",
        with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    local_name: Option<String>,
    /// Advertised service identifiers, all normalised to 128-bit.
    #[serde(default, rename = "services", with = "uuid16::serde_list")]
    service_uuids: Vec<Uuid>,
    /// Manufacturer specific data, company identifier (little-endian) first.
    #[serde(
        default,
        with = "hex_bytes",
        skip_serializing_if = "Option::is_none"
    )]
    manufacturer_data: Option<Vec<u8>>,
    /// Platform-assigned transient identifier. Never used as a key.
    #[serde(
        default,
        rename = "id",
        with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    platform_id: Option<String>,
}

impl DiscoveredPeripheralRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.local_name = Some(name.into()).filter(|n| !n.is_empty());
        self
    }

    pub fn with_service(mut self, uuid: Uuid) -> Self {
        self.push_service(uuid);
        self
    }

    pub fn with_manufacturer_data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.manufacturer_data = Some(data.into()).filter(|d| !d.is_empty());
        self
    }

    pub fn with_platform_id(mut self, id: impl Into<String>) -> Self {
        self.platform_id = Some(id.into());
        self
    }

    /// The advertised name, or `None` when it is absent or empty.
    pub fn name(&self) -> Option<&str> {
        self.local_name.as_deref()
    }

    pub fn service_uuids(&self) -> &[Uuid] {
        &self.service_uuids
    }

    /// Manufacturer data, or `None` when absent or empty.
    pub fn manufacturer_data(&self) -> Option<&[u8]> {
        self.manufacturer_data.as_deref()
    }

    pub fn platform_id(&self) -> Option<&str> {
        self.platform_id.as_deref()
    }

    pub fn advertises(&self, uuid: &Uuid) -> bool {
        self.service_uuids.contains(uuid)
    }

    /// True when the record carries nothing a signature could match on.
    pub fn is_blank(&self) -> bool {
        self.local_name.is_none() && self.service_uuids.is_empty() && self.manufacturer_data.is_none()
    }

    /// Parse the JSON form used across the FFI boundary.
    ///
    /// Only input that is not a JSON object fails. A field that cannot be
    /// read is treated as absent, which leaves its criteria unsatisfied.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json).map_err(|e| RecordError::InvalidJson(e.to_string()))
    }

    /// Build a record from raw LE advertising data (AD structures).
    ///
    /// A structure whose declared length runs past the buffer ends parsing;
    /// everything decoded up to that point is kept. A complete local name
    /// takes precedence over a shortened one.
    pub fn from_advertisement(platform_id: Option<String>, data: &[u8]) -> Self {
        let mut record = Self {
            platform_id,
            ..Self::default()
        };
        let mut shortened_name = None;

        let mut i = 0;
        while i < data.len() {
            let len = data[i] as usize;
            if len == 0 || i + len >= data.len() {
                break;
            }
            let ad_type = data[i + 1];
            let value = &data[i + 2..i + 1 + len];
            match ad_type {
                AD_INCOMPLETE_UUID16 | AD_COMPLETE_UUID16 => {
                    for chunk in value.chunks_exact(2) {
                        let short = u16::from_le_bytes([chunk[0], chunk[1]]);
                        record.push_service(uuid16::from_u16(short));
                    }
                }
                AD_INCOMPLETE_UUID32 | AD_COMPLETE_UUID32 => {
                    for chunk in value.chunks_exact(4) {
                        let short = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                        record.push_service(uuid16::from_u32(short));
                    }
                }
                AD_INCOMPLETE_UUID128 | AD_COMPLETE_UUID128 => {
                    for chunk in value.chunks_exact(16) {
                        let mut bytes = [0u8; 16];
                        bytes.copy_from_slice(chunk);
                        // Over the air 128-bit UUIDs are little-endian.
                        bytes.reverse();
                        record.push_service(Uuid::from_bytes(bytes));
                    }
                }
                AD_SHORTENED_NAME if !value.is_empty() => {
                    shortened_name = Some(String::from_utf8_lossy(value).into_owned());
                }
                AD_COMPLETE_NAME if !value.is_empty() => {
                    record.local_name = Some(String::from_utf8_lossy(value).into_owned());
                }
                AD_MANUFACTURER_DATA if record.manufacturer_data.is_none() && !value.is_empty() => {
                    record.manufacturer_data = Some(value.to_vec());
                }
                _ => {}
            }
            i += len + 1;
        }

        if record.local_name.is_none() {
            record.local_name = shortened_name;
        }
        record
    }

    fn push_service(&mut self, uuid: Uuid) {
        if !self.service_uuids.contains(&uuid) {
            self.service_uuids.push(uuid);
        }
    }
}

/// Optional strings; a non-string or empty value reads as absent.
mod lenient_text {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(text: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match text {
            Some(t) => serializer.serialize_str(t),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) if !s.is_empty() => Some(s),
            Value::String(_) | Value::Null => None,
            other => {
                log::debug!("Ignoring non-string record field: {}", other);
                None
            }
        })
    }
}

/// Hex-encoded bytes; malformed or empty hex reads as absent.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => match hex::decode(s.trim()) {
                Ok(bytes) if !bytes.is_empty() => Some(bytes),
                Ok(_) => None,
                Err(e) => {
                    log::debug!("Ignoring manufacturer data {:?}: {}", s, e);
                    None
                }
            },
            Value::Null => None,
            other => {
                log::debug!("Ignoring non-string manufacturer data: {}", other);
                None
            }
        })
    }
}
