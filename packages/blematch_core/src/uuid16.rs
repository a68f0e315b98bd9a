//! Bluetooth base-UUID helpers
//!
//! SIG-assigned services are advertised in 16- or 32-bit short form and
//! expand onto the Bluetooth base UUID `0000xxxx-0000-1000-8000-00805f9b34fb`.
//! Everything inside the crate compares full 128-bit values.

use uuid::Uuid;

const BASE_UUID: u128 = 0x0000_0000_0000_1000_8000_0080_5f9b_34fb;
const BASE_MASK: u128 = 0x0000_0000_ffff_ffff_ffff_ffff_ffff_ffff;

/// Expand a 16-bit SIG identifier (e.g. `0x180D`) to its 128-bit form.
pub const fn from_u16(short: u16) -> Uuid {
    from_u32(short as u32)
}

/// Expand a 32-bit SIG identifier to its 128-bit form.
pub const fn from_u32(short: u32) -> Uuid {
    Uuid::from_u128(BASE_UUID | ((short as u128) << 96))
}

/// Return the short form if `uuid` sits on the Bluetooth base UUID.
pub fn to_u32(uuid: &Uuid) -> Option<u32> {
    let value = uuid.as_u128();
    if value & BASE_MASK == BASE_UUID {
        Some((value >> 96) as u32)
    } else {
        None
    }
}

/// Parse `"180D"`, `"0000180d"` or a full hyphenated UUID.
pub fn parse(text: &str) -> Option<Uuid> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let all_hex = text.bytes().all(|b| b.is_ascii_hexdigit());
    match text.len() {
        4 if all_hex => u16::from_str_radix(text, 16).ok().map(from_u16),
        8 if all_hex => u32::from_str_radix(text, 16).ok().map(from_u32),
        4 | 8 => None,
        _ => Uuid::parse_str(text).ok(),
    }
}

/// Render a UUID the way BLE tooling displays it: `"180d"` when it has a
/// 16-bit short form, the hyphenated 128-bit form otherwise.
pub fn to_display_string(uuid: &Uuid) -> String {
    match to_u32(uuid) {
        Some(short) if short <= u16::MAX as u32 => format!("{:04x}", short),
        _ => uuid.hyphenated().to_string(),
    }
}

/// serde adapters accepting short or full UUID strings.
///
/// Deserialization is lenient: scan records come from untrusted
/// advertisements, so unparseable entries are dropped and anything other
/// than a list (including `null`) reads as no services.
pub(crate) mod serde_list {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use uuid::Uuid;

    pub fn serialize<S>(uuids: &[Uuid], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(uuids.iter().map(super::to_display_string))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Uuid>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = match Value::deserialize(deserializer)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                log::debug!("Ignoring non-list services field: {}", other);
                Vec::new()
            }
        };

        let mut uuids = Vec::with_capacity(raw.len());
        for item in &raw {
            match item.as_str().and_then(super::parse) {
                Some(uuid) if !uuids.contains(&uuid) => uuids.push(uuid),
                Some(_) => {}
                None => log::debug!("Ignoring unparseable service UUID {}", item),
            }
        }
        Ok(uuids)
    }
}
