//! Peripheral descriptors
//!
//! The descriptor is what a caller gets back on a match. Its `info` map is
//! derived from the descriptor itself plus the model's static extra
//! configuration, so the structured and the key-value view cannot drift.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Info key carrying the display name.
pub const INFO_DEVICE_NAME: &str = "DeviceName";
/// Info key carrying the profile tag.
pub const INFO_DEVICE_TYPE: &str = "DeviceType";

/// Profile tags used by the shipped catalog.
pub mod profiles {
    pub const BLOOD_PRESSURE: &str = "bloodpressure";
    pub const GLUCOSE: &str = "glucose";
    pub const PULSE_OX: &str = "pulseox";
    pub const WEIGHT: &str = "weight";
    pub const TEMPERATURE: &str = "temperature";
}

/// The communication profile the application should use for a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeripheralProfile(String);

impl PeripheralProfile {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeripheralProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

/// Static metadata for one supported device model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeripheralDescriptor {
    model: String,
    display_name: String,
    profile: PeripheralProfile,
    #[serde(skip_serializing_if = "Map::is_empty")]
    extra: Map<String, Value>,
    #[serde(skip)]
    info: Map<String, Value>,
}

impl PeripheralDescriptor {
    pub fn new(
        model: impl Into<String>,
        display_name: impl Into<String>,
        profile: PeripheralProfile,
    ) -> Self {
        let mut descriptor = Self {
            model: model.into(),
            display_name: display_name.into(),
            profile,
            extra: Map::new(),
            info: Map::new(),
        };
        descriptor.rebuild_info();
        descriptor
    }

    /// Attach a static configuration value. Reserved info keys are rejected
    /// when the registry is built.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self.rebuild_info();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn profile(&self) -> &PeripheralProfile {
        &self.profile
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    /// The key-value view: extra configuration plus `DeviceName` and
    /// `DeviceType`.
    pub fn info(&self) -> &Map<String, Value> {
        &self.info
    }

    pub(crate) fn reserved_extra_key(&self) -> Option<&str> {
        [INFO_DEVICE_NAME, INFO_DEVICE_TYPE]
            .into_iter()
            .find(|key| self.extra.contains_key(*key))
    }

    fn rebuild_info(&mut self) {
        let mut info = self.extra.clone();
        info.insert(
            INFO_DEVICE_NAME.to_string(),
            Value::String(self.display_name.clone()),
        );
        info.insert(
            INFO_DEVICE_TYPE.to_string(),
            Value::String(self.profile.as_str().to_string()),
        );
        self.info = info;
    }
}
