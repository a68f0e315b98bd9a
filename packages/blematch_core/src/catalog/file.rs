//! Catalog file format
//!
//! The catalog ships as JSON embedded in the build. The same format can be
//! loaded from disk for tooling and tests:
//!
//! ```json
//! {
//!   "peripherals": [
//!     {
//!       "model": "UA_651",
//!       "display": "A&D UA-651",
//!       "profile": "bloodpressure",
//!       "signatures": [{ "name": { "contains": "UA-651" } }],
//!       "extra": { "hrsTabOnly": false }
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::descriptor::{PeripheralDescriptor, PeripheralProfile};
use super::registry::Registry;
use super::signature::{Criterion, NamePattern, PeripheralSignature};
use super::CatalogError;
use crate::uuid16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub peripherals: Vec<PeripheralSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeripheralSpec {
    pub model: String,
    pub display: String,
    pub profile: String,
    pub signatures: Vec<SignatureSpec>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Unset fields are "don't care".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<NamePatternSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
    /// Hex-encoded byte prefix, company identifier first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer_data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePatternSpec {
    Exact(String),
    Prefix(String),
    Contains(String),
    /// Whole-name regex; `/pattern/i` for case-insensitive.
    Regex(String),
}

impl CatalogFile {
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, CatalogError> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::Parse(e.to_string()))
    }

    pub fn into_registry(self) -> Result<Registry, CatalogError> {
        let mut builder = Registry::builder();
        for spec in self.peripherals {
            let (descriptor, signatures) = spec.into_parts()?;
            builder = builder.add(descriptor, signatures);
        }
        builder.build()
    }
}

impl PeripheralSpec {
    fn into_parts(self) -> Result<(PeripheralDescriptor, Vec<PeripheralSignature>), CatalogError> {
        let signatures = self
            .signatures
            .iter()
            .map(|s| {
                s.to_signature().map_err(|e| match e {
                    CatalogError::EmptySignature { .. } => CatalogError::EmptySignature {
                        model: self.model.clone(),
                    },
                    other => other,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let descriptor = self.extra.into_iter().fold(
            PeripheralDescriptor::new(
                self.model,
                self.display,
                PeripheralProfile::new(self.profile),
            ),
            |d, (key, value)| d.with_extra(key, value),
        );
        Ok((descriptor, signatures))
    }
}

impl SignatureSpec {
    pub fn to_signature(&self) -> Result<PeripheralSignature, CatalogError> {
        let mut criteria = Vec::new();

        if let Some(name) = &self.name {
            criteria.push(Criterion::Name(name.to_pattern()?));
        }
        if let Some(services) = &self.services {
            let uuids = services
                .iter()
                .map(|s| uuid16::parse(s).ok_or_else(|| CatalogError::InvalidServiceUuid(s.clone())))
                .collect::<Result<Vec<_>, _>>()?;
            criteria.push(Criterion::Services(uuids));
        }
        if let Some(data) = &self.manufacturer_data {
            let bytes = hex::decode(data.trim())
                .map_err(|_| CatalogError::InvalidManufacturerData(data.clone()))?;
            criteria.push(Criterion::ManufacturerData(bytes));
        }

        PeripheralSignature::new(criteria)
    }
}

impl NamePatternSpec {
    fn to_pattern(&self) -> Result<NamePattern, CatalogError> {
        Ok(match self {
            Self::Exact(s) => NamePattern::Exact(s.clone()),
            Self::Prefix(s) => NamePattern::Prefix(s.clone()),
            Self::Contains(s) => NamePattern::Contains(s.clone()),
            Self::Regex(s) => NamePattern::parse_regex(s)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEART_RATE_CATALOG: &str = r#"{
        "peripherals": [
            {
                "model": "HR-100",
                "display": "Heart Rate Strap",
                "profile": "heart_rate_v1",
                "signatures": [{ "services": ["180D"] }],
                "extra": { "hrsTabOnly": true }
            }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let registry = Registry::from_json(HEART_RATE_CATALOG).unwrap();
        let hr = registry.descriptor("HR-100").unwrap();
        assert_eq!(hr.profile().as_str(), "heart_rate_v1");
        assert_eq!(hr.info()["hrsTabOnly"], Value::Bool(true));

        let (signature, _) = registry.all_signatures().next().unwrap();
        assert_eq!(
            signature.criteria(),
            &[Criterion::Services(vec![uuid16::from_u16(0x180D)])]
        );
    }

    #[test]
    fn test_empty_signature_names_model() {
        let err = Registry::from_json(
            r#"{"peripherals":[{"model":"M","display":"M","profile":"weight","signatures":[{}]}]}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            CatalogError::EmptySignature {
                model: "M".to_string()
            }
        );
    }

    #[test]
    fn test_bad_values_rejected() {
        let bad_uuid = r#"{"peripherals":[{"model":"M","display":"M","profile":"weight",
            "signatures":[{"services":["not-a-uuid"]}]}]}"#;
        assert_eq!(
            Registry::from_json(bad_uuid).unwrap_err(),
            CatalogError::InvalidServiceUuid("not-a-uuid".to_string())
        );

        let bad_hex = r#"{"peripherals":[{"model":"M","display":"M","profile":"weight",
            "signatures":[{"manufacturer_data":"4c0"}]}]}"#;
        assert_eq!(
            Registry::from_json(bad_hex).unwrap_err(),
            CatalogError::InvalidManufacturerData("4c0".to_string())
        );

        let unknown_field = r#"{"peripherals":[{"model":"M","display":"M","profile":"weight",
            "signatures":[{"rssi":-40}]}]}"#;
        assert!(matches!(
            Registry::from_json(unknown_field).unwrap_err(),
            CatalogError::Parse(_)
        ));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(HEART_RATE_CATALOG.as_bytes()).unwrap();

        let catalog = CatalogFile::load(file.path()).unwrap();
        assert_eq!(catalog.peripherals.len(), 1);

        let reparsed = CatalogFile::from_json(&catalog.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reparsed, catalog);

        assert!(matches!(
            CatalogFile::load(file.path().with_extension("missing")),
            Err(CatalogError::Io(_))
        ));
    }
}
