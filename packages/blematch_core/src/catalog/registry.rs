//! The supported peripheral registry
//!
//! Built once, validated once, then shared read-only. Nothing here takes a
//! lock: after `build()` the registry is plain immutable data and can be read
//! concurrently from any scan callback thread.

use std::collections::HashSet;

use super::descriptor::PeripheralDescriptor;
use super::file::CatalogFile;
use super::signature::PeripheralSignature;
use super::CatalogError;

/// Embedded catalog shipped with the application build.
const BUILTIN_CATALOG: &str = include_str!("../../catalog/supported_peripherals.json");

#[derive(Debug, Clone)]
pub(crate) struct CatalogEntry {
    pub(crate) signature: PeripheralSignature,
    pub(crate) descriptor: usize,
}

/// Immutable catalog of supported peripherals.
#[derive(Debug, Clone)]
pub struct Registry {
    descriptors: Vec<PeripheralDescriptor>,
    // Grouped by descriptor, in ascending descriptor order.
    entries: Vec<CatalogEntry>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// The catalog embedded in this build.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        CatalogFile::from_json(json)?.into_registry()
    }

    pub fn from_catalog(catalog: CatalogFile) -> Result<Self, CatalogError> {
        catalog.into_registry()
    }

    /// Every (signature, descriptor) pair, in catalog order.
    pub fn all_signatures(
        &self,
    ) -> impl Iterator<Item = (&PeripheralSignature, &PeripheralDescriptor)> + '_ {
        self.entries
            .iter()
            .map(|e| (&e.signature, &self.descriptors[e.descriptor]))
    }

    pub fn descriptors(&self) -> &[PeripheralDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, model: &str) -> Option<&PeripheralDescriptor> {
        self.descriptors.iter().find(|d| d.model() == model)
    }

    pub fn models(&self) -> impl Iterator<Item = &str> + '_ {
        self.descriptors.iter().map(PeripheralDescriptor::model)
    }

    /// Number of signatures in the catalog.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub(crate) fn descriptor_at(&self, index: usize) -> &PeripheralDescriptor {
        &self.descriptors[index]
    }
}

/// Collects models and their signatures, then validates them as a whole.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    models: Vec<(PeripheralDescriptor, Vec<PeripheralSignature>)>,
}

impl RegistryBuilder {
    pub fn add(
        mut self,
        descriptor: PeripheralDescriptor,
        signatures: impl IntoIterator<Item = PeripheralSignature>,
    ) -> Self {
        self.models
            .push((descriptor, signatures.into_iter().collect()));
        self
    }

    pub fn build(self) -> Result<Registry, CatalogError> {
        let mut descriptors = Vec::with_capacity(self.models.len());
        let mut entries: Vec<CatalogEntry> = Vec::new();
        let mut seen_models = HashSet::new();

        for (descriptor, signatures) in self.models {
            let model = descriptor.model().to_string();
            if !seen_models.insert(model.clone()) {
                return Err(CatalogError::DuplicateModel(model));
            }
            if signatures.is_empty() {
                return Err(CatalogError::NoSignatures(model));
            }
            if let Some(key) = descriptor.reserved_extra_key() {
                return Err(CatalogError::ReservedInfoKey {
                    model,
                    key: key.to_string(),
                });
            }

            let index = descriptors.len();
            for signature in signatures {
                if let Some(existing) = entries.iter().find(|e| e.signature == signature) {
                    if existing.descriptor == index {
                        log::warn!("Ignoring repeated signature for {}: {}", model, signature);
                        continue;
                    }
                    let first: &PeripheralDescriptor = &descriptors[existing.descriptor];
                    return Err(CatalogError::ConflictingSignature {
                        signature: signature.to_string(),
                        first: first.model().to_string(),
                        second: model,
                    });
                }
                entries.push(CatalogEntry {
                    signature,
                    descriptor: index,
                });
            }
            descriptors.push(descriptor);
        }

        log::info!(
            "Peripheral registry built: {} models, {} signatures",
            descriptors.len(),
            entries.len()
        );

        Ok(Registry {
            descriptors,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{profiles, Criterion, NamePattern, PeripheralProfile};
    use crate::uuid16;

    fn descriptor(model: &str) -> PeripheralDescriptor {
        PeripheralDescriptor::new(model, model, PeripheralProfile::new(profiles::WEIGHT))
    }

    fn contains(text: &str) -> PeripheralSignature {
        PeripheralSignature::name(NamePattern::Contains(text.into())).unwrap()
    }

    #[test]
    fn test_builtin_catalog_builds() {
        let registry = Registry::builtin().unwrap();
        assert_eq!(registry.descriptors().len(), 19);
        assert_eq!(registry.len(), 19);

        let ua651 = registry.descriptor("UA_651").unwrap();
        assert_eq!(ua651.display_name(), "A&D UA-651");
        assert_eq!(ua651.profile().as_str(), profiles::BLOOD_PRESSURE);
    }

    #[test]
    fn test_all_signatures_is_restartable() {
        let registry = Registry::builder()
            .add(descriptor("A"), [contains("A1"), contains("A2")])
            .add(descriptor("B"), [contains("B1")])
            .build()
            .unwrap();

        let first: Vec<_> = registry
            .all_signatures()
            .map(|(s, d)| (s.to_string(), d.model().to_string()))
            .collect();
        let second: Vec<_> = registry
            .all_signatures()
            .map(|(s, d)| (s.to_string(), d.model().to_string()))
            .collect();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(first[1].1, "A");
        assert_eq!(first[2].1, "B");
        assert_eq!(registry.models().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn test_conflicting_signature_rejected() {
        let err = Registry::builder()
            .add(descriptor("A"), [contains("SCALE")])
            .add(descriptor("B"), [contains("SCALE")])
            .build()
            .unwrap_err();

        assert_eq!(
            err,
            CatalogError::ConflictingSignature {
                signature: "name *= \"SCALE\"".to_string(),
                first: "A".to_string(),
                second: "B".to_string(),
            }
        );
    }

    #[test]
    fn test_repeated_signature_same_model_is_collapsed() {
        let registry = Registry::builder()
            .add(descriptor("A"), [contains("SCALE"), contains("SCALE")])
            .build()
            .unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_model_rejected() {
        let err = Registry::builder()
            .add(descriptor("A"), [contains("X")])
            .add(descriptor("A"), [contains("Y")])
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateModel("A".to_string()));
    }

    #[test]
    fn test_model_without_signatures_rejected() {
        let err = Registry::builder()
            .add(descriptor("A"), Vec::new())
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::NoSignatures("A".to_string()));
    }

    #[test]
    fn test_reserved_info_key_rejected() {
        let err = Registry::builder()
            .add(descriptor("A").with_extra("DeviceName", "spoof"), [contains("X")])
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::ReservedInfoKey { .. }));
    }

    #[test]
    fn test_overlapping_but_distinct_signatures_allowed() {
        let hr = uuid16::from_u16(0x180D);
        let registry = Registry::builder()
            .add(descriptor("A"), [PeripheralSignature::services([hr]).unwrap()])
            .add(
                descriptor("B"),
                [PeripheralSignature::new(vec![
                    Criterion::Services(vec![hr]),
                    Criterion::Name(NamePattern::Prefix("HRM".into())),
                ])
                .unwrap()],
            )
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
    }
}
