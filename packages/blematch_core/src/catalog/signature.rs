//! Identification signatures
//!
//! A signature is a conjunction of criteria. The criterion kinds form a
//! closed set, so they are variants of one enum rather than trait objects.
//! A kind the signature leaves unset is "don't care".

use std::fmt;

use regex::{Regex, RegexBuilder};
use uuid::Uuid;

use super::CatalogError;
use crate::record::DiscoveredPeripheralRecord;
use crate::uuid16;

/// How an advertised local name is compared.
#[derive(Debug, Clone)]
pub enum NamePattern {
    Exact(String),
    Prefix(String),
    Contains(String),
    /// Whole-name regular expression, compiled when the signature is built.
    Regex {
        source: String,
        case_insensitive: bool,
        compiled: Regex,
    },
}

impl NamePattern {
    /// Compile a regex name pattern. The pattern must match the whole name.
    pub fn regex(source: &str, case_insensitive: bool) -> Result<Self, CatalogError> {
        let compiled = RegexBuilder::new(&format!("^(?:{source})$"))
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|e| CatalogError::InvalidNamePattern {
                pattern: source.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::Regex {
            source: source.to_string(),
            case_insensitive,
            compiled,
        })
    }

    /// Parse the catalog regex form. `/pattern/i` selects case-insensitive
    /// matching; anything else is taken verbatim.
    pub fn parse_regex(text: &str) -> Result<Self, CatalogError> {
        match text
            .strip_prefix('/')
            .and_then(|rest| rest.strip_suffix("/i"))
        {
            Some(inner) => Self::regex(inner, true),
            None => Self::regex(text, false),
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Self::Exact(s) => name == s,
            Self::Prefix(s) => name.starts_with(s.as_str()),
            Self::Contains(s) => name.contains(s.as_str()),
            Self::Regex { compiled, .. } => compiled.is_match(name),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Exact(s) | Self::Prefix(s) | Self::Contains(s) => s.is_empty(),
            Self::Regex { source, .. } => source.is_empty(),
        }
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b))
            | (Self::Prefix(a), Self::Prefix(b))
            | (Self::Contains(a), Self::Contains(b)) => a == b,
            (
                Self::Regex {
                    source: a,
                    case_insensitive: ai,
                    ..
                },
                Self::Regex {
                    source: b,
                    case_insensitive: bi,
                    ..
                },
            ) => a == b && ai == bi,
            _ => false,
        }
    }
}

impl Eq for NamePattern {}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "name == {s:?}"),
            Self::Prefix(s) => write!(f, "name ^= {s:?}"),
            Self::Contains(s) => write!(f, "name *= {s:?}"),
            Self::Regex {
                source,
                case_insensitive: true,
                ..
            } => write!(f, "name ~ /{source}/i"),
            Self::Regex { source, .. } => write!(f, "name ~ /{source}/"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CriterionKind {
    Name,
    Services,
    ManufacturerData,
}

impl fmt::Display for CriterionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name",
            Self::Services => "services",
            Self::ManufacturerData => "manufacturer data",
        })
    }
}

/// One matching criterion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    Name(NamePattern),
    /// Satisfied when the record advertises at least one of these.
    Services(Vec<Uuid>),
    /// Satisfied when the record's manufacturer data starts with these bytes.
    ManufacturerData(Vec<u8>),
}

impl Criterion {
    pub fn kind(&self) -> CriterionKind {
        match self {
            Self::Name(_) => CriterionKind::Name,
            Self::Services(_) => CriterionKind::Services,
            Self::ManufacturerData(_) => CriterionKind::ManufacturerData,
        }
    }

    /// Missing record fields make a criterion unsatisfiable, never an error.
    pub fn is_satisfied_by(&self, record: &DiscoveredPeripheralRecord) -> bool {
        match self {
            Self::Name(pattern) => record.name().is_some_and(|n| pattern.is_match(n)),
            Self::Services(required) => required.iter().any(|u| record.advertises(u)),
            Self::ManufacturerData(prefix) => record
                .manufacturer_data()
                .is_some_and(|data| data.starts_with(prefix)),
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(pattern) => fmt::Display::fmt(pattern, f),
            Self::Services(uuids) => {
                let list: Vec<String> = uuids.iter().map(uuid16::to_display_string).collect();
                write!(f, "services any [{}]", list.join(", "))
            }
            Self::ManufacturerData(prefix) => write!(f, "mfr ^= {}", hex::encode(prefix)),
        }
    }
}

/// The identifying shape of a supported device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralSignature {
    // Sorted by kind, at most one per kind.
    criteria: Vec<Criterion>,
}

impl PeripheralSignature {
    /// Validate and normalise a set of criteria.
    ///
    /// `EmptySignature` is reported with an empty model name; the registry
    /// builder fills it in.
    pub fn new(criteria: Vec<Criterion>) -> Result<Self, CatalogError> {
        if criteria.is_empty() {
            return Err(CatalogError::EmptySignature {
                model: String::new(),
            });
        }

        let mut criteria = criteria;
        for criterion in criteria.iter_mut() {
            match criterion {
                Criterion::Name(pattern) if pattern.is_empty() => {
                    return Err(CatalogError::EmptyNamePattern)
                }
                Criterion::Services(uuids) => {
                    if uuids.is_empty() {
                        return Err(CatalogError::EmptyServices);
                    }
                    uuids.sort();
                    uuids.dedup();
                }
                Criterion::ManufacturerData(prefix) if prefix.is_empty() => {
                    return Err(CatalogError::EmptyManufacturerData)
                }
                _ => {}
            }
        }

        criteria.sort_by_key(Criterion::kind);
        if let Some(pair) = criteria.windows(2).find(|w| w[0].kind() == w[1].kind()) {
            return Err(CatalogError::DuplicateCriterion {
                kind: pair[0].kind(),
            });
        }

        Ok(Self { criteria })
    }

    pub fn name(pattern: NamePattern) -> Result<Self, CatalogError> {
        Self::new(vec![Criterion::Name(pattern)])
    }

    pub fn services(uuids: impl IntoIterator<Item = Uuid>) -> Result<Self, CatalogError> {
        Self::new(vec![Criterion::Services(uuids.into_iter().collect())])
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Number of criteria this signature specifies.
    pub fn specificity(&self) -> usize {
        self.criteria.len()
    }

    /// Every specified criterion must hold.
    pub fn matches(&self, record: &DiscoveredPeripheralRecord) -> bool {
        self.criteria.iter().all(|c| c.is_satisfied_by(record))
    }
}

impl fmt::Display for PeripheralSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                f.write_str(" && ")?;
            }
            write!(f, "{criterion}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hr() -> Uuid {
        uuid16::from_u16(0x180D)
    }

    #[test]
    fn test_contains_pattern_requires_name() {
        let sig = PeripheralSignature::name(NamePattern::Contains("UA-651".into())).unwrap();
        let named = DiscoveredPeripheralRecord::new().with_name("A&D_UA-651BLE_B5583A");
        let unnamed = DiscoveredPeripheralRecord::new().with_service(hr());
        let empty_name = DiscoveredPeripheralRecord::new().with_name("");

        assert!(sig.matches(&named));
        assert!(!sig.matches(&unnamed));
        assert!(!sig.matches(&empty_name));
    }

    #[test]
    fn test_regex_is_anchored() {
        let exact = NamePattern::regex("TNG", false).unwrap();
        assert!(exact.is_match("TNG"));
        assert!(!exact.is_match("TNG SCALE"));
        assert!(!exact.is_match("xTNG"));

        let prefix = NamePattern::parse_regex("(^Nonin3230.*$).*").unwrap();
        assert!(prefix.is_match("Nonin3230_502880"));
        assert!(!prefix.is_match("My Nonin3230"));
    }

    #[test]
    fn test_case_insensitive_regex_literal() {
        let pattern = NamePattern::parse_regex("/.*bp100.*/i").unwrap();
        assert!(pattern.is_match("Welch BP100"));
        assert_eq!(pattern.to_string(), "name ~ /.*bp100.*/i");

        let sensitive = NamePattern::parse_regex(".*bp100.*").unwrap();
        assert!(!sensitive.is_match("Welch BP100"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = NamePattern::regex("(unclosed", false).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidNamePattern { .. }));
    }

    #[test]
    fn test_services_any_of() {
        let sig = PeripheralSignature::services([hr(), uuid16::from_u16(0x1810)]).unwrap();
        let bp_only = DiscoveredPeripheralRecord::new().with_service(uuid16::from_u16(0x1810));
        let battery = DiscoveredPeripheralRecord::new().with_service(uuid16::from_u16(0x180F));

        assert!(sig.matches(&bp_only));
        assert!(!sig.matches(&battery));
        assert!(!sig.matches(&DiscoveredPeripheralRecord::new()));
    }

    #[test]
    fn test_manufacturer_prefix_not_substring() {
        let sig =
            PeripheralSignature::new(vec![Criterion::ManufacturerData(vec![0x4C, 0x00, 0x07])])
                .unwrap();

        let record = |bytes: &[u8]| DiscoveredPeripheralRecord::new().with_manufacturer_data(bytes);

        assert!(sig.matches(&record(&[0x4C, 0x00, 0x07, 0x19])));
        assert!(!sig.matches(&record(&[0x01, 0x4C, 0x00, 0x07])));
        assert!(!sig.matches(&record(&[0x4C, 0x00])));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            PeripheralSignature::new(vec![]),
            Err(CatalogError::EmptySignature { .. })
        ));
        assert_eq!(
            PeripheralSignature::services(Vec::new()),
            Err(CatalogError::EmptyServices)
        );
        assert_eq!(
            PeripheralSignature::new(vec![Criterion::ManufacturerData(vec![])]),
            Err(CatalogError::EmptyManufacturerData)
        );
        assert_eq!(
            PeripheralSignature::name(NamePattern::Prefix(String::new())),
            Err(CatalogError::EmptyNamePattern)
        );
        assert_eq!(
            PeripheralSignature::new(vec![
                Criterion::Name(NamePattern::Exact("a".into())),
                Criterion::Services(vec![hr()]),
                Criterion::Name(NamePattern::Exact("b".into())),
            ]),
            Err(CatalogError::DuplicateCriterion {
                kind: CriterionKind::Name
            })
        );
    }

    #[test]
    fn test_normalised_equality_and_specificity() {
        let a = PeripheralSignature::new(vec![
            Criterion::Services(vec![uuid16::from_u16(0x1810), hr()]),
            Criterion::Name(NamePattern::Prefix("HR".into())),
        ])
        .unwrap();
        let b = PeripheralSignature::new(vec![
            Criterion::Name(NamePattern::Prefix("HR".into())),
            Criterion::Services(vec![hr(), uuid16::from_u16(0x1810), hr()]),
        ])
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.specificity(), 2);
        assert_eq!(a.to_string(), "name ^= \"HR\" && services any [180d, 1810]");
    }
}
