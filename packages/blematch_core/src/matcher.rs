//! Peripheral matcher
//!
//! One decision function, `Matcher::decide`, and two thin views over it.
//! The most specific candidate wins; a tie between different models at the
//! top specificity is treated as no match, since a wrong device profile is
//! worse than asking the user to pick.

use serde_json::{Map, Value};

use crate::catalog::{PeripheralDescriptor, Registry};
use crate::record::DiscoveredPeripheralRecord;

/// Outcome of matching one record against the registry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchDecision<'r> {
    Matched {
        descriptor: &'r PeripheralDescriptor,
        specificity: usize,
    },
    /// No signature was satisfied. The normal case for unrelated traffic.
    NoCandidate,
    /// Several models tied at the highest specificity.
    Ambiguous {
        specificity: usize,
        /// Distinct models in the tie.
        models: usize,
    },
}

impl<'r> MatchDecision<'r> {
    pub fn descriptor(&self) -> Option<&'r PeripheralDescriptor> {
        match self {
            Self::Matched { descriptor, .. } => Some(*descriptor),
            _ => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// Stateless classifier over an injected registry.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'r> {
    registry: &'r Registry,
}

impl<'r> Matcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Classify a record. Linear in catalog size, no allocation.
    pub fn decide(&self, record: &DiscoveredPeripheralRecord) -> MatchDecision<'r> {
        // (specificity, first descriptor index at that specificity)
        let mut best: Option<(usize, usize)> = None;
        let mut last_descriptor = 0usize;
        let mut models = 0usize;

        // Registry entries are grouped by descriptor, so counting changes of
        // descriptor index counts distinct models.
        for entry in self.registry.entries() {
            if !entry.signature.matches(record) {
                continue;
            }
            let specificity = entry.signature.specificity();
            match best {
                Some((top, _)) if specificity < top => {}
                Some((top, _)) if specificity == top => {
                    if entry.descriptor != last_descriptor {
                        models += 1;
                        last_descriptor = entry.descriptor;
                    }
                }
                _ => {
                    best = Some((specificity, entry.descriptor));
                    last_descriptor = entry.descriptor;
                    models = 1;
                }
            }
        }

        match best {
            None => MatchDecision::NoCandidate,
            Some((specificity, _)) if models > 1 => {
                log::debug!(
                    "Ambiguous peripheral {:?}: {} models tied at specificity {}",
                    record.name(),
                    models,
                    specificity
                );
                MatchDecision::Ambiguous {
                    specificity,
                    models,
                }
            }
            Some((specificity, index)) => {
                let descriptor = self.registry.descriptor_at(index);
                log::debug!(
                    "Found supported peripheral {:?} matching {}",
                    record.name(),
                    descriptor.display_name()
                );
                MatchDecision::Matched {
                    descriptor,
                    specificity,
                }
            }
        }
    }

    /// The matched descriptor, if exactly one model is the best candidate.
    pub fn match_record(
        &self,
        record: &DiscoveredPeripheralRecord,
    ) -> Option<&'r PeripheralDescriptor> {
        self.decide(record).descriptor()
    }

    /// Same decision as `match_record`, returning the descriptor's info map.
    pub fn match_info(&self, record: &DiscoveredPeripheralRecord) -> Option<&'r Map<String, Value>> {
        self.match_record(record).map(PeripheralDescriptor::info)
    }
}
