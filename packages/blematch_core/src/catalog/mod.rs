//! Supported peripheral catalog
//!
//! The catalog maps identification signatures (name patterns, advertised
//! services, manufacturer data prefixes) onto the descriptor of the device
//! model they identify. It is validated once when the `Registry` is built
//! and is read-only afterwards.

pub mod descriptor;
pub mod file;
pub mod registry;
pub mod signature;

pub use descriptor::{profiles, PeripheralDescriptor, PeripheralProfile};
pub use file::{CatalogFile, PeripheralSpec, SignatureSpec};
pub use registry::{Registry, RegistryBuilder};
pub use signature::{Criterion, CriterionKind, NamePattern, PeripheralSignature};

use thiserror::Error;

/// Catalog configuration errors. These surface when a registry is built,
/// never while matching.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Catalog parse error: {0}")]
    Parse(String),

    #[error("Catalog IO error: {0}")]
    Io(String),

    #[error("Signature for {model} specifies no criteria")]
    EmptySignature { model: String },

    #[error("Signature specifies more than one {kind} criterion")]
    DuplicateCriterion { kind: CriterionKind },

    #[error("Service criterion lists no identifiers")]
    EmptyServices,

    #[error("Manufacturer data criterion has an empty prefix")]
    EmptyManufacturerData,

    #[error("Name pattern is empty")]
    EmptyNamePattern,

    #[error("Invalid name pattern {pattern:?}: {reason}")]
    InvalidNamePattern { pattern: String, reason: String },

    #[error("Invalid service UUID {0:?}")]
    InvalidServiceUuid(String),

    #[error("Invalid manufacturer data {0:?}")]
    InvalidManufacturerData(String),

    #[error("Model {0} is defined more than once")]
    DuplicateModel(String),

    #[error("Model {0} has no signatures")]
    NoSignatures(String),

    #[error("Signature {signature} is claimed by both {first} and {second}")]
    ConflictingSignature {
        signature: String,
        first: String,
        second: String,
    },

    #[error("Model {model} redefines reserved info key {key}")]
    ReservedInfoKey { model: String, key: String },
}
