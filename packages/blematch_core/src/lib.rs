// blematch - supported BLE peripheral recognition

pub mod catalog;
pub mod ffi;
pub mod matcher;
pub mod record;
pub mod uuid16;

pub use catalog::{
    CatalogError, Criterion, NamePattern, PeripheralDescriptor, PeripheralProfile,
    PeripheralSignature, Registry,
};
pub use matcher::{MatchDecision, Matcher};
pub use record::{DiscoveredPeripheralRecord, RecordError};
