//! Configuration records and the append-only store that holds them.
//!
//! A record captures what a machine looked like (compute, memory, network and
//! disk topology) at one point in time. Records are written by the capture
//! pipeline and only ever read by restore.

pub mod document;
pub mod record;
pub mod store;

pub use document::{RecordDocument, DOCUMENT_VERSION};
pub use record::{
    ConfigurationRecord, ControllerAddress, ControllerKind, DiskSpec, MemoryPolicy,
    NetworkAdapterSpec, VlanPolicy,
};
pub use store::{validate_entity_name, MetadataStore, PruneReport, RecordEntry};
