//! Restore pipeline.
//!
//! A restore picks a stored record and a storage snapshot, clones the
//! snapshot, exposes the clone as a share, checks that the clone holds the
//! machine's files, and builds a new machine wired to them. Storage resources
//! are never removed automatically; [`cleanup`] does that on request.

pub mod cleanup;
pub mod orchestrator;
pub mod selector;

pub use cleanup::{cleanup, locate_orphan, CleanupReport, CleanupStep};
pub use orchestrator::{
    CloneHandle, RestoreOrchestrator, RestoreOutcome, RestoreRequest, RestoreSession, Stage,
};
pub use selector::{checked_index, Choice, FixedSelector, SelectionItem, Selector};
