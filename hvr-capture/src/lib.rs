//! Capture pipeline: leader gate, configuration snapshotter, and the pass
//! that writes records and applies retention.

pub mod leader;
pub mod pipeline;
pub mod snapshotter;

pub use leader::{is_authoritative, LeaderDecision};
pub use pipeline::{CaptureOptions, CapturePipeline, CaptureReport};
pub use snapshotter::{CaptureOutcome, Snapshotter};
