//! Central registry for operator-facing message templates.
//!
//! - `capture` - configuration capture pipeline
//! - `restore` - restore pipeline, record listing and cleanup
//! - `common` - shared messages
//!
//! ```rust
//! use hvr_messages::MESSAGES;
//!
//! let line = MESSAGES.capture.summary;
//! let other = MESSAGES.restore.cleanup_prompt;
//! ```

mod capture;
mod common;
mod restore;

pub use capture::{CaptureMessages, CAPTURE_MESSAGES};
pub use common::{CommonMessages, COMMON_MESSAGES};
pub use restore::{RestoreMessages, RESTORE_MESSAGES};

pub struct Messages {
    pub capture: CaptureMessages,
    pub restore: RestoreMessages,
    pub common: CommonMessages,
}

pub const MESSAGES: Messages = Messages {
    capture: CAPTURE_MESSAGES,
    restore: RESTORE_MESSAGES,
    common: COMMON_MESSAGES,
};
