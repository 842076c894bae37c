pub mod error;
pub mod output_macros;
pub mod paths;

pub use error::{HvrError, Result};
