//! Harvest module - concurrent comment block extraction.
//!
//! This module provides the pipeline side of the block harvester:
//! - **Options**: validation of [`InputSpec`](crate::InputSpec)s via [`Options::build`]
//! - **Pipeline**: the [`ExtractPipeline`] driver and its [`BlockStream`]
//! - **Cancellation**: cooperative stop signal via [`CancelToken`]

pub mod cancel;
pub mod options;
pub mod pipeline;

// Re-export commonly used types
pub use cancel::CancelToken;
pub use options::Options;
pub use pipeline::{extract, BlockStream, ExtractPipeline};
