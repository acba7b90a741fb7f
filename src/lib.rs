//! Orbit Swiftgen
//!
//! Swift binding generation from Kotlin/Native klib metadata:
//!
//! - **Metadata reading**: Decode a compiled library's module header and
//!   per-package metadata parts into a declaration model
//! - **Pattern recognition**: Find container host classes and extract their
//!   state/side-effect types and public functions
//! - **Code emission**: Render deterministic Swift sources from bundled
//!   templates, one file per matched class plus one fixed publisher bridge
//!
//! See [`pipeline::Pipeline`] for the entry point driving a full run.

pub mod klib;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod processor;
pub mod render;
pub mod wire;

// Re-export main types
pub use metadata::{read_library, ReadError};
pub use model::Module;
pub use pipeline::{Pipeline, RunSummary};
