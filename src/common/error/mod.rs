//! Unified error types for the longan pipeline.
//!
//! Every stage (container loading, sanitizing, validation and packing)
//! reports failures through the single [`Error`] enum so callers can tell
//! input problems, malformed parts and failed validation apart.

// Submodule declarations
pub mod conversions;
pub mod types;

// Re-exports
pub use types::{Error, Result};
