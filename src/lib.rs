//! Longan - Sanitize, validate and repack unpacked Office Open XML containers
//!
//! This library makes raw XML-level edits to `.docx`, `.pptx` and `.xlsx`
//! files safe to ship. An editor unzips a container, rewrites its XML parts
//! directly, and hands the directory back; longan then:
//!
//! - **Sanitizes**: resolves the tracked changes (`w:ins`/`w:del`) a given
//!   author left behind, keeping everyone else's revisions
//! - **Validates**: checks well-formedness, `mc:Ignorable` prefixes, identifier
//!   uniqueness and relationship targets over the whole part tree
//! - **Packs**: writes a deterministic archive, condensing insignificant
//!   whitespace while keeping run text exactly as written
//!
//! # Example - Pack with validation
//!
//! ```no_run
//! use longan::ooxml::pack::pack;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! match pack("unpacked", "document.docx", true) {
//!     Ok(summary) => println!("wrote {} entries", summary.entries),
//!     Err(longan::Error::Validation(report)) => eprint!("{}", report),
//!     Err(e) => return Err(e.into()),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Full pipeline from YAML
//!
//! ```no_run
//! use longan::{Pipeline, PipelineConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::from_yaml_str("author: Editor\nvalidate: true\n")?;
//! let outcome = Pipeline::new(config)?.run("unpacked", "document.docx")?;
//! for (part, summary) in &outcome.sanitized {
//!     println!(
//!         "{}: {} insertion(s) removed, {} deletion(s) restored",
//!         part, summary.insertions_removed, summary.deletions_restored
//!     );
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Logging
//!
//! Diagnostics go through the `log` facade; install any logger to see them.

/// Common types shared across the crate
pub mod common;

/// Office Open XML containers
pub mod ooxml;

/// Sanitize → validate → pack
pub mod pipeline;

pub use common::{Error, Result};
pub use ooxml::opc::Container;
pub use ooxml::pack::{PackOptions, PackSummary, pack, pack_container, unpack};
pub use ooxml::validate::{ValidationReport, ValidationResult, ValidationSuite};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutcome};
