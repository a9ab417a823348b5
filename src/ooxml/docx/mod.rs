//! Word (.docx) document support.
//!
//! This module operates on the main WordprocessingML part of an unpacked
//! document (`word/document.xml`):
//!
//! - `redline`: resolving one author's tracked changes and extracting
//!   paragraph text

pub mod redline;

pub use redline::{RedlineSummary, TrackedChange, extract_text, remove_tracked_changes};
