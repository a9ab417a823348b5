//! Open Packaging Conventions (OPC) support for unpacked containers.
//!
//! - Part tree loaded from a directory (`container`)
//! - Part names and relative reference resolution (`packuri`)
//! - Relationship parsing (`rel`)
//! - Well-known namespaces and part names (`constants`)

pub mod constants;
pub mod container;
pub mod packuri;
pub mod rel;

// Re-export commonly used types
pub use container::{Container, Part, PartKind};
pub use packuri::PackURI;
pub use rel::{Relationship, Relationships};
