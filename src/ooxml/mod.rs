//! Office Open XML (OOXML) container handling.
//!
//! This module works on unpacked Office Open XML containers (Word .docx,
//! PowerPoint .pptx, Excel .xlsx): the directory tree that results from
//! unzipping one.
//!
//! # Architecture
//!
//! The module is organized into several layers:
//!
//! 1. **XML Layer** (`xml`): arena document model and whitespace condenser
//! 2. **OPC Layer** (`opc`): part tree, part names, relationships
//! 3. **Format-Specific Modules**:
//!    - `docx`: tracked-change resolution for Word documents
//! 4. **Container Operations**:
//!    - `validate`: structural checks over a part tree
//!    - `pack`: deterministic archive writer and extractor
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ooxml::opc::Container;
//! use longan::ooxml::pack::{PackOptions, pack_container};
//! use longan::ooxml::validate::ValidationSuite;
//!
//! let mut container = Container::open("unpacked")?;
//! container.sanitize_part("word/document.xml", "Editor")?;
//!
//! let report = ValidationSuite::standard().run(&container);
//! println!("{}", report);
//!
//! pack_container(&container, "out.docx", &PackOptions::default())?;
//! # Ok::<(), longan::Error>(())
//! ```
pub mod docx;
pub mod opc;
pub mod pack;
pub mod validate;
pub mod xml;

// Re-export commonly used types from OPC layer
pub use opc::{Container, PackURI, Part};
