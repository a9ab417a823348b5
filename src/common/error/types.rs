//! Error type definitions.
use crate::ooxml::validate::ValidationReport;
use crate::ooxml::xml::XmlParseError;
use thiserror::Error;

/// Main error type for longan operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid source directory, or a part that does not exist
    #[error("Input error: {0}")]
    Input(String),

    /// Output path carries an unsupported container extension
    #[error("Format error: {0}")]
    Format(String),

    /// Malformed XML in a specific part
    #[error("Parse error in {path}: {source}")]
    Parse {
        /// Member name of the offending part
        path: String,
        #[source]
        source: XmlParseError,
    },

    /// One or more requested validation checks failed
    #[error("Validation failed: {}", .0.failed_checks().join(", "))]
    Validation(Box<ValidationReport>),

    /// Relationship target that does not resolve to a part
    #[error("Broken reference {r_id} -> {target}")]
    Reference { r_id: String, target: String },

    /// Invalid pipeline configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP archive error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal error
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for longan operations.
pub type Result<T> = std::result::Result<T, Error>;
