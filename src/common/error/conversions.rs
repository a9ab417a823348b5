//! Error conversion implementations and constructors.
//!
//! Conversions that need context (the part path of a parse failure) are
//! constructors rather than `From` impls.

use super::types::Error;
use crate::ooxml::validate::ValidationReport;
use crate::ooxml::xml::XmlParseError;

impl Error {
    /// Attach a part path to an XML parse failure.
    pub fn parse(path: impl Into<String>, source: XmlParseError) -> Self {
        Error::Parse {
            path: path.into(),
            source,
        }
    }

    /// Wrap a failed validation report.
    pub fn validation(report: ValidationReport) -> Self {
        Error::Validation(Box::new(report))
    }

    /// The validation report carried by [`Error::Validation`], if any.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Error::Validation(report) => Some(report),
            _ => None,
        }
    }
}
