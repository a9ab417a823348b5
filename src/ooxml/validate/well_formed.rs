//! Well-formedness of every XML part.

use super::{Check, ValidationResult};
use crate::ooxml::opc::Container;
use crate::ooxml::xml::XmlDocument;

/// Parses every XML part; one message per malformed part, naming it.
#[derive(Debug, Clone, Copy, Default)]
pub struct WellFormedCheck;

impl Check for WellFormedCheck {
    fn name(&self) -> &str {
        "xml"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let messages = container
            .xml_parts()
            .filter_map(|part| {
                XmlDocument::parse(part.data())
                    .err()
                    .map(|e| format!("{}: {}", part.membername(), e))
            })
            .collect();
        ValidationResult::from_messages(self.name(), messages)
    }
}
