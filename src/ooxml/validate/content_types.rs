//! Content-type coverage.

use super::{Check, ValidationResult};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::{namespace::OPC_CONTENT_TYPES, part_name};
use std::collections::HashSet;

/// Every part must have a content type, either from a `Default` for its
/// extension or from an `Override` for its name.
///
/// Extensions and part names compare case-insensitively.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypesCheck;

impl Check for ContentTypesCheck {
    fn name(&self) -> &str {
        "content_types"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let Some(types_part) = container.get(part_name::CONTENT_TYPES) else {
            return ValidationResult::from_messages(
                self.name(),
                vec![format!("{} is missing", part_name::CONTENT_TYPES)],
            );
        };
        let Ok(doc) = types_part.parse_xml() else {
            // Reported by the xml check
            return ValidationResult::from_messages(self.name(), Vec::new());
        };

        let mut defaults = HashSet::new();
        let mut overrides = HashSet::new();
        for (id, el) in doc.elements() {
            if doc.is_element(id, OPC_CONTENT_TYPES, "Default") {
                if let Some(ext) = el.attribute("Extension") {
                    defaults.insert(ext.to_ascii_lowercase());
                }
            } else if doc.is_element(id, OPC_CONTENT_TYPES, "Override")
                && let Some(name) = el.attribute("PartName")
            {
                overrides.insert(name.to_ascii_lowercase());
            }
        }

        let messages = container
            .parts()
            .iter()
            .filter(|part| part.membername() != part_name::CONTENT_TYPES)
            .filter(|part| {
                !overrides.contains(&part.uri().as_str().to_ascii_lowercase())
                    && !defaults.contains(&part.uri().ext().to_ascii_lowercase())
            })
            .map(|part| format!("{}: no Default or Override content type", part.membername()))
            .collect();

        ValidationResult::from_messages(self.name(), messages)
    }
}
