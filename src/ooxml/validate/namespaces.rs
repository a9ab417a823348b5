//! Scoping of prefixes listed in `mc:Ignorable`.
//!
//! Markup compatibility lets a producer mark namespaces a consumer may ignore,
//! but only by prefix; a prefix that is not bound where it is listed makes
//! the part unreadable for strict consumers.

use super::{Check, ValidationResult, parsed_xml_parts};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::namespace::MARKUP_COMPATIBILITY;

/// Every prefix in an `mc:Ignorable` list must be declared on that element or
/// one of its ancestors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NamespacesCheck;

impl Check for NamespacesCheck {
    fn name(&self) -> &str {
        "namespaces"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let mut messages = Vec::new();
        for (part, doc) in parsed_xml_parts(container) {
            for (id, _) in doc.elements() {
                let Some(ignorable) = doc.attribute_ns(id, MARKUP_COMPATIBILITY, "Ignorable") else {
                    continue;
                };
                for prefix in ignorable.split_ascii_whitespace() {
                    if doc.lookup_namespace(id, Some(prefix)).is_none() {
                        messages.push(format!(
                            "{}: namespace prefix '{}' listed in Ignorable is not declared",
                            part.membername(),
                            prefix
                        ));
                    }
                }
            }
        }
        ValidationResult::from_messages(self.name(), messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::validate::test_support::container;

    #[test]
    fn test_all_declared() {
        let c = container(&[(
            "test.xml",
            r#"<?xml version="1.0"?>
<root xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"
      xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml"
      mc:Ignorable="w14">
</root>"#,
        )]);
        assert!(NamespacesCheck.run(&c).passed());
    }

    #[test]
    fn test_undeclared() {
        let c = container(&[(
            "test.xml",
            r#"<?xml version="1.0"?>
<root xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"
      mc:Ignorable="w14 w15">
</root>"#,
        )]);
        let result = NamespacesCheck.run(&c);
        assert!(!result.passed());
        assert_eq!(result.messages().len(), 2);
        assert!(result.messages()[0].contains("'w14'"));
        assert!(result.messages()[1].contains("'w15'"));
    }

    #[test]
    fn test_declared_on_ancestor() {
        let c = container(&[(
            "word/document.xml",
            r#"<w:document xmlns:w="urn:w" xmlns:w14="urn:w14" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006"><w:body mc:Ignorable="w14"/></w:document>"#,
        )]);
        assert!(NamespacesCheck.run(&c).passed());
    }

    #[test]
    fn test_ignorable_outside_markup_compatibility_namespace() {
        let c = container(&[("test.xml", r#"<root xmlns:x="urn:other" x:Ignorable="w14"/>"#)]);
        assert!(NamespacesCheck.run(&c).passed());
    }
}
