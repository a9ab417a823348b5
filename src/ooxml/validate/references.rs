//! Relationship-graph consistency.

use super::{Check, ValidationResult};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::rel::Relationships;

/// Every internal relationship target must name a part of the container.
///
/// Targets are resolved against the directory of the part a `.rels` file
/// describes (the parent of its `_rels` directory). External targets are
/// skipped. Malformed `.rels` parts are left to the `xml` check.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferencesCheck;

impl Check for ReferencesCheck {
    fn name(&self) -> &str {
        "references"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let mut messages = Vec::new();

        for part in container.parts().iter().filter(|part| part.is_rels()) {
            let Some(source) = part.uri().rels_source() else {
                continue;
            };
            let Ok(rels) = Relationships::from_xml(part.data(), source.base_uri()) else {
                continue;
            };

            for rel in rels.iter().filter(|rel| !rel.is_external()) {
                let found = rel
                    .target_partname()
                    .is_ok_and(|target| container.contains(&target));
                if !found {
                    messages.push(format!("{}: {}", part.membername(), rel.reference_error()));
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

    fn rels(body: &str) -> String {
        format!(
            r#"<?xml version="1.0"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{body}</Relationships>"#
        )
    }

    #[test]
    fn test_valid_references() {
        let rels = rels(r#"<Relationship Id="rId1" Type="http://test" Target="word/document.xml"/>"#);
        let c = container(&[("_rels/.rels", rels.as_str()), ("word/document.xml", "<root/>")]);
        assert!(ReferencesCheck.run(&c).passed());
    }

    #[test]
    fn test_broken_reference() {
        let rels = rels(r#"<Relationship Id="rId1" Type="http://test" Target="word/missing.xml"/>"#);
        let c = container(&[("_rels/.rels", rels.as_str())]);
        let result = ReferencesCheck.run(&c);
        assert!(!result.passed());
        assert_eq!(
            result.messages(),
            ["_rels/.rels: Broken reference rId1 -> word/missing.xml"]
        );
    }

    #[test]
    fn test_external_urls_skipped() {
        let rels = rels(
            r#"<Relationship Id="rId1" Type="http://test" Target="http://example.com"/>
    <Relationship Id="rId2" Type="http://test" Target="mailto:test@example.com"/>
    <Relationship Id="rId3" Type="http://test" Target="../outside.docx" TargetMode="External"/>"#,
        );
        let c = container(&[("_rels/.rels", rels.as_str())]);
        assert!(ReferencesCheck.run(&c).passed());
    }

    #[test]
    fn test_resolves_against_described_part() {
        let rels = rels(
            r#"<Relationship Id="rId1" Type="t" Target="styles.xml"/>
    <Relationship Id="rId2" Type="t" Target="../customXml/item1.xml"/>
    <Relationship Id="rId3" Type="t" Target="/word/media/image1.png"/>
    <Relationship Id="rId4" Type="t" Target="media/image2.png"/>"#,
        );
        let c = container(&[
            ("word/_rels/document.xml.rels", rels.as_str()),
            ("word/document.xml", "<root/>"),
            ("word/styles.xml", "<root/>"),
            ("customXml/item1.xml", "<root/>"),
            ("word/media/image1.png", "png"),
        ]);
        let result = ReferencesCheck.run(&c);
        assert_eq!(
            result.messages(),
            ["word/_rels/document.xml.rels: Broken reference rId4 -> media/image2.png"]
        );
    }

    #[test]
    fn test_target_above_root_is_broken() {
        let rels = rels(r#"<Relationship Id="rId1" Type="t" Target="../../word/styles.xml"/>"#);
        let c = container(&[
            ("word/_rels/document.xml.rels", rels.as_str()),
            ("word/document.xml", "<root/>"),
            ("word/styles.xml", "<root/>"),
        ]);
        let result = ReferencesCheck.run(&c);
        assert!(!result.passed());
        assert_eq!(
            result.messages(),
            ["word/_rels/document.xml.rels: Broken reference rId1 -> ../../word/styles.xml"]
        );
    }
}
