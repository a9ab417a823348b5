//! Resolution of tracked changes (revisions) made by one author.
//!
//! An automated editor that writes its edits as tracked changes leaves two
//! kinds of markup behind: `w:ins` wrappers around inserted runs and `w:del`
//! wrappers around deleted runs, whose text lives in `w:delText` /
//! `w:delInstrText`. This module undoes those edits for a single author:
//!
//! - insertions by the author are dropped together with their content
//! - deletions by the author are unwrapped, their deleted text restored
//!
//! Changes by any other author are kept as they are.
//!
//! # Example
//!
//! ```rust
//! use longan::ooxml::docx::redline::{extract_text, remove_tracked_changes};
//! use longan::ooxml::xml::XmlDocument;
//!
//! let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
//!   <w:p><w:r><w:t>Original</w:t></w:r><w:ins w:author="Bot"><w:r><w:t> added</w:t></w:r></w:ins></w:p>
//! </w:body></w:document>"#;
//!
//! let mut doc = XmlDocument::parse(xml.as_bytes())?;
//! let summary = remove_tracked_changes(&mut doc, "Bot");
//! assert_eq!(summary.insertions_removed, 1);
//! assert_eq!(extract_text(&doc), "Original");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::ooxml::opc::constants::namespace::WML_MAIN;
use crate::ooxml::xml::{NodeId, XmlDocument};
use serde::Serialize;

/// Classification of a node with respect to tracked changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackedChange {
    /// `w:ins`: content inserted by `author`
    Insertion { author: String },
    /// `w:del`: content deleted by `author`
    Deletion { author: String },
    /// Anything else, including other revision kinds (moves, formatting)
    Other,
}

impl TrackedChange {
    /// Classify a node of a WordprocessingML document.
    ///
    /// A revision without `w:author` is attributed to the empty author.
    pub fn classify(doc: &XmlDocument, id: NodeId) -> Self {
        let author = || doc.attribute_ns(id, WML_MAIN, "author").unwrap_or_default();
        if doc.is_element(id, WML_MAIN, "ins") {
            TrackedChange::Insertion { author: author() }
        } else if doc.is_element(id, WML_MAIN, "del") {
            TrackedChange::Deletion { author: author() }
        } else {
            TrackedChange::Other
        }
    }

    /// The author of an insertion or deletion.
    pub fn author(&self) -> Option<&str> {
        match self {
            TrackedChange::Insertion { author } | TrackedChange::Deletion { author } => Some(author),
            TrackedChange::Other => None,
        }
    }
}

/// What [`remove_tracked_changes`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RedlineSummary {
    /// `w:ins` elements dropped with their content
    pub insertions_removed: usize,
    /// `w:del` elements unwrapped
    pub deletions_restored: usize,
}

impl RedlineSummary {
    /// Whether the document was changed.
    #[inline]
    pub fn changed(&self) -> bool {
        self.insertions_removed + self.deletions_restored > 0
    }
}

/// Rewrite plan computed over the unchanged tree.
#[derive(Default)]
struct Plan {
    /// New child list per element whose children change
    children: Vec<(NodeId, Vec<NodeId>)>,
    /// `w:delText`/`w:delInstrText` elements to rename
    restored_text: Vec<NodeId>,
    summary: RedlineSummary,
}

/// Remove `author`'s tracked changes from a WordprocessingML document.
///
/// Insertions by `author` are removed with their subtree. Deletions by
/// `author` are replaced in their parent by their children, with `w:delText`
/// becoming `w:t` and `w:delInstrText` becoming `w:instrText` (other authors'
/// revisions nested inside are left alone). Revisions by other authors are
/// untouched, but `author`'s revisions nested inside them are still resolved.
///
/// Running it a second time is a no-op.
pub fn remove_tracked_changes(doc: &mut XmlDocument, author: &str) -> RedlineSummary {
    let mut plan = Plan::default();
    let root = doc.document();
    let children = rewrite_children(doc, root, author, false, &mut plan);
    if children.as_slice() != doc.children(root) {
        plan.children.push((root, children));
    }

    for (parent, children) in plan.children {
        doc.set_children(parent, children);
    }
    for id in plan.restored_text {
        if let Some(el) = doc.element_mut(id) {
            let restored = match el.local_name() {
                "delText" => "t",
                "delInstrText" => "instrText",
                _ => continue,
            };
            el.set_local_name(restored);
        }
    }

    plan.summary
}

/// Compute the new child list of `parent`, recording changes below it in `plan`.
fn rewrite_children(
    doc: &XmlDocument,
    parent: NodeId,
    author: &str,
    restoring: bool,
    plan: &mut Plan,
) -> Vec<NodeId> {
    let mut result = Vec::with_capacity(doc.children(parent).len());
    for &child in doc.children(parent) {
        if doc.element(child).is_none() {
            result.push(child);
            continue;
        }

        match TrackedChange::classify(doc, child) {
            TrackedChange::Insertion { author: who } if who == author => {
                plan.summary.insertions_removed += 1;
            },
            TrackedChange::Deletion { author: who } if who == author => {
                plan.summary.deletions_restored += 1;
                result.extend(rewrite_children(doc, child, author, true, plan));
            },
            TrackedChange::Insertion { .. } | TrackedChange::Deletion { .. } => {
                // Another author's revision stays, deleted text included
                rewrite_element(doc, child, author, false, plan);
                result.push(child);
            },
            TrackedChange::Other => {
                if restoring
                    && (doc.is_element(child, WML_MAIN, "delText")
                        || doc.is_element(child, WML_MAIN, "delInstrText"))
                {
                    plan.restored_text.push(child);
                }
                rewrite_element(doc, child, author, restoring, plan);
                result.push(child);
            },
        }
    }
    result
}

fn rewrite_element(doc: &XmlDocument, id: NodeId, author: &str, restoring: bool, plan: &mut Plan) {
    let children = rewrite_children(doc, id, author, restoring, plan);
    if children.as_slice() != doc.children(id) {
        plan.children.push((id, children));
    }
}

/// Text of a WordprocessingML document, one line per non-empty paragraph.
///
/// Each `w:p` contributes the concatenated text of its `w:t` descendants.
/// Paragraphs nested in another paragraph (text boxes) are reported on their
/// own line and not counted towards the enclosing one.
pub fn extract_text(doc: &XmlDocument) -> String {
    paragraph_texts(doc).join("\n")
}

/// Non-empty paragraph texts in document order.
pub fn paragraph_texts(doc: &XmlDocument) -> Vec<String> {
    doc.descendants(doc.document())
        .filter(|&id| doc.is_element(id, WML_MAIN, "p"))
        .map(|p| paragraph_text(doc, p))
        .filter(|text| !text.is_empty())
        .collect()
}

fn paragraph_text(doc: &XmlDocument, paragraph: NodeId) -> String {
    let mut text = String::new();
    let mut stack: Vec<NodeId> = doc.children(paragraph).iter().rev().copied().collect();
    while let Some(id) = stack.pop() {
        if doc.is_element(id, WML_MAIN, "p") {
            continue;
        }
        if doc.is_element(id, WML_MAIN, "t") {
            text.push_str(&doc.text_content(id));
            continue;
        }
        stack.extend(doc.children(id).iter().rev().copied());
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(body: &str) -> XmlDocument {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="{WML_MAIN}">
<w:body>{body}</w:body>
</w:document>"#
        );
        XmlDocument::parse(xml.as_bytes()).unwrap()
    }

    fn serialized(doc: &XmlDocument) -> String {
        String::from_utf8(doc.to_xml()).unwrap()
    }

    #[test]
    fn test_extract_text_simple() {
        let doc = document("<w:p><w:r><w:t>Hello World</w:t></w:r></w:p>");
        assert_eq!(extract_text(&doc), "Hello World");
    }

    #[test]
    fn test_extract_text_multiple_paragraphs() {
        let doc = document(
            r#"
            <w:p><w:r><w:t>First paragraph</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second paragraph</w:t></w:r></w:p>
            "#,
        );
        assert_eq!(extract_text(&doc), "First paragraph\nSecond paragraph");
    }

    #[test]
    fn test_extract_text_skips_empty_paragraphs() {
        let doc = document(
            r#"
            <w:p><w:r><w:t>Content</w:t></w:r></w:p>
            <w:p></w:p>
            <w:p><w:r></w:r></w:p>
            "#,
        );
        assert_eq!(extract_text(&doc), "Content");
    }

    #[test]
    fn test_extract_text_nested_paragraphs() {
        let doc = document(
            r#"<w:p><w:r><w:t>Outer</w:t></w:r><w:r><w:txbxContent><w:p><w:r><w:t>Inner</w:t></w:r></w:p></w:txbxContent></w:r></w:p>"#,
        );
        assert_eq!(extract_text(&doc), "Outer\nInner");
    }

    #[test]
    fn test_removes_insertions() {
        let mut doc = document(
            r#"
            <w:p>
                <w:r><w:t>Original text</w:t></w:r>
                <w:ins w:author="Claude">
                    <w:r><w:t> added by Claude</w:t></w:r>
                </w:ins>
            </w:p>
            "#,
        );
        let summary = remove_tracked_changes(&mut doc, "Claude");
        assert_eq!(summary.insertions_removed, 1);

        let text = extract_text(&doc);
        assert!(!text.contains("added by Claude"));
        assert!(text.contains("Original text"));
        assert!(!serialized(&doc).contains("w:ins"));
    }

    #[test]
    fn test_preserves_other_authors() {
        let mut doc = document(
            r#"
            <w:p>
                <w:r><w:t>Original</w:t></w:r>
                <w:ins w:author="OtherUser">
                    <w:r><w:t> by other</w:t></w:r>
                </w:ins>
                <w:ins w:author="Claude">
                    <w:r><w:t> by Claude</w:t></w:r>
                </w:ins>
                <w:del w:author="OtherUser"><w:r><w:delText>gone</w:delText></w:r></w:del>
            </w:p>
            "#,
        );
        remove_tracked_changes(&mut doc, "Claude");

        let text = extract_text(&doc);
        assert!(!text.contains("by Claude"));
        assert!(text.contains("by other"));

        let xml = serialized(&doc);
        assert!(xml.contains(r#"<w:ins w:author="OtherUser">"#));
        assert!(xml.contains("<w:delText>gone</w:delText>"));
    }

    #[test]
    fn test_restores_deletions() {
        let mut doc = document(
            r#"
            <w:p>
                <w:r><w:t>Keep this</w:t></w:r>
                <w:del w:author="Claude">
                    <w:r><w:delText> restore this</w:delText></w:r>
                    <w:r><w:delInstrText>PAGE</w:delInstrText></w:r>
                </w:del>
            </w:p>
            "#,
        );
        let summary = remove_tracked_changes(&mut doc, "Claude");
        assert_eq!(summary.deletions_restored, 1);

        let text = extract_text(&doc);
        assert!(text.contains("Keep this"));
        assert!(text.contains("restore this"));

        let xml = serialized(&doc);
        assert!(!xml.contains("w:del"));
        assert!(xml.contains("<w:t> restore this</w:t>"));
        assert!(xml.contains("<w:instrText>PAGE</w:instrText>"));
    }

    #[test]
    fn test_nested_revisions() {
        let mut doc = document(
            r#"<w:p><w:ins w:author="Human"><w:r><w:t>a</w:t></w:r><w:ins w:author="Claude"><w:r><w:t>b</w:t></w:r></w:ins></w:ins><w:del w:author="Claude"><w:r><w:delText>c</w:delText></w:r><w:del w:author="Human"><w:r><w:delText>d</w:delText></w:r></w:del></w:del></w:p>"#,
        );
        let summary = remove_tracked_changes(&mut doc, "Claude");
        assert_eq!(
            summary,
            RedlineSummary {
                insertions_removed: 1,
                deletions_restored: 1
            }
        );

        let xml = serialized(&doc);
        assert!(xml.contains(
            r#"<w:p><w:ins w:author="Human"><w:r><w:t>a</w:t></w:r></w:ins><w:r><w:t>c</w:t></w:r><w:del w:author="Human"><w:r><w:delText>d</w:delText></w:r></w:del></w:p>"#
        ));
    }

    #[test]
    fn test_is_idempotent() {
        let mut doc = document(
            r#"<w:p><w:ins w:author="Claude"><w:r><w:t>x</w:t></w:r></w:ins><w:del w:author="Claude"><w:r><w:delText>y</w:delText></w:r></w:del></w:p>"#,
        );
        assert!(remove_tracked_changes(&mut doc, "Claude").changed());
        let once = doc.to_xml();

        assert_eq!(remove_tracked_changes(&mut doc, "Claude"), RedlineSummary::default());
        assert_eq!(doc.to_xml(), once);
    }

    #[test]
    fn test_ignores_foreign_namespace() {
        let mut doc = XmlDocument::parse(br#"<root><ins author="Claude"><t>x</t></ins></root>"#).unwrap();
        assert!(!remove_tracked_changes(&mut doc, "Claude").changed());
    }

    #[test]
    fn test_classify() {
        let doc = document(r#"<w:p><w:ins w:author="A"/><w:del/><w:moveFrom w:author="A"/></w:p>"#);
        let kinds: Vec<_> = doc
            .elements()
            .filter(|(_, el)| el.prefix() == Some("w"))
            .map(|(id, _)| TrackedChange::classify(&doc, id))
            .filter(|change| *change != TrackedChange::Other)
            .collect();
        assert_eq!(
            kinds,
            vec![
                TrackedChange::Insertion { author: "A".into() },
                TrackedChange::Deletion { author: String::new() },
            ]
        );
        assert_eq!(kinds[0].author(), Some("A"));
    }
}
