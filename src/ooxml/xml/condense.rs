//! Whitespace condensing for serialized parts.
//!
//! Streams a part through `quick-xml` and writes it back with:
//! - whitespace-only text between elements removed
//! - comments removed
//! - text inside significant-text elements (and `xml:space="preserve"`
//!   subtrees) copied exactly, leading and trailing spaces included
//! - every other piece of markup (declaration, tags with their attributes,
//!   non-blank text, CDATA, processing instructions) copied byte-for-byte
//!
//! Unlike a general-purpose minifier, text is never trimmed and empty
//! elements are never collapsed, so the extracted character content of a part
//! is identical before and after condensing, and condensing is idempotent.

use super::{SourceEncoding, XmlParseError, split_qname};
use crate::common::xml::is_xml_whitespace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Local names whose character content is significant, whatever their prefix.
///
/// `w:t`/`a:t`/`m:t` and SpreadsheetML `t` carry literal run text; the others
/// are their deleted and field-code counterparts in WordprocessingML.
pub const SIGNIFICANT_TEXT_ELEMENTS: &[&str] = &["t", "delText", "instrText", "delInstrText"];

/// Condense a serialized part.
///
/// # Errors
///
/// Returns an [`XmlParseError`] for malformed input: syntax errors,
/// mismatched or unclosed elements, or a document without a root element.
pub fn condense_xml(xml: &[u8]) -> Result<Vec<u8>, XmlParseError> {
    let (encoding, body) = SourceEncoding::decode(xml)?;

    let mut reader = Reader::from_reader(&body[..]);
    reader.config_mut().trim_text(false); // Whitespace is decided per text run below

    let mut output = Vec::with_capacity(xml.len());

    let mut buf = Vec::with_capacity(1024);
    // One entry per open element: whether its content is preserved verbatim
    let mut preserve_stack: Vec<bool> = Vec::with_capacity(32);
    // Character data between two pieces of markup, entity references included
    let mut pending_text: Vec<u8> = Vec::new();
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XmlParseError::new(e.to_string(), reader.error_position() as u64))?;
        let position = reader.buffer_position() as u64;

        match event {
            Event::Text(e) => pending_text.extend_from_slice(&e),
            Event::GeneralRef(e) => {
                pending_text.push(b'&');
                pending_text.extend_from_slice(&e);
                pending_text.push(b';');
            },
            markup => {
                // Any other event ends the current text run
                let preserving = preserve_stack.last().copied().unwrap_or(false);
                flush_text(
                    &mut pending_text,
                    &mut output,
                    preserving,
                    preserve_stack.is_empty(),
                    position,
                )?;

                match markup {
                    Event::Eof => break,

                    // Preserve the declaration as written
                    Event::Decl(e) => {
                        output.extend_from_slice(b"<?");
                        output.extend_from_slice(&e);
                        output.extend_from_slice(b"?>");
                    },

                    // Comments carry no content
                    Event::Comment(_) => {},

                    Event::PI(e) => {
                        output.extend_from_slice(b"<?");
                        output.extend_from_slice(&e);
                        output.extend_from_slice(b"?>");
                    },

                    Event::DocType(e) => {
                        output.extend_from_slice(b"<!DOCTYPE ");
                        output.extend_from_slice(trim_ascii_whitespace(&e));
                        output.push(b'>');
                    },

                    Event::Start(e) => {
                        if preserve_stack.is_empty() {
                            if seen_root {
                                return Err(XmlParseError::new("multiple root elements", position));
                            }
                            seen_root = true;
                        }
                        preserve_stack.push(preserving || preserves_content(&e));
                        output.push(b'<');
                        output.extend_from_slice(&e);
                        output.push(b'>');
                    },

                    Event::Empty(e) => {
                        if preserve_stack.is_empty() {
                            if seen_root {
                                return Err(XmlParseError::new("multiple root elements", position));
                            }
                            seen_root = true;
                        }
                        output.push(b'<');
                        output.extend_from_slice(&e);
                        output.extend_from_slice(b"/>");
                    },

                    Event::End(e) => {
                        if preserve_stack.pop().is_none() {
                            return Err(XmlParseError::new("unexpected closing tag", position));
                        }
                        output.extend_from_slice(b"</");
                        output.extend_from_slice(e.name().as_ref());
                        output.push(b'>');
                    },

                    // CDATA may hold formatting-sensitive content
                    Event::CData(e) => {
                        output.extend_from_slice(b"<![CDATA[");
                        output.extend_from_slice(&e);
                        output.extend_from_slice(b"]]>");
                    },

                    // Consumed by the outer match
                    Event::Text(_) | Event::GeneralRef(_) => {},
                }
            },
        }
        buf.clear();
    }

    if !preserve_stack.is_empty() {
        return Err(XmlParseError::new(
            format!("{} unclosed element(s) at end of input", preserve_stack.len()),
            reader.buffer_position() as u64,
        ));
    }
    if !seen_root {
        return Err(XmlParseError::new(
            "document has no root element",
            reader.buffer_position() as u64,
        ));
    }

    Ok(encoding.encode(output))
}

/// Write out (or drop) the pending text run.
fn flush_text(
    pending: &mut Vec<u8>,
    output: &mut Vec<u8>,
    preserving: bool,
    at_document_level: bool,
    position: u64,
) -> Result<(), XmlParseError> {
    if pending.is_empty() {
        return Ok(());
    }

    let blank = pending.iter().copied().all(is_xml_whitespace);
    if at_document_level && !blank {
        return Err(XmlParseError::new(
            "character data outside the root element",
            position,
        ));
    }

    if preserving || !blank {
        output.extend_from_slice(pending);
    }
    pending.clear();
    Ok(())
}

/// Whether an element's content must be copied verbatim.
fn preserves_content(start: &BytesStart<'_>) -> bool {
    let name = start.name();
    let local = std::str::from_utf8(name.as_ref())
        .map(|qname| split_qname(qname).1)
        .unwrap_or_default();
    if SIGNIFICANT_TEXT_ELEMENTS.contains(&local) {
        return true;
    }

    start
        .attributes()
        .flatten()
        .any(|attr| attr.key.as_ref() == b"xml:space" && attr.value.as_ref() == b"preserve")
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !is_xml_whitespace(*b))
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !is_xml_whitespace(*b))
        .map_or(start, |pos| pos + 1);
    &bytes[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::xml::XmlDocument;
    use proptest::prelude::*;

    fn condense_str(xml: &str) -> String {
        String::from_utf8(condense_xml(xml.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_removes_whitespace_between_elements() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n    <child1>\n        <nested/>\n    </child1>\n    <child2/>\n</root>";
        assert_eq!(
            condense_str(xml),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><root><child1><nested/></child1><child2/></root>"
        );
    }

    #[test]
    fn test_preserves_text_elements_exactly() {
        let xml = r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
    <w:body>
        <w:p>
            <w:r>
                <w:t>Hello World</w:t>
                <w:t xml:space="preserve">  padded  </w:t>
                <w:t>   </w:t>
            </w:r>
        </w:p>
    </w:body>
</w:document>"#;
        let out = condense_str(xml);
        assert!(out.contains("<w:t>Hello World</w:t>"));
        assert!(out.contains(r#"<w:t xml:space="preserve">  padded  </w:t>"#));
        assert!(out.contains("<w:t>   </w:t>"));
        assert!(out.contains("<w:body><w:p><w:r><w:t>"));
    }

    #[test]
    fn test_removes_comments() {
        let xml = "<root>\n    <!-- This is a comment -->\n    <child>content</child>\n    <!-- Another comment -->\n</root>";
        let out = condense_str(xml);
        assert!(!out.contains("This is a comment"));
        assert!(!out.contains("Another comment"));
        assert_eq!(out, "<root><child>content</child></root>");
    }

    #[test]
    fn test_non_blank_text_is_not_trimmed() {
        let out = condense_str("<a><b> keep  me </b>\n</a>");
        assert_eq!(out, "<a><b> keep  me </b></a>");
    }

    #[test]
    fn test_entities_and_attributes_untouched() {
        let xml = "<a  x='1 &amp; 2'>\n  <b>&lt;&#32;</b>\n</a>";
        let out = condense_str(xml);
        assert_eq!(out, "<a  x='1 &amp; 2'><b>&lt;&#32;</b></a>");
    }

    #[test]
    fn test_handles_rels_files() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;
        let out = condense_str(xml);
        assert!(out.contains("rId1"));
        assert!(out.contains(r#"Target="word/document.xml"/></Relationships>"#));
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(condense_xml(b"<root><child></root>").is_err());
        assert!(condense_xml(b"<root>").is_err());
        assert!(condense_xml(b"").is_err());
        assert!(condense_xml(b"<a/><b/>").is_err());
    }

    #[test]
    fn test_condenses_utf16_in_place() {
        let encode = |xml: &str| {
            let mut bytes = vec![0xFF, 0xFE];
            bytes.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));
            bytes
        };
        let input = encode("<?xml version=\"1.0\" encoding=\"UTF-16\"?>\n<root>\n  <a>x</a>\n</root>");
        assert_eq!(
            condense_xml(&input).unwrap(),
            encode("<?xml version=\"1.0\" encoding=\"UTF-16\"?><root><a>x</a></root>")
        );
    }

    #[test]
    fn test_is_idempotent_on_sample() {
        let xml = "<?xml version=\"1.0\"?>\n<r>\n <!--c-->\n <w:t xmlns:w=\"u\"> x </w:t>\n <s>y</s>\n</r>";
        let once = condense_xml(xml.as_bytes()).unwrap();
        let twice = condense_xml(&once).unwrap();
        assert_eq!(once, twice);
    }

    fn text_of_t_elements(xml: &[u8]) -> Vec<String> {
        let doc = XmlDocument::parse(xml).unwrap();
        doc.elements()
            .filter(|(_, el)| el.local_name() == "t")
            .map(|(id, _)| doc.text_content(id))
            .collect()
    }

    fn fragment() -> impl Strategy<Value = String> {
        let text = "[ a-z&<]{0,8}".prop_map(|s| s.replace('&', "&amp;").replace('<', "&lt;"));
        let ws = "[ \n\t]{0,3}";
        (ws, text.clone(), ws, text, ws).prop_map(|(w1, t1, w2, t2, w3)| {
            format!("{w1}<p>{w2}<w:t>{t1}</w:t>{w3}<!-- {t2} --><s>{t2}</s>{w1}</p>{w2}")
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_condense_is_idempotent(body in prop::collection::vec(fragment(), 0..4)) {
            let xml = format!("<?xml version=\"1.0\"?>\n<root xmlns:w=\"urn:w\">{}</root>", body.concat());
            let once = condense_xml(xml.as_bytes()).unwrap();
            let twice = condense_xml(&once).unwrap();
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn prop_condense_preserves_run_text(body in prop::collection::vec(fragment(), 0..4)) {
            let xml = format!("<root xmlns:w=\"urn:w\">{}</root>", body.concat());
            let once = condense_xml(xml.as_bytes()).unwrap();
            prop_assert_eq!(text_of_t_elements(xml.as_bytes()), text_of_t_elements(&once));
        }
    }
}
