//! XML handling for container parts.
//!
//! - `tree`: arena-backed document model used where parts are rewritten or
//!   inspected with namespace awareness (sanitizer, namespace and id checks)
//! - `condense`: streaming whitespace condenser used by the packer
//!
//! Both read with `quick-xml` and report failures as [`XmlParseError`].
//! UTF-16 parts are transcoded to UTF-8 for reading and written back in
//! their original encoding.

pub mod condense;
pub mod tree;

pub use condense::condense_xml;
pub use tree::{Attribute, Element, NodeId, NodeKind, XmlDocument};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use std::borrow::Cow;
use thiserror::Error;

/// Malformed XML, with the byte offset the reader had reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at byte {position})")]
pub struct XmlParseError {
    message: String,
    position: u64,
}

impl XmlParseError {
    pub(crate) fn new(message: impl Into<String>, position: u64) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }

    /// Human-readable description of the failure.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset in the input where the failure was detected.
    pub fn position(&self) -> u64 {
        self.position
    }
}

/// Strip a UTF-8 byte order mark, returning it separately so writers can keep it.
pub(crate) fn split_bom(bytes: &[u8]) -> (&[u8], &[u8]) {
    const BOM: &[u8] = b"\xEF\xBB\xBF";
    if bytes.starts_with(BOM) {
        bytes.split_at(BOM.len())
    } else {
        (&[], bytes)
    }
}

/// The encoding a part was stored in, so it can be written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceEncoding {
    encoding: &'static Encoding,
    bom: bool,
}

impl SourceEncoding {
    /// Detect the encoding of a part and return its content as UTF-8.
    ///
    /// UTF-16 is recognized by its byte order mark, or by `<?` encoded in
    /// either byte order when the mark is absent. Everything else is read as
    /// UTF-8.
    pub(crate) fn decode(bytes: &[u8]) -> Result<(Self, Cow<'_, [u8]>), XmlParseError> {
        let (encoding, bom_len) = match Encoding::for_bom(bytes) {
            Some((encoding, bom_len)) => (encoding, bom_len),
            None if bytes.starts_with(b"<\0?\0") => (UTF_16LE, 0),
            None if bytes.starts_with(b"\0<\0?") => (UTF_16BE, 0),
            None => (UTF_8, 0),
        };
        let source = Self {
            encoding,
            bom: bom_len > 0,
        };
        let body = &bytes[bom_len..];

        if encoding == UTF_8 {
            return Ok((source, Cow::Borrowed(body)));
        }
        match encoding.decode_without_bom_handling_and_without_replacement(body) {
            Some(text) => Ok((source, Cow::Owned(text.into_owned().into_bytes()))),
            None => Err(XmlParseError::new(
                format!("invalid {} content", encoding.name()),
                bom_len as u64,
            )),
        }
    }

    /// Convert serialized UTF-8 back to this encoding, restoring the byte order mark.
    pub(crate) fn encode(&self, utf8: Vec<u8>) -> Vec<u8> {
        let bom: &[u8] = match (self.bom, self.encoding) {
            (false, _) => b"",
            (true, e) if e == UTF_16LE => b"\xFF\xFE",
            (true, e) if e == UTF_16BE => b"\xFE\xFF",
            (true, _) => b"\xEF\xBB\xBF",
        };

        if self.encoding == UTF_8 {
            if bom.is_empty() {
                return utf8;
            }
            let mut out = Vec::with_capacity(bom.len() + utf8.len());
            out.extend_from_slice(bom);
            out.extend_from_slice(&utf8);
            return out;
        }

        let text = String::from_utf8_lossy(&utf8);
        let big_endian = self.encoding == UTF_16BE;
        let mut out = Vec::with_capacity(bom.len() + text.len() * 2);
        out.extend_from_slice(bom);
        for unit in text.encode_utf16() {
            let bytes = if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            };
            out.extend_from_slice(&bytes);
        }
        out
    }
}

/// Split a qualified name into its optional prefix and local name.
#[inline]
pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(text: &str, bom: bool) -> Vec<u8> {
        let mut out = if bom { vec![0xFF, 0xFE] } else { Vec::new() };
        out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        out
    }

    #[test]
    fn test_utf8_is_borrowed() {
        let (source, body) = SourceEncoding::decode(b"\xEF\xBB\xBF<a/>").unwrap();
        assert!(matches!(body, Cow::Borrowed(_)));
        assert_eq!(body.as_ref(), b"<a/>");
        assert_eq!(source.encode(body.into_owned()), b"\xEF\xBB\xBF<a/>");
    }

    #[test]
    fn test_utf16_is_transcoded_and_restored() {
        let xml = r#"<?xml version="1.0" encoding="UTF-16"?><a>é</a>"#;
        for bom in [true, false] {
            let bytes = utf16le(xml, bom);
            let (source, body) = SourceEncoding::decode(&bytes).unwrap();
            assert_eq!(body.as_ref(), xml.as_bytes());
            assert_eq!(source.encode(body.into_owned()), bytes);
        }
    }

    #[test]
    fn test_utf16_big_endian() {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend("<a/>".encode_utf16().flat_map(u16::to_be_bytes));
        let (source, body) = SourceEncoding::decode(&bytes).unwrap();
        assert_eq!(body.as_ref(), b"<a/>");
        assert_eq!(source.encode(body.into_owned()), bytes);
    }

    #[test]
    fn test_unpaired_surrogate_is_rejected() {
        let bytes = [0xFF, 0xFE, b'<', 0, 0x00, 0xD8, b'>', 0];
        assert!(SourceEncoding::decode(&bytes).is_err());
    }
}
