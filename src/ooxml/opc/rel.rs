//! Relationship-related objects for OPC packages.
//!
//! This module parses `.rels` parts into relationships and resolves their
//! targets against the part they describe.

use crate::common::{Error, Result};
use crate::ooxml::opc::constants::target_mode;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::xml::XmlParseError;
use quick_xml::Reader;
use quick_xml::events::Event;
use smallvec::SmallVec;

/// A single relationship from a source part to a target.
///
/// Represents a connection between parts in an OPC package, identified by an rId
/// (relationship ID). Can be either internal (pointing to another part) or external
/// (pointing to an external URL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference - either a part URI or external URL
    target_ref: String,

    /// Base URI for resolving relative references
    base_uri: String,

    /// Whether this is an external relationship
    is_external: bool,
}

impl Relationship {
    /// Create a new relationship.
    ///
    /// # Arguments
    /// * `r_id` - Relationship ID (e.g., "rId1")
    /// * `reltype` - Relationship type URI
    /// * `target_ref` - Target reference (part URI or external URL)
    /// * `base_uri` - Base URI for resolving relative references
    /// * `is_external` - Whether this is an external relationship
    pub fn new(
        r_id: String,
        reltype: String,
        target_ref: String,
        base_uri: String,
        is_external: bool,
    ) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            base_uri,
            is_external,
        }
    }

    /// Get the relationship ID.
    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    /// Get the relationship type.
    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Get the target reference.
    ///
    /// For internal relationships, this is a relative part reference.
    /// For external relationships, this is an absolute URL.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    /// Check if this is an external relationship.
    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Get the absolute target partname for internal relationships.
    ///
    /// Returns [`Error::Reference`] if this is an external relationship or the
    /// target cannot be turned into a partname.
    pub fn target_partname(&self) -> Result<PackURI> {
        if self.is_external {
            return Err(self.reference_error());
        }
        // Fragments and queries never name a part
        let path = self
            .target_ref
            .split(['#', '?'])
            .next()
            .unwrap_or_default();
        if path.is_empty() {
            return Err(self.reference_error());
        }
        PackURI::from_rel_ref(&self.base_uri, path).map_err(|_| self.reference_error())
    }

    /// The error describing this relationship as broken.
    pub fn reference_error(&self) -> Error {
        Error::Reference {
            r_id: self.r_id.clone(),
            target: self.target_ref.clone(),
        }
    }
}

/// Relationships declared by one `.rels` part, in document order.
#[derive(Debug, Default)]
pub struct Relationships {
    /// Base URI for resolving relative references
    base_uri: String,

    rels: SmallVec<[Relationship; 8]>,
}

impl Relationships {
    /// Create a new empty relationships collection.
    ///
    /// # Arguments
    /// * `base_uri` - Base URI for resolving relative references
    pub fn new(base_uri: String) -> Self {
        Self {
            base_uri,
            rels: SmallVec::new(),
        }
    }

    /// Parse a `.rels` part.
    ///
    /// `base_uri` is the directory of the part the relationships belong to, i.e.
    /// the parent of the `_rels` directory ("/" for package relationships).
    /// Entries missing `Id` or `Target` are skipped.
    pub fn from_xml(rels_xml: &[u8], base_uri: &str) -> std::result::Result<Self, XmlParseError> {
        let mut rels = Self::new(base_uri.to_string());
        let mut reader = Reader::from_reader(rels_xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut r_id = None;
                        let mut reltype = String::new();
                        let mut target_ref = None;
                        let mut mode = target_mode::INTERNAL.to_string();

                        for attr in e.attributes() {
                            let attr = attr.map_err(|err| {
                                XmlParseError::new(err.to_string(), reader.buffer_position() as u64)
                            })?;
                            let value = std::str::from_utf8(&attr.value)
                                .map(crate::common::xml::unescape_xml)
                                .map_err(|err| {
                                    XmlParseError::new(err.to_string(), reader.buffer_position() as u64)
                                })?;
                            match attr.key.as_ref() {
                                b"Id" => r_id = Some(value),
                                b"Type" => reltype = value,
                                b"Target" => target_ref = Some(value),
                                b"TargetMode" => mode = value,
                                _ => {},
                            }
                        }

                        if let (Some(id), Some(target)) = (r_id, target_ref) {
                            rels.add_relationship(reltype, target, id, &mode);
                        }
                    }
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(XmlParseError::new(
                        format!("Rels parse error: {}", e),
                        reader.error_position() as u64,
                    ));
                },
                _ => {},
            }
            buf.clear();
        }

        Ok(rels)
    }

    /// Add a relationship to the collection.
    ///
    /// The relationship is external when `mode` is `External` or the target
    /// carries a URI scheme (`http:`, `mailto:`, ...).
    pub fn add_relationship(&mut self, reltype: String, target_ref: String, r_id: String, mode: &str) {
        let is_external = mode == target_mode::EXTERNAL || has_uri_scheme(&target_ref);
        self.rels.push(Relationship::new(
            r_id,
            reltype,
            target_ref,
            self.base_uri.clone(),
            is_external,
        ));
    }

    /// Get a relationship by its ID.
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|rel| rel.r_id() == r_id)
    }

    /// Get an iterator over all relationships.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    /// Get the number of relationships in the collection.
    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    /// Check if the collection is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }
}

/// Whether a reference starts with a URI scheme (RFC 3986: `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"`).
///
/// The colon must come before any path, query or fragment delimiter.
pub fn has_uri_scheme(target: &str) -> bool {
    let bytes = target.as_bytes();
    let Some(colon) = memchr::memchr(b':', bytes) else {
        return false;
    };
    let scheme = &bytes[..colon];
    match scheme.split_first() {
        Some((first, rest)) => {
            first.is_ascii_alphabetic()
                && rest
                    .iter()
                    .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'))
        },
        None => false,
    }
}
