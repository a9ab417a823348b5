//! Arena-backed XML document model.
//!
//! Nodes live in a flat table and refer to each other by [`NodeId`], so
//! rewriting passes can compute a new parent/child mapping first and apply it
//! afterwards instead of mutating a tree they are still walking. Detached
//! nodes stay in the table but are unreachable from the document node and are
//! never serialized.
//!
//! Text, attribute values, comments and other character data are kept in
//! their raw (escaped) form, so serializing an unmodified document reproduces
//! its markup. Accessors such as [`XmlDocument::text_content`] unescape on
//! demand.

use super::{SourceEncoding, XmlParseError, split_qname};
use crate::common::xml::{is_xml_whitespace, unescape_xml};
use crate::ooxml::opc::constants::namespace;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use smallvec::SmallVec;

/// Index of a node in an [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the document's node table.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// An attribute with its qualified name and raw (escaped) value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    raw_value: String,
}

impl Attribute {
    /// Qualified attribute name, e.g. `w:author`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix, if the name is qualified.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Local part of the name.
    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Value exactly as written in the source, entities still escaped.
    #[inline]
    pub fn raw_value(&self) -> &str {
        &self.raw_value
    }

    /// Unescaped value.
    pub fn value(&self) -> String {
        unescape_xml(&self.raw_value)
    }

    /// The prefix this attribute declares, if it is a namespace declaration.
    ///
    /// `Some("")` stands for the default namespace (`xmlns="..."`).
    pub fn declared_prefix(&self) -> Option<&str> {
        if self.name == "xmlns" {
            Some("")
        } else {
            self.name.strip_prefix("xmlns:")
        }
    }
}

/// Element name and attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: SmallVec<[Attribute; 4]>,
    /// Written as `<name/>` in the source
    empty_tag: bool,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, empty_tag: bool) -> Result<Self, String> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| format!("element name is not UTF-8: {}", e))?
            .to_string();

        let mut attributes = SmallVec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| format!("invalid attribute on <{}>: {}", name, e))?;
            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| format!("attribute name is not UTF-8: {}", e))?;
            let raw_value = std::str::from_utf8(&attr.value)
                .map_err(|e| format!("attribute value is not UTF-8: {}", e))?;
            attributes.push(Attribute {
                name: attr_name.to_string(),
                raw_value: raw_value.to_string(),
            });
        }

        Ok(Self {
            name,
            attributes,
            empty_tag,
        })
    }

    /// Qualified element name, e.g. `w:p`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace prefix, if the name is qualified.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Local part of the name.
    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Replace the local name, keeping the prefix.
    pub fn set_local_name(&mut self, local: &str) {
        self.name = match self.prefix() {
            Some(prefix) => format!("{}:{}", prefix, local),
            None => local.to_string(),
        };
    }

    /// All attributes in source order.
    #[inline]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Unescaped value of the attribute with the given qualified name.
    pub fn attribute(&self, name: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(Attribute::value)
    }
}

/// Kinds of nodes in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node; always at index 0
    Document,
    Element(Element),
    /// Raw character data, entities still escaped
    Text(String),
    CData(String),
    Comment(String),
    /// The `<?xml ...?>` declaration body
    Declaration(String),
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed XML part.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    encoding: SourceEncoding,
}

const DOCUMENT: NodeId = NodeId(0);

impl XmlDocument {
    /// Parse a part into a document.
    ///
    /// Rejects mismatched or unclosed elements, duplicate attributes, character
    /// data outside the root element, multiple roots and documents without a
    /// root element.
    ///
    /// UTF-16 input is accepted; [`XmlDocument::to_xml`] writes it back in
    /// the same encoding.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlParseError> {
        let (encoding, body) = SourceEncoding::decode(bytes)?;

        let mut doc = Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            encoding,
        };

        let mut reader = Reader::from_reader(&body[..]);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<NodeId> = vec![DOCUMENT];
        let mut buf = Vec::with_capacity(1024);

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| XmlParseError::new(e.to_string(), reader.error_position() as u64))?;
            let position = reader.buffer_position() as u64;
            let parent = *stack.last().unwrap_or(&DOCUMENT);

            match event {
                Event::Start(e) => {
                    doc.check_root_slot(parent, position)?;
                    let element = Element::from_start(&e, false)
                        .map_err(|msg| XmlParseError::new(msg, position))?;
                    let id = doc.push(parent, NodeKind::Element(element));
                    stack.push(id);
                },
                Event::Empty(e) => {
                    doc.check_root_slot(parent, position)?;
                    let element = Element::from_start(&e, true)
                        .map_err(|msg| XmlParseError::new(msg, position))?;
                    doc.push(parent, NodeKind::Element(element));
                },
                Event::End(_) => {
                    if stack.len() <= 1 {
                        return Err(XmlParseError::new("unexpected closing tag", position));
                    }
                    stack.pop();
                },
                Event::Text(e) => {
                    let text = utf8(&e, position)?;
                    if parent == DOCUMENT && !text.bytes().all(is_xml_whitespace) {
                        return Err(XmlParseError::new(
                            "character data outside the root element",
                            position,
                        ));
                    }
                    doc.append_text(parent, text);
                },
                Event::GeneralRef(e) => {
                    if parent == DOCUMENT {
                        return Err(XmlParseError::new(
                            "entity reference outside the root element",
                            position,
                        ));
                    }
                    let name = utf8(&e, position)?;
                    doc.append_text(parent, &format!("&{};", name));
                },
                Event::CData(e) => {
                    let text = utf8(&e, position)?.to_string();
                    doc.push(parent, NodeKind::CData(text));
                },
                Event::Comment(e) => {
                    let text = utf8(&e, position)?.to_string();
                    doc.push(parent, NodeKind::Comment(text));
                },
                Event::Decl(e) => {
                    let text = utf8(&e, position)?.to_string();
                    doc.push(parent, NodeKind::Declaration(text));
                },
                Event::PI(e) => {
                    let text = utf8(&e, position)?.to_string();
                    doc.push(parent, NodeKind::ProcessingInstruction(text));
                },
                Event::DocType(e) => {
                    let text = utf8(&e, position)?.trim().to_string();
                    doc.push(parent, NodeKind::DocType(text));
                },
                Event::Eof => break,
            }
            buf.clear();
        }

        if stack.len() > 1 {
            let open = stack
                .last()
                .and_then(|id| doc.element(*id))
                .map(|el| el.name().to_string())
                .unwrap_or_default();
            return Err(XmlParseError::new(
                format!("unclosed element <{}>", open),
                reader.buffer_position() as u64,
            ));
        }

        if doc.root_element().is_none() {
            return Err(XmlParseError::new(
                "document has no root element",
                reader.buffer_position() as u64,
            ));
        }

        Ok(doc)
    }

    fn check_root_slot(&self, parent: NodeId, position: u64) -> Result<(), XmlParseError> {
        if parent == DOCUMENT && self.root_element().is_some() {
            return Err(XmlParseError::new("multiple root elements", position));
        }
        Ok(())
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append character data, merging with a preceding text sibling so an
    /// entity reference and its surrounding text form one node.
    fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return;
        }
        self.push(parent, NodeKind::Text(text.to_string()));
    }

    /// The document node.
    #[inline]
    pub fn document(&self) -> NodeId {
        DOCUMENT
    }

    /// The single root element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[DOCUMENT.0]
            .children
            .iter()
            .copied()
            .find(|id| self.element(*id).is_some())
    }

    /// Node kind.
    #[inline]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element data, if the node is an element.
    #[inline]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Mutable element data, if the node is an element.
    #[inline]
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Child nodes in document order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Parent node; `None` for the document node and detached subtrees' roots.
    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Replace the children of `id`, re-parenting the new ones.
    ///
    /// Nodes dropped from the list are detached: they keep their own subtree but
    /// are no longer reachable from the document.
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        for old in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[old.0].parent = None;
        }
        for child in &children {
            self.nodes[child.0].parent = Some(id);
        }
        self.nodes[id.0].children = children;
    }

    /// Pre-order traversal of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// Elements below the document node in document order.
    pub fn elements(&self) -> impl Iterator<Item = (NodeId, &Element)> + '_ {
        self.descendants(DOCUMENT)
            .filter_map(move |id| self.element(id).map(|el| (id, el)))
    }

    /// Resolve a namespace prefix in scope at `id`.
    ///
    /// `None` asks for the default namespace. The reserved `xml` prefix is always
    /// bound; an empty default namespace declaration (`xmlns=""`) unbinds.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        let wanted = prefix.unwrap_or("");
        if wanted == "xml" {
            return Some(namespace::XML);
        }

        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(el) = self.element(node)
                && let Some(decl) = el
                    .attributes()
                    .iter()
                    .find(|attr| attr.declared_prefix() == Some(wanted))
            {
                let uri = decl.raw_value();
                return if uri.is_empty() { None } else { Some(uri) };
            }
            current = self.parent(node);
        }
        None
    }

    /// Namespace URI of an element's name.
    pub fn element_namespace(&self, id: NodeId) -> Option<&str> {
        let el = self.element(id)?;
        self.lookup_namespace(id, el.prefix())
    }

    /// Whether `id` is an element with the given namespace and local name.
    pub fn is_element(&self, id: NodeId, ns: &str, local: &str) -> bool {
        match self.element(id) {
            Some(el) => el.local_name() == local && self.element_namespace(id) == Some(ns),
            None => false,
        }
    }

    /// Unescaped value of a namespaced attribute on element `id`.
    ///
    /// Unprefixed attributes are in no namespace and never match.
    pub fn attribute_ns(&self, id: NodeId, ns: &str, local: &str) -> Option<String> {
        let el = self.element(id)?;
        el.attributes()
            .iter()
            .filter(|attr| attr.local_name() == local && attr.declared_prefix().is_none())
            .find(|attr| match attr.prefix() {
                Some(prefix) => self.lookup_namespace(id, Some(prefix)) == Some(ns),
                None => false,
            })
            .map(Attribute::value)
    }

    /// Unescaped concatenation of all text and CDATA below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            match self.kind(node) {
                NodeKind::Text(raw) => out.push_str(&unescape_xml(raw)),
                NodeKind::CData(text) => out.push_str(text),
                _ => {},
            }
        }
        out
    }

    /// Serialize the document reachable from the document node.
    pub fn to_xml(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.nodes.len() * 32);
        for &child in self.children(DOCUMENT) {
            self.write_node(child, &mut out);
        }
        self.encoding.encode(out)
    }

    fn write_node(&self, id: NodeId, out: &mut Vec<u8>) {
        match self.kind(id) {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            },
            NodeKind::Element(el) => {
                out.push(b'<');
                out.extend_from_slice(el.name().as_bytes());
                for attr in el.attributes() {
                    // Raw values never contain the quote they were delimited with
                    let quote = if attr.raw_value().contains('"') { b'\'' } else { b'"' };
                    out.push(b' ');
                    out.extend_from_slice(attr.name().as_bytes());
                    out.push(b'=');
                    out.push(quote);
                    out.extend_from_slice(attr.raw_value().as_bytes());
                    out.push(quote);
                }

                let children = self.children(id);
                if children.is_empty() && el.empty_tag {
                    out.extend_from_slice(b"/>");
                    return;
                }

                out.push(b'>');
                for &child in children {
                    self.write_node(child, out);
                }
                out.extend_from_slice(b"</");
                out.extend_from_slice(el.name().as_bytes());
                out.push(b'>');
            },
            NodeKind::Text(raw) => out.extend_from_slice(raw.as_bytes()),
            NodeKind::CData(text) => {
                out.extend_from_slice(b"<![CDATA[");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"]]>");
            },
            NodeKind::Comment(text) => {
                out.extend_from_slice(b"<!--");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"-->");
            },
            NodeKind::Declaration(text) | NodeKind::ProcessingInstruction(text) => {
                out.extend_from_slice(b"<?");
                out.extend_from_slice(text.as_bytes());
                out.extend_from_slice(b"?>");
            },
            NodeKind::DocType(text) => {
                out.extend_from_slice(b"<!DOCTYPE ");
                out.extend_from_slice(text.as_bytes());
                out.push(b'>');
            },
        }
    }
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, XmlParseError> {
    std::str::from_utf8(bytes).map_err(|e| XmlParseError::new(format!("invalid UTF-8: {}", e), position))
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    doc: &'a XmlDocument,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(id).iter().rev().copied());
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    #[test]
    fn test_parse_and_serialize_unchanged() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
            <w:body><w:p><w:r><w:t xml:space=\"preserve\"> a &amp; b </w:t></w:r></w:p>\
            <w:sectPr/><!-- note --></w:body></w:document>";
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        assert_eq!(String::from_utf8(doc.to_xml()).unwrap(), xml);
    }

    #[test]
    fn test_text_content_unescapes() {
        let doc = XmlDocument::parse(b"<a>x &lt; y<b>&#33;</b><![CDATA[<raw>]]></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.text_content(root), "x < y!<raw>");
    }

    #[test]
    fn test_namespace_lookup() {
        let xml = format!(
            r#"<w:document xmlns:w="{W_NS}"><w:body><w:p w:rsidR="00"/></w:body></w:document>"#
        );
        let doc = XmlDocument::parse(xml.as_bytes()).unwrap();
        let p = doc
            .elements()
            .find(|(_, el)| el.local_name() == "p")
            .map(|(id, _)| id)
            .unwrap();
        assert!(doc.is_element(p, W_NS, "p"));
        assert_eq!(doc.attribute_ns(p, W_NS, "rsidR").as_deref(), Some("00"));
        assert_eq!(doc.lookup_namespace(p, Some("xml")), Some(namespace::XML));
        assert_eq!(doc.lookup_namespace(p, Some("w14")), None);
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(XmlDocument::parse(b"<root><child></root>").is_err());
        assert!(XmlDocument::parse(b"<root><child>").is_err());
        assert!(XmlDocument::parse(b"<?xml version=\"1.0\"?>").is_err());
        assert!(XmlDocument::parse(b"<a/><b/>").is_err());
        assert!(XmlDocument::parse(b"<a x=\"1\" x=\"2\"/>").is_err());
        assert!(XmlDocument::parse(b"text<a/>").is_err());
    }

    #[test]
    fn test_set_children_detaches() {
        let mut doc = XmlDocument::parse(b"<a><b/><c/></a>").unwrap();
        let root = doc.root_element().unwrap();
        let c = doc.children(root)[1];
        doc.set_children(root, vec![c]);
        assert_eq!(doc.to_xml(), b"<a><c/></a>");
    }

    #[test]
    fn test_bom_is_preserved() {
        let doc = XmlDocument::parse(b"\xEF\xBB\xBF<a/>").unwrap();
        assert_eq!(doc.to_xml(), b"\xEF\xBB\xBF<a/>");
    }

    #[test]
    fn test_utf16_part_round_trips() {
        let xml = r#"<?xml version="1.0" encoding="UTF-16"?><ds:item xmlns:ds="urn:x"><ds:v>ü</ds:v></ds:item>"#;
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend(xml.encode_utf16().flat_map(u16::to_le_bytes));

        let doc = XmlDocument::parse(&bytes).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.element(root).unwrap().name(), "ds:item");
        assert_eq!(doc.text_content(root), "ü");
        assert_eq!(doc.to_xml(), bytes);
    }
}
