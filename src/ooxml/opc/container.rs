//! In-memory part tree of an unpacked container.
//!
//! A [`Container`] is loaded from a directory (the result of unzipping a
//! `.docx`/`.pptx`/`.xlsx`) or assembled from named byte buffers. Parts keep
//! the order the packer writes them in: `[Content_Types].xml` first, then a
//! depth-first walk with file names sorted at every level.

use crate::common::xml::is_xml_whitespace;
use crate::common::{Error, Result};
use crate::ooxml::docx::redline::{RedlineSummary, remove_tracked_changes};
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::opc::packuri::PackURI;
use crate::ooxml::xml::{XmlDocument, split_bom};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// How a part's bytes are treated by the validator and packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// Parsed by the validators and condensed by the packer
    Xml,
    /// Copied unchanged
    Binary,
}

impl PartKind {
    /// Classify a part by its extension, falling back to sniffing its content.
    ///
    /// `.xml` and `.rels` parts are always XML; anything else is XML when its
    /// first non-whitespace byte after an optional BOM is `<`.
    pub fn detect(uri: &PackURI, data: &[u8]) -> Self {
        let ext = uri.ext();
        if ext.eq_ignore_ascii_case("xml") || ext.eq_ignore_ascii_case("rels") {
            return PartKind::Xml;
        }

        let (_, body) = split_bom(data);
        match body.iter().find(|b| !is_xml_whitespace(**b)) {
            Some(b'<') => PartKind::Xml,
            _ => PartKind::Binary,
        }
    }
}

/// A named resource inside a container.
#[derive(Debug, Clone)]
pub struct Part {
    uri: PackURI,
    kind: PartKind,
    data: Vec<u8>,
    modified: bool,
}

impl Part {
    /// Create a part, detecting its kind from name and content.
    pub fn new(uri: PackURI, data: Vec<u8>) -> Self {
        let kind = PartKind::detect(&uri, &data);
        Self {
            uri,
            kind,
            data,
            modified: false,
        }
    }

    /// The part's URI ("/word/document.xml").
    #[inline]
    pub fn uri(&self) -> &PackURI {
        &self.uri
    }

    /// The part's member name ("word/document.xml").
    #[inline]
    pub fn membername(&self) -> &str {
        self.uri.membername()
    }

    #[inline]
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    #[inline]
    pub fn is_xml(&self) -> bool {
        self.kind == PartKind::Xml
    }

    /// Whether this part is a relationships part under a `_rels` directory.
    #[inline]
    pub fn is_rels(&self) -> bool {
        self.uri.is_rels()
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the part's bytes and mark it as modified.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.modified = true;
    }

    /// Whether the part changed since it was loaded.
    #[inline]
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Parse the part as an XML document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] naming the part when the content is malformed.
    pub fn parse_xml(&self) -> Result<XmlDocument> {
        XmlDocument::parse(&self.data).map_err(|e| Error::parse(self.membername(), e))
    }
}

/// The part tree of one unpacked container.
#[derive(Debug, Default)]
pub struct Container {
    /// Directory the parts were loaded from, if any
    root: Option<PathBuf>,

    /// Parts in packing order
    parts: Vec<Part>,

    /// Index into `parts` by URI
    index: HashMap<PackURI, usize>,
}

impl Container {
    /// Load every regular file below `dir` as a part.
    ///
    /// Symbolic links to files are loaded as the file they point to. Links to
    /// directories and other special files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// - [`Error::Input`] if `dir` is not a directory or a file name is not UTF-8
    /// - [`Error::Walk`] / [`Error::Io`] if the tree cannot be read
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::Input(format!("{} is not a directory", dir.display())));
        }

        let mut parts = Vec::new();
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            // Symlinked files are read through; linked directories are not walked
            if !file_type.is_file() && !(file_type.is_symlink() && entry.path().is_file()) {
                log::warn!("skipping {}: not a regular file", entry.path().display());
                continue;
            }

            let membername = membername_for(dir, entry.path())?;
            let data = std::fs::read(entry.path())?;
            parts.push(Part::new(PackURI::from_membername(&membername), data));
        }

        let mut container = Self::with_parts(parts)?;
        container.root = Some(dir.to_path_buf());
        log::debug!(
            "loaded {} parts ({} XML) from {}",
            container.len(),
            container.xml_parts().count(),
            dir.display()
        );
        Ok(container)
    }

    /// Assemble a container from member names and bytes, in the given order.
    ///
    /// `[Content_Types].xml` is moved to the front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] when a member name occurs twice.
    pub fn from_parts<I, S>(parts: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let parts = parts
            .into_iter()
            .map(|(name, data)| Part::new(PackURI::from_membername(name.as_ref()), data))
            .collect();
        Self::with_parts(parts)
    }

    fn with_parts(mut parts: Vec<Part>) -> Result<Self> {
        // Stable, so everything else keeps its order
        parts.sort_by_key(|part| part.membername() != part_name::CONTENT_TYPES);

        let mut index = HashMap::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            if index.insert(part.uri.clone(), i).is_some() {
                return Err(Error::Input(format!("duplicate part {}", part.membername())));
            }
        }

        Ok(Self {
            root: None,
            parts,
            index,
        })
    }

    /// The directory the container was loaded from.
    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// All parts in packing order.
    #[inline]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// XML parts in packing order.
    pub fn xml_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter().filter(|part| part.is_xml())
    }

    /// Look up a part by member name, with or without the leading slash.
    pub fn get(&self, name: &str) -> Option<&Part> {
        let uri = PackURI::from_membername(name);
        self.index.get(&uri).map(|&i| &self.parts[i])
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Part> {
        let uri = PackURI::from_membername(name);
        self.index.get(&uri).map(|&i| &mut self.parts[i])
    }

    /// Whether a part with this URI exists.
    #[inline]
    pub fn contains(&self, uri: &PackURI) -> bool {
        self.index.contains_key(uri)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Remove `author`'s tracked changes from a WordprocessingML part in place.
    ///
    /// The part is re-serialized and marked modified only if something changed.
    ///
    /// # Errors
    ///
    /// - [`Error::Input`] if the part does not exist
    /// - [`Error::Parse`] if the part is not well-formed XML
    pub fn sanitize_part(&mut self, name: &str, author: &str) -> Result<RedlineSummary> {
        let part = self
            .get_mut(name)
            .ok_or_else(|| Error::Input(format!("part {} not found", name)))?;

        let mut doc = part.parse_xml()?;
        let summary = remove_tracked_changes(&mut doc, author);
        if summary.changed() {
            part.set_data(doc.to_xml());
        }

        log::debug!(
            "sanitized {} for {}: {} insertion(s) removed, {} deletion(s) restored",
            part.membername(),
            author,
            summary.insertions_removed,
            summary.deletions_restored
        );
        Ok(summary)
    }

    /// Write modified parts back below the directory the container was loaded from.
    ///
    /// Returns the number of parts written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Input`] for a container that was not loaded from a
    /// directory, or [`Error::Io`] if a write fails.
    pub fn save(&mut self) -> Result<usize> {
        let root = self
            .root
            .clone()
            .ok_or_else(|| Error::Input("container was not loaded from a directory".to_string()))?;

        let mut written = 0;
        for part in self.parts.iter_mut().filter(|part| part.modified) {
            let path = root.join(part.membername());
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, &part.data)?;
            part.modified = false;
            written += 1;
        }

        log::debug!("saved {} modified part(s) to {}", written, root.display());
        Ok(written)
    }
}

/// Forward-slash member name of `path` relative to `root`.
fn membername_for(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::Input(format!("{} is outside {}", path.display(), root.display())))?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_str().ok_or_else(|| {
                Error::Input(format!("part name {} is not valid UTF-8", relative.display()))
            })?),
            _ => {
                return Err(Error::Input(format!(
                    "unexpected path component in {}",
                    relative.display()
                )));
            },
        }
    }
    Ok(segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:t>Keep</w:t></w:r><w:ins w:id="1" w:author="Claude"><w:r><w:t>Added</w:t></w:r></w:ins></w:p></w:body></w:document>"#;

    fn write_tree(dir: &Path) {
        fs::create_dir_all(dir.join("word/_rels")).unwrap();
        fs::create_dir_all(dir.join("_rels")).unwrap();
        fs::create_dir_all(dir.join("word/media")).unwrap();
        fs::write(dir.join("[Content_Types].xml"), "<Types/>").unwrap();
        fs::write(dir.join("_rels/.rels"), "<Relationships/>").unwrap();
        fs::write(dir.join("word/document.xml"), DOCUMENT).unwrap();
        fs::write(dir.join("word/_rels/document.xml.rels"), "<Relationships/>").unwrap();
        fs::write(dir.join("word/media/image1.png"), [0x89, b'P', b'N', b'G']).unwrap();
    }

    #[test]
    fn test_open_orders_parts() {
        let tmp = tempfile::tempdir().unwrap();
        write_tree(tmp.path());

        let container = Container::open(tmp.path()).unwrap();
        let names: Vec<_> = container.parts().iter().map(Part::membername).collect();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/_rels/document.xml.rels",
                "word/document.xml",
                "word/media/image1.png",
            ]
        );
        assert_eq!(container.xml_parts().count(), 4);
        assert_eq!(
            container.get("word/media/image1.png").unwrap().kind(),
            PartKind::Binary
        );
        assert!(container.contains(&PackURI::new("/word/document.xml").unwrap()));
    }

    #[cfg(unix)]
    #[test]
    fn test_open_reads_symlinked_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("unpacked");
        write_tree(&root);
        let shared = tmp.path().join("theme1.xml");
        fs::write(&shared, "<a:theme/>").unwrap();
        std::os::unix::fs::symlink(&shared, root.join("word/theme1.xml")).unwrap();
        std::os::unix::fs::symlink(tmp.path(), root.join("word/loop")).unwrap();

        let container = Container::open(&root).unwrap();
        assert_eq!(container.get("word/theme1.xml").unwrap().data(), b"<a:theme/>");
        assert_eq!(container.len(), 6);
    }

    #[test]
    fn test_open_rejects_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Container::open(tmp.path().join("nope")).unwrap_err();
        assert!(matches!(err, Error::Input(ref msg) if msg.contains("not a directory")));
    }

    #[test]
    fn test_detects_xml_by_content() {
        let uri = PackURI::from_membername("customXml/item1.dat");
        assert_eq!(PartKind::detect(&uri, b"\xEF\xBB\xBF  <root/>"), PartKind::Xml);
        assert_eq!(PartKind::detect(&uri, b"GIF89a"), PartKind::Binary);
        let rels = PackURI::from_membername("_rels/.rels");
        assert_eq!(PartKind::detect(&rels, b""), PartKind::Xml);
    }

    #[test]
    fn test_from_parts_rejects_duplicates() {
        let result = Container::from_parts([("a.xml", b"<a/>".to_vec()), ("/a.xml", b"<b/>".to_vec())]);
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[test]
    fn test_sanitize_and_save() {
        let tmp = tempfile::tempdir().unwrap();
        write_tree(tmp.path());

        let mut container = Container::open(tmp.path()).unwrap();
        let summary = container.sanitize_part("word/document.xml", "Claude").unwrap();
        assert_eq!(summary.insertions_removed, 1);
        assert!(container.get("word/document.xml").unwrap().is_modified());

        assert_eq!(container.save().unwrap(), 1);
        let saved = fs::read_to_string(tmp.path().join("word/document.xml")).unwrap();
        assert!(saved.contains("Keep"));
        assert!(!saved.contains("Added"));

        // Nothing left to resolve
        let again = container.sanitize_part("word/document.xml", "Claude").unwrap();
        assert!(!again.changed());
        assert_eq!(container.save().unwrap(), 0);
    }

    #[test]
    fn test_sanitize_missing_part() {
        let mut container = Container::from_parts([("a.xml", b"<a/>".to_vec())]).unwrap();
        assert!(matches!(
            container.sanitize_part("word/document.xml", "Claude"),
            Err(Error::Input(_))
        ));
        assert!(matches!(container.save(), Err(Error::Input(_))));
    }
}
