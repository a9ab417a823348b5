//! Provides the PackURI value type and utilities for working with package URIs.
//!
//! A PackURI represents a part name within an OPC package, following the URI format
//! defined by the Open Packaging Conventions specification.

/// Represents a package URI, which is a partname within an OPC package.
///
/// PackURIs always begin with a forward slash and use forward slashes as path separators,
/// regardless of the host platform. The member name (URI without the leading slash) is
/// what ends up as the ZIP entry name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackURI {
    /// The full pack URI string (e.g., "/word/document.xml")
    uri: String,
}

impl PackURI {
    /// Create a new PackURI from a string.
    ///
    /// # Arguments
    /// * `uri` - The URI string, which must begin with a forward slash
    ///
    /// # Returns
    /// * `Ok(PackURI)` if the URI is valid
    /// * `Err` if the URI doesn't start with a forward slash
    pub fn new<S: Into<String>>(uri: S) -> Result<Self, String> {
        let uri = uri.into();
        if !uri.starts_with('/') {
            return Err(format!("PackURI must begin with slash, got '{}'", uri));
        }
        Ok(PackURI { uri })
    }

    /// Create a PackURI from a container member name such as "word/document.xml".
    ///
    /// Backslashes are normalized to forward slashes so the same tree always maps
    /// to the same names.
    pub fn from_membername(membername: &str) -> Self {
        let normalized = membername.replace('\\', "/");
        PackURI {
            uri: format!("/{}", normalized.trim_start_matches('/')),
        }
    }

    /// Create a PackURI from a relative reference and a base URI.
    ///
    /// This translates a relative reference (like "../styles.xml") onto a base URI
    /// (like "/word") to produce an absolute PackURI (like "/styles.xml"). References
    /// that already begin with a slash are taken relative to the package root.
    ///
    /// Fails when a ".." segment would climb above the package root.
    ///
    /// # Arguments
    /// * `base_uri` - The base URI to resolve from
    /// * `relative_ref` - The relative reference to resolve
    pub fn from_rel_ref(base_uri: &str, relative_ref: &str) -> Result<Self, String> {
        let joined = if relative_ref.starts_with('/') {
            relative_ref.to_string()
        } else {
            Self::join_paths(base_uri, relative_ref)
        };
        let normalized = Self::normalize_path(&joined)?;
        Self::new(normalized)
    }

    /// Get the base URI (directory portion) of this PackURI.
    ///
    /// For example, "/ppt/slides" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns "/".
    pub fn base_uri(&self) -> &str {
        if self.uri == "/" {
            return "/";
        }

        match self.uri.rfind('/') {
            Some(0) | None => "/",
            Some(pos) => &self.uri[..pos],
        }
    }

    /// Get the filename portion of this PackURI.
    ///
    /// For example, "slide1.xml" for "/ppt/slides/slide1.xml".
    /// For the package pseudo-partname "/", returns an empty string.
    pub fn filename(&self) -> &str {
        match self.uri.rfind('/') {
            Some(pos) => &self.uri[pos + 1..],
            None => "",
        }
    }

    /// Get the extension portion of this PackURI.
    ///
    /// For example, "xml" for "/word/document.xml" (note: no leading period).
    pub fn ext(&self) -> &str {
        let filename = self.filename();
        match filename.rfind('.') {
            Some(pos) => &filename[pos + 1..],
            None => "",
        }
    }

    /// Get the membername (URI with leading slash stripped).
    ///
    /// This is the form used as the Zip file membername for the package item.
    /// Returns an empty string for the package pseudo-partname "/".
    pub fn membername(&self) -> &str {
        &self.uri[1..]
    }

    /// Whether this PackURI names a relationships part (`.../_rels/<name>.rels`).
    pub fn is_rels(&self) -> bool {
        self.ext() == "rels" && self.base_uri().ends_with("/_rels")
    }

    /// Get the URI of the part a relationships part describes.
    ///
    /// The inverse of the `_rels` naming rule: "/word/_rels/document.xml.rels"
    /// describes "/word/document.xml", and "/_rels/.rels" describes the package
    /// itself ("/"). Returns `None` for URIs that are not relationships parts.
    pub fn rels_source(&self) -> Option<PackURI> {
        if !self.is_rels() {
            return None;
        }

        let source_name = self.filename().strip_suffix(".rels")?;
        let rels_dir = self.base_uri();
        let owner_dir = rels_dir.strip_suffix("_rels")?.trim_end_matches('/');

        let uri = match (owner_dir.is_empty(), source_name.is_empty()) {
            (true, true) => PACKAGE_URI.to_string(),
            (true, false) => format!("/{}", source_name),
            (false, true) => format!("{}/", owner_dir),
            (false, false) => format!("{}/{}", owner_dir, source_name),
        };
        Some(PackURI { uri })
    }

    /// Get the full URI string.
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    /// Helper function to join two paths using forward slashes
    fn join_paths(base: &str, rel: &str) -> String {
        if base.ends_with('/') {
            format!("{}{}", base, rel)
        } else {
            format!("{}/{}", base, rel)
        }
    }

    /// Helper function to normalize a path (resolve ".." and ".")
    fn normalize_path(path: &str) -> Result<String, String> {
        let mut parts = vec![""];

        for part in path.split('/') {
            match part {
                "" | "." => {},
                ".." => {
                    if parts.len() == 1 {
                        return Err(format!("'{}' climbs above the package root", path));
                    }
                    parts.pop();
                },
                _ => parts.push(part),
            }
        }

        if parts.len() == 1 {
            return Ok(PACKAGE_URI.to_string());
        }

        Ok(parts.join("/"))
    }
}

impl std::fmt::Display for PackURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.uri)
    }
}

impl AsRef<str> for PackURI {
    fn as_ref(&self) -> &str {
        &self.uri
    }
}

/// The package pseudo-partname, representing the package itself
pub const PACKAGE_URI: &str = "/";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packuri_new() {
        assert!(PackURI::new("/word/document.xml").is_ok());
        assert!(PackURI::new("word/document.xml").is_err());
    }

    #[test]
    fn test_from_membername_normalizes_separators() {
        let uri = PackURI::from_membername("word\\media\\image1.png");
        assert_eq!(uri.as_str(), "/word/media/image1.png");
        assert_eq!(uri.membername(), "word/media/image1.png");
    }

    #[test]
    fn test_base_uri() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.base_uri(), "/ppt/slides");

        let top = PackURI::new("/[Content_Types].xml").unwrap();
        assert_eq!(top.base_uri(), "/");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.base_uri(), "/");
    }

    #[test]
    fn test_filename_and_ext() {
        let uri = PackURI::new("/ppt/slides/slide1.xml").unwrap();
        assert_eq!(uri.filename(), "slide1.xml");
        assert_eq!(uri.ext(), "xml");

        let root = PackURI::new("/").unwrap();
        assert_eq!(root.filename(), "");
        assert_eq!(root.membername(), "");
    }

    #[test]
    fn test_from_rel_ref() {
        let uri = PackURI::from_rel_ref("/word", "../customXml/item1.xml").unwrap();
        assert_eq!(uri.as_str(), "/customXml/item1.xml");

        let uri = PackURI::from_rel_ref("/", "word/document.xml").unwrap();
        assert_eq!(uri.as_str(), "/word/document.xml");

        let uri = PackURI::from_rel_ref("/word", "/word/media/a.png").unwrap();
        assert_eq!(uri.as_str(), "/word/media/a.png");

        assert!(PackURI::from_rel_ref("/", "../outside.xml").is_err());
        assert!(PackURI::from_rel_ref("/word", "../../word/styles.xml").is_err());
    }

    #[test]
    fn test_rels_source() {
        let rels = PackURI::new("/word/_rels/document.xml.rels").unwrap();
        assert!(rels.is_rels());
        assert_eq!(rels.rels_source().unwrap().as_str(), "/word/document.xml");

        let pkg_rels = PackURI::new("/_rels/.rels").unwrap();
        let source = pkg_rels.rels_source().unwrap();
        assert_eq!(source.as_str(), "/");
        assert_eq!(source.base_uri(), "/");

        let not_rels = PackURI::new("/word/document.xml").unwrap();
        assert!(not_rels.rels_source().is_none());
    }
}
