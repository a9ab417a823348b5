//! Constant values related to the Open Packaging Convention.
//!
//! XML namespaces, relationship target modes and the well-known part names
//! the validator and packer rely on.

/// XML namespace URIs used in OPC packages
pub mod namespace {
    /// WordprocessingML main namespace
    pub const WML_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    /// PresentationML main namespace
    pub const PML_MAIN: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// SpreadsheetML main namespace
    pub const SML_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    /// Markup compatibility namespace (carries `Ignorable`)
    pub const MARKUP_COMPATIBILITY: &str =
        "http://schemas.openxmlformats.org/markup-compatibility/2006";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// The namespace bound to the reserved `xml` prefix
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// Internal relationship target mode (default)
    pub const INTERNAL: &str = "Internal";

    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Member names every container is expected to carry
pub mod part_name {
    /// The content type map
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";

    /// Main WordprocessingML story
    pub const WML_DOCUMENT: &str = "word/document.xml";
}

/// Output extensions the packer accepts (lowercase, no leading period)
pub const CONTAINER_EXTENSIONS: &[&str] = &[
    "docx", "docm", "dotx", "dotm", "pptx", "pptm", "potx", "xlsx", "xlsm", "xltx",
];
