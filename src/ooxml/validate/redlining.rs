//! Every edit by one author must be tracked.
//!
//! Compares the edited main document against the original archive. Once the
//! author's own tracked changes are removed from both, what is left is the
//! text nobody but other authors touched, so the two must read the same. An
//! untracked edit shows up as a differing paragraph.

use super::{Check, ValidationResult};
use crate::common::{Error, Result};
use crate::ooxml::docx::redline::{paragraph_texts, remove_tracked_changes};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::xml::XmlDocument;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Compares `word/document.xml` with the same part of the original archive.
///
/// Containers without a main WordprocessingML part pass.
#[derive(Debug, Clone)]
pub struct RedliningCheck {
    original: PathBuf,
    author: String,
}

impl RedliningCheck {
    /// # Arguments
    /// * `original` - The archive the container was unpacked from
    /// * `author` - Author whose edits must all be tracked
    pub fn new<P: Into<PathBuf>, S: Into<String>>(original: P, author: S) -> Self {
        Self {
            original: original.into(),
            author: author.into(),
        }
    }

    fn compare(&self, edited: &[u8]) -> Result<Option<String>> {
        let original = read_member(&self.original, part_name::WML_DOCUMENT)?;

        let mut original = XmlDocument::parse(&original)
            .map_err(|e| Error::parse(format!("{}!{}", self.original.display(), part_name::WML_DOCUMENT), e))?;
        let mut edited =
            XmlDocument::parse(edited).map_err(|e| Error::parse(part_name::WML_DOCUMENT, e))?;

        remove_tracked_changes(&mut original, &self.author);
        remove_tracked_changes(&mut edited, &self.author);

        let expected = paragraph_texts(&original);
        let found = paragraph_texts(&edited);
        let paragraphs = expected.len().max(found.len());

        Ok((0..paragraphs)
            .find(|&i| expected.get(i) != found.get(i))
            .map(|i| {
                format!(
                    "{}: paragraph {} has untracked changes by {}: expected {:?}, found {:?}",
                    part_name::WML_DOCUMENT,
                    i + 1,
                    self.author,
                    expected.get(i).map_or("", String::as_str),
                    found.get(i).map_or("", String::as_str),
                )
            }))
    }
}

impl Check for RedliningCheck {
    fn name(&self) -> &str {
        "redlining"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let Some(document) = container.get(part_name::WML_DOCUMENT) else {
            return ValidationResult::from_messages(self.name(), Vec::new());
        };

        let messages = match self.compare(document.data()) {
            Ok(difference) => difference.into_iter().collect(),
            Err(e) => vec![e.to_string()],
        };
        ValidationResult::from_messages(self.name(), messages)
    }
}

/// Read one member of a zip archive.
fn read_member(archive: &Path, name: &str) -> Result<Vec<u8>> {
    let file = std::fs::File::open(archive)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entry = archive.by_name(name)?;
    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data)?;
    Ok(data)
}
