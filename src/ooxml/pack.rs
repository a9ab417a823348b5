//! Deterministic container packing and extraction.
//!
//! [`pack`] turns an unpacked container directory back into a `.docx`,
//! `.pptx` or `.xlsx` archive. Every XML part is condensed on the way (see
//! [`condense_xml`]); binary parts are copied as they are. Entries are
//! written in part order with a fixed timestamp and fixed permissions, so the
//! same tree always produces the same bytes.
//!
//! The archive is assembled in memory and written with a single call only
//! once every part has been processed: a failure never leaves a partial
//! output file behind.

use crate::common::{Error, Result};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::CONTAINER_EXTENSIONS;
use crate::ooxml::validate::ValidationSuite;
use crate::ooxml::xml::condense_xml;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Options for [`pack_container`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PackOptions {
    /// Run the standard validation suite first and refuse to pack on failure
    pub validate: bool,

    /// Deflate level (0-9); `None` uses the zip crate's default
    pub compression_level: Option<i64>,
}

/// What a successful pack wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    /// Archive entries written
    pub entries: usize,
    /// Entries that were condensed as XML
    pub xml_parts: usize,
    /// Size of the archive in bytes
    pub archive_size: u64,
}

/// Pack an unpacked container directory into an archive.
///
/// # Arguments
/// * `source_dir` - Directory holding the unpacked container
/// * `output` - Archive to create; must end in a container extension
///   (`.docx`, `.pptx`, `.xlsx` and their macro-enabled and template variants)
/// * `validate` - Run the standard validation suite first
///
/// # Errors
///
/// - [`Error::Input`] if `source_dir` is not a directory
/// - [`Error::Format`] if `output` has an unsupported extension
/// - [`Error::Validation`] if validation was requested and failed
/// - [`Error::Parse`] if an XML part is malformed
///
/// Nothing is written to `output` in any of these cases.
///
/// # Example
///
/// ```rust,no_run
/// use longan::ooxml::pack::pack;
///
/// let summary = pack("unpacked", "document.docx", true)?;
/// println!("{} entries", summary.entries);
/// # Ok::<(), longan::Error>(())
/// ```
pub fn pack<P: AsRef<Path>, Q: AsRef<Path>>(
    source_dir: P,
    output: Q,
    validate: bool,
) -> Result<PackSummary> {
    let output = output.as_ref();
    let source_dir = source_dir.as_ref();
    if !source_dir.is_dir() {
        return Err(Error::Input(format!("{} is not a directory", source_dir.display())));
    }
    check_output_extension(output)?;

    let container = Container::open(source_dir)?;
    pack_container(
        &container,
        output,
        &PackOptions {
            validate,
            ..PackOptions::default()
        },
    )
}

/// Pack an in-memory container into an archive.
///
/// See [`pack`] for the error cases.
pub fn pack_container<Q: AsRef<Path>>(
    container: &Container,
    output: Q,
    options: &PackOptions,
) -> Result<PackSummary> {
    let output = output.as_ref();
    check_output_extension(output)?;

    if options.validate {
        let report = ValidationSuite::standard().run(container);
        if !report.passed() {
            return Err(Error::validation(report));
        }
    }

    let (bytes, xml_parts) = to_bytes(container, options)?;
    std::fs::write(output, &bytes)?;

    let summary = PackSummary {
        entries: container.len(),
        xml_parts,
        archive_size: bytes.len() as u64,
    };
    log::debug!(
        "packed {} entries ({} XML) into {} ({} bytes)",
        summary.entries,
        summary.xml_parts,
        output.display(),
        summary.archive_size
    );
    Ok(summary)
}

/// Serialize a container into archive bytes.
///
/// Returns the archive and the number of condensed XML parts.
fn to_bytes(container: &Container, options: &PackOptions) -> Result<(Vec<u8>, usize)> {
    if let Some(level) = options.compression_level
        && !(0..=9).contains(&level)
    {
        return Err(Error::Config(format!(
            "compression level {} is outside 0-9",
            level
        )));
    }

    let file_options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(options.compression_level)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut xml_parts = 0;

    for part in container.parts() {
        zip.start_file(part.membername(), file_options)?;
        if part.is_xml() {
            let condensed =
                condense_xml(part.data()).map_err(|e| Error::parse(part.membername(), e))?;
            zip.write_all(&condensed)?;
            xml_parts += 1;
        } else {
            zip.write_all(part.data())?;
        }
    }

    Ok((zip.finish()?.into_inner(), xml_parts))
}

/// Reject outputs whose extension is not a container extension.
pub(crate) fn check_output_extension(output: &Path) -> Result<()> {
    let ext = output
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if CONTAINER_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(Error::Format(format!(
            "{}: output must be a .docx, .pptx, or .xlsx file (or one of {})",
            output.display(),
            CONTAINER_EXTENSIONS.join(", ")
        )))
    }
}

/// Extract every file entry of an archive below `dest_dir`.
///
/// Returns the number of files written. Directory entries are skipped.
///
/// # Errors
///
/// Returns [`Error::Input`] for an entry whose name would land outside
/// `dest_dir` (absolute paths, `..` components).
pub fn unpack<P: AsRef<Path>, Q: AsRef<Path>>(archive: P, dest_dir: Q) -> Result<usize> {
    let archive_path = archive.as_ref();
    let dest_dir = dest_dir.as_ref();

    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    // Every entry is checked before the first byte is extracted
    let mut targets = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(Error::Input(format!(
                "archive entry {} escapes the destination directory",
                entry.name()
            )));
        };
        targets.push((i, dest_dir.join(relative)));
    }

    std::fs::create_dir_all(dest_dir)?;
    let mut written = 0;
    for (i, path) in targets {
        let mut entry = archive.by_index(i)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = std::fs::File::create(&path)?;
        std::io::copy(&mut entry, &mut out)?;
        written += 1;
    }

    log::debug!(
        "unpacked {} files from {} into {}",
        written,
        archive_path.display(),
        dest_dir.display()
    );
    Ok(written)
}
