//! Sanitize, validate and pack in one pass.
//!
//! A [`Pipeline`] loads an unpacked container, resolves one author's tracked
//! changes in the configured parts, runs the validation suite and writes the
//! archive. The source directory is left untouched unless
//! [`PipelineConfig::save_sanitized`] is set.
//!
//! # Configuration
//!
//! [`PipelineConfig`] can be built in code or read from YAML:
//!
//! ```yaml
//! author: Editor
//! sanitize_parts:
//!   - word/document.xml
//! validate: true
//! check_content_types: false
//! original: original.docx
//! compression_level: 6
//! ```
//!
//! Every key is optional.

use crate::common::{Error, Result};
use crate::ooxml::docx::RedlineSummary;
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::part_name;
use crate::ooxml::pack::{PackOptions, PackSummary, check_output_extension, pack_container};
use crate::ooxml::validate::{ContentTypesCheck, RedliningCheck, ValidationReport, ValidationSuite};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings for a [`Pipeline`] run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Author whose tracked changes are resolved; `None` skips sanitizing
    pub author: Option<String>,

    /// Member names of the parts to sanitize
    pub sanitize_parts: Vec<String>,

    /// Write sanitized parts back to the source directory
    pub save_sanitized: bool,

    /// Run the validation suite and refuse to pack on failure
    pub validate: bool,

    /// Add the content-type coverage check to the suite
    pub check_content_types: bool,

    /// Archive the container was unpacked from; adds the redlining check
    /// (requires `author`)
    pub original: Option<PathBuf>,

    /// Deflate level (0-9)
    pub compression_level: Option<i64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            author: None,
            sanitize_parts: vec![part_name::WML_DOCUMENT.to_string()],
            save_sanitized: false,
            validate: true,
            check_content_types: false,
            original: None,
            compression_level: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for malformed YAML, unknown keys or
    /// inconsistent settings.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_saphyr::from_str(yaml)
            .map_err(|e| Error::Config(format!("Failed to parse pipeline configuration: {}", e)))?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject settings that cannot work together.
    pub fn check(&self) -> Result<()> {
        if self.original.is_some() && self.author.is_none() {
            return Err(Error::Config(
                "`original` needs an `author` whose edits are compared".to_string(),
            ));
        }
        if let Some(level) = self.compression_level
            && !(0..=9).contains(&level)
        {
            return Err(Error::Config(format!(
                "compression level {} is outside 0-9",
                level
            )));
        }
        Ok(())
    }
}

/// What a [`Pipeline`] run did.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    /// Sanitized parts with what was resolved in each
    pub sanitized: Vec<(String, RedlineSummary)>,

    /// Validation report, when validation ran
    pub report: Option<ValidationReport>,

    pub pack: PackSummary,
}

/// Sanitize → validate → pack.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline, checking the configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.check()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The validation suite this pipeline runs.
    pub fn suite(&self) -> ValidationSuite {
        let mut suite = ValidationSuite::standard();
        if self.config.check_content_types {
            suite = suite.with(ContentTypesCheck);
        }
        if let (Some(original), Some(author)) = (&self.config.original, &self.config.author) {
            suite = suite.with(RedliningCheck::new(original.clone(), author.clone()));
        }
        suite
    }

    /// Run the pipeline on an unpacked container.
    ///
    /// Parts listed in `sanitize_parts` that the container does not have are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Container::open`], [`Container::sanitize_part`]
    /// and [`pack_container`], and [`Error::Validation`] when validation fails.
    /// Nothing is written to `output` on error.
    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, source_dir: P, output: Q) -> Result<PipelineOutcome> {
        let output = output.as_ref();
        check_output_extension(output)?;

        let mut container = Container::open(source_dir)?;

        let mut sanitized = Vec::new();
        if let Some(author) = &self.config.author {
            for name in &self.config.sanitize_parts {
                if container.get(name).is_none() {
                    log::warn!("skipping sanitize of {}: no such part", name);
                    continue;
                }
                let summary = container.sanitize_part(name, author)?;
                sanitized.push((name.clone(), summary));
            }
            if self.config.save_sanitized {
                container.save()?;
            }
        }

        let report = if self.config.validate {
            let report = self.suite().run(&container);
            if !report.passed() {
                return Err(Error::validation(report));
            }
            Some(report)
        } else {
            None
        };

        let options = PackOptions {
            validate: false,
            compression_level: self.config.compression_level,
        };
        let pack = pack_container(&container, output, &options)?;

        Ok(PipelineOutcome {
            sanitized,
            report,
            pack,
        })
    }
}
