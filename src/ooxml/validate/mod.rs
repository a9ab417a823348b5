//! Structural validation of a part tree.
//!
//! Each check implements [`Check`]: a pure function from a [`Container`] to a
//! [`ValidationResult`]. Checks never modify the container and never stop at
//! the first problem; every problem found becomes one message.
//!
//! The standard suite runs four checks:
//!
//! | Name | What it checks |
//! |---|---|
//! | `xml` | every XML part is well-formed |
//! | `namespaces` | prefixes listed in `mc:Ignorable` are declared |
//! | `unique_ids` | identifier attributes do not repeat |
//! | `references` | internal relationship targets exist |
//!
//! Two more checks can be added to a suite: [`ContentTypesCheck`] and
//! [`RedliningCheck`].
//!
//! # Example
//!
//! ```rust,no_run
//! use longan::ooxml::opc::Container;
//! use longan::ooxml::validate::ValidationSuite;
//!
//! let container = Container::open("unpacked")?;
//! let report = ValidationSuite::standard().run(&container);
//! if !report.passed() {
//!     eprint!("{}", report);
//! }
//! # Ok::<(), longan::Error>(())
//! ```

pub mod content_types;
pub mod namespaces;
pub mod redlining;
pub mod references;
pub mod unique_ids;
pub mod well_formed;

pub use content_types::ContentTypesCheck;
pub use namespaces::NamespacesCheck;
pub use redlining::RedliningCheck;
pub use references::ReferencesCheck;
pub use unique_ids::UniqueIdsCheck;
pub use well_formed::WellFormedCheck;

use crate::ooxml::opc::{Container, Part};
use crate::ooxml::xml::XmlDocument;
use serde::Serialize;
use std::fmt;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A single structural check over a container.
pub trait Check: Send + Sync {
    /// Short name used in reports.
    fn name(&self) -> &str;

    /// Inspect the container.
    fn run(&self, container: &Container) -> ValidationResult;
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    check_name: String,
    passed: bool,
    messages: Vec<String>,
}

impl ValidationResult {
    /// A result that passed when no problem was reported.
    pub fn from_messages(check_name: impl Into<String>, messages: Vec<String>) -> Self {
        Self {
            check_name: check_name.into(),
            passed: messages.is_empty(),
            messages,
        }
    }

    #[inline]
    pub fn check_name(&self) -> &str {
        &self.check_name
    }

    #[inline]
    pub fn passed(&self) -> bool {
        self.passed
    }

    /// One message per problem found.
    #[inline]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

/// Results of a suite run, in the order the checks were registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        Self { results }
    }

    #[inline]
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Whether every check passed.
    pub fn passed(&self) -> bool {
        self.results.iter().all(ValidationResult::passed)
    }

    /// Names of the checks that failed.
    pub fn failed_checks(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|result| !result.passed())
            .map(ValidationResult::check_name)
            .collect()
    }

    /// The result of a check by name.
    pub fn get(&self, check_name: &str) -> Option<&ValidationResult> {
        self.results
            .iter()
            .find(|result| result.check_name() == check_name)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for result in &self.results {
            if result.passed() {
                writeln!(f, "PASSED - {}", result.check_name())?;
            } else {
                for message in result.messages() {
                    writeln!(f, "FAILED - {}: {}", result.check_name(), message)?;
                }
            }
        }
        Ok(())
    }
}

/// An ordered set of checks.
#[derive(Default)]
pub struct ValidationSuite {
    checks: Vec<Box<dyn Check>>,
}

impl ValidationSuite {
    /// An empty suite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Well-formedness, namespaces, unique ids and references.
    pub fn standard() -> Self {
        Self::new()
            .with(WellFormedCheck)
            .with(NamespacesCheck)
            .with(UniqueIdsCheck)
            .with(ReferencesCheck)
    }

    /// Append a check.
    pub fn with<C: Check + 'static>(mut self, check: C) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    /// Names of the registered checks.
    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|check| check.name()).collect()
    }

    /// Run every check against the container.
    pub fn run(&self, container: &Container) -> ValidationReport {
        #[cfg(feature = "parallel")]
        let results: Vec<ValidationResult> = self
            .checks
            .par_iter()
            .map(|check| check.run(container))
            .collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<ValidationResult> = self
            .checks
            .iter()
            .map(|check| check.run(container))
            .collect();

        for result in &results {
            if result.passed() {
                log::debug!("check {} passed", result.check_name());
            } else {
                log::warn!(
                    "check {} failed with {} problem(s)",
                    result.check_name(),
                    result.messages().len()
                );
            }
        }

        ValidationReport::new(results)
    }
}

/// Parse every XML part, skipping parts that are not well-formed.
///
/// Checks other than `xml` use this so a malformed part is reported once.
pub(crate) fn parsed_xml_parts(
    container: &Container,
) -> impl Iterator<Item = (&Part, XmlDocument)> {
    container
        .xml_parts()
        .filter_map(|part| part.parse_xml().ok().map(|doc| (part, doc)))
}
