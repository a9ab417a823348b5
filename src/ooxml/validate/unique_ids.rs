//! Uniqueness of identifier attributes.
//!
//! Only a fixed set of elements is checked. Each entry has its own value
//! space: a comment and a bookmark may share an id, two comments may not.
//! `w:commentReference` is not listed because references repeat by nature.

use super::{Check, ValidationResult, parsed_xml_parts};
use crate::ooxml::opc::Container;
use crate::ooxml::opc::constants::namespace::{PML_MAIN, SML_MAIN, WML_MAIN};
use crate::ooxml::xml::{NodeId, XmlDocument};
use std::collections::{HashMap, HashSet};

/// Where an identifier must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScope {
    /// Within one part
    Part,
    /// Across every part of the container
    Container,
}

/// An identifier-bearing element.
#[derive(Debug, Clone, Copy)]
pub struct IdRule {
    /// Namespace of the element
    pub namespace: &'static str,
    /// Local name of the element
    pub element: &'static str,
    /// Namespace of the attribute; `None` for an unprefixed attribute
    pub attribute_namespace: Option<&'static str>,
    /// Local name of the attribute
    pub attribute: &'static str,
    pub scope: IdScope,
}

impl IdRule {
    const fn wml(element: &'static str) -> Self {
        Self {
            namespace: WML_MAIN,
            element,
            attribute_namespace: Some(WML_MAIN),
            attribute: "id",
            scope: IdScope::Part,
        }
    }

    const fn plain(
        namespace: &'static str,
        element: &'static str,
        attribute: &'static str,
        scope: IdScope,
    ) -> Self {
        Self {
            namespace,
            element,
            attribute_namespace: None,
            attribute,
            scope,
        }
    }

    fn matches(&self, doc: &XmlDocument, id: NodeId) -> bool {
        doc.is_element(id, self.namespace, self.element)
    }

    fn value(&self, doc: &XmlDocument, id: NodeId) -> Option<String> {
        match self.attribute_namespace {
            Some(ns) => doc.attribute_ns(id, ns, self.attribute),
            None => doc.element(id)?.attribute(self.attribute),
        }
    }
}

/// Elements whose identifiers must not repeat.
pub const ID_RULES: &[IdRule] = &[
    IdRule::wml("comment"),
    IdRule::wml("commentRangeStart"),
    IdRule::wml("commentRangeEnd"),
    IdRule::wml("bookmarkStart"),
    IdRule::wml("bookmarkEnd"),
    IdRule::plain(PML_MAIN, "sldId", "id", IdScope::Part),
    IdRule::plain(PML_MAIN, "sldMasterId", "id", IdScope::Container),
    IdRule::plain(PML_MAIN, "sldLayoutId", "id", IdScope::Container),
    IdRule::plain(SML_MAIN, "sheet", "sheetId", IdScope::Part),
];

/// Reports every repeated identifier of an [`ID_RULES`] element.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniqueIdsCheck;

impl Check for UniqueIdsCheck {
    fn name(&self) -> &str {
        "unique_ids"
    }

    fn run(&self, container: &Container) -> ValidationResult {
        let mut messages = Vec::new();
        // (rule, value) -> part that used it first
        let mut container_seen: HashMap<(usize, String), String> = HashMap::new();

        for (part, doc) in parsed_xml_parts(container) {
            let mut part_seen: HashSet<(usize, String)> = HashSet::new();

            for (id, el) in doc.elements() {
                let local = el.local_name();
                for (index, rule) in ID_RULES.iter().enumerate() {
                    if rule.element != local || !rule.matches(&doc, id) {
                        continue;
                    }
                    let Some(value) = rule.value(&doc, id) else {
                        continue;
                    };

                    match rule.scope {
                        IdScope::Part => {
                            if !part_seen.insert((index, value.clone())) {
                                messages.push(format!(
                                    "{}: Duplicate {} {} '{}'",
                                    part.membername(),
                                    el.name(),
                                    rule.attribute,
                                    value
                                ));
                            }
                        },
                        IdScope::Container => {
                            if let Some(first) = container_seen.get(&(index, value.clone())) {
                                messages.push(format!(
                                    "{}: Duplicate {} {} '{}' (first used in {})",
                                    part.membername(),
                                    el.name(),
                                    rule.attribute,
                                    value,
                                    first
                                ));
                            } else {
                                container_seen.insert((index, value), part.membername().to_string());
                            }
                        },
                    }
                }
            }
        }

        ValidationResult::from_messages(self.name(), messages)
    }
}
