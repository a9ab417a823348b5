//! XML text helpers shared by the tree parser and the condenser.

mod escape;

pub use escape::{is_xml_whitespace, unescape_xml};
