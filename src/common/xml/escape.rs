use aho_corasick::{AhoCorasick, MatchKind};
use once_cell::sync::Lazy;

// Named entities plus the character-reference opener. "&#" is not a prefix of
// any named entity, so LeftmostLongest never has to choose between them.
static XML_ENTITIES: Lazy<AhoCorasick> = Lazy::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(["&amp;", "&lt;", "&gt;", "&quot;", "&apos;", "&#"])
        .expect("Failed to build XML entity matcher")
});

const NAMED_REPLACEMENTS: [char; 5] = ['&', '<', '>', '"', '\''];

/// Unescape XML entity and character references.
///
/// Handles the five predefined entities and decimal/hexadecimal character
/// references in a single left-to-right pass, so `&amp;#65;` stays `&#65;`.
/// Unknown or malformed references are left unchanged.
///
/// # Examples
///
/// ```
/// use longan::common::xml::unescape_xml;
/// assert_eq!(unescape_xml("&lt;a &amp; b&gt;"), "<a & b>");
/// assert_eq!(unescape_xml("&#65;&#x42;"), "AB");
/// assert_eq!(unescape_xml("&amp;lt;"), "&lt;");
/// assert_eq!(unescape_xml("a & b"), "a & b");
/// assert_eq!(unescape_xml("&invalid;"), "&invalid;");
/// ```
pub fn unescape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;

    for m in XML_ENTITIES.find_iter(s) {
        if m.start() < last {
            // Inside a character reference consumed below
            continue;
        }
        out.push_str(&s[last..m.start()]);

        if m.pattern().as_usize() < NAMED_REPLACEMENTS.len() {
            out.push(NAMED_REPLACEMENTS[m.pattern().as_usize()]);
            last = m.end();
            continue;
        }

        match parse_char_ref(&s[m.end()..]) {
            Some((ch, consumed)) => {
                out.push(ch);
                last = m.end() + consumed;
            },
            None => {
                out.push_str("&#");
                last = m.end();
            },
        }
    }

    out.push_str(&s[last..]);
    out
}

/// Parse the body of a character reference (`65;` or `x41;`).
///
/// Returns the character and the number of bytes consumed, including the `;`.
fn parse_char_ref(rest: &str) -> Option<(char, usize)> {
    let end = memchr::memchr(b';', rest.as_bytes())?;
    let body = &rest[..end];
    let code = match body.strip_prefix('x').or_else(|| body.strip_prefix('X')) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => body.parse::<u32>().ok()?,
    };
    char::from_u32(code).map(|ch| (ch, end + 1))
}

/// Check whether a byte is XML whitespace (space, tab, CR or LF).
#[inline]
pub fn is_xml_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}
