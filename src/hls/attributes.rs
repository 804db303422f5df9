//! HLS attribute-list parsing for tag lines such as `#EXT-X-KEY:`.
//!
//! Only the lexical structure is parsed (`NAME=value` pairs, quoted strings
//! may contain commas). Values keep their byte spans so a single attribute
//! can be replaced without touching the rest of the line.

use std::ops::Range;

/// One `NAME=value` pair from an attribute list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: &'a str,
    /// Value without surrounding quotes
    pub value: &'a str,
    pub quoted: bool,
    /// Byte range of `value` within the parsed input
    pub span: Range<usize>,
}

/// Split a tag line into its name (including `#` and `:`) and attribute list.
///
/// Returns `None` for lines that are not tags or carry no attributes.
pub fn split_tag(line: &str) -> Option<(&str, &str)> {
    if !line.starts_with('#') {
        return None;
    }
    let colon = line.find(':')?;
    Some((&line[..=colon], &line[colon + 1..]))
}

/// Parse an attribute list.
///
/// Returns `None` when the input does not follow the attribute-list grammar
/// (missing `=`, unterminated quote, invalid attribute name, garbage after a
/// quoted value). A single trailing comma is tolerated.
pub fn parse_attribute_list(input: &str) -> Option<Vec<Attribute<'_>>> {
    let bytes = input.as_bytes();
    let mut attrs = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let eq = pos + input[pos..].find('=')?;
        let name = &input[pos..eq];
        if !is_attribute_name(name) {
            return None;
        }

        let value_start = eq + 1;
        let (span, quoted, next) = if bytes.get(value_start) == Some(&b'"') {
            let open = value_start + 1;
            let close = open + input[open..].find('"')?;
            (open..close, true, close + 1)
        } else {
            let end = input[value_start..]
                .find(',')
                .map_or(bytes.len(), |i| value_start + i);
            (value_start..end, false, end)
        };

        attrs.push(Attribute {
            name,
            value: &input[span.clone()],
            quoted,
            span,
        });

        pos = next;
        if pos < bytes.len() {
            if bytes[pos] != b',' {
                return None;
            }
            pos += 1;
        }
    }

    Some(attrs)
}

/// Look up an attribute by name.
pub fn find<'s, 'a>(attrs: &'s [Attribute<'a>], name: &str) -> Option<&'s Attribute<'a>> {
    attrs.iter().find(|a| a.name == name)
}

fn is_attribute_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-')
}
