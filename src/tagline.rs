//! Parsing of single tags-file lines.
//!
//! Format: `name<TAB>file<TAB>address[;"<TAB>field...]`, where the address
//! is a line number or a `/pattern/` (`?pattern?` for backward searches).

use std::path::PathBuf;

use crate::types::{Address, TagEntry};

/// Separator between the address and the extension fields.
const FIELDS_MARKER: &str = ";\"";

/// The symbol name of a raw line: everything before the first tab.
pub fn name_of(line: &[u8]) -> &[u8] {
    return line
        .iter()
        .position(|b| return *b == b'\t')
        .and_then(|end| return line.get(..end))
        .unwrap_or(line);
}

/// Parse one tag line. Returns `None` for pseudo-tags, blank lines and
/// anything that is not a well-formed entry.
pub fn parse(line: &str) -> Option<TagEntry> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.starts_with("!_") {
        return None;
    }

    let (name, rest) = line.split_once('\t')?;
    let (file, rest) = rest.split_once('\t')?;
    if name.is_empty() || file.is_empty() {
        return None;
    }

    let (address, rest) = split_address(rest)?;
    let mut entry = TagEntry {
        address,
        file: PathBuf::from(file),
        kind: None,
        line_hint: None,
        name: name.to_string(),
    };

    if let Some(fields) = rest.strip_prefix(FIELDS_MARKER) {
        for field in fields.split('\t').filter(|f| return !f.is_empty()) {
            apply_field(&mut entry, field);
        }
    }

    return Some(entry);
}

/// Record one extension field on the entry. Unknown keys are ignored.
fn apply_field(entry: &mut TagEntry, field: &str) {
    match field.split_once(':') {
        None => entry.kind = field.chars().next(),
        Some(("kind", value)) => entry.kind = value.chars().next(),
        Some(("line", value)) => entry.line_hint = value.parse().ok(),
        Some(_) => {},
    }
}

/// Read a `/.../` or `?...?` pattern starting right after the opening delimiter.
/// Returns the unescaped text and the byte offset just past the closing delimiter.
fn read_pattern(body: &str, delimiter: char) -> Option<(String, usize)> {
    let mut pattern = String::with_capacity(body.len());
    let mut chars = body.char_indices();

    while let Some((offset, c)) = chars.next() {
        if c == delimiter {
            return Some((pattern, offset.saturating_add(c.len_utf8())));
        }
        if c != '\\' {
            pattern.push(c);
            continue;
        }
        match chars.next() {
            Some((_, escaped)) if escaped == delimiter || escaped == '\\' => pattern.push(escaped),
            Some((_, other)) => {
                pattern.push('\\');
                pattern.push(other);
            },
            None => pattern.push('\\'),
        }
    }

    // Unterminated.
    return None;
}

/// Split the address off the front of the third column.
fn split_address(rest: &str) -> Option<(Address, &str)> {
    let first = rest.chars().next()?;

    if first == '/' || first == '?' {
        let body = rest.get(first.len_utf8()..)?;
        let (pattern, consumed) = read_pattern(body, first)?;
        let tail = body.get(consumed..)?;
        return Some((Address::Pattern(pattern), tail));
    }

    let digits_end = rest
        .find(|c: char| return !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = rest.get(..digits_end)?;
    if digits.is_empty() {
        return None;
    }
    let line = digits.parse().ok()?;
    return Some((Address::LineNumber(line), rest.get(digits_end..)?));
}
