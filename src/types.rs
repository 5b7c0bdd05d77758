/// Core domain types for tag entries, addresses, and resolved positions.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind letter ctags assigns to whole-file entries (`--extras=+f`).
const FILE_REFERENCE_KIND: char = 'F';

/// Where an entry's definition lives inside its file.
/// Exactly one of the two forms is recorded in the address field of a tag line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    /// Explicit 1-based line number. `0` means no usable line was recorded.
    LineNumber(u32),
    /// Search pattern with its `/` delimiters removed and escapes undone.
    /// `^` and `$` anchors are kept verbatim.
    Pattern(String),
}

/// A snapshot of a cursor location, saved before a jump so it can be undone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JumpStackEntry {
    /// Zero-based character column.
    pub column: u32,
    /// Document identifier, normally an absolute file path.
    pub document: String,
    /// Zero-based line.
    pub line: u32,
}

/// A concrete navigation target inside a source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPosition {
    /// Zero-based character column.
    pub column: u32,
    /// Absolute path of the file.
    pub file: PathBuf,
    /// Zero-based line.
    pub line: u32,
}

/// One record of a tags index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    /// Line number or search pattern locating the definition.
    pub address: Address,
    /// Source file; absolute once returned by the searcher.
    pub file: PathBuf,
    /// Single-letter classification (function, macro, file, ...), if recorded.
    pub kind: Option<char>,
    /// The `line:N` extension field, when the generator emitted one.
    pub line_hint: Option<u32>,
    /// Symbol name. Never empty.
    pub name: String,
}

impl TagEntry {
    /// The line number the entry carries, `0` when it only has a pattern.
    pub fn effective_line(&self) -> u32 {
        return match self.address {
            Address::LineNumber(n) => n,
            Address::Pattern(_) => self.line_hint.unwrap_or(0),
        };
    }

    /// Whole-file entries take their position from the text around the cursor.
    pub fn is_file_reference(&self) -> bool {
        return self.kind == Some(FILE_REFERENCE_KIND);
    }

    /// The pattern text, or `Line N` for numeric addresses. Used in pick lists.
    pub fn address_detail(&self) -> String {
        return match &self.address {
            Address::LineNumber(n) => format!("Line {n}"),
            Address::Pattern(p) => p.clone(),
        };
    }
}
