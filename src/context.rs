//! The caller's side of a lookup: where the cursor is and what text surrounds it.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Error;
use crate::types::JumpStackEntry;

/// `FILE[:LINE[:COL]]`, lazily matched so drive letters stay in the file part.
static POSITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    return Regex::new(r"^(?P<file>.+?)(?::(?P<line>\d+))?(?::(?P<col>\d+))?$").expect("valid regex");
});

/// The document the lookup was triggered from, with the triggering selection.
#[derive(Debug, Clone)]
pub struct ContextDocument {
    /// Every line of the document, terminators stripped.
    pub lines: Vec<String>,
    /// Absolute path of the document.
    pub path: PathBuf,
    /// Range of the triggering text.
    pub selection: Selection,
}

/// A cursor position as given on the command line, converted to 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    /// Zero-based character column.
    pub column: u32,
    /// File the cursor is in.
    pub file: PathBuf,
    /// Zero-based line.
    pub line: u32,
}

/// A character range on one line. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Zero-based column just past the selection.
    pub end: u32,
    /// Zero-based line.
    pub line: u32,
    /// Zero-based first column.
    pub start: u32,
}

/// Everything the navigator knows about where a lookup came from.
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    /// Position pushed onto the jump stack before a successful jump.
    pub cursor: Option<JumpStackEntry>,
    /// Text around the cursor, for whole-file entries.
    pub document: Option<ContextDocument>,
}

impl ContextDocument {
    /// Read `cursor.file` and select the word under the cursor
    /// (an empty selection at the cursor when there is none).
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailure` if the file cannot be read, or
    /// `Error::Io` if its path cannot be made absolute.
    pub fn load(cursor: &Cursor) -> Result<Self, Error> {
        let bytes = std::fs::read(&cursor.file).map_err(|source| {
            return Error::ReadFailure {
                path: cursor.file.clone(),
                source,
            };
        })?;
        let lines: Vec<String> = String::from_utf8_lossy(&bytes)
            .lines()
            .map(|l| return l.trim_end_matches('\r').to_string())
            .collect();

        let line_text = usize::try_from(cursor.line)
            .ok()
            .and_then(|i| return lines.get(i))
            .map_or("", String::as_str);
        let selection = match word_range(line_text, cursor.column) {
            Some((start, end)) => Selection {
                end,
                line: cursor.line,
                start,
            },
            None => Selection {
                end: cursor.column,
                line: cursor.line,
                start: cursor.column,
            },
        };

        return Ok(Self {
            lines,
            path: std::path::absolute(&cursor.file)?,
            selection,
        });
    }

    /// The selected text, trimmed. Empty when nothing usable is selected.
    pub fn selected_text(&self) -> String {
        let Some(line) = self.line_text(self.selection.line) else {
            return String::new();
        };
        return char_slice(line, self.selection.start, self.selection.end).trim().to_string();
    }

    /// Read a `LINE[:COL]` reference written right after the selection, as in
    /// `foo.h:12:5`. Both numbers are 1-based in the text; the result is
    /// 0-based. `None` when no number follows.
    pub fn file_position_after_selection(&self) -> Option<(u32, u32)> {
        let line_text = self.line_text(self.selection.line)?;

        let (line_start, line_end) = word_range(line_text, self.selection.end.saturating_add(1))?;
        let line = leading_number(&char_slice(line_text, line_start, line_end))?;

        let column = word_range(line_text, line_end.saturating_add(1))
            .and_then(|(start, end)| return leading_number(&char_slice(line_text, start, end)))
            .unwrap_or(1);

        return Some((line.saturating_sub(1), column.saturating_sub(1)));
    }

    fn line_text(&self, line: u32) -> Option<&str> {
        let index = usize::try_from(line).ok()?;
        return self.lines.get(index).map(String::as_str);
    }
}

impl Cursor {
    /// Parse `FILE[:LINE[:COL]]` with 1-based numbers; missing parts mean 1.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPosition` for an empty file part, a zero, or a
    /// number that does not fit.
    pub fn parse(input: &str) -> Result<Self, Error> {
        let invalid = |reason: &str| {
            return Error::InvalidPosition {
                input: input.to_string(),
                reason: reason.to_string(),
            };
        };

        let caps = POSITION_PATTERN
            .captures(input)
            .ok_or_else(|| return invalid("expected FILE[:LINE[:COL]]"))?;
        let file = caps.name("file").map_or("", |m| return m.as_str());
        if file.is_empty() {
            return Err(invalid("missing file"));
        }

        let number = |group: &str| -> Result<u32, Error> {
            let Some(m) = caps.name(group) else {
                return Ok(0);
            };
            let n: u32 = m.as_str().parse().map_err(|_err| return invalid("number out of range"))?;
            return n.checked_sub(1).ok_or_else(|| return invalid("lines and columns start at 1"));
        };

        return Ok(Self {
            column: number("col")?,
            file: PathBuf::from(file),
            line: number("line")?,
        });
    }
}

impl SourceContext {
    /// Context for a cursor in a file on disk: the cursor becomes the
    /// jump-back position and the file becomes the context document.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailure` if the file cannot be read.
    pub fn at(cursor: &Cursor) -> Result<Self, Error> {
        let document = ContextDocument::load(cursor)?;
        let entry = JumpStackEntry {
            column: cursor.column,
            document: document.path.display().to_string(),
            line: cursor.line,
        };
        return Ok(Self {
            cursor: Some(entry),
            document: Some(document),
        });
    }

    /// Where to start looking for the tags index.
    pub fn search_start(&self, fallback: &Path) -> PathBuf {
        return self
            .document
            .as_ref()
            .map_or_else(|| return fallback.to_path_buf(), |d| return d.path.clone());
    }

    /// The symbol to look up when none was given: the selection.
    pub fn symbol(&self) -> Option<String> {
        let text = self.document.as_ref()?.selected_text();
        return if text.is_empty() { None } else { Some(text) };
    }
}

/// Characters `start..end` of `line`, by char index.
fn char_slice(line: &str, start: u32, end: u32) -> String {
    let start = usize::try_from(start).unwrap_or(usize::MAX);
    let end = usize::try_from(end).unwrap_or(usize::MAX);
    return line
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect();
}

fn is_word_char(c: char) -> bool {
    return c.is_ascii_alphanumeric() || c == '_';
}

/// The digits a word starts with, if any.
fn leading_number(word: &str) -> Option<u32> {
    let digits: String = word.chars().take_while(char::is_ascii_digit).collect();
    return digits.parse().ok();
}

/// The identifier run containing or touching `column`, as a char range.
fn word_range(line: &str, column: u32) -> Option<(u32, u32)> {
    let chars: Vec<char> = line.chars().collect();
    let column = usize::try_from(column).ok()?;

    let at = chars.get(column).copied().is_some_and(is_word_char);
    let before = column
        .checked_sub(1)
        .and_then(|i| return chars.get(i))
        .copied()
        .is_some_and(is_word_char);
    if !at && !before {
        return None;
    }

    let mut start = if at { column } else { column.saturating_sub(1) };
    while start > 0 && chars.get(start.saturating_sub(1)).copied().is_some_and(is_word_char) {
        start = start.saturating_sub(1);
    }
    let mut end = start;
    while chars.get(end).copied().is_some_and(is_word_char) {
        end = end.saturating_add(1);
    }

    return Some((u32::try_from(start).ok()?, u32::try_from(end).ok()?));
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    fn document(line: &str, start: u32, end: u32) -> ContextDocument {
        return ContextDocument {
            lines: vec![line.to_string()],
            path: PathBuf::from("/proj/doc.txt"),
            selection: Selection { end, line: 0, start },
        };
    }

    #[test]
    fn parses_full_position() {
        let cursor = Cursor::parse("src/a.c:12:5").unwrap();
        assert_eq!(
            cursor,
            Cursor {
                column: 4,
                file: PathBuf::from("src/a.c"),
                line: 11,
            }
        );
    }

    #[test]
    fn parses_partial_positions() {
        assert_eq!(Cursor::parse("a.c").unwrap().line, 0);
        assert_eq!(Cursor::parse("a.c:3").unwrap().line, 2);
        assert_eq!(Cursor::parse(r"C:\src\a.c:3:2").unwrap().file, PathBuf::from(r"C:\src\a.c"));
    }

    #[test]
    fn rejects_zero_and_empty() {
        assert!(matches!(Cursor::parse("a.c:0"), Err(Error::InvalidPosition { .. })));
        assert!(matches!(Cursor::parse(""), Err(Error::InvalidPosition { .. })));
    }

    #[test]
    fn word_under_and_after_cursor() {
        assert_eq!(word_range("int main(void)", 5), Some((4, 8)));
        assert_eq!(word_range("int main(void)", 8), Some((4, 8)));
        assert_eq!(word_range("a  b", 2), None);
        assert_eq!(word_range("", 0), None);
    }

    #[test]
    fn words_are_ascii_identifiers() {
        assert_eq!(word_range("x = größe_1;", 6), Some((4, 6)));
        assert_eq!(word_range("héllo", 0), Some((0, 1)));
        assert_eq!(word_range("a_b9 c", 2), Some((0, 4)));
    }

    #[test]
    fn reads_line_and_column_after_selection() {
        let doc = document("see foo.h:12:5 here", 4, 9);
        assert_eq!(doc.file_position_after_selection(), Some((11, 4)));
    }

    #[test]
    fn column_is_optional() {
        let doc = document("foo.h:7", 0, 5);
        assert_eq!(doc.file_position_after_selection(), Some((6, 0)));
    }

    #[test]
    fn no_number_after_selection() {
        let doc = document("foo.h is here", 0, 5);
        assert_eq!(doc.file_position_after_selection(), None);
    }

    #[test]
    fn loads_document_and_selects_word() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        std::fs::write(&path, "int x;\nreturn helper(x);\n").unwrap();

        let cursor = Cursor {
            column: 9,
            file: path,
            line: 1,
        };
        let context = SourceContext::at(&cursor).unwrap();
        assert_eq!(context.symbol().as_deref(), Some("helper"));
        assert_eq!(context.cursor.unwrap().line, 1);
    }
}
