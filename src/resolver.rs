use std::ops::ControlFlow;

use tracing::{debug, warn};

use crate::context::ContextDocument;
use crate::error::Error;
use crate::lines::{CancelToken, LineSource};
use crate::types::{Address, ResolvedPosition, TagEntry};

/// How a line must relate to a tag pattern to count as a match.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LineMatcher {
    /// Anchored with `$`: the line must equal `text`.
    full_line: bool,
    /// Pattern text with its anchors removed.
    text: String,
}

impl LineMatcher {
    fn matches(&self, line: &str) -> bool {
        if self.full_line {
            return line == self.text;
        }
        return line.starts_with(&self.text);
    }

    /// Build a matcher from a raw tag pattern.
    ///
    /// # Errors
    ///
    /// Returns `Error::UnsupportedPattern` if the pattern is not anchored
    /// at the line start with `^`.
    fn parse(pattern: &str) -> Result<Self, Error> {
        let Some(body) = pattern.strip_prefix('^') else {
            return Err(Error::UnsupportedPattern {
                pattern: pattern.to_string(),
            });
        };
        return Ok(match body.strip_suffix('$') {
            Some(text) => Self {
                full_line: true,
                text: text.to_string(),
            },
            None => Self {
                full_line: false,
                text: body.to_string(),
            },
        });
    }
}

/// Turns tag entries into concrete positions, reading source files through `L`.
pub struct AddressResolver<'a, L: LineSource> {
    /// Line supplier for pattern scans.
    lines: &'a L,
}

impl<'a, L: LineSource> AddressResolver<'a, L> {
    pub const fn new(lines: &'a L) -> Self {
        return Self { lines };
    }

    /// Resolve one entry to zero or more positions, in file order.
    ///
    /// Entries without a usable line number are located by scanning for
    /// their pattern; whole-file entries take the `LINE:COL` written after
    /// the triggering selection in `context`; everything else lands on its
    /// recorded line. Unsupported patterns and patterns matching nothing
    /// yield an empty result. A cancelled scan returns what it had found.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailure` if the entry's file cannot be read.
    pub fn resolve(
        &self,
        entry: &TagEntry,
        context: Option<&ContextDocument>,
        cancel: &CancelToken,
    ) -> Result<Vec<ResolvedPosition>, Error> {
        let line = entry.effective_line();

        if line == 0 {
            let Address::Pattern(pattern) = &entry.address else {
                warn!(name = %entry.name, "tag has neither a line number nor a pattern");
                return Ok(Vec::new());
            };
            return self.resolve_pattern(entry, pattern, cancel);
        }

        if entry.is_file_reference()
            && let Some(document) = context
        {
            return Ok(resolve_file_reference(entry, document));
        }

        return Ok(vec![ResolvedPosition {
            column: 0,
            file: entry.file.clone(),
            line: line.saturating_sub(1),
        }]);
    }

    /// Scan the entry's file for every line matching `pattern`.
    fn resolve_pattern(
        &self,
        entry: &TagEntry,
        pattern: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<ResolvedPosition>, Error> {
        let matcher = match LineMatcher::parse(pattern) {
            Ok(m) => m,
            Err(e) => {
                warn!(file = %entry.file.display(), "{e}");
                return Ok(Vec::new());
            },
        };

        let mut found = Vec::new();
        self.lines.for_each_line(&entry.file, &mut |line, number| {
            if cancel.is_cancelled() {
                debug!(file = %entry.file.display(), "pattern scan cancelled");
                return ControlFlow::Break(());
            }
            if matcher.matches(line) {
                let column = column_of(line, &entry.name);
                debug!(line = number, column, "pattern matched");
                found.push(ResolvedPosition {
                    column,
                    file: entry.file.clone(),
                    line: number.saturating_sub(1),
                });
            }
            return ControlFlow::Continue(());
        })?;

        if found.is_empty() && !cancel.is_cancelled() {
            warn!(file = %entry.file.display(), pattern, "no line matches tag pattern");
        }
        return Ok(found);
    }
}

/// Character offset of `name` in `line`, or 0.
fn column_of(line: &str, name: &str) -> u32 {
    return line
        .find(name)
        .and_then(|byte| return line.get(..byte))
        .map_or(0, |prefix| return u32::try_from(prefix.chars().count()).unwrap_or(0));
}

/// Position named by the `LINE[:COL]` after the triggering selection.
fn resolve_file_reference(entry: &TagEntry, document: &ContextDocument) -> Vec<ResolvedPosition> {
    let Some((line, column)) = document.file_position_after_selection() else {
        debug!(file = %entry.file.display(), "no line number after selection");
        return Vec::new();
    };
    debug!(line = line.saturating_add(1), column = column.saturating_add(1), "resolved file position");
    return vec![ResolvedPosition {
        column,
        file: entry.file.clone(),
        line,
    }];
}
