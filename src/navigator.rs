//! Orchestration of a lookup: locate, search, choose, resolve, record history.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::SourceContext;
use crate::disambiguate::{self, Choice, Chooser, PatternMatch};
use crate::error::Error;
use crate::jumpstack::JumpStack;
use crate::lines::{CancelToken, LineSource};
use crate::locator::{self, TagIndex};
use crate::resolver::AddressResolver;
use crate::searcher;
use crate::types::{Address, JumpStackEntry, ResolvedPosition, TagEntry};

/// What a lookup ended in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NavigationResult {
    /// Several candidates were offered and none was picked.
    Cancelled,
    /// No tags file was found.
    NoIndex {
        /// Where the upward search began.
        start: PathBuf,
    },
    /// The index has no usable entry for the symbol.
    NoMatches {
        /// The symbol that was looked up.
        symbol: String,
    },
    /// The jump target. The caller's position has been pushed.
    Resolved {
        /// Where to go.
        position: ResolvedPosition,
    },
}

/// Runs lookups against the tags index nearest to the caller.
pub struct Navigator<'a, L: LineSource> {
    /// Asked whenever more than one candidate remains.
    chooser: &'a mut dyn Chooser,
    /// Line supplier for pattern scans.
    lines: &'a L,
    /// Directory searched when the context has no document.
    root: PathBuf,
    /// Tags file names to look for.
    tag_files: &'a [String],
}

impl<'a, L: LineSource> Navigator<'a, L> {
    pub fn new(root: &Path, tag_files: &'a [String], lines: &'a L, chooser: &'a mut dyn Chooser) -> Self {
        return Self {
            chooser,
            lines,
            root: root.to_path_buf(),
            tag_files,
        };
    }

    /// Every definition of `query`, without prompting. A failure to read one
    /// entry's file is logged and skipped; the other entries still resolve.
    /// Stops between entries once `cancel` is set.
    ///
    /// # Errors
    ///
    /// Returns `Error::IndexNotFound` if there is no tags file, `Error::Io`
    /// if it cannot be read, or `Error::EmptyQuery` for an empty symbol.
    pub fn definitions(
        &self,
        query: &str,
        context: &SourceContext,
        cancel: &CancelToken,
    ) -> Result<Vec<ResolvedPosition>, Error> {
        let (_index, entries) = self.lookup(query, context)?;
        let resolver = AddressResolver::new(self.lines);
        let mut positions = Vec::new();

        for entry in &entries {
            if cancel.is_cancelled() {
                debug!("definition lookup cancelled");
                break;
            }
            match resolver.resolve(entry, context.document.as_ref(), cancel) {
                Ok(found) => positions.extend(found),
                Err(e) => warn!(file = %entry.file.display(), "skipping tag: {e}"),
            }
        }

        return Ok(positions);
    }

    /// Locate the index and fetch the entries for `query`.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuery`, `Error::IndexNotFound`, or `Error::Io`.
    fn lookup(&self, query: &str, context: &SourceContext) -> Result<(TagIndex, Vec<TagEntry>), Error> {
        if query.is_empty() {
            return Err(Error::EmptyQuery);
        }
        let start = context.search_start(&self.root);
        let index = locator::locate(&start, self.tag_files)?;
        let entries = searcher::search(&index, query)?;
        return Ok((index, entries));
    }

    /// Look `query` up and pick one target.
    ///
    /// When there are several entries the chooser picks one; when its
    /// pattern matches several lines the chooser picks again. Only a
    /// successful lookup pushes the context's cursor onto `stack`, and it
    /// does so once.
    ///
    /// # Errors
    ///
    /// Returns `Error::EmptyQuery` for an empty symbol, `Error::Io` if the
    /// index cannot be read, or `Error::ReadFailure` if the chosen entry's
    /// file cannot be read. A missing index is `NavigationResult::NoIndex`.
    pub fn navigate(
        &mut self,
        query: &str,
        context: &SourceContext,
        stack: &mut JumpStack,
        cancel: &CancelToken,
    ) -> Result<NavigationResult, Error> {
        let (index, entries) = match self.lookup(query, context) {
            Err(Error::IndexNotFound { start }) => {
                info!(start = %start.display(), "no tags file found");
                return Ok(NavigationResult::NoIndex { start });
            },
            Err(e) => return Err(e),
            Ok(found) => found,
        };
        debug!(tags = %index.path.display(), count = entries.len(), "entries found");

        let no_matches = || {
            return NavigationResult::NoMatches {
                symbol: query.to_string(),
            };
        };

        let prompt = format!("{query}: {} tags", entries.len());
        let entry = match disambiguate::choose(entries, &prompt, self.chooser) {
            Choice::Cancelled => return Ok(NavigationResult::Cancelled),
            Choice::NotFound => return Ok(no_matches()),
            Choice::Selected(entry) => entry,
        };

        let positions = AddressResolver::new(self.lines).resolve(&entry, context.document.as_ref(), cancel)?;
        let pattern = match &entry.address {
            Address::LineNumber(_) => String::new(),
            Address::Pattern(p) => p.clone(),
        };
        let matches: Vec<PatternMatch> = positions
            .into_iter()
            .map(|position| {
                return PatternMatch {
                    pattern: pattern.clone(),
                    position,
                };
            })
            .collect();

        let prompt = format!("{query}: {} matching lines in {}", matches.len(), entry.file.display());
        let position = match disambiguate::choose(matches, &prompt, self.chooser) {
            Choice::Cancelled => return Ok(NavigationResult::Cancelled),
            Choice::NotFound => return Ok(no_matches()),
            Choice::Selected(found) => found.position,
        };

        if let Some(cursor) = &context.cursor {
            stack.push(cursor.clone());
        }
        return Ok(NavigationResult::Resolved { position });
    }
}

/// Pop the most recent position off `stack`.
pub fn jump_back(stack: &mut JumpStack) -> Option<JumpStackEntry> {
    let entry = stack.pop();
    if let Some(e) = &entry {
        debug!(document = %e.document, line = e.line, "jumping back");
    }
    return entry;
}
