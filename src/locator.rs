//! Nearest-ancestor lookup of the tags index.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;

/// A discovered tags file and the directory its relative paths are based on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagIndex {
    /// Absolute path of the tags file.
    pub path: PathBuf,
    /// Parent directory of the tags file.
    pub root: PathBuf,
}

/// Find the tags file nearest to `start`.
///
/// The search begins at `start` when it is a directory, otherwise at its
/// parent, and walks up to the filesystem root. In each directory the names in
/// `tag_files` are tried in order; the first regular file wins.
///
/// # Errors
///
/// Returns `Error::IndexNotFound` if no directory on the way up holds one,
/// or `Error::Io` if `start` cannot be made absolute.
pub fn locate(start: &Path, tag_files: &[String]) -> Result<TagIndex, Error> {
    let absolute = std::path::absolute(start)?;
    let first_dir = if absolute.is_dir() {
        absolute.as_path()
    } else {
        absolute.parent().unwrap_or(absolute.as_path())
    };

    for dir in first_dir.ancestors() {
        for name in tag_files {
            let candidate = dir.join(name);
            if candidate.is_file() {
                debug!(tags = %candidate.display(), "found tags file");
                return Ok(TagIndex {
                    path: candidate,
                    root: dir.to_path_buf(),
                });
            }
        }
    }

    return Err(Error::IndexNotFound {
        start: first_dir.to_path_buf(),
    });
}
