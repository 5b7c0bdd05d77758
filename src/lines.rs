//! Line supply for pattern scans, and the token that cancels them.

use std::fs::File;
use std::io::{BufRead as _, BufReader};
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::Error;

/// Cooperative cancellation flag shared between a scan and whoever may stop it.
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    /// Set once; never reset.
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Ask running scans to stop at their next line boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        return self.cancelled.load(Ordering::Relaxed);
    }

    pub fn new() -> Self {
        return Self::default();
    }
}

/// Reads files on disk line by line.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLines;

/// Something that can hand out the lines of a file in order.
pub trait LineSource {
    /// Call `visitor` with each line (terminator stripped) and its 1-based
    /// number until the file ends or the visitor breaks.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReadFailure` if the file cannot be opened or read.
    /// A visitor that matched nothing is not an error.
    fn for_each_line(
        &self,
        path: &Path,
        visitor: &mut dyn FnMut(&str, u32) -> ControlFlow<()>,
    ) -> Result<(), Error>;
}

impl LineSource for FileLines {
    fn for_each_line(
        &self,
        path: &Path,
        visitor: &mut dyn FnMut(&str, u32) -> ControlFlow<()>,
    ) -> Result<(), Error> {
        let read_failure = |source: std::io::Error| {
            return Error::ReadFailure {
                path: path.to_path_buf(),
                source,
            };
        };

        let file = File::open(path).map_err(read_failure)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut number = 0_u32;

        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).map_err(read_failure)?;
            if read == 0 {
                return Ok(());
            }
            number = number.saturating_add(1);
            while buf.last().is_some_and(|b| return *b == b'\n' || *b == b'\r') {
                buf.pop();
            }
            // Source files are not always UTF-8; match on what we can decode.
            let line = String::from_utf8_lossy(&buf);
            if visitor(&line, number).is_break() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use super::*;

    #[test]
    fn visits_lines_with_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        std::fs::write(&path, "one\r\ntwo\n\nfour").unwrap();

        let mut seen = Vec::new();
        FileLines
            .for_each_line(&path, &mut |line, n| {
                seen.push((line.to_string(), n));
                return ControlFlow::Continue(());
            })
            .unwrap();

        assert_eq!(
            seen,
            vec![
                ("one".to_string(), 1),
                ("two".to_string(), 2),
                (String::new(), 3),
                ("four".to_string(), 4),
            ]
        );
    }

    #[test]
    fn visitor_can_stop_early() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.c");
        std::fs::write(&path, "1\n2\n3\n").unwrap();

        let mut count = 0;
        FileLines
            .for_each_line(&path, &mut |_, n| {
                count += 1;
                return if n == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) };
            })
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn missing_file_is_a_read_failure() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileLines.for_each_line(&dir.path().join("nope.c"), &mut |_, _| {
            return ControlFlow::Continue(());
        });
        assert!(matches!(result, Err(Error::ReadFailure { .. })));
    }

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }
}
