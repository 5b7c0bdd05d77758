//! Binary search over a sorted tags file.
//!
//! The file is never loaded whole: the search seeks to byte offsets, realigns
//! to the next line start and compares names, so lookups stay logarithmic in
//! the index size.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufRead as _, BufReader, Seek as _, SeekFrom};

use tracing::{debug, warn};

use crate::error::Error;
use crate::locator::TagIndex;
use crate::tagline;
use crate::types::TagEntry;

/// Pseudo-tag announcing how the generator sorted the file.
const SORTED_PSEUDO_TAG: &[u8] = b"!_TAG_FILE_SORTED";

/// How the index was sorted, from its `!_TAG_FILE_SORTED` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortMode {
    /// Sorted on ASCII-uppercased names, as `sort -f` and ctags `--sort=foldcase` do.
    FoldCase,
    /// Sorted byte-wise. Also assumed when the header is absent.
    Sorted,
    /// Not sorted; only a linear scan is correct.
    Unsorted,
}

/// Seekable line access to a tags file.
struct IndexReader {
    /// Total size in bytes.
    len: u64,
    /// Buffered handle; every read starts with a seek.
    reader: BufReader<File>,
}

impl IndexReader {
    /// Offset of the first line starting at or after `pos`, or `len`.
    fn line_start_at_or_after(&mut self, pos: u64) -> std::io::Result<u64> {
        if pos == 0 {
            return Ok(0);
        }
        let before = pos.saturating_sub(1);
        self.reader.seek(SeekFrom::Start(before))?;
        let mut skipped = Vec::new();
        let read = self.reader.read_until(b'\n', &mut skipped)?;
        let read: u64 = read.try_into().unwrap_or(u64::MAX);
        return Ok(before.saturating_add(read).min(self.len));
    }

    /// Open a tags file for searching.
    fn open(index: &TagIndex) -> Result<Self, Error> {
        let file = match File::open(&index.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::IndexNotFound { start: index.root.clone() });
            },
            Err(e) => return Err(Error::Io(e)),
            Ok(f) => f,
        };
        let len = file.metadata()?.len();
        return Ok(Self {
            len,
            reader: BufReader::new(file),
        });
    }

    /// Read the line starting at `pos` without its terminator.
    /// Returns the line and the offset of the next one.
    fn read_line_at(&mut self, pos: u64) -> std::io::Result<(Vec<u8>, u64)> {
        self.reader.seek(SeekFrom::Start(pos))?;
        let mut line = Vec::new();
        let read = self.reader.read_until(b'\n', &mut line)?;
        let read: u64 = read.try_into().unwrap_or(u64::MAX);
        while line.last().is_some_and(|b| return *b == b'\n' || *b == b'\r') {
            line.pop();
        }
        return Ok((line, pos.saturating_add(read)));
    }

    /// Read the leading pseudo-tags. Returns the sort mode and the offset of
    /// the first real entry.
    fn read_header(&mut self) -> std::io::Result<(SortMode, u64)> {
        let mut mode = SortMode::Sorted;
        let mut pos = 0;

        while pos < self.len {
            let (line, next) = self.read_line_at(pos)?;
            if !line.starts_with(b"!_") {
                break;
            }
            if tagline::name_of(&line) == SORTED_PSEUDO_TAG {
                mode = sort_mode_from_pseudo_tag(&line);
            }
            pos = next;
        }

        return Ok((mode, pos));
    }
}

/// Find the offset of the first entry whose name is not less than `query`.
fn binary_search_lower_bound(
    reader: &mut IndexReader,
    mode: SortMode,
    query: &[u8],
    data_start: u64,
) -> std::io::Result<u64> {
    let mut lo = data_start;
    let mut hi = reader.len;

    // Every line starting before `lo` sorts below the query; every line
    // starting at or after `hi` does not.
    while lo < hi {
        let mid = lo.saturating_add(hi.saturating_sub(lo) / 2);
        let start = reader.line_start_at_or_after(mid)?;
        if start >= hi {
            hi = mid;
            continue;
        }
        let (line, next) = reader.read_line_at(start)?;
        if compare_names(mode, tagline::name_of(&line), query) == Ordering::Less {
            lo = next;
        } else {
            hi = start;
        }
    }

    return reader.line_start_at_or_after(lo);
}

/// Binary search, then collect the run of equal names that follows.
fn collect_sorted_matches(
    reader: &mut IndexReader,
    mode: SortMode,
    query: &str,
    data_start: u64,
) -> std::io::Result<Vec<TagEntry>> {
    let mut pos = binary_search_lower_bound(reader, mode, query.as_bytes(), data_start)?;
    let mut entries = Vec::new();

    while pos < reader.len {
        let (line, next) = reader.read_line_at(pos)?;
        let name = tagline::name_of(&line);
        if compare_names(mode, name, query.as_bytes()) != Ordering::Equal {
            break;
        }
        // Folded runs also hold other spellings of the same name.
        if name == query.as_bytes() {
            push_parsed(&mut entries, &line);
        }
        pos = next;
    }

    return Ok(entries);
}

/// Order two names the way the index was sorted.
fn compare_names(mode: SortMode, name: &[u8], query: &[u8]) -> Ordering {
    return match mode {
        SortMode::FoldCase => name
            .iter()
            .map(u8::to_ascii_uppercase)
            .cmp(query.iter().map(u8::to_ascii_uppercase)),
        SortMode::Sorted | SortMode::Unsorted => name.cmp(query),
    };
}

/// Scan every line. Used for unsorted indexes.
fn linear_scan(
    reader: &mut IndexReader,
    query: &str,
    data_start: u64,
) -> std::io::Result<Vec<TagEntry>> {
    let mut pos = data_start;
    let mut entries = Vec::new();

    while pos < reader.len {
        let (line, next) = reader.read_line_at(pos)?;
        if tagline::name_of(&line) == query.as_bytes() {
            push_parsed(&mut entries, &line);
        }
        pos = next;
    }

    return Ok(entries);
}

/// Parse a matching line, skipping it with a warning if it is malformed.
fn push_parsed(entries: &mut Vec<TagEntry>, line: &[u8]) {
    let text = String::from_utf8_lossy(line);
    match tagline::parse(&text) {
        Some(entry) => entries.push(entry),
        None => warn!(line = %text, "skipping malformed tag line"),
    }
}

/// Return every entry named exactly `symbol`, in index order, with relative
/// file paths joined onto the index root.
///
/// An empty result means the index was read and holds no such symbol.
///
/// # Errors
///
/// Returns `Error::IndexNotFound` if the index file vanished since it was
/// located, or `Error::Io` if it cannot be read.
pub fn search(index: &TagIndex, symbol: &str) -> Result<Vec<TagEntry>, Error> {
    let mut reader = IndexReader::open(index)?;
    let (mode, data_start) = reader.read_header()?;
    debug!(tags = %index.path.display(), ?mode, symbol, "searching tags");

    let mut entries = match mode {
        SortMode::FoldCase | SortMode::Sorted => {
            collect_sorted_matches(&mut reader, mode, symbol, data_start)?
        },
        SortMode::Unsorted => linear_scan(&mut reader, symbol, data_start)?,
    };

    for entry in &mut entries {
        if entry.file.is_relative() {
            entry.file = index.root.join(&entry.file);
        }
    }

    debug!(symbol, matches = entries.len(), "search finished");
    return Ok(entries);
}

/// Read the mode digit from a `!_TAG_FILE_SORTED<TAB>N<TAB>...` line.
fn sort_mode_from_pseudo_tag(line: &[u8]) -> SortMode {
    let value = line.split(|b| return *b == b'\t').nth(1).unwrap_or_default();
    return match value {
        b"0" => SortMode::Unsorted,
        b"2" => SortMode::FoldCase,
        _ => SortMode::Sorted,
    };
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::Address;

    /// Write `content` as a tags file in a fresh directory.
    fn index_with(content: &str) -> (tempfile::TempDir, TagIndex) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tags");
        std::fs::write(&path, content).unwrap();
        let index = TagIndex {
            path,
            root: dir.path().to_path_buf(),
        };
        return (dir, index);
    }

    /// Small deterministic generator so fixtures are reproducible.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            return self.0;
        }

        fn name(&mut self) -> String {
            let alphabet = b"abAB_z";
            let len = 1 + self.next() % 4;
            return (0..len)
                .map(|_| return char::from(alphabet[(self.next() % 6) as usize]))
                .collect();
        }
    }

    fn linear(index: &TagIndex, symbol: &str) -> Vec<TagEntry> {
        let mut reader = IndexReader::open(index).unwrap();
        let (_, start) = reader.read_header().unwrap();
        return linear_scan(&mut reader, symbol, start).unwrap();
    }

    #[test]
    fn exact_matches_only_in_file_order() {
        let content = "ma\ta.c\t1\nmain\ta.c\t12;\"\tf\nmain\tb.c\t30;\"\tf\nmain2\tc.c\t4\nmaio\td.c\t5\n";
        let (dir, index) = index_with(content);

        let entries = search(&index, "main").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].file, dir.path().join("a.c"));
        assert_eq!(entries[0].address, Address::LineNumber(12));
        assert_eq!(entries[1].file, dir.path().join("b.c"));
    }

    #[test]
    fn first_and_last_lines_are_found() {
        let content = "alpha\ta.c\t1\nbeta\tb.c\t2\nomega\to.c\t3";
        let (_dir, index) = index_with(content);

        assert_eq!(search(&index, "alpha").unwrap().len(), 1);
        assert_eq!(search(&index, "omega").unwrap().len(), 1);
        assert!(search(&index, "aaa").unwrap().is_empty());
        assert!(search(&index, "zzz").unwrap().is_empty());
    }

    #[test]
    fn empty_index_has_no_matches() {
        let (_dir, index) = index_with("");
        assert!(search(&index, "main").unwrap().is_empty());
    }

    #[test]
    fn pseudo_tags_never_match() {
        let content = "!_TAG_FILE_FORMAT\t2\t/extended format/\n!_TAG_FILE_SORTED\t1\t/0=unsorted, 1=sorted/\nmain\ta.c\t3\n";
        let (_dir, index) = index_with(content);

        assert!(search(&index, "!_TAG_FILE_SORTED").unwrap().is_empty());
        assert_eq!(search(&index, "main").unwrap().len(), 1);
    }

    #[test]
    fn absolute_paths_are_kept() {
        let (_dir, index) = index_with("main\t/abs/a.c\t3\n");
        let entries = search(&index, "main").unwrap();
        assert_eq!(entries[0].file, PathBuf::from("/abs/a.c"));
    }

    #[test]
    fn crlf_line_endings() {
        let (dir, index) = index_with("alpha\ta.c\t1\r\nmain\tm.c\t/^int main()$/\r\nzed\tz.c\t9\r\n");
        let entries = search(&index, "main").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file, dir.path().join("m.c"));
        assert_eq!(entries[0].address, Address::Pattern("^int main()$".to_string()));
    }

    #[test]
    fn malformed_matching_line_is_skipped() {
        let (_dir, index) = index_with("main\tbroken\nmain\ta.c\t3\n");
        assert_eq!(search(&index, "main").unwrap().len(), 1);
    }

    #[test]
    fn unsorted_index_is_scanned() {
        let content = "!_TAG_FILE_SORTED\t0\t/0=unsorted/\nzed\tz.c\t1\nmain\ta.c\t2\nalpha\tb.c\t3\nmain\tc.c\t4\n";
        let (dir, index) = index_with(content);

        let entries = search(&index, "main").unwrap();
        let files: Vec<PathBuf> = entries.into_iter().map(|e| return e.file).collect();
        assert_eq!(files, vec![dir.path().join("a.c"), dir.path().join("c.c")]);
    }

    #[test]
    fn foldcase_index_returns_exact_spelling() {
        let content = "!_TAG_FILE_SORTED\t2\t/2=foldcase/\nalpha\ta.c\t1\nMain\tM.c\t2\nmain\tm.c\t3\nMAIN\tMM.c\t4\nzed\tz.c\t5\n";
        let (dir, index) = index_with(content);

        let entries = search(&index, "main").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file, dir.path().join("m.c"));
        assert_eq!(search(&index, "MAIN").unwrap()[0].file, dir.path().join("MM.c"));
    }

    #[test]
    fn foldcase_orders_underscore_after_letters() {
        // Uppercase folding puts `_` (0x5F) after every letter.
        let mut content = String::from("!_TAG_FILE_SORTED\t2\t/2=foldcase/\naa\taa.c\t1\n");
        for i in 0..10 {
            content.push_str(&format!("ab{i}\tab{i}.c\t1\n"));
        }
        content.push_str("a_b\tunder.c\t7\nzz\tzz.c\t1\n");
        let (dir, index) = index_with(&content);

        let entries = search(&index, "a_b").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file, dir.path().join("under.c"));
        assert_eq!(search(&index, "ab9").unwrap().len(), 1);
        assert_eq!(search(&index, "zz").unwrap().len(), 1);
    }

    #[test]
    fn binary_search_agrees_with_linear_scan() {
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

        for round in 0..40 {
            let count = (rng.next() % 300) as usize;
            let mut names: Vec<(String, usize)> =
                (0..count).map(|i| return (rng.name(), i)).collect();
            let foldcase = round % 4 == 3;
            if foldcase {
                names.sort_by(|a, b| return a.0.to_ascii_uppercase().cmp(&b.0.to_ascii_uppercase()));
            } else {
                names.sort_by(|a, b| return a.0.as_bytes().cmp(b.0.as_bytes()));
            }

            let mut content = String::new();
            for (name, i) in &names {
                content.push_str(&format!("{name}\tf{i}.c\t{}\n", i + 1));
            }
            if foldcase {
                content.insert_str(0, "!_TAG_FILE_SORTED\t2\t/foldcase/\n");
            } else if round % 2 == 0 {
                content.insert_str(0, "!_TAG_FILE_SORTED\t1\t/sorted/\n");
            }
            let (_dir, index) = index_with(&content);

            for _ in 0..20 {
                let query = rng.name();
                let binary = search(&index, &query).unwrap();
                let expected: Vec<TagEntry> = linear(&index, &query)
                    .into_iter()
                    .map(|mut e| {
                        e.file = index.root.join(&e.file);
                        return e;
                    })
                    .collect();
                assert_eq!(binary, expected, "query {query:?} in round {round}");
            }
        }
    }

    #[test]
    fn vanished_index_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let index = TagIndex {
            path: dir.path().join("tags"),
            root: dir.path().to_path_buf(),
        };
        assert!(matches!(search(&index, "main"), Err(Error::IndexNotFound { .. })));
    }
}
