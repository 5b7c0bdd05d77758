//! Picking one candidate out of many: the zero/one/many policy and the choosers behind it.

use std::io::{BufRead, Write};

use tracing::{debug, warn};

use crate::types::{ResolvedPosition, TagEntry};

/// One row of a pick list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Secondary text shown next to the label.
    pub description: String,
    /// Extra line of context.
    pub detail: String,
    /// Primary text.
    pub label: String,
}

/// Outcome of disambiguation.
#[derive(Debug, PartialEq, Eq)]
pub enum Choice<T> {
    /// There were several candidates and none was picked.
    Cancelled,
    /// There was nothing to choose from.
    NotFound,
    /// The single candidate, or the one the chooser picked.
    Selected(T),
}

/// Asks someone to pick among several candidates.
pub trait Chooser {
    /// Return the index of the picked item, or `None` if the user declined.
    fn choose(&mut self, prompt: &str, items: &[Candidate]) -> Option<usize>;
}

/// Declines every choice. Used when prompting is turned off.
#[derive(Debug, Default)]
pub struct DecliningChooser;

/// Values that can be shown in a pick list.
pub trait Labeled {
    fn candidate(&self) -> Candidate;
}

/// A line found by scanning for a tag pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// The tag's pattern; empty for line-number addresses.
    pub pattern: String,
    /// Where the pattern matched.
    pub position: ResolvedPosition,
}

/// Prints a numbered list and reads a 1-based choice.
pub struct TerminalChooser<R, W> {
    /// Where the answer is read from.
    input: R,
    /// Where the list is written.
    output: W,
}

impl Chooser for DecliningChooser {
    fn choose(&mut self, prompt: &str, items: &[Candidate]) -> Option<usize> {
        debug!(prompt, candidates = items.len(), "prompting disabled, declining");
        return None;
    }
}

impl Labeled for PatternMatch {
    fn candidate(&self) -> Candidate {
        let mut candidate = self.position.candidate();
        if !self.pattern.is_empty() {
            candidate.description = format!("{} {}", self.pattern, candidate.description);
        }
        return candidate;
    }
}

impl Labeled for ResolvedPosition {
    fn candidate(&self) -> Candidate {
        let line = self.line.saturating_add(1);
        return Candidate {
            description: format!("Line {line} at {}", self.column),
            detail: self.file.display().to_string(),
            label: line.to_string(),
        };
    }
}

impl Labeled for TagEntry {
    fn candidate(&self) -> Candidate {
        return Candidate {
            description: self.kind.map(String::from).unwrap_or_default(),
            detail: self.address_detail(),
            label: self.file.display().to_string(),
        };
    }
}

impl<R: BufRead, W: Write> Chooser for TerminalChooser<R, W> {
    fn choose(&mut self, prompt: &str, items: &[Candidate]) -> Option<usize> {
        if let Err(e) = self.write_list(prompt, items) {
            warn!("cannot show choices: {e}");
            return None;
        }

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => return None,
            Ok(_) => {},
        }

        let picked: usize = answer.trim().parse().ok()?;
        return picked.checked_sub(1).filter(|i| return *i < items.len());
    }
}

impl<R: BufRead, W: Write> TerminalChooser<R, W> {
    pub const fn new(input: R, output: W) -> Self {
        return Self { input, output };
    }

    fn write_list(&mut self, prompt: &str, items: &[Candidate]) -> std::io::Result<()> {
        writeln!(self.output, "{prompt}")?;
        for (i, item) in items.iter().enumerate() {
            let n = i.saturating_add(1);
            if item.description.is_empty() {
                writeln!(self.output, "  {n:>3}. {}", item.label)?;
            } else {
                writeln!(self.output, "  {n:>3}. {}  ({})", item.label, item.description)?;
            }
            writeln!(self.output, "       {}", item.detail)?;
        }
        write!(self.output, "Pick 1-{} (empty to cancel): ", items.len())?;
        self.output.flush()?;
        return Ok(());
    }
}

/// Apply the zero/one/many policy: nothing → `NotFound`, one → selected
/// without asking, several → the chooser decides, and declining (or an
/// out-of-range answer) → `Cancelled`.
pub fn choose<T: Labeled>(candidates: Vec<T>, prompt: &str, chooser: &mut dyn Chooser) -> Choice<T> {
    if candidates.len() < 2 {
        return candidates
            .into_iter()
            .next()
            .map_or(Choice::NotFound, Choice::Selected);
    }

    let items: Vec<Candidate> = candidates.iter().map(Labeled::candidate).collect();
    let Some(index) = chooser.choose(prompt, &items) else {
        debug!("choice cancelled");
        return Choice::Cancelled;
    };

    return candidates
        .into_iter()
        .nth(index)
        .map_or(Choice::Cancelled, Choice::Selected);
}

#[cfg(test)]
#[allow(clippy::missing_panics_doc, reason = "tests")]
mod tests {
    use std::path::PathBuf;

    use super::*;

    /// Records what it was shown and answers from a script.
    struct ScriptedChooser {
        answer: Option<usize>,
        shown: Vec<Vec<Candidate>>,
    }

    impl Chooser for ScriptedChooser {
        fn choose(&mut self, _prompt: &str, items: &[Candidate]) -> Option<usize> {
            self.shown.push(items.to_vec());
            return self.answer;
        }
    }

    fn position(line: u32) -> ResolvedPosition {
        return ResolvedPosition {
            column: 0,
            file: PathBuf::from("/proj/a.c"),
            line,
        };
    }

    #[test]
    fn zero_candidates_is_not_found() {
        let mut chooser = ScriptedChooser { answer: Some(0), shown: Vec::new() };
        assert_eq!(choose(Vec::<ResolvedPosition>::new(), "pick", &mut chooser), Choice::NotFound);
        assert!(chooser.shown.is_empty());
    }

    #[test]
    fn single_candidate_skips_the_chooser() {
        let mut chooser = ScriptedChooser { answer: None, shown: Vec::new() };
        assert_eq!(choose(vec![position(3)], "pick", &mut chooser), Choice::Selected(position(3)));
        assert!(chooser.shown.is_empty());
    }

    #[test]
    fn many_candidates_go_to_the_chooser() {
        let mut chooser = ScriptedChooser { answer: Some(2), shown: Vec::new() };
        let picked = choose(vec![position(1), position(5), position(9)], "pick", &mut chooser);
        assert_eq!(picked, Choice::Selected(position(9)));
        assert_eq!(chooser.shown.len(), 1);
        assert_eq!(chooser.shown[0].len(), 3);
        assert_eq!(chooser.shown[0][1].label, "6");
    }

    #[test]
    fn declined_or_bogus_choice_is_cancelled() {
        let mut declined = ScriptedChooser { answer: None, shown: Vec::new() };
        assert_eq!(choose(vec![position(1), position(2)], "pick", &mut declined), Choice::Cancelled);

        let mut bogus = ScriptedChooser { answer: Some(7), shown: Vec::new() };
        assert_eq!(choose(vec![position(1), position(2)], "pick", &mut bogus), Choice::Cancelled);
    }

    #[test]
    fn terminal_chooser_reads_one_based_index() {
        let mut output = Vec::new();
        let items = vec![position(1).candidate(), position(2).candidate()];

        let picked = TerminalChooser::new("2\n".as_bytes(), &mut output).choose("Where?", &items);
        assert_eq!(picked, Some(1));

        let shown = String::from_utf8(output).unwrap();
        assert!(shown.starts_with("Where?\n"));
        assert!(shown.contains("    2. 3  (Line 3 at 0)"));
    }

    #[test]
    fn terminal_chooser_declines_on_empty_or_garbage() {
        let items = vec![position(1).candidate(), position(2).candidate()];
        for input in ["", "\n", "x\n", "0\n", "3\n"] {
            let picked = TerminalChooser::new(input.as_bytes(), Vec::new()).choose("Where?", &items);
            assert_eq!(picked, None, "input {input:?}");
        }
    }

    #[test]
    fn entry_labels() {
        let entry = TagEntry {
            address: crate::types::Address::Pattern("^int main()$".to_string()),
            file: PathBuf::from("/proj/a.c"),
            kind: Some('f'),
            line_hint: None,
            name: "main".to_string(),
        };
        let candidate = entry.candidate();
        assert_eq!(candidate.label, "/proj/a.c");
        assert_eq!(candidate.description, "f");
        assert_eq!(candidate.detail, "^int main()$");
    }

    #[test]
    fn pattern_matches_describe_pattern_and_position() {
        let found = PatternMatch {
            pattern: "^int dup;$".to_string(),
            position: ResolvedPosition {
                column: 4,
                file: PathBuf::from("/proj/a.c"),
                line: 9,
            },
        };
        let candidate = found.candidate();
        assert_eq!(candidate.label, "10");
        assert_eq!(candidate.description, "^int dup;$ Line 10 at 4");

        let bare = PatternMatch {
            pattern: String::new(),
            ..found
        };
        assert_eq!(bare.candidate().description, "Line 10 at 4");
    }
}
