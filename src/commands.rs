//! CLI command bodies: find, defs, back, stack, clear, generate.

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use tracing::{debug, info};

use crate::config::Config;
use crate::context::{Cursor, SourceContext};
use crate::diagnostics;
use crate::disambiguate::{Chooser, DecliningChooser, TerminalChooser};
use crate::error;
use crate::jumpstack::{JsonStateFile, JumpStack};
use crate::lines::{CancelToken, FileLines};
use crate::navigator::{self, NavigationResult, Navigator};
use crate::types::{JumpStackEntry, ResolvedPosition};

/// Exit code when the lookup found nothing, or the stack was empty.
const EXIT_NOT_FOUND: u8 = 1;
/// Exit code when there is no tags file.
const EXIT_NO_INDEX: u8 = 2;
/// Exit code when a choice was declined.
const EXIT_CANCELLED: u8 = 3;
/// Exit code for errors: bad arguments or config, unreadable files, corrupt state.
pub const EXIT_ERROR: u8 = 4;

/// What `find` and `defs` look up, and where from.
pub struct LookupRequest<'a> {
    /// `FILE:LINE:COL` of the caller's cursor.
    pub at: Option<&'a str>,
    /// Print JSON instead of `file:line:col`.
    pub json: bool,
    /// Explicit symbol; otherwise the word under the cursor.
    pub symbol: Option<&'a str>,
}

/// Project root, its config, and the state file the jump stack lives in.
struct Project {
    /// Loaded `.tagjump.toml`.
    config: Config,
    /// The current directory.
    root: PathBuf,
    /// Jump stack storage.
    store: JsonStateFile,
}

impl Project {
    /// Load config from the current directory. `state` overrides the
    /// configured state file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the current directory is unavailable, or
    /// config loading errors.
    fn load(state: Option<&Path>) -> Result<Self, error::Error> {
        let root = std::env::current_dir()?;
        let config = Config::load(&root)?;
        let state_path = state.map_or_else(|| return config.state_path(&root), Path::to_path_buf);
        debug!(state = %state_path.display(), "using state file");
        return Ok(Self {
            config,
            root,
            store: JsonStateFile::new(state_path),
        });
    }
}

/// Pop the jump stack and print where to return to.
///
/// # Errors
///
/// Returns errors from config or state file access.
pub fn back(json: bool, state: Option<&Path>) -> Result<ExitCode, error::Error> {
    let mut project = Project::load(state)?;
    let mut stack = JumpStack::load(&project.store)?;

    let Some(entry) = navigator::jump_back(&mut stack) else {
        eprintln!("Jump stack is empty");
        return Ok(ExitCode::from(EXIT_NOT_FOUND));
    };
    stack.save(&mut project.store)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("{}", format_entry(&entry));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Empty the jump stack.
///
/// # Errors
///
/// Returns errors from config or state file access.
pub fn clear(state: Option<&Path>) -> Result<ExitCode, error::Error> {
    let mut project = Project::load(state)?;
    // Clearing rewrites a corrupt state file.
    let mut stack = match JumpStack::load(&project.store) {
        Err(error::Error::StateCorrupt { .. }) => JumpStack::default(),
        other => other?,
    };
    stack.clear();
    stack.save(&mut project.store)?;
    println!("Cleared jump stack");
    return Ok(ExitCode::SUCCESS);
}

/// Print every definition of the symbol without prompting or touching history.
///
/// # Errors
///
/// Returns errors from config loading, position parsing, or index reading.
pub fn defs(request: &LookupRequest<'_>) -> Result<ExitCode, error::Error> {
    let project = Project::load(None)?;
    let context = source_context(request.at)?;
    let query = lookup_query(request.symbol, &context)?;

    let mut chooser = DecliningChooser;
    let navigator = Navigator::new(&project.root, &project.config.tag_files, &FileLines, &mut chooser);
    let positions = match navigator.definitions(&query, &context, &CancelToken::new()) {
        Err(error::Error::IndexNotFound { start }) => {
            diagnostics::print_outcome(&NavigationResult::NoIndex { start });
            return Ok(ExitCode::from(EXIT_NO_INDEX));
        },
        Err(e) => return Err(e),
        Ok(found) => found,
    };

    if request.json {
        println!("{}", serde_json::to_string_pretty(&positions)?);
    } else {
        for position in &positions {
            println!("{}", format_position(position));
        }
    }

    if positions.is_empty() {
        diagnostics::print_outcome(&NavigationResult::NoMatches { symbol: query });
        return Ok(ExitCode::from(EXIT_NOT_FOUND));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Look a symbol up, ask when it is ambiguous, and print the target.
/// A successful jump records the `--at` position on the jump stack.
///
/// # Errors
///
/// Returns errors from config loading, position parsing, index or source
/// reading, or state file access.
pub fn find(request: &LookupRequest<'_>, prompt: bool, state: Option<&Path>) -> Result<ExitCode, error::Error> {
    let mut project = Project::load(state)?;
    let context = source_context(request.at)?;
    let query = lookup_query(request.symbol, &context)?;
    let mut stack = JumpStack::load(&project.store)?;

    let mut chooser: Box<dyn Chooser> = if prompt {
        Box::new(TerminalChooser::new(std::io::stdin().lock(), std::io::stderr()))
    } else {
        Box::new(DecliningChooser)
    };
    let result = Navigator::new(&project.root, &project.config.tag_files, &FileLines, chooser.as_mut())
        .navigate(&query, &context, &mut stack, &CancelToken::new())?;

    if matches!(result, NavigationResult::Resolved { .. }) {
        stack.save(&mut project.store)?;
    }

    if request.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if let NavigationResult::Resolved { position } = &result {
        println!("{}", format_position(position));
    } else {
        diagnostics::print_outcome(&result);
    }

    return Ok(match result {
        NavigationResult::Cancelled => ExitCode::from(EXIT_CANCELLED),
        NavigationResult::NoIndex { .. } => ExitCode::from(EXIT_NO_INDEX),
        NavigationResult::NoMatches { .. } => ExitCode::from(EXIT_NOT_FOUND),
        NavigationResult::Resolved { .. } => ExitCode::SUCCESS,
    });
}

/// `document:line:col`, 1-based.
fn format_entry(entry: &JumpStackEntry) -> String {
    return format!(
        "{}:{}:{}",
        entry.document,
        entry.line.saturating_add(1),
        entry.column.saturating_add(1)
    );
}

/// `file:line:col`, 1-based, the form editors and terminals link.
fn format_position(position: &ResolvedPosition) -> String {
    return format!(
        "{}:{}:{}",
        position.file.display(),
        position.line.saturating_add(1),
        position.column.saturating_add(1)
    );
}

/// Run the configured tags generator in the project root.
///
/// # Errors
///
/// Returns `Error::GenerateFailed` if the generator cannot start or fails.
pub fn generate() -> Result<ExitCode, error::Error> {
    let project = Project::load(None)?;
    let generator = &project.config.generate;
    info!(command = %generator.command, args = ?generator.args, "generating tags");

    let status = Command::new(&generator.command)
        .args(&generator.args)
        .current_dir(&project.root)
        .status()
        .map_err(|e| {
            return error::Error::GenerateFailed {
                command: generator.command.clone(),
                reason: format!("could not start: {e}"),
            };
        })?;

    if !status.success() {
        return Err(error::Error::GenerateFailed {
            command: generator.command.clone(),
            reason: format!("exited with {status}"),
        });
    }

    println!("Regenerated tags with `{}`", generator.command);
    return Ok(ExitCode::SUCCESS);
}

/// The explicit symbol, else the word under the cursor.
///
/// # Errors
///
/// Returns `Error::EmptyQuery` when neither is available.
fn lookup_query(symbol: Option<&str>, context: &SourceContext) -> Result<String, error::Error> {
    return symbol
        .map(str::trim)
        .filter(|s| return !s.is_empty())
        .map(str::to_string)
        .or_else(|| return context.symbol())
        .ok_or(error::Error::EmptyQuery);
}

/// Build the lookup context from an optional `--at` argument.
///
/// # Errors
///
/// Returns `Error::InvalidPosition` or `Error::ReadFailure`.
fn source_context(at: Option<&str>) -> Result<SourceContext, error::Error> {
    let Some(raw) = at else {
        return Ok(SourceContext::default());
    };
    let cursor = Cursor::parse(raw)?;
    return SourceContext::at(&cursor);
}

/// Print the jump stack, oldest first.
///
/// # Errors
///
/// Returns errors from config or state file access.
pub fn stack(state: Option<&Path>) -> Result<ExitCode, error::Error> {
    let project = Project::load(state)?;
    let stack = JumpStack::load(&project.store)?;

    if stack.is_empty() {
        println!("Jump stack is empty");
        return Ok(ExitCode::SUCCESS);
    }
    for (i, entry) in stack.entries().enumerate() {
        println!("{:>3}  {}", i.saturating_add(1), format_entry(entry));
    }
    return Ok(ExitCode::SUCCESS);
}
