use std::path::Path;

use crate::config::CONFIG_FILE;
use crate::error::Error;
use crate::navigator::NavigationResult;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Print a rendered markdown block to stderr with bold headings.
fn print_markdown(md: &str) {
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    print_markdown(&render_error(e));
}

/// Explain a lookup that did not end in a jump. Prints nothing for `Resolved`.
pub fn print_outcome(result: &NavigationResult) {
    if let Some(md) = render_outcome(result) {
        print_markdown(&md);
    }
}

fn render_empty_query() -> String {
    return "\
# Error: Nothing To Look Up

No symbol was given and there is no word under the cursor.

## Fix

Name the symbol, or point `--at` at an identifier:

    tagjump find main
    tagjump find --at src/main.c:12:8
"
    .to_string();
}

/// Render an error as a structured markdown diagnostic.
///
/// Each variant produces a block with what happened and, where there is one,
/// how to fix it.
pub fn render_error(e: &Error) -> String {
    return match e {
        Error::EmptyQuery => render_empty_query(),
        Error::GenerateFailed { command, reason } => render_generate_failed(command, reason),
        Error::IndexNotFound { start } => render_no_index(start),
        Error::InvalidPosition { input, reason } => format!(
            "\
# Error: Invalid Position

`{input}`: {reason}

Positions are written `FILE[:LINE[:COL]]`, counting from 1.
"
        ),
        Error::ReadFailure { path, source } => format!(
            "\
# Error: Cannot Read Source

`{}`: {source}

The tags index may be stale. Regenerate it:

    tagjump generate
",
            path.display()
        ),
        Error::StateCorrupt { path, reason } => format!(
            "\
# Error: State File Corrupt

`{}`: {reason}

## Fix

Clear the jump stack to rewrite it:

    tagjump clear
",
            path.display()
        ),
        Error::TomlDe(e) => format!(
            "\
# Error: Invalid {CONFIG_FILE}

{e}
"
        ),
        Error::Io(_) | Error::Json(_) | Error::UnsupportedPattern { .. } => format!(
            "\
# Error

{e}
"
        ),
    };
}

fn render_generate_failed(command: &str, reason: &str) -> String {
    return format!(
        "\
# Error: Tags Generation Failed

`{command}` {reason}.

## Fix

Install Universal Ctags, or point `[generate]` in `{CONFIG_FILE}` at your generator:

    [generate]
    command = \"ctags\"
    args = [\"-R\", \".\"]
"
    );
}

fn render_no_index(start: &Path) -> String {
    return format!(
        "\
# Warning: No Tags File Found

No tags file in `{}` or any parent directory.

## Fix

Generate one in the project root:

    tagjump generate
",
        start.display()
    );
}

/// Markdown for an unresolved lookup, or `None` for a jump.
pub fn render_outcome(result: &NavigationResult) -> Option<String> {
    return match result {
        NavigationResult::Cancelled | NavigationResult::Resolved { .. } => None,
        NavigationResult::NoIndex { start } => Some(render_no_index(start)),
        NavigationResult::NoMatches { symbol } => Some(format!(
            "\
# No Tags Found For `{symbol}`

The tags index has no usable entry for `{symbol}`. If it was added recently,
regenerate the index:

    tagjump generate
"
        )),
    };
}
