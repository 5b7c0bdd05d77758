mod commands;
mod config;
mod context;
mod diagnostics;
mod disambiguate;
mod error;
mod jumpstack;
mod lines;
mod locator;
mod navigator;
mod resolver;
mod searcher;
mod tagline;
mod types;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::LookupRequest;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "TAGJUMP_LOG";

#[derive(Parser)]
#[command(name = "tagjump", about = "Jump to definitions recorded in a ctags index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Jump stack state file (default from .tagjump.toml)
    #[arg(long, global = true)]
    state: Option<PathBuf>,
    /// Log lookup progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pop the jump stack and print the position to return to
    Back {
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear the jump stack
    Clear,
    /// Print every definition of a symbol
    Defs(LookupArgs),
    /// Find a symbol's definition, prompting when it is ambiguous
    Find {
        #[command(flatten)]
        lookup: LookupArgs,
        /// Never prompt; ambiguous lookups end as cancelled
        #[arg(long)]
        no_prompt: bool,
    },
    /// Regenerate the tags index with the configured generator
    Generate,
    /// List the jump stack, oldest first
    Stack,
}

#[derive(Args)]
struct LookupArgs {
    /// Cursor position FILE[:LINE[:COL]], 1-based
    #[arg(long)]
    at: Option<String>,
    /// Print JSON (0-based positions)
    #[arg(long)]
    json: bool,
    /// Symbol to look up (default: the word at --at)
    symbol: Option<String>,
}

impl LookupArgs {
    fn request(&self) -> LookupRequest<'_> {
        return LookupRequest {
            at: self.at.as_deref(),
            json: self.json,
            symbol: self.symbol.as_deref(),
        };
    }
}

/// Install the stderr log subscriber. `TAGJUMP_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| return EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> ExitCode {
    // Usage errors share the error exit code; clap's own 2 means "no index" here.
    let cli = match Cli::try_parse() {
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(commands::EXIT_ERROR)
            } else {
                ExitCode::SUCCESS
            };
        },
        Ok(cli) => cli,
    };
    init_logging(cli.verbose);
    let state = cli.state.as_deref();

    let result = match &cli.command {
        Commands::Back { json } => commands::back(*json, state),
        Commands::Clear => commands::clear(state),
        Commands::Defs(lookup) => commands::defs(&lookup.request()),
        Commands::Find { lookup, no_prompt } => commands::find(&lookup.request(), !*no_prompt, state),
        Commands::Generate => commands::generate(),
        Commands::Stack => commands::stack(state),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(commands::EXIT_ERROR)
        },
    };
}
