/// Crate-level error types for tagjump lookups and history.
use std::path::PathBuf;

/// All errors in tagjump carry enough context to produce a useful diagnostic
/// without a debugger. Each variant names the file, symbol, or reason for failure.
///
/// Lookup outcomes that are not failures (no matches, a cancelled choice) are
/// reported through `NavigationResult`, never through this type.
#[allow(clippy::error_impl_error, reason = "crate-internal error type in binary")]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Neither an explicit symbol nor a word under the cursor was available.
    #[error("no symbol to search for")]
    EmptyQuery,

    /// The configured tags generator could not be run or exited unsuccessfully.
    #[error("tags generation failed: `{command}`: {reason}")]
    GenerateFailed {
        /// Program that was invoked.
        command: String,
        /// Exit status or spawn failure description.
        reason: String,
    },

    /// No tags file exists in the start directory or any of its ancestors.
    #[error("no tags file found above {}", start.display())]
    IndexNotFound {
        /// Directory the upward search started from.
        start: PathBuf,
    },

    /// A `FILE:LINE:COL` argument could not be parsed.
    #[error("invalid position `{input}`: {reason}")]
    InvalidPosition {
        /// The raw argument text.
        input: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Underlying I/O error from the filesystem.
    #[error("io: {0}")]
    Io(
        /// The wrapped I/O error.
        #[from]
        std::io::Error,
    ),

    /// JSON (de)serialization of the state file failed.
    #[error("json: {0}")]
    Json(
        /// The wrapped JSON error.
        #[from]
        serde_json::Error,
    ),

    /// A source file named by a tag entry could not be read.
    #[error("cannot read {}: {source}", path.display())]
    ReadFailure {
        /// File that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The state file exists but does not hold a JSON object.
    #[error("state file corrupt: {}: {reason}", path.display())]
    StateCorrupt {
        /// Path to the state file.
        path: PathBuf,
        /// Description of the corruption.
        reason: String,
    },

    /// TOML deserialization failed.
    #[error("toml deserialize: {0}")]
    TomlDe(
        /// The wrapped TOML deserialization error.
        #[from]
        toml::de::Error,
    ),

    /// A tag pattern lacks the leading `^` anchor.
    #[error("unsupported tag pattern: `{pattern}`")]
    UnsupportedPattern {
        /// The raw pattern text.
        pattern: String,
    },
}
