use std::path::{Path, PathBuf};

use crate::error::Error;

/// Name of the project config file, looked up in the project root.
pub const CONFIG_FILE: &str = ".tagjump.toml";

/// Project configuration loaded from `.tagjump.toml`.
#[derive(Debug)]
pub struct Config {
    /// Program and arguments that regenerate the tags index.
    pub generate: GenerateConfig,
    /// Where the jump stack is persisted. Relative paths are taken from the project root.
    pub state_file: PathBuf,
    /// Tags file names tried, in order, in every directory of the upward search.
    pub tag_files: Vec<String>,
}

/// The `[generate]` table: how `tagjump generate` invokes the indexer.
#[derive(Debug, serde::Deserialize)]
pub struct GenerateConfig {
    /// Arguments passed to the generator.
    #[serde(default = "default_generate_args")]
    pub args: Vec<String>,
    /// Generator program.
    #[serde(default = "default_generate_command")]
    pub command: String,
}

/// Raw TOML structure for `.tagjump.toml`.
#[derive(serde::Deserialize)]
struct TagjumpTomlConfig {
    #[serde(default)]
    generate: Option<GenerateConfig>,
    #[serde(default)]
    state_file: Option<PathBuf>,
    #[serde(default)]
    tag_files: Option<Vec<String>>,
}

impl Config {
    /// Load config from `.tagjump.toml` in the given root directory.
    /// Returns defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };

        let raw: TagjumpTomlConfig = toml::from_str(&content)?;
        let defaults = Self::default();
        return Ok(Self {
            generate: raw.generate.unwrap_or(defaults.generate),
            state_file: raw.state_file.unwrap_or(defaults.state_file),
            tag_files: raw
                .tag_files
                .filter(|names| return !names.is_empty())
                .unwrap_or(defaults.tag_files),
        });
    }

    /// The state file as an absolute-or-root-relative path.
    pub fn state_path(&self, root: &Path) -> PathBuf {
        return root.join(&self.state_file);
    }
}

impl Default for Config {
    /// `tags` then `.tags`, state under `.tagjump/`, plain `ctags -R`.
    fn default() -> Self {
        return Self {
            generate: GenerateConfig {
                args: default_generate_args(),
                command: default_generate_command(),
            },
            state_file: PathBuf::from(".tagjump").join("state.json"),
            tag_files: vec!["tags".to_string(), ".tags".to_string()],
        };
    }
}

/// Recursive, with line numbers and whole-file entries.
fn default_generate_args() -> Vec<String> {
    return ["-R", "--fields=+n", "--extras=+f", "."]
        .iter()
        .map(|s| return (*s).to_string())
        .collect();
}

fn default_generate_command() -> String {
    return "ctags".to_string();
}
