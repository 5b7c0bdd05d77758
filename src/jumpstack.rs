//! Jump-back history: a capped stack of prior cursor positions, persisted
//! through a small key-value store.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Error;
use crate::types::JumpStackEntry;

/// Most positions kept; older ones are dropped first.
pub const JUMP_STACK_CAPACITY: usize = 50;

/// Store key the stack is saved under.
pub const JUMP_STACK_KEY: &str = "TAGJUMP_JUMP_STACK";

/// Small persistent state, one JSON object per file.
#[derive(Debug)]
pub struct JsonStateFile {
    /// Location of the JSON file.
    path: PathBuf,
}

/// Bounded LIFO of positions, oldest first in storage.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct JumpStack {
    /// Oldest at the front, most recent at the back.
    entries: VecDeque<JumpStackEntry>,
}

/// Key-value storage for state that outlives a single command.
pub trait StateStore {
    /// The value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Where the state lives, for diagnostics.
    fn path(&self) -> &Path;

    /// Store `value` under `key`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: Value) -> Result<(), Error>;
}

impl JsonStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        return Self { path: path.into() };
    }

    /// Read the whole object. A missing file is an empty object.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` on read failure or `Error::StateCorrupt` if the
    /// file is not a JSON object.
    fn read_all(&self) -> Result<BTreeMap<String, Value>, Error> {
        let content = match std::fs::read_to_string(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(Error::Io(e)),
            Ok(c) => c,
        };
        return serde_json::from_str(&content).map_err(|e| {
            return Error::StateCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            };
        });
    }
}

impl JumpStack {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries from oldest to most recent.
    pub fn entries(&self) -> impl Iterator<Item = &JumpStackEntry> {
        return self.entries.iter();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Load the stack saved under `JUMP_STACK_KEY`, or an empty one.
    ///
    /// # Errors
    ///
    /// Returns store errors, or `Error::StateCorrupt` if the saved value is
    /// not a list of positions.
    pub fn load(store: &dyn StateStore) -> Result<Self, Error> {
        let Some(value) = store.get(JUMP_STACK_KEY)? else {
            return Ok(Self::default());
        };
        let entries: Vec<JumpStackEntry> = serde_json::from_value(value).map_err(|e| {
            return Error::StateCorrupt {
                path: store.path().to_path_buf(),
                reason: format!("`{JUMP_STACK_KEY}`: {e}"),
            };
        })?;
        return Ok(Self {
            entries: entries.into(),
        });
    }

    /// Remove and return the most recent position.
    pub fn pop(&mut self) -> Option<JumpStackEntry> {
        return self.entries.pop_back();
    }

    /// Record a position. Repeating the top entry's document and line is a
    /// no-op; a full stack drops its oldest entry first.
    pub fn push(&mut self, entry: JumpStackEntry) {
        if let Some(top) = self.entries.back()
            && top.document == entry.document
            && top.line == entry.line
        {
            debug!(document = %entry.document, line = entry.line, "same line as top of jump stack");
            return;
        }
        if self.entries.len() >= JUMP_STACK_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Save the stack under `JUMP_STACK_KEY`.
    ///
    /// # Errors
    ///
    /// Returns store errors, or `Error::Json` if serialization fails.
    pub fn save(&self, store: &mut dyn StateStore) -> Result<(), Error> {
        let value = serde_json::to_value(&self.entries)?;
        return store.set(JUMP_STACK_KEY, value);
    }
}

impl StateStore for JsonStateFile {
    fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        return Ok(self.read_all()?.remove(key));
    }

    fn path(&self) -> &Path {
        return &self.path;
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), Error> {
        let mut all = match self.read_all() {
            Err(Error::StateCorrupt { reason, .. }) => {
                warn!(path = %self.path.display(), %reason, "overwriting corrupt state file");
                BTreeMap::new()
            },
            other => other?,
        };
        all.insert(key.to_string(), value);
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        return Ok(());
    }
}
