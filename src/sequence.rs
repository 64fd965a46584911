//! Invoice numbering backed by a small key-value store.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::input::parse_counter;

/// Store key holding the last allocated invoice number.
pub const SEQUENCE_KEY: &str = "invoiceNo";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid TOML: {0}")]
    Decode(#[from] toml::de::Error),

    #[error("failed to encode store: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// String-to-string persistence, scoped to one installation.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// In-process store. Reads and writes can be switched to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, String>,
    fail_reads: bool,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut store = Self::default();
        store.values.insert(key.to_string(), value.to_string());
        store
    }

    pub fn fail_reads(mut self, fail: bool) -> Self {
        self.fail_reads = fail;
        self
    }

    pub fn fail_writes(mut self, fail: bool) -> Self {
        self.fail_writes = fail;
        self
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flat TOML table on disk. A missing file reads as an empty store and every
/// write rewrites the whole file.
#[derive(Debug, Clone)]
pub struct TomlFileStore {
    path: PathBuf,
}

impl TomlFileStore {
    pub const FILE_NAME: &'static str = "state.toml";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store file inside a data root directory.
    pub fn in_dir(root: &Path) -> Self {
        Self::new(root.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".bak");
        self.path.with_file_name(name)
    }

    fn load(&self) -> Result<toml::Table, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(toml::Table::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl KeyValueStore for TomlFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let table = self.load()?;
        Ok(table.get(key).map(|v| match v {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }

    /// A file that no longer parses is moved aside to `<name>.bak` and
    /// replaced, so one bad edit does not pin the store forever.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut table = match self.load() {
            Ok(table) => table,
            Err(StoreError::Decode(e)) => {
                let backup = self.backup_path();
                warn!(error = %e, backup = %backup.display(), "store file unreadable, starting a new one");
                fs::rename(&self.path, &backup)?;
                toml::Table::new()
            }
            Err(e) => return Err(e),
        };
        table.insert(key.to_string(), toml::Value::String(value.to_string()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&table)?)?;
        Ok(())
    }
}

/// Hands out invoice numbers 1, 2, 3, ... across sessions.
///
/// Each call is a read, an increment and a write with no locking. Two
/// processes sharing one store can both read the same previous value and
/// hand out the same number; only a single writer is supported.
#[derive(Debug)]
pub struct SequenceAllocator<S> {
    store: S,
}

impl<S: KeyValueStore> SequenceAllocator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Allocate the next number and persist it.
    ///
    /// Never fails: an unreadable or non-numeric stored value counts as 0,
    /// and a failed write is logged while the number is still returned.
    pub fn next_invoice_number(&mut self) -> u64 {
        let next = self.previous().saturating_add(1);
        if let Err(e) = self.store.set(SEQUENCE_KEY, &next.to_string()) {
            warn!(error = %e, next, "could not persist invoice sequence");
        }
        debug!(next, "allocated invoice number");
        next
    }

    /// Last allocated number, 0 if none. Does not allocate.
    pub fn current(&self) -> u64 {
        self.previous()
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn previous(&self) -> u64 {
        match self.store.get(SEQUENCE_KEY) {
            Ok(Some(raw)) => parse_counter(&raw).unwrap_or_else(|| {
                warn!(value = %raw, "stored invoice sequence is not a number, restarting at 1");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "could not read invoice sequence, restarting at 1");
                0
            }
        }
    }
}
