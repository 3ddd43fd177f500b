use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use log::warn;

use super::ledger::ProgressLedger;
use crate::error::{Result, TrainerError};

/// Key the ledger is stored under in key-value backends.
pub const STORAGE_KEY: &str = "perfectPitchProgress";

/// Durable home of the ledger. `load` returns `None` when nothing was saved yet.
pub trait LedgerStore {
    fn load(&self) -> Result<Option<ProgressLedger>>;
    fn save(&mut self, ledger: &ProgressLedger) -> Result<()>;
}

/// Load the saved ledger, or start empty if there is none or it cannot be read.
pub fn load_or_default(store: &dyn LedgerStore) -> ProgressLedger {
    match store.load() {
        Ok(Some(ledger)) => ledger,
        Ok(None) => ProgressLedger::default(),
        Err(e) => {
            warn!("could not load progress, starting fresh: {}", e);
            ProgressLedger::default()
        }
    }
}

/// Keeps the serialized ledger in memory.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    blob: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(blob: impl Into<String>) -> Self {
        MemoryStore {
            blob: Some(blob.into()),
        }
    }

    pub fn blob(&self) -> Option<&str> {
        self.blob.as_deref()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<ProgressLedger>> {
        self.blob
            .as_deref()
            .map(ProgressLedger::from_json)
            .transpose()
    }

    fn save(&mut self, ledger: &ProgressLedger) -> Result<()> {
        self.blob = Some(ledger.to_json()?);
        Ok(())
    }
}

/// One JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<ProgressLedger>> {
        match fs::read_to_string(&self.path) {
            Ok(json) => ProgressLedger::from_json(&json).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TrainerError::Storage(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn save(&mut self, ledger: &ProgressLedger) -> Result<()> {
        fs::write(&self.path, ledger.to_json()?)
            .map_err(|e| TrainerError::Storage(format!("{}: {}", self.path.display(), e)))
    }
}

/// The browser's `localStorage`.
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Result<web_sys::Storage> {
        web_sys::window()
            .ok_or_else(|| TrainerError::Storage("no window".to_string()))?
            .local_storage()
            .map_err(|e| TrainerError::Storage(format!("{:?}", e)))?
            .ok_or_else(|| TrainerError::Storage("localStorage unavailable".to_string()))
    }
}

#[cfg(target_arch = "wasm32")]
impl LedgerStore for LocalStorageStore {
    fn load(&self) -> Result<Option<ProgressLedger>> {
        let blob = Self::storage()?
            .get_item(STORAGE_KEY)
            .map_err(|e| TrainerError::Storage(format!("{:?}", e)))?;
        blob.as_deref().map(ProgressLedger::from_json).transpose()
    }

    fn save(&mut self, ledger: &ProgressLedger) -> Result<()> {
        Self::storage()?
            .set_item(STORAGE_KEY, &ledger.to_json()?)
            .map_err(|e| TrainerError::Storage(format!("{:?}", e)))
    }
}
