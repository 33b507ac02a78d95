use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use super::domain::LedgerState;
use super::registry::MethodRegistry;

const METHODS_FILE: &str = "methods.json";
const LEDGER_FILE: &str = "ledger.json";

/// Key-value persistence for the method table and the accrual ledger.
///
/// Loads never fail: missing or malformed data yields the built-in defaults.
pub trait RewardStore: Send + Sync {
    fn load_methods(&self) -> MethodRegistry;
    fn save_methods(&self, registry: &MethodRegistry) -> Result<(), StoreError>;
    fn load_ledger(&self) -> LedgerState;
    fn save_ledger(&self, ledger: &LedgerState) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to encode {what}: {source}")]
    Encode {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Process-local store; starts from defaults unless seeded.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRewardStore {
    methods: Arc<Mutex<Option<MethodRegistry>>>,
    ledger: Arc<Mutex<Option<LedgerState>>>,
}

impl InMemoryRewardStore {
    pub fn seeded(registry: MethodRegistry, ledger: LedgerState) -> Self {
        Self {
            methods: Arc::new(Mutex::new(Some(registry))),
            ledger: Arc::new(Mutex::new(Some(ledger))),
        }
    }

    pub fn saved_ledger(&self) -> Option<LedgerState> {
        self.ledger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn saved_methods(&self) -> Option<MethodRegistry> {
        self.methods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RewardStore for InMemoryRewardStore {
    fn load_methods(&self) -> MethodRegistry {
        self.saved_methods().unwrap_or_else(MethodRegistry::standard)
    }

    fn save_methods(&self, registry: &MethodRegistry) -> Result<(), StoreError> {
        *self.methods.lock().unwrap_or_else(PoisonError::into_inner) = Some(registry.clone());
        Ok(())
    }

    fn load_ledger(&self) -> LedgerState {
        self.saved_ledger().unwrap_or_else(LedgerState::standard)
    }

    fn save_ledger(&self, ledger: &LedgerState) -> Result<(), StoreError> {
        *self.ledger.lock().unwrap_or_else(PoisonError::into_inner) = Some(ledger.clone());
        Ok(())
    }
}

/// JSON files in a data directory. Writes go through a temp file and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "unreadable store file, using defaults");
                return None;
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "malformed store file, using defaults");
                None
            }
        }
    }

    fn write<T: Serialize>(
        &self,
        file: &str,
        what: &'static str,
        value: &T,
    ) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(value)
            .map_err(|source| StoreError::Encode { what, source })?;

        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;
        let target = self.dir.join(file);
        let staging = self.dir.join(format!("{file}.tmp"));

        let mut handle = fs::File::create(&staging).map_err(io_error(&staging))?;
        handle.write_all(&payload).map_err(io_error(&staging))?;
        handle.sync_all().map_err(io_error(&staging))?;
        fs::rename(&staging, &target).map_err(io_error(&target))?;
        Ok(())
    }
}

impl RewardStore for JsonFileStore {
    fn load_methods(&self) -> MethodRegistry {
        self.read(METHODS_FILE).unwrap_or_else(MethodRegistry::standard)
    }

    fn save_methods(&self, registry: &MethodRegistry) -> Result<(), StoreError> {
        self.write(METHODS_FILE, "method table", registry)
    }

    fn load_ledger(&self) -> LedgerState {
        self.read(LEDGER_FILE).unwrap_or_else(LedgerState::standard)
    }

    fn save_ledger(&self, ledger: &LedgerState) -> Result<(), StoreError> {
        self.write(LEDGER_FILE, "ledger", ledger)
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rewards::domain::MethodId;
    use tempfile::tempdir;

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path().join("nested"));
        assert_eq!(store.load_methods(), MethodRegistry::standard());
        assert_eq!(store.load_ledger(), LedgerState::standard());
    }

    #[test]
    fn corrupt_files_fall_back_to_defaults() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join(METHODS_FILE), b"{not json").expect("write");
        fs::write(dir.path().join(LEDGER_FILE), b"[1, 2, 3]").expect("write");
        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load_methods(), MethodRegistry::standard());
        assert_eq!(store.load_ledger(), LedgerState::standard());
    }

    #[test]
    fn saved_state_is_reloaded() {
        let dir = tempdir().expect("tempdir");
        let store = JsonFileStore::new(dir.path());

        let mut registry = MethodRegistry::standard();
        registry.set_active(&MethodId::new("sbi_1x_offline"), false);
        store.save_methods(&registry).expect("save methods");

        let mut ledger = LedgerState::standard();
        ledger.milestone.ytd_spend = 12_345.0;
        ledger
            .used_this_cycle
            .insert(MethodId::new("kiwi_neon"), 617.25);
        store.save_ledger(&ledger).expect("save ledger");

        assert_eq!(store.load_methods(), registry);
        assert_eq!(store.load_ledger(), ledger);
        assert!(!dir.path().join("ledger.json.tmp").exists());
    }
}
