use crate::config::app_dir;
use crate::error::AppError;
use crate::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const SCHEMA_VERSION: u32 = 1;
const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "STUDYSYNC_STORE_PATH";

#[derive(Debug, Serialize, Deserialize)]
struct StoredEntries {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, Value>,
}

impl Default for StoredEntries {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(STORE_FILE_NAME))
}

/// Single JSON document holding every key, rewritten through a temp file on
/// each write.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn open_default() -> Result<Self, AppError> {
        Ok(Self::new(store_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_document(&self) -> Result<StoredEntries, AppError> {
        let stored = self.parse_document()?;
        check_schema_version(stored.schema_version)?;
        Ok(stored)
    }

    fn parse_document(&self) -> Result<StoredEntries, AppError> {
        if !self.path.exists() {
            return Ok(StoredEntries::default());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|err| AppError::io(err.to_string()))?;
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))
    }

    fn save_document(&self, stored: &StoredEntries) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let content = serde_json::to_string_pretty(stored)?;
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content).map_err(|err| AppError::io(err.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp_path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        std::fs::rename(&tmp_path, &self.path).map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}

fn check_schema_version(version: u32) -> Result<(), AppError> {
    if (1..=SCHEMA_VERSION).contains(&version) {
        Ok(())
    } else {
        Err(AppError::invalid_data("schema_version mismatch"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<Value>, AppError> {
        Ok(self.load_document()?.entries.remove(key))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), AppError> {
        let mut stored = match self.parse_document() {
            Ok(stored) => stored,
            Err(AppError::InvalidData(message)) => {
                warn!(path = %self.path.display(), %message, "replacing unreadable store");
                StoredEntries::default()
            }
            Err(err) => return Err(err),
        };
        // A newer document is left untouched.
        check_schema_version(stored.schema_version)?;

        stored.schema_version = SCHEMA_VERSION;
        stored.entries.insert(key.to_string(), value);
        self.save_document(&stored)
    }
}
