pub mod json_store;

use crate::error::AppError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::{debug, warn};

pub use json_store::JsonFileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKey {
    Tasks,
    UserProfile,
    StudyHours,
    PomodoroCounter,
    Theme,
}

impl StoreKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "ss_tasks",
            Self::UserProfile => "ss_user",
            Self::StudyHours => "ss_hours",
            Self::PomodoroCounter => "ss_pomodoros",
            Self::Theme => "ss_theme",
        }
    }
}

pub trait KeyValueStore {
    fn read(&self, key: &str) -> Result<Option<Value>, AppError>;

    fn write(&self, key: &str, value: Value) -> Result<(), AppError>;
}

/// Best-effort typed view over a [`KeyValueStore`].
#[derive(Clone)]
pub struct PersistentStore {
    backend: Rc<dyn KeyValueStore>,
}

impl PersistentStore {
    pub fn new(backend: Rc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Rc::new(MemoryStore::default()))
    }

    /// Returns whether the value reached the backend.
    pub fn save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => {
                debug!(key = key.as_str(), "saved");
                true
            }
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "save failed, keeping value in memory");
                false
            }
        }
    }

    pub fn try_save<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(value)?;
        self.backend.write(key.as_str(), value)
    }

    pub fn load<T: DeserializeOwned>(&self, key: StoreKey, default: T) -> T {
        self.load_optional(key).unwrap_or(default)
    }

    pub fn load_optional<T: DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        let value = match self.backend.read(key.as_str()) {
            Ok(Some(Value::Null)) | Ok(None) => return None,
            Ok(Some(value)) => value,
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "store unreadable, using default");
                return None;
            }
        };

        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key = key.as_str(), error = %err, "malformed entry, using default");
                None
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<BTreeMap<String, Value>>,
    unavailable: Cell<bool>,
}

impl MemoryStore {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    pub fn insert_raw(&self, key: &str, value: Value) {
        self.entries.borrow_mut().insert(key.to_string(), value);
    }

    pub fn get_raw(&self, key: &str) -> Option<Value> {
        self.entries.borrow().get(key).cloned()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.get() {
            Err(AppError::io("store unavailable"))
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Value>, AppError> {
        self.check_available()?;
        Ok(self.get_raw(key))
    }

    fn write(&self, key: &str, value: Value) -> Result<(), AppError> {
        self.check_available()?;
        self.insert_raw(key, value);
        Ok(())
    }
}
