use std::{collections::HashMap, fs, path::PathBuf, sync::Mutex};

use serde::{Deserialize, Serialize};

use habitbuddy_core::{errors::Error, session::SessionStore, Result};

const CURRENT_VERSION: u32 = 1;

/// Session values persisted as a small JSON file between invocations.
#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    lock: Mutex<()>,
}

#[derive(Serialize, Deserialize, Default)]
struct SessionFile {
    version: u32,
    values: HashMap<String, String>,
}

impl FileSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn with_values<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut HashMap<String, String>),
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::session("Session store lock poisoned"))?;
        let mut values = self.load_locked()?;
        op(&mut values);
        self.persist_locked(values)
    }

    fn read_values(&self) -> Result<HashMap<String, String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| Error::session("Session store lock poisoned"))?;
        self.load_locked()
    }

    fn load_locked(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let raw = fs::read(&self.path).map_err(|e| {
            Error::session(format!("Failed to read {}: {e}", self.path.display()))
        })?;
        if raw.is_empty() {
            return Ok(HashMap::new());
        }

        let file: SessionFile = serde_json::from_slice(&raw).map_err(|e| {
            Error::session(format!("Corrupt session file {}: {e}", self.path.display()))
        })?;
        Ok(file.values)
    }

    fn persist_locked(&self, values: HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::session(format!("Failed to create {}: {e}", parent.display())))?;
        }

        let file = SessionFile {
            version: CURRENT_VERSION,
            values,
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| Error::session(format!("Failed to encode session: {e}")))?;
        fs::write(&self.path, json).map_err(|e| {
            Error::session(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_values()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_values(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.with_values(|values| {
            values.remove(key);
        })
    }
}
