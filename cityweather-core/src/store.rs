//! Persistence of the last successfully resolved city.
//!
//! The record on disk is versioned:
//!
//! ```json
//! { "version": 1, "location": { "city": "Paris", "state": null, "country": "FR", "lat": 48.85, "lon": 2.35 } }
//! ```
//!
//! A bare `Location` object (the unversioned shape) is still accepted on read.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use crate::{WeatherError, model::Location};

pub const RECORD_VERSION: u32 = 1;

pub trait CityStore: Send + Sync + std::fmt::Debug {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Location>, WeatherError>;

    fn save(&self, location: &Location) -> Result<(), WeatherError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct SavedCity {
    version: u32,
    location: Location,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Versioned(SavedCity),
    Bare(Location),
}

fn decode(contents: &str) -> Result<Location, WeatherError> {
    let record: StoredRecord = serde_json::from_str(contents)
        .map_err(|e| WeatherError::PersistenceRead(format!("invalid record: {e}")))?;

    match record {
        StoredRecord::Versioned(saved) if saved.version == RECORD_VERSION => Ok(saved.location),
        StoredRecord::Versioned(saved) => Err(WeatherError::PersistenceRead(format!(
            "unsupported record version {}",
            saved.version
        ))),
        StoredRecord::Bare(location) => {
            tracing::debug!("Upgrading unversioned city record");
            Ok(location)
        }
    }
}

fn encode(location: &Location) -> Result<String, WeatherError> {
    let record = SavedCity { version: RECORD_VERSION, location: location.clone() };
    serde_json::to_string_pretty(&record)
        .map_err(|e| WeatherError::PersistenceWrite(format!("serialize: {e}")))
}

/// JSON file store, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileCityStore {
    path: PathBuf,
}

impl FileCityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CityStore for FileCityStore {
    fn load(&self) -> Result<Option<Location>, WeatherError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(WeatherError::PersistenceRead(format!(
                    "{}: {e}",
                    self.path.display()
                )));
            }
        };

        decode(&contents).map(Some)
    }

    fn save(&self, location: &Location) -> Result<(), WeatherError> {
        let write_err = |e: std::io::Error| {
            WeatherError::PersistenceWrite(format!("{}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encode(location)?).map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), city = %location.city, "Saved city");
        Ok(())
    }
}

/// Store kept in memory; used by tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryCityStore {
    record: Mutex<Option<String>>,
}

impl MemoryCityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with raw record contents, as if read from disk.
    pub fn with_raw(contents: impl Into<String>) -> Self {
        Self { record: Mutex::new(Some(contents.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.record.lock().ok().and_then(|r| r.clone())
    }
}

impl CityStore for MemoryCityStore {
    fn load(&self) -> Result<Option<Location>, WeatherError> {
        let record = self
            .record
            .lock()
            .map_err(|_| WeatherError::PersistenceRead("store lock poisoned".into()))?;

        record.as_deref().map(decode).transpose()
    }

    fn save(&self, location: &Location) -> Result<(), WeatherError> {
        let encoded = encode(location)?;
        let mut record = self
            .record
            .lock()
            .map_err(|_| WeatherError::PersistenceWrite("store lock poisoned".into()))?;
        *record = Some(encoded);
        Ok(())
    }
}
