//! Drink log: the ordered collection of drink events, with file persistence.
//!
//! Events are kept in insertion order; the simulation re-sorts by time.
//! The log is saved as JSON by atomic rename, so readers never see a
//! partial file. Every load-modify-save holds an exclusive lock on a
//! sibling `.lock` file for its whole duration, so concurrent writers
//! (threads or processes) apply their changes one after another and none
//! is lost. The lock is advisory and only binds callers that go through
//! this module.

use crate::{DrinkEvent, Error, Result};
use chrono::Utc;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use uuid::Uuid;

/// File name of the drink log inside the data directory
pub const DRINK_LOG_FILE: &str = "drinks.json";

/// Ordered collection of drink events
#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct DrinkLog {
    drinks: Vec<DrinkEvent>,
}

impl DrinkLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and log a new drink
    pub fn add(
        &mut self,
        name: impl Into<String>,
        volume_ml: f64,
        abv_percent: f64,
        timestamp_ms: i64,
    ) -> Result<&DrinkEvent> {
        crate::validate_drink_input(volume_ml, abv_percent)?;

        let drink = DrinkEvent::new(name, volume_ml, abv_percent, timestamp_ms);
        tracing::debug!(
            "Logged drink {} ({:.2} standard drinks)",
            drink.id,
            drink.standard_drinks
        );
        self.drinks.push(drink);

        let last = self.drinks.len() - 1;
        Ok(&self.drinks[last])
    }

    /// Remove a drink by id, returning it
    pub fn remove(&mut self, id: Uuid) -> Result<DrinkEvent> {
        let idx = self
            .drinks
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| Error::DrinkNotFound(id.to_string()))?;

        Ok(self.drinks.remove(idx))
    }

    /// Correct when a drink was consumed; standard drinks are left as-is
    pub fn update_timestamp(&mut self, id: Uuid, timestamp_ms: i64) -> Result<&DrinkEvent> {
        let drink = self
            .drinks
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| Error::DrinkNotFound(id.to_string()))?;

        drink.timestamp_ms = timestamp_ms;
        Ok(&*drink)
    }

    /// Remove every drink, returning how many were removed
    pub fn clear(&mut self) -> usize {
        let count = self.drinks.len();
        self.drinks.clear();
        count
    }

    /// Look up a drink by full UUID or unique id prefix
    pub fn find_by_prefix(&self, prefix: &str) -> Result<&DrinkEvent> {
        let needle = prefix.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::DrinkNotFound(prefix.to_string()));
        }

        let mut matches = self
            .drinks
            .iter()
            .filter(|d| d.id.to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(drink), None) => Ok(drink),
            (Some(_), Some(_)) => Err(Error::AmbiguousDrink(prefix.to_string())),
            (None, _) => Err(Error::DrinkNotFound(prefix.to_string())),
        }
    }

    /// Drinks in insertion order
    pub fn events(&self) -> &[DrinkEvent] {
        &self.drinks
    }

    /// Drinks ordered by timestamp, ties kept in insertion order
    pub fn sorted_by_time(&self) -> Vec<&DrinkEvent> {
        let mut sorted: Vec<_> = self.drinks.iter().collect();
        sorted.sort_by_key(|d| d.timestamp_ms);
        sorted
    }

    pub fn total_standard_drinks(&self) -> f64 {
        self.drinks.iter().map(|d| d.standard_drinks).sum()
    }

    pub fn len(&self) -> usize {
        self.drinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drinks.is_empty()
    }

    /// Load the log for reading
    ///
    /// Returns an empty log if the file doesn't exist.
    /// If the file is corrupted, logs a warning and returns an empty log;
    /// the file itself is left untouched.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No drink log found, starting empty");
            return Ok(Self::default());
        }

        let _lock = match LogLock::shared(path) {
            Ok(lock) => Some(lock),
            Err(e) => {
                tracing::warn!("Unable to lock drink log {:?}: {}. Reading unlocked.", path, e);
                None
            }
        };

        match Self::read(path) {
            Ok(Some(log)) => Ok(log),
            Ok(None) => {
                tracing::info!("No drink log found, starting empty");
                Ok(Self::default())
            }
            Err(e) => {
                tracing::warn!("Failed to read drink log {:?}: {}. Starting empty.", path, e);
                Ok(Self::default())
            }
        }
    }

    /// Save the log, holding the exclusive log lock while writing
    pub fn save(&self, path: &Path) -> Result<()> {
        let _lock = LogLock::exclusive(path)?;
        self.write_atomic(path)
    }

    /// Load the log, modify it, and save it back under one exclusive lock
    ///
    /// A log that no longer parses is moved aside (see [`quarantine_corrupt`])
    /// before the fresh log is written, so its contents are never overwritten.
    /// Read errors other than a parse failure abort without writing.
    pub fn update<F, T>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut DrinkLog) -> Result<T>,
    {
        let _lock = LogLock::exclusive(path)?;

        let mut log = match Self::read(path) {
            Ok(Some(log)) => log,
            Ok(None) => Self::default(),
            Err(Error::Json(e)) => {
                let moved_to = quarantine_corrupt(path)?;
                tracing::warn!(
                    "Drink log {:?} is corrupted ({}). Moved it to {:?} and started a new log.",
                    path,
                    e,
                    moved_to
                );
                Self::default()
            }
            Err(e) => return Err(e),
        };

        let out = f(&mut log)?;
        log.write_atomic(path)?;
        Ok(out)
    }

    /// Parse the log file; `None` if it doesn't exist
    fn read(path: &Path) -> Result<Option<Self>> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let log: DrinkLog = serde_json::from_slice(&bytes)?;
        tracing::debug!("Loaded {} drinks from {:?}", log.len(), path);
        Ok(Some(log))
    }

    /// Write to a temp file in the same directory, sync it, then rename it
    /// over the original. Callers hold the exclusive log lock.
    fn write_atomic(&self, path: &Path) -> Result<()> {
        let parent = parent_dir(path)?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} drinks to {:?}", self.len(), path);
        Ok(())
    }
}

/// Move an unreadable log to `<name>.corrupt-<epoch ms>` next to it
///
/// Returns the new location.
pub fn quarantine_corrupt(path: &Path) -> Result<PathBuf> {
    let target = sibling(path, &format!(".corrupt-{}", Utc::now().timestamp_millis()));
    std::fs::rename(path, &target)?;
    Ok(target)
}

/// Path of the lock file guarding a drink log
pub fn lock_path(path: &Path) -> PathBuf {
    sibling(path, ".lock")
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DRINK_LOG_FILE.into());
    name.push(suffix);
    path.with_file_name(name)
}

fn parent_dir(path: &Path) -> Result<&Path> {
    path.parent()
        .ok_or_else(|| Error::Other(format!("drink log path {:?} has no parent", path)))
}

/// Advisory lock on `<log>.lock`, released on drop
///
/// The log file itself is replaced by rename on every save, so locks are
/// taken on a stable sibling file instead.
struct LogLock {
    file: File,
}

impl LogLock {
    fn open(path: &Path) -> Result<File> {
        std::fs::create_dir_all(parent_dir(path)?)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path(path))?;
        Ok(file)
    }

    fn shared(path: &Path) -> Result<Self> {
        let file = Self::open(path)?;
        file.lock_shared()?;
        Ok(Self { file })
    }

    fn exclusive(path: &Path) -> Result<Self> {
        let file = Self::open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for LogLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}
