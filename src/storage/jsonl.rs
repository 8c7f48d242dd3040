//! JSONL (JSON Lines) cache store.
//!
//! One file per collection under `<data_dir>/cache/`, one cached record per
//! line. Upserts rewrite the file through a temporary sibling and a rename,
//! so readers only ever see a complete file. Lines that do not parse as a
//! record are carried over unchanged.
//!
//! Every upsert reads and rewrites the whole file, so this backend is meant
//! for local runs and small leagues; use MongoDB for anything larger.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::{CacheStore, StorageError};
use crate::models::CachedRecord;

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write entities, atomically replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        let lines = entities
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        self.write_lines(&lines)
    }

    /// Write pre-encoded lines, atomically replacing the entire file.
    pub fn write_lines(&self, lines: &[String]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp = self.path.with_extension("jsonl.tmp");
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);

        for line in lines {
            writeln!(writer, "{}", line)?;
        }

        writer.flush()?;
        drop(writer);
        fs::rename(&tmp, &self.path)?;

        debug!("Wrote {} lines to {:?}", lines.len(), self.path);
        Ok(lines.len())
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Read all non-blank lines verbatim. A missing file reads as empty.
    pub fn read_lines(&self) -> Result<Vec<String>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut lines = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                lines.push(line);
            }
        }
        Ok(lines)
    }

    /// Read all entities from the file.
    ///
    /// A missing file reads as empty. Lines that fail to parse are skipped
    /// with a warning.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        let mut entities = Vec::new();

        for (idx, line) in self.read_lines()?.iter().enumerate() {
            match serde_json::from_str(line) {
                Ok(entity) => entities.push(entity),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }
}

/// Cache store persisting records to a JSONL file.
pub struct JsonlStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl JsonlStore {
    /// Open (or prepare) `<data_dir>/cache/<collection>.jsonl`.
    pub fn open(data_dir: &Path, collection: &str) -> Result<Self, StorageError> {
        if collection.is_empty() || collection.contains(['/', '\\']) || collection.starts_with('.')
        {
            return Err(StorageError::InvalidPath(PathBuf::from(collection)));
        }

        let dir = data_dir.join("cache");
        fs::create_dir_all(&dir)?;

        Ok(Self {
            path: dir.join(format!("{}.jsonl", collection)),
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every stored record.
    pub async fn read_all(&self) -> Result<Vec<CachedRecord>, StorageError> {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            JsonlReader::new(path).read_all()
        })
        .await?
    }
}

/// Replace the line holding `record`'s battle tag, or append one.
///
/// Runs under the store lock on the blocking pool, so an abandoned upsert
/// still finishes its rewrite before the next one starts.
fn upsert_file(path: PathBuf, record: &CachedRecord) -> Result<(), StorageError> {
    let encoded = serde_json::to_string(record)?;
    let mut lines = JsonlReader::<CachedRecord>::new(path.clone()).read_lines()?;

    let existing = lines.iter().position(|line| {
        serde_json::from_str::<CachedRecord>(line)
            .map(|stored| stored.battle_tag() == record.battle_tag())
            .unwrap_or(false)
    });
    match existing {
        Some(idx) => lines[idx] = encoded,
        None => lines.push(encoded),
    }

    JsonlWriter::<CachedRecord>::new(path).write_lines(&lines)?;
    Ok(())
}

#[async_trait]
impl CacheStore for JsonlStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn upsert(&self, record: &CachedRecord) -> Result<(), StorageError> {
        let path = self.path.clone();
        let lock = Arc::clone(&self.lock);
        let record = record.clone();

        tokio::task::spawn_blocking(move || {
            let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            upsert_file(path, &record)
        })
        .await?
    }

    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(self.path.parent().map(Path::is_dir).unwrap_or(false))
    }
}
