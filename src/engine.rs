use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use crate::collection::Collection;
use crate::errors::DbError;
use crate::types::{CollectionName, Operation};
use crate::wal::{self, WalRecord, WalWriter, write_record};

pub const WAL_FILE: &str = "wal.bin";

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub path: PathBuf,
    /// Fsync after every WAL append.
    pub sync_writes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self { path: PathBuf::from("./data"), sync_writes: false }
    }
}

/// The embedded engine: a registry of collections backed by one
/// write-ahead log. Opening replays the log to rebuild collections,
/// documents, and declared indexes.
pub struct Engine {
    pub(crate) options: EngineOptions,
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
    wal: Arc<WalWriter>,
    wal_path: PathBuf,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("options", &self.options)
            .field("wal_path", &self.wal_path)
            .finish()
    }
}

impl Engine {
    /// Open (or create) a database directory.
    pub fn open(options: EngineOptions) -> Result<Self, DbError> {
        fs::create_dir_all(&options.path)?;
        let wal_path = options.path.join(WAL_FILE);
        if !wal_path.exists() {
            File::create(&wal_path)?;
        }

        let wal = Arc::new(WalWriter::open(&wal_path, options.sync_writes)?);
        let engine = Self {
            options,
            collections: RwLock::new(HashMap::new()),
            wal,
            wal_path,
        };
        engine.replay()?;
        Ok(engine)
    }

    /// Convenience: open at `path` with default options.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        Self::open(EngineOptions { path: path.into(), ..EngineOptions::default() })
    }

    fn replay(&self) -> Result<(), DbError> {
        let mut reader = BufReader::new(File::open(&self.wal_path)?);
        let mut applied = 0usize;
        loop {
            let rec = match wal::read_record(&mut reader) {
                Ok(Some(rec)) => rec,
                Ok(None) => break,
                Err(DbError::WalCorrupt(msg)) => {
                    // Tolerate a damaged tail; everything before it is applied.
                    log::warn!("wal replay stopped: {msg}");
                    break;
                }
                Err(e) => return Err(e),
            };
            self.apply_record(rec);
            applied += 1;
        }
        log::info!("wal replay complete records={applied} path={}", self.wal_path.display());
        Ok(())
    }

    fn apply_record(&self, rec: WalRecord) {
        let mut cols = self.collections.write();
        match rec.op {
            Operation::CreateCollection => {
                cols.entry(rec.collection.clone())
                    .or_insert_with(|| Arc::new(Collection::new(rec.collection, self.wal.clone())));
            }
            Operation::DropCollection => {
                cols.remove(&rec.collection);
            }
            Operation::RenameCollection { new_name } => {
                if let Some(col) = cols.remove(&rec.collection) {
                    col.set_name(new_name.clone());
                    cols.insert(new_name, col);
                }
            }
            Operation::Insert { document } => {
                if let Some(col) = cols.get(&rec.collection) {
                    col.apply_insert(document);
                }
            }
            Operation::Update { document_id, new_document } => {
                if let Some(col) = cols.get(&rec.collection) {
                    col.apply_update(&document_id, new_document);
                }
            }
            Operation::Delete { document_id } => {
                if let Some(col) = cols.get(&rec.collection) {
                    col.apply_delete(&document_id);
                }
            }
            Operation::CreateIndex { spec, kind } => {
                if let Some(col) = cols.get(&rec.collection)
                    && let Err(e) = col.apply_create_index(spec, kind)
                {
                    log::warn!("wal replay: duplicate index ignored: {e}");
                }
            }
            Operation::DropIndex { name } => {
                if let Some(col) = cols.get(&rec.collection) {
                    col.apply_drop_index(&name);
                }
            }
        }
    }

    /// Create a collection; returns the existing one when already present.
    pub fn create_collection(&self, name: impl Into<String>) -> Result<Arc<Collection>, DbError> {
        let name = name.into();
        if let Some(existing) = self.collections.read().get(&name) {
            return Ok(existing.clone());
        }
        self.wal.append(&WalRecord::new(name.clone(), Operation::CreateCollection))?;
        let col = Arc::new(Collection::new(name.clone(), self.wal.clone()));
        self.collections.write().insert(name, col.clone());
        Ok(col)
    }

    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    pub fn drop_collection(&self, name: &str) -> Result<bool, DbError> {
        if self.collections.read().get(name).is_none() {
            return Ok(false);
        }
        self.wal.append(&WalRecord::new(name.to_string(), Operation::DropCollection))?;
        Ok(self.collections.write().remove(name).is_some())
    }

    pub fn rename_collection(&self, old: &str, new: &str) -> Result<(), DbError> {
        let mut cols = self.collections.write();
        if cols.contains_key(new) {
            return Err(DbError::CollectionAlreadyExists(new.to_string()));
        }
        let Some(col) = cols.remove(old) else {
            return Err(DbError::NoSuchCollection(old.to_string()));
        };
        self.wal.append(&WalRecord::new(
            old.to_string(),
            Operation::RenameCollection { new_name: new.to_string() },
        ))?;
        col.set_name(new.to_string());
        cols.insert(new.to_string(), col);
        Ok(())
    }

    pub fn list_collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Flush buffered WAL writes to disk.
    pub fn flush(&self) -> Result<(), DbError> {
        self.wal.flush()
    }

    /// Rewrite the WAL from live state and swap files atomically.
    pub fn compact(&self) -> Result<(), DbError> {
        let cols = self.collections.read();
        let tmp_path = self.options.path.join("wal.compacting.bin");
        {
            let tmp = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(tmp);
            let mut names: Vec<&String> = cols.keys().collect();
            names.sort();
            for name in names {
                let col = &cols[name.as_str()];
                write_record(
                    &mut writer,
                    &WalRecord::new(name.clone(), Operation::CreateCollection),
                )?;
                for desc in col.list_indexes() {
                    write_record(
                        &mut writer,
                        &WalRecord::new(
                            name.clone(),
                            Operation::CreateIndex { spec: desc.spec, kind: desc.kind },
                        ),
                    )?;
                }
                for document in col.all_documents() {
                    write_record(
                        &mut writer,
                        &WalRecord::new(name.clone(), Operation::Insert { document }),
                    )?;
                }
            }
            use std::io::Write;
            writer.flush()?;
            writer.get_mut().sync_all()?;
        }

        self.wal.flush()?;
        let backup = self.options.path.join("wal.backup.bin");
        if backup.exists() {
            let _ = fs::remove_file(&backup);
        }
        fs::rename(&self.wal_path, &backup)?;
        fs::rename(&tmp_path, &self.wal_path)?;
        self.wal.reopen(&self.wal_path)?;
        let _ = fs::remove_file(&backup);
        log::info!("wal compacted path={}", self.wal_path.display());
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}
