use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::errors::DbError;
use crate::types::{CollectionName, Operation, SerializableDateTime};

/// Upper bound on a single record's payload. A length prefix past this is
/// treated as corruption rather than trusted for allocation.
const MAX_RECORD_LEN: usize = 64 * 1024 * 1024;

/// One WAL record, bincode-encoded and framed as
/// `[len: u32 LE][crc32: u32 LE][payload]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalRecord {
    pub collection: CollectionName,
    pub op: Operation,
    pub ts: SerializableDateTime,
}

impl WalRecord {
    #[must_use]
    pub fn new(collection: CollectionName, op: Operation) -> Self {
        Self { collection, op, ts: SerializableDateTime(chrono::Utc::now()) }
    }
}

pub fn write_record<W: Write>(writer: &mut W, rec: &WalRecord) -> Result<(), DbError> {
    let bytes = bincode::serialize(rec)?;
    if bytes.len() > MAX_RECORD_LEN {
        return Err(DbError::WalCorrupt(format!("record of {} bytes exceeds cap", bytes.len())));
    }
    let len = u32::try_from(bytes.len())
        .map_err(|_| DbError::WalCorrupt("record exceeds u32 length".into()))?;
    let crc = crc32fast::hash(&bytes);
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&bytes)?;
    Ok(())
}

/// Reads the next record. `Ok(None)` signals a clean end of log; a short
/// read or checksum mismatch is reported as `WalCorrupt` so replay can
/// stop at the damaged tail.
pub fn read_record<R: Read>(reader: &mut R) -> Result<Option<WalRecord>, DbError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(DbError::Io(e)),
    }
    let mut crc_buf = [0u8; 4];
    reader
        .read_exact(&mut crc_buf)
        .map_err(|_| DbError::WalCorrupt("truncated record header".into()))?;
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RECORD_LEN {
        return Err(DbError::WalCorrupt(format!("record length {len} exceeds cap")));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).map_err(|_| DbError::WalCorrupt("truncated record body".into()))?;
    let expected = u32::from_le_bytes(crc_buf);
    let actual = crc32fast::hash(&buf);
    if actual != expected {
        return Err(DbError::WalCorrupt(format!("crc mismatch: {actual:#x} != {expected:#x}")));
    }
    let rec: WalRecord = bincode::deserialize(&buf)?;
    Ok(Some(rec))
}

/// Shared append handle over the log file. Collections write through
/// this; the engine swaps the underlying file during compaction.
pub struct WalWriter {
    inner: parking_lot::Mutex<std::io::BufWriter<std::fs::File>>,
    sync_writes: bool,
}

impl WalWriter {
    pub fn open(path: &std::path::Path, sync_writes: bool) -> Result<Self, DbError> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { inner: parking_lot::Mutex::new(std::io::BufWriter::new(file)), sync_writes })
    }

    pub fn append(&self, rec: &WalRecord) -> Result<(), DbError> {
        let mut w = self.inner.lock();
        write_record(&mut *w, rec)?;
        if self.sync_writes {
            w.flush()?;
            w.get_mut().sync_all()?;
        }
        Ok(())
    }

    pub fn flush(&self) -> Result<(), DbError> {
        let mut w = self.inner.lock();
        w.flush()?;
        w.get_mut().sync_all()?;
        Ok(())
    }

    /// Point the handle at a freshly written log (compaction swap).
    pub fn reopen(&self, path: &std::path::Path) -> Result<(), DbError> {
        let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
        *self.inner.lock() = std::io::BufWriter::new(file);
        Ok(())
    }
}
