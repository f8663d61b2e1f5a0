use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use fixity_types::Ref;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::traits::PointerStore;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One pointer update as written to the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
enum PointerUpdate {
    Id { id: String, content: Ref },
    Head { block: Ref },
}

#[derive(Debug, Default)]
struct Pointers {
    ids: BTreeMap<String, Ref>,
    head: Option<Ref>,
}

impl Pointers {
    fn apply(&mut self, update: PointerUpdate) {
        match update {
            PointerUpdate::Id { id, content } => {
                self.ids.insert(id, content);
            }
            PointerUpdate::Head { block } => self.head = Some(block),
        }
    }
}

/// Destination of log frames. Implemented by [`File`]; tests swap in a sink
/// that fails on demand.
trait LogFile: Write {
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Append side of the log. Only whole frames ever stay in the file.
struct LogWriter<F> {
    file: F,
    len: u64,
    broken: bool,
}

impl<F: LogFile> LogWriter<F> {
    fn new(file: F, len: u64) -> Self {
        Self {
            file,
            len,
            broken: false,
        }
    }

    fn append(&mut self, frame: &[u8]) -> DbResult<()> {
        if self.broken {
            return Err(DbError::LogBroken);
        }
        if let Err(e) = self.file.write_all(frame).and_then(|()| self.file.flush()) {
            if let Err(rollback) = self.file.truncate_to(self.len) {
                warn!(len = self.len, error = %rollback, "could not roll back partial pointer frame");
                self.broken = true;
            }
            return Err(e.into());
        }
        self.len += frame.len() as u64;
        Ok(())
    }
}

/// Durable [`PointerStore`] backed by an append-only update log.
///
/// On-disk format, one frame per update:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized update)]
/// ```
///
/// Opening the store replays the log into memory; the last update for a key
/// wins. A damaged frame with nothing intact after it is a torn tail: it is
/// dropped and the file truncated back to the last whole frame. A damaged
/// frame followed by intact ones fails the open with
/// [`DbError::CorruptLog`] and the file is not touched.
pub struct FilePointerStore {
    path: PathBuf,
    pointers: RwLock<Pointers>,
    writer: Mutex<LogWriter<File>>,
    fsync: bool,
}

impl FilePointerStore {
    /// Open (or create) the pointer log at `path`.
    ///
    /// With `fsync` set, every update is synced to disk before the call
    /// returns; otherwise updates are handed to the OS only.
    pub fn open(path: impl AsRef<Path>, fsync: bool) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let (pointers, valid_len) = match replay(&bytes) {
            Ok(replayed) => replayed,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "refusing to open pointer log");
                return Err(e);
            }
        };

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        if valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid_len,
                file_len = bytes.len(),
                "truncating torn pointer log tail"
            );
            file.set_len(valid_len)?;
        }

        debug!(
            path = %path.display(),
            ids = pointers.ids.len(),
            has_head = pointers.head.is_some(),
            "pointer log replayed"
        );
        Ok(Self {
            path,
            pointers: RwLock::new(pointers),
            writer: Mutex::new(LogWriter::new(file, valid_len)),
            fsync,
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, update: PointerUpdate) -> DbResult<()> {
        let frame = encode_frame(&update)?;

        let mut w = self.writer.lock().map_err(|_| DbError::LockPoisoned)?;
        w.append(&frame)?;
        if self.fsync {
            w.file.sync_data()?;
        }

        // Applied while the writer lock is held so memory and log agree on order.
        let mut pointers = self.pointers.write().map_err(|_| DbError::LockPoisoned)?;
        pointers.apply(update);
        Ok(())
    }
}

/// Header and payload of one update, as a single buffer.
fn encode_frame(update: &PointerUpdate) -> DbResult<Vec<u8>> {
    let payload =
        bincode::serialize(update).map_err(|e| DbError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| DbError::Serialization("pointer update too large".into()))?;
    let crc = crc32fast::hash(&payload);

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

/// Decode the frame starting at `offset`. `None` if it is cut short, fails
/// its CRC or does not decode. On success returns the update and the offset
/// of the next frame.
fn read_frame(bytes: &[u8], offset: usize) -> Option<(PointerUpdate, usize)> {
    let header = bytes.get(offset..offset.checked_add(HEADER_SIZE)?)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if length == 0 {
        return None;
    }

    let start = offset + HEADER_SIZE;
    let end = start.checked_add(length)?;
    let payload = bytes.get(start..end)?;
    if crc32fast::hash(payload) != expected_crc {
        return None;
    }
    let update = bincode::deserialize(payload).ok()?;
    Some((update, end))
}

/// Replay every whole frame in `bytes`. Returns the pointers and the length
/// of the prefix made of whole frames.
fn replay(bytes: &[u8]) -> DbResult<(Pointers, u64)> {
    let mut pointers = Pointers::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let Some((update, next)) = read_frame(bytes, offset) else {
            // Anything intact past this point means the damage is not a torn write.
            if (offset + 1..bytes.len()).any(|pos| read_frame(bytes, pos).is_some()) {
                warn!(offset, file_len = bytes.len(), "damaged pointer log frame before intact frames");
                return Err(DbError::CorruptLog {
                    offset: offset as u64,
                });
            }
            warn!(offset, file_len = bytes.len(), "dropping torn pointer log tail");
            break;
        };
        pointers.apply(update);
        offset = next;
    }

    Ok((pointers, offset as u64))
}

impl PointerStore for FilePointerStore {
    fn get_id_hash(&self, id: &str) -> DbResult<Option<Ref>> {
        let pointers = self.pointers.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(pointers.ids.get(id).copied())
    }

    fn set_id_hash(&self, id: &str, content: &Ref) -> DbResult<()> {
        self.append(PointerUpdate::Id {
            id: id.to_string(),
            content: *content,
        })
    }

    fn ledger_head(&self) -> DbResult<Option<Ref>> {
        let pointers = self.pointers.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(pointers.head)
    }

    fn set_ledger_head(&self, block: &Ref) -> DbResult<()> {
        self.append(PointerUpdate::Head { block: *block })
    }

    fn ids(&self) -> DbResult<Vec<String>> {
        let pointers = self.pointers.read().map_err(|_| DbError::LockPoisoned)?;
        Ok(pointers.ids.keys().cloned().collect())
    }
}

impl std::fmt::Debug for FilePointerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePointerStore")
            .field("path", &self.path)
            .field("fsync", &self.fsync)
            .finish()
    }
}
