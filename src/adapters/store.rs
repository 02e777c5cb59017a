//! Persistent store adapters.
//!
//! All implement [`StoragePort`]:
//!
//! - [`FileStore`]: one file per `namespace/key` under a state directory.
//!   Writes go to a temp file that is renamed over the target, so a reader
//!   sees either the old or the new value.
//! - [`MemoryStore`]: in-memory map for tests and dry runs.
//! - [`WriteBehindStore`]: queues writes for a writer thread so callers
//!   never wait on the disk.

use std::collections::HashMap;
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::app::ports::{StorageError, StoragePort};

use super::outbox::Outbox;

// ── File-backed store ─────────────────────────────────────────

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) the state directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|_| StorageError::IoError)?;
        info!("Store: using {}", root.display());
        Ok(Self { root })
    }

    fn path(&self, namespace: &str, key: &str) -> PathBuf {
        self.root.join(escape(namespace)).join(escape(key))
    }
}

/// Percent-encode a key into a single path component.  ASCII
/// alphanumerics, `-`, `_` and non-leading `.` pass through; every other
/// byte becomes `%XX`, so distinct keys never share a file.
fn escape(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for (i, b) in part.bytes().enumerate() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || (b == b'.' && i > 0) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl StoragePort for FileStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let data = fs::read(self.path(namespace, key)).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound,
            _ => StorageError::IoError,
        })?;
        let dst = buf.get_mut(..data.len()).ok_or(StorageError::BufferTooSmall)?;
        dst.copy_from_slice(&data);
        Ok(data.len())
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let target = self.path(namespace, key);
        let dir = self.root.join(escape(namespace));
        fs::create_dir_all(&dir).map_err(|_| StorageError::IoError)?;

        // `%t` never comes out of `escape`, so no key can name a temp file.
        let mut tmp_name = target.as_os_str().to_owned();
        tmp_name.push("%tmp");
        let tmp = PathBuf::from(tmp_name);

        let mut file = fs::File::create(&tmp).map_err(|_| StorageError::IoError)?;
        file.write_all(data).map_err(|_| StorageError::IoError)?;
        file.sync_all().map_err(|_| StorageError::IoError)?;
        fs::rename(&tmp, &target).map_err(|_| StorageError::IoError)
    }
}

// ── In-memory store ───────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Vec<u8>>> {
        // A poisoned map is still a valid map.
        self.map.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl StoragePort for MemoryStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let entries = self.entries();
        let data = entries
            .get(&(namespace.to_string(), key.to_string()))
            .ok_or(StorageError::NotFound)?;
        let dst = buf.get_mut(..data.len()).ok_or(StorageError::BufferTooSmall)?;
        dst.copy_from_slice(data);
        Ok(data.len())
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.entries()
            .insert((namespace.to_string(), key.to_string()), data.to_vec());
        Ok(())
    }
}

// ── Write-behind wrapper ──────────────────────────────────────

struct PendingWrite {
    namespace: String,
    key: String,
    data: Vec<u8>,
}

/// Reads go straight to the backing store; writes are queued and committed
/// in order by a writer thread.  A read may miss a write still in the
/// queue, which only matters to readers other than start-up seeding.
pub struct WriteBehindStore {
    inner: Arc<dyn StoragePort>,
    outbox: Outbox<PendingWrite>,
}

impl WriteBehindStore {
    /// Wrap `inner` and start its writer thread.
    pub fn spawn(inner: Arc<dyn StoragePort>) -> io::Result<Self> {
        let outbox = Outbox::new("store");
        let target = inner.clone();
        outbox.spawn_writer(move |w: PendingWrite| {
            if let Err(e) = target.write(&w.namespace, &w.key, &w.data) {
                warn!("Store: write {}/{} failed: {}", w.namespace, w.key, e);
            }
        })?;
        Ok(Self { inner, outbox })
    }
}

impl StoragePort for WriteBehindStore {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.inner.read(namespace, key, buf)
    }

    fn write(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let queued = self.outbox.post(PendingWrite {
            namespace: namespace.to_string(),
            key: key.to_string(),
            data: data.to_vec(),
        });
        if queued { Ok(()) } else { Err(StorageError::QueueFull) }
    }
}
