//! Snapshot persistence.
//!
//! The snapshot is one pretty-printed JSON document, read once at the start
//! of a run and written once at the end. Writes go to a `.tmp` sibling which
//! is flushed and then renamed over the target, so a failed save leaves the
//! previous document untouched.
//!
//! Loading is soft: a missing file is an empty snapshot, and a corrupt or
//! unreadable file is an empty snapshot plus a warning.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Deserialize;

use crate::error::{snapshot_io, SnapshotError};
use crate::types::{Collection, Snapshot};

/// Load/save contract between the sync pipeline and persistent storage.
pub trait SnapshotStore: Send + Sync {
    /// Read the persisted snapshot. Never fails: problems degrade to an
    /// empty snapshot and are logged.
    fn load(&self) -> Snapshot;

    /// Persist `snapshot` wholesale. Either the whole document is durably
    /// written or the previous one is left as it was.
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotCompat {
    Keyed(Snapshot),
    Legacy(Vec<Collection>),
}

// ---------------------------------------------------------------------------
// JSON file store
// ---------------------------------------------------------------------------

/// [`SnapshotStore`] backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<snapshot>.tmp`, always in the same directory as the target so the
    /// final rename stays on one filesystem.
    pub fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.json".to_string());
        self.path.with_file_name(format!("{name}.tmp"))
    }

    /// Strict read. `Ok(None)` when the file does not exist.
    pub fn read(&self) -> Result<Option<Snapshot>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| snapshot_io(&self.path, e))?;
        let compat: SnapshotCompat =
            serde_json::from_str(&contents).map_err(|e| SnapshotError::Parse {
                path: self.path.clone(),
                source: e,
            })?;
        let mut snapshot = match compat {
            SnapshotCompat::Keyed(snapshot) => snapshot,
            SnapshotCompat::Legacy(list) => {
                tracing::info!(
                    path = %self.path.display(),
                    collections = list.len(),
                    "migrating legacy snapshot layout"
                );
                Snapshot::from_list(list)
            }
        };
        for collection in snapshot.collections.values_mut() {
            collection.normalize();
        }
        Ok(Some(snapshot))
    }

    fn write_atomic(&self, json: &str, tmp: &Path) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| snapshot_io(parent, e))?;
        }

        let written = File::create(tmp).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(tmp);
            return Err(snapshot_io(tmp, e));
        }

        if let Err(e) = fs::rename(tmp, &self.path) {
            let _ = fs::remove_file(tmp);
            return Err(snapshot_io(&self.path, e));
        }
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Snapshot {
        match self.read() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "no snapshot yet, starting empty");
                Snapshot::default()
            }
            Err(err) => {
                tracing::warn!(error = %err, "snapshot unreadable, starting empty");
                Snapshot::default()
            }
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        self.write_atomic(&json, &self.tmp_path())?;
        tracing::info!(
            path = %self.path.display(),
            collections = snapshot.len(),
            "snapshot written"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// [`SnapshotStore`] kept in memory, for tests and embedders. Can be told to
/// fail saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: Option<Snapshot>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::default();
        store.lock().snapshot = Some(snapshot);
        store
    }

    /// Make every subsequent `save` fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    /// The last saved (or seeded) snapshot.
    pub fn current(&self) -> Option<Snapshot> {
        self.lock().snapshot.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a panicking test thread; the state is
        // still plain data.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Snapshot {
        self.lock().snapshot.clone().unwrap_or_default()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let mut state = self.lock();
        if state.fail_saves {
            return Err(snapshot_io(
                "<memory>",
                std::io::Error::other("save disabled"),
            ));
        }
        state.snapshot = Some(snapshot.clone());
        state.saves += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
