use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::error::Result;

/// Side-car file holding the filename -> fingerprint map.
pub const LEDGER_FILENAME: &str = ".sync-fingerprints.json";

/// Side-car file holding the last-synced source catalogs.
pub const SNAPSHOT_FILENAME: &str = ".sync-snapshots.json";

/// Deterministic digest of a catalog's content. Key order does not matter:
/// the catalog is serialized in canonical form (sorted keys) before hashing.
pub fn fingerprint_of(catalog: &Catalog) -> Result<String> {
    let canonical = serde_jcs::to_string(catalog)?;
    Ok(blake3::hash(canonical.as_bytes()).to_hex().to_string())
}

/// Persisted filename -> fingerprint mapping; the source of truth for "has
/// this file changed since we last looked".
///
/// An entry must only be updated after the corresponding file write has
/// succeeded, otherwise a failed write would be masked on the next signal.
pub struct Ledger {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl Ledger {
    /// Load the ledger side-car from a catalog directory. A missing or
    /// corrupt ledger starts empty, never an error.
    pub async fn load(dir: &Path) -> Self {
        let path = dir.join(LEDGER_FILENAME);
        let entries = read_sidecar(&path).await;
        Self { path, entries }
    }

    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries.get(filename).map(String::as_str)
    }

    pub fn set(&mut self, filename: &str, fingerprint: String) {
        self.entries.insert(filename.to_string(), fingerprint);
    }

    /// Make the current entries durable. Callers must persist after every
    /// `set` that should survive a restart.
    pub async fn persist(&self) -> Result<()> {
        write_sidecar(&self.path, &self.entries).await
    }

    /// Drop all entries and delete the side-car file. The next sync then
    /// re-validates every catalog against content.
    pub async fn reset(&mut self) -> Result<()> {
        self.entries.clear();
        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        debug!("Ledger reset: {}", self.path.display());
        Ok(())
    }
}

/// Last-synced content of each source catalog. Diffing against these
/// snapshots is what turns "file changed" into "these keys changed".
pub struct SnapshotStore {
    path: PathBuf,
    entries: BTreeMap<String, Catalog>,
}

impl SnapshotStore {
    /// Load the snapshot side-car from a catalog directory, with the same
    /// lenient semantics as the ledger.
    pub async fn load(dir: &Path) -> Self {
        let path = dir.join(SNAPSHOT_FILENAME);
        let entries = read_sidecar(&path).await;
        Self { path, entries }
    }

    pub fn get(&self, filename: &str) -> Option<&Catalog> {
        self.entries.get(filename)
    }

    pub fn set(&mut self, filename: &str, catalog: Catalog) {
        self.entries.insert(filename.to_string(), catalog);
    }

    pub async fn persist(&self) -> Result<()> {
        write_sidecar(&self.path, &self.entries).await
    }
}

async fn read_sidecar<T>(path: &Path) -> T
where
    T: serde::de::DeserializeOwned + Default,
{
    match fs::read_to_string(path).await {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring corrupt side-car {}: {}", path.display(), e);
                T::default()
            }
        },
        Err(e) => {
            debug!("No side-car at {}: {}", path.display(), e);
            T::default()
        }
    }
}

async fn write_sidecar<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value)?;
    content.push('\n');

    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, content).await?;
    fs::rename(&tmp_path, path).await?;
    Ok(())
}
