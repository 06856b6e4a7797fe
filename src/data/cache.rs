use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};

use super::loader::load_file;
use super::model::VisitTable;
use crate::config::ColumnConfig;

// ---------------------------------------------------------------------------
// Table cache: load each sheet once, reload when the file changes
// ---------------------------------------------------------------------------

/// File identity used to decide whether a cached table is still valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)
            .with_context(|| format!("reading metadata of {}", path.display()))?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

struct Entry {
    fingerprint: Fingerprint,
    columns: ColumnConfig,
    table: Arc<VisitTable>,
}

/// Loaded tables keyed by canonical path.
///
/// A hit requires the same column configuration and an unchanged file
/// (modification time and length); anything else reloads from disk.
#[derive(Default)]
pub struct TableCache {
    entries: HashMap<PathBuf, Entry>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it if absent or stale.
    pub fn load(&mut self, path: &Path, columns: &ColumnConfig) -> Result<Arc<VisitTable>> {
        let key = path
            .canonicalize()
            .with_context(|| format!("cannot open {}", path.display()))?;
        let fingerprint = Fingerprint::of(&key)?;

        if let Some(entry) = self.entries.get(&key) {
            if entry.fingerprint == fingerprint && entry.columns == *columns {
                log::debug!("cache hit for {}", key.display());
                return Ok(Arc::clone(&entry.table));
            }
            log::warn!("{} changed on disk, reloading", key.display());
        }

        let table = Arc::new(load_file(&key, columns)?);
        self.entries.insert(
            key,
            Entry {
                fingerprint,
                columns: columns.clone(),
                table: Arc::clone(&table),
            },
        );
        Ok(table)
    }

    /// Drop the cached table for `path`, forcing the next load to read the file.
    pub fn invalidate(&mut self, path: &Path) {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.entries.remove(&key);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
