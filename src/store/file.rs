use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, info};

use super::cell::{DataCell, StoreData};
use crate::error::{ProbeError, Result};

/// Store persisted as one pretty-printed JSON file.
///
/// The file is read once on open and rewritten after every mutation. A
/// missing file starts an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: Mutex<StoreData>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let data: StoreData = serde_json::from_str(&content).map_err(|e| {
                ProbeError::Storage(format!("{}: {e}", path.display()))
            })?;
            info!(path = %path.display(), "Loaded store");
            data
        } else {
            debug!(path = %path.display(), "Store file does not exist, starting empty");
            StoreData::default()
        };
        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(data)?;
        // Atomic replace.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "Saved store");
        Ok(())
    }
}

impl DataCell for FileStore {
    fn read<R>(&self, f: impl FnOnce(&StoreData) -> R) -> Result<R> {
        let data = self
            .data
            .lock()
            .map_err(|_| ProbeError::Storage("store lock poisoned".into()))?;
        Ok(f(&data))
    }

    fn write<R>(&self, f: impl FnOnce(&mut StoreData) -> R) -> Result<R> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| ProbeError::Storage("store lock poisoned".into()))?;
        let mut next = data.clone();
        let out = f(&mut next);
        self.persist(&next)?;
        *data = next;
        Ok(out)
    }
}
