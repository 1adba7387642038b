use std::sync::Mutex;

use super::cell::{DataCell, StoreData};
use crate::error::{ProbeError, Result};

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DataCell for MemoryStore {
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
        Ok(f(&mut data))
    }
}
