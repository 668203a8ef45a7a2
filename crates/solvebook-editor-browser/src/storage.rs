//! Drafts in `localStorage`.

use gloo_storage::errors::StorageError;
use gloo_storage::{LocalStorage, Storage};
use solvebook_editor_core::{DraftSnapshot, DraftStore, PlatformError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDraftStore;

impl DraftStore for LocalDraftStore {
    fn load(&self, key: &str) -> Result<Option<DraftSnapshot>, PlatformError> {
        match LocalStorage::get::<DraftSnapshot>(key) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(err) => Err(PlatformError(format!("LocalStorage error: {err}"))),
        }
    }

    fn save(&self, key: &str, snapshot: &DraftSnapshot) -> Result<(), PlatformError> {
        LocalStorage::set(key, snapshot)
            .map_err(|err| PlatformError(format!("LocalStorage error: {err}")))
    }

    fn remove(&self, key: &str) {
        LocalStorage::delete(key);
    }
}
