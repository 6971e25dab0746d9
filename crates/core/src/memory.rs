//! In-process [`MediaStore`] used by tests and embedded hosts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::TrackingError;
use crate::media_file::{MediaFile, OrphanPolicy};
use crate::store::MediaStore;
use crate::types::DbId;

/// Map-backed store that counts loads and commits.
#[derive(Debug, Default)]
pub struct InMemoryMediaStore {
    files: Mutex<HashMap<DbId, MediaFile>>,
    files_loaded: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: impl IntoIterator<Item = MediaFile>) -> Self {
        let store = Self::new();
        for file in files {
            store.insert(file);
        }
        store
    }

    pub fn insert(&self, file: MediaFile) {
        self.lock().insert(file.id, file);
    }

    /// Current stored state of a file, without counting as a load.
    pub fn get(&self, id: DbId) -> Option<MediaFile> {
        self.lock().get(&id).cloned()
    }

    /// Number of file aggregates loaded so far.
    pub fn files_loaded(&self) -> usize {
        self.files_loaded.load(Ordering::SeqCst)
    }

    /// Number of `save_files` commits so far.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.files_loaded.store(0, Ordering::SeqCst);
        self.commits.store(0, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<DbId, MediaFile>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn find_file(&self, id: DbId) -> Result<Option<MediaFile>, TrackingError> {
        let file = self.lock().get(&id).cloned();
        if file.is_some() {
            self.files_loaded.fetch_add(1, Ordering::SeqCst);
        }
        Ok(file)
    }

    async fn find_files(&self, ids: &[DbId]) -> Result<Vec<MediaFile>, TrackingError> {
        let files = self.lock();
        let found: Vec<MediaFile> = ids.iter().filter_map(|id| files.get(id).cloned()).collect();
        self.files_loaded.fetch_add(found.len(), Ordering::SeqCst);
        Ok(found)
    }

    async fn save_files(&self, files: &[MediaFile]) -> Result<(), TrackingError> {
        let mut stored = self.lock();
        for file in files {
            match stored.get_mut(&file.id) {
                Some(current) => file.merge_into(current),
                None => {
                    stored.insert(file.id, file.clone().into_committed());
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_tracks_in_album(&self, album: &str) -> Result<u64, TrackingError> {
        let mut stored = self.lock();
        let mut removed = 0u64;
        for file in stored.values_mut() {
            let doomed: Vec<_> = file
                .tracks()
                .iter()
                .filter(|t| t.album == album)
                .cloned()
                .collect();
            for track in &doomed {
                // Set-based delete: the stored transient flag stays as is.
                file.remove_track(track, OrphanPolicy::KeepPersistent);
            }
            file.mark_committed();
            removed += doomed.len() as u64;
        }
        Ok(removed)
    }
}
