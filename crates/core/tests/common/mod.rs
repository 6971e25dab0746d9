//! Shared fixtures for tracker and interceptor tests.
#![allow(dead_code)]

use std::sync::Arc;

use shopmedia_core::types::DbId;
use shopmedia_core::{
    AlbumInfo, AlbumRegistry, DetectorIndex, InMemoryMediaStore, MediaFile, MediaTrack,
    MediaTracker, StaticDetector, TrackableEntity, TrackingConfig,
};

pub const CATALOG: &str = "catalog";
pub const CATALOG_ID: DbId = 1;
pub const CONTENT: &str = "content";
pub const CONTENT_ID: DbId = 2;
/// Sub folder of the catalog album.
pub const CATALOG_SUBFOLDER: DbId = 10;

pub const PICTURE: &str = "MainPictureId";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Product {
    pub id: DbId,
    pub main_picture_id: Option<DbId>,
}

impl Product {
    pub fn new(id: DbId, main_picture_id: DbId) -> Self {
        Self {
            id,
            main_picture_id: Some(main_picture_id),
        }
    }
}

impl TrackableEntity for Product {
    fn entity_name(&self) -> &'static str {
        "Product"
    }
    fn entity_id(&self) -> DbId {
        self.id
    }
}

#[derive(Debug, Clone)]
pub struct BlogPost {
    pub id: DbId,
    pub picture_id: Option<DbId>,
}

impl TrackableEntity for BlogPost {
    fn entity_name(&self) -> &'static str {
        "BlogPost"
    }
    fn entity_id(&self) -> DbId {
        self.id
    }
}

/// Not registered anywhere.
#[derive(Debug, Clone)]
pub struct Category {
    pub id: DbId,
}

impl TrackableEntity for Category {
    fn entity_name(&self) -> &'static str {
        "Category"
    }
    fn entity_id(&self) -> DbId {
        self.id
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// `catalog` supports detection; `content` does not.
pub fn albums() -> AlbumRegistry {
    AlbumRegistry::new()
        .with_album(
            AlbumInfo::new(CATALOG_ID, CATALOG)
                .system()
                .with_detector::<StaticDetector>()
                .track::<Product, _>(PICTURE, |p| p.main_picture_id),
        )
        .with_album(
            AlbumInfo::new(CONTENT_ID, CONTENT)
                .track::<BlogPost, _>("PictureId", |b| b.picture_id),
        )
        .with_folder(CATALOG_SUBFOLDER, CATALOG_ID)
}

pub struct Harness {
    pub store: Arc<InMemoryMediaStore>,
    pub tracker: Arc<MediaTracker>,
}

pub fn harness(files: Vec<MediaFile>) -> Harness {
    harness_with(files, Vec::new(), TrackingConfig::default())
}

pub fn harness_with(
    files: Vec<MediaFile>,
    detected: Vec<MediaTrack>,
    config: TrackingConfig,
) -> Harness {
    let store = Arc::new(InMemoryMediaStore::with_files(files));
    let detectors = DetectorIndex::new().with(StaticDetector::new(detected));
    let tracker = Arc::new(MediaTracker::new(
        store.clone(),
        Arc::new(albums()),
        Arc::new(detectors),
        &config,
    ));
    Harness { store, tracker }
}

/// A persisted, untracked, non-transient file in the catalog album.
pub fn catalog_file(id: DbId) -> MediaFile {
    MediaFile::from_parts(id, Some(CATALOG_ID), 1, false, [])
}

pub fn catalog_track(entity_id: DbId, file_id: DbId) -> MediaTrack {
    MediaTrack::new("Product", entity_id, PICTURE, file_id, CATALOG)
}
