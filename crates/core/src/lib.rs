//! Media reference tracking.
//!
//! Keeps a record of which entity properties reference which media files so
//! that unreferenced files can be garbage-collected safely:
//!
//! - [`tracked_properties`]: startup registry of media foreign keys.
//! - [`tracker`]: [`MediaTracker`], the only component mutating tracks.
//! - [`interceptor`]: derives track deltas from ordinary entity saves.
//! - [`detector`]: full album re-scans feeding bulk re-detection.
//!
//! Storage is reached through the [`MediaStore`] port; the Postgres
//! implementation lives in `shopmedia-db`.

pub mod album;
pub mod config;
pub mod detector;
pub mod entity;
pub mod error;
pub mod interceptor;
pub mod media_file;
pub mod memory;
pub mod messages;
pub mod store;
pub mod track;
pub mod tracked_properties;
pub mod tracker;
pub mod types;

pub use album::{AlbumInfo, AlbumLookup, AlbumRegistry, DetectorKey};
pub use config::TrackingConfig;
pub use detector::{DetectorIndex, StaticDetector, TrackDetector, TrackStream};
pub use entity::{EntityKey, TrackableEntity};
pub use error::TrackingError;
pub use interceptor::{EntityState, MediaTrackInterceptor, SaveEntry, SaveInterceptor};
pub use media_file::{MediaFile, OrphanPolicy, TrackState};
pub use memory::InMemoryMediaStore;
pub use store::MediaStore;
pub use track::{MediaTrack, TrackAction, TrackOperation};
pub use tracked_properties::{TrackedMediaProperty, TrackedPropertyRegistry, TrackedPropertyTable};
pub use tracker::{BatchOutcome, DetectionReport, MediaTracker, TrackerScope};
