//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod media_file_repo;
pub mod media_track_repo;

pub use media_file_repo::MediaFileRepo;
pub use media_track_repo::MediaTrackRepo;
