//! Album detectors: full re-scans producing an album's authoritative set of
//! references.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::BoxStream;

use crate::album::DetectorKey;
use crate::error::TrackingError;
use crate::track::MediaTrack;

/// Stream of tracks produced by a detector.
pub type TrackStream<'a> = BoxStream<'a, Result<MediaTrack, TrackingError>>;

/// Re-scans the domain behind one album type.
///
/// The returned stream is lazy, finite and single-pass: one item per live
/// reference. Calling again starts a fresh scan.
pub trait TrackDetector: Send + Sync {
    fn detect_all_tracks<'a>(&'a self, album_name: &'a str) -> TrackStream<'a>;
}

/// Detector instances keyed by their type.
#[derive(Default, Clone)]
pub struct DetectorIndex {
    detectors: HashMap<DetectorKey, Arc<dyn TrackDetector>>,
}

impl DetectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `detector` under its type. A second registration of the
    /// same type replaces the first.
    pub fn register<D: TrackDetector + 'static>(&mut self, detector: D) -> &mut Self {
        self.detectors
            .insert(DetectorKey::of::<D>(), Arc::new(detector));
        self
    }

    pub fn with<D: TrackDetector + 'static>(mut self, detector: D) -> Self {
        self.register(detector);
        self
    }

    pub fn get(&self, key: DetectorKey) -> Option<Arc<dyn TrackDetector>> {
        self.detectors.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl std::fmt::Debug for DetectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.detectors.keys().map(DetectorKey::type_name))
            .finish()
    }
}

/// Detector over a fixed list of tracks. Useful for seeding and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    tracks: Vec<MediaTrack>,
}

impl StaticDetector {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }
}

impl TrackDetector for StaticDetector {
    fn detect_all_tracks<'a>(&'a self, album_name: &'a str) -> TrackStream<'a> {
        Box::pin(futures::stream::iter(
            self.tracks
                .iter()
                .filter(move |t| t.album == album_name)
                .cloned()
                .map(Ok),
        ))
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;

    use super::*;

    #[tokio::test]
    async fn static_detector_filters_by_album() {
        let detector = StaticDetector::new(vec![
            MediaTrack::new("Product", 1, "PictureId", 5, "catalog"),
            MediaTrack::new("BlogPost", 2, "PictureId", 6, "content"),
        ]);
        let tracks: Vec<_> = detector
            .detect_all_tracks("catalog")
            .try_collect()
            .await
            .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].entity_name, "Product");

        // A second call is a fresh scan.
        let again: Vec<_> = detector
            .detect_all_tracks("catalog")
            .try_collect()
            .await
            .unwrap();
        assert_eq!(again, tracks);
    }

    #[test]
    fn index_is_keyed_by_type() {
        let index = DetectorIndex::new().with(StaticDetector::default());
        assert_eq!(index.len(), 1);
        assert!(index.get(DetectorKey::of::<StaticDetector>()).is_some());
    }
}
