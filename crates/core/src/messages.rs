//! User-facing message keys for tracking errors.
//!
//! Hosts with their own resource tables implement [`Localizer`];
//! [`EnglishMessages`] is the built-in fallback.

/// A file without an album was passed to `track`.
pub const TRACK_UNASSIGNED_FILE: &str = "Admin.Media.Exception.TrackUnassignedFile";
/// An album name did not resolve.
pub const ALBUM_NONEXISTENT: &str = "Admin.Media.Exception.AlbumNonexistent";
/// Full re-detection was requested for an album without a detector.
pub const ALBUM_NO_TRACK_DETECTOR: &str = "Admin.Media.Exception.AlbumNoTrack";

/// Resolves a resource key to a message, substituting `{0}`, `{1}`, ...
pub trait Localizer: Send + Sync {
    fn get(&self, key: &str, args: &[&str]) -> String;
}

/// Built-in English messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishMessages;

impl Localizer for EnglishMessages {
    fn get(&self, key: &str, args: &[&str]) -> String {
        let template = match key {
            TRACK_UNASSIGNED_FILE => {
                "Media file #{0} is not assigned to an album. Only album files can be tracked."
            }
            ALBUM_NONEXISTENT => "The album '{0}' does not exist.",
            ALBUM_NO_TRACK_DETECTOR => "The album '{0}' does not support track detection.",
            other => other,
        };
        format_args_into(template, args)
    }
}

/// Replace positional `{n}` placeholders. Unknown positions are left as-is.
pub fn format_args_into(template: &str, args: &[&str]) -> String {
    args.iter()
        .enumerate()
        .fold(template.to_string(), |text, (i, arg)| {
            text.replace(&format!("{{{i}}}"), arg)
        })
}
