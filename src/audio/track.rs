use serde::{Deserialize, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// A catalog entry. Built once from a search response and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String, // opaque catalog identifier
    pub title: String,
    pub artist: String,
    pub duration_display: String, // m:ss
    pub thumbnail_url: Option<String>,
}

impl Track {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist: Option<String>,
        duration_seconds: Option<u64>,
        thumbnail_url: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
            duration_display: format_duration(duration_seconds),
            thumbnail_url,
        }
    }

    /// URL the player streams from
    pub fn watch_url(&self, base: &str) -> String {
        format!("{}{}", base, self.id)
    }

    /// "Title - Artist"
    pub fn display_title(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }

    /// "Title - Artist (m:ss)", used for result choosers and playlist listings
    pub fn display_line(&self) -> String {
        format!("{} ({})", self.display_title(), self.duration_display)
    }
}

/// Seconds to m:ss. Missing or zero durations render as 0:00.
pub fn format_duration(seconds: Option<u64>) -> String {
    match seconds {
        Some(secs) if secs > 0 => format!("{}:{:02}", secs / 60, secs % 60),
        _ => "0:00".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Some(213)), "3:33");
        assert_eq!(format_duration(Some(59)), "0:59");
        assert_eq!(format_duration(Some(3605)), "60:05");
        assert_eq!(format_duration(Some(0)), "0:00");
        assert_eq!(format_duration(None), "0:00");
    }

    #[test]
    fn test_missing_artist_defaults() {
        let track = Track::new("abc123", "Song", None, Some(61), None);
        assert_eq!(track.artist, UNKNOWN_ARTIST);
        assert_eq!(track.duration_display, "1:01");

        let blank = Track::new("abc123", "Song", Some("  ".to_string()), None, None);
        assert_eq!(blank.artist, UNKNOWN_ARTIST);
        assert_eq!(blank.duration_display, "0:00");
    }

    #[test]
    fn test_display_helpers() {
        let track = Track::new("dQw4w9WgXcQ", "Never Gonna", Some("Rick".to_string()), Some(212), None);
        assert_eq!(track.display_title(), "Never Gonna - Rick");
        assert_eq!(track.display_line(), "Never Gonna - Rick (3:32)");
        assert_eq!(
            track.watch_url("https://www.youtube.com/watch?v="),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
    }
}
