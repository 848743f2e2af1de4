use tracing::info;

use super::track::Track;

/// The in-memory queue built from one search result set.
///
/// A new search replaces it wholesale; tracks are never merged in. `current`
/// always points inside `tracks` while the playlist is non-empty and is left
/// at 0 (ignored) when it is empty.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    tracks: Vec<Track>,
    current: usize,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>, start_index: usize) -> Self {
        let mut playlist = Self::default();
        playlist.replace(tracks, start_index);
        playlist
    }

    /// Swap in a new set of tracks. An out-of-range start index is clamped.
    pub fn replace(&mut self, tracks: Vec<Track>, start_index: usize) {
        let current = if tracks.is_empty() {
            0
        } else {
            start_index.min(tracks.len() - 1)
        };
        info!("Loaded playlist with {} tracks (starting at {})", tracks.len(), current);
        self.tracks = tracks;
        self.current = current;
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.tracks.get(self.current)
    }

    /// Point at `index`. Returns false (and changes nothing) when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.tracks.len() {
            self.current = index;
            true
        } else {
            false
        }
    }

    /// Index after the current one, wrapping to 0
    pub fn next_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some((self.current + 1) % self.tracks.len())
    }

    /// Index before the current one, wrapping to the last track
    pub fn previous_index(&self) -> Option<usize> {
        if self.tracks.is_empty() {
            return None;
        }
        Some(if self.current == 0 {
            self.tracks.len() - 1
        } else {
            self.current - 1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(n: usize) -> Vec<Track> {
        (0..n)
            .map(|i| Track::new(format!("id{}", i), format!("Song {}", i), None, Some(120), None))
            .collect()
    }

    #[test]
    fn test_replace_clamps_start_index() {
        let playlist = Playlist::new(tracks(3), 7);
        assert_eq!(playlist.current_index(), 2);

        let empty = Playlist::new(Vec::new(), 4);
        assert_eq!(empty.current_index(), 0);
        assert!(empty.current_track().is_none());
    }

    #[test]
    fn test_circular_indices() {
        let mut playlist = Playlist::new(tracks(3), 0);
        assert_eq!(playlist.next_index(), Some(1));
        assert_eq!(playlist.previous_index(), Some(2));

        playlist.select(2);
        assert_eq!(playlist.next_index(), Some(0));
        assert_eq!(playlist.previous_index(), Some(1));

        let empty = Playlist::default();
        assert_eq!(empty.next_index(), None);
        assert_eq!(empty.previous_index(), None);
    }

    #[test]
    fn test_select_rejects_out_of_range() {
        let mut playlist = Playlist::new(tracks(2), 1);
        assert!(!playlist.select(2));
        assert_eq!(playlist.current_index(), 1);
        assert!(playlist.select(0));
        assert_eq!(playlist.current_track().map(|t| t.id.as_str()), Some("id0"));
    }
}
