// TermTunes Library - search-and-play music from the terminal
// The player and the catalog are external tools; this crate drives them.

pub mod audio;     // tracks, playlist, player processes, playback session
pub mod catalog;   // search backend
pub mod config;    // settings and preferences
pub mod installer; // getting mpv onto the machine
pub mod shutdown;  // signals, panic hook, teardown
pub mod ui;        // terminal menu

pub use audio::{PlaybackError, PlaybackSession, PlaybackState, Track};
pub use catalog::{Catalog, YtDlpCatalog};
pub use config::Config;
