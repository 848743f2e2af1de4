// Playback core: the track model, the playlist, the external player process,
// and the session tying them together.

pub mod player;
pub mod playlist;
pub mod session;
pub mod track;

#[cfg(test)]
pub(crate) mod testing;

pub use player::{Launcher, LiveProcess, MpvLauncher, PlayerError, ProcessHandle};
pub use playlist::Playlist;
pub use session::{PlaybackError, PlaybackSession, PlaybackState, SessionEvent, SessionNotice, SessionStatus};
pub use track::{format_duration, Track};
