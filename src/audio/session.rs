// Playback session - the one place playback transitions happen
// Owns the playlist, the current player process, and the auto-advance policy.

use super::player::{release, Launcher, LiveProcess};
use super::{Playlist, Track};
use crate::config::PlaybackConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Starting,
    Playing,
    Stopping,
}

/// Things that happen to the session between user actions
#[derive(Debug)]
pub enum SessionEvent {
    /// A player process ended. `code` is `None` when it was killed by a signal.
    ProcessExited { generation: u64, code: Option<i32> },
    /// The settle delay after starting `generation` is over
    Settled { generation: u64 },
    /// A scheduled auto-advance is due
    AdvanceDue,
}

/// Why a playback request did nothing. None of these are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("Playlist is empty")]
    EmptyPlaylist,

    #[error("Only one track in playlist")]
    SinglePlaylist,

    #[error("Track transition in progress, please wait...")]
    TransitionInProgress,

    #[error("Track {index} is out of range for a playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Reached end of playlist")]
    EndOfPlaylist,

    #[error("Player failed to start: {0}")]
    SpawnFailed(String),
}

/// Something the menu should tell the user about after handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    NowPlaying(Track),
    TrackFinished,
    StoppedWithCode(i32),
    AdvanceSkipped(PlaybackError),
}

/// Read-only view of the session
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub state: PlaybackState,
    pub current_track: Option<Track>,
    pub current_index: Option<usize>,
    pub playlist: Vec<Track>,
    pub auto_advance: bool,
    pub transitioning: bool,
}

pub struct PlaybackSession {
    playlist: Playlist,
    state: PlaybackState,
    process: LiveProcess,
    auto_advance: bool,
    transitioning: bool,
    generation: u64,
    launcher: Arc<dyn Launcher>,
    config: PlaybackConfig,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    settle_timer: Option<AbortHandle>,
    pending_advance: Option<AbortHandle>,
}

impl PlaybackSession {
    pub fn new(launcher: Arc<dyn Launcher>, config: PlaybackConfig) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            playlist: Playlist::default(),
            state: PlaybackState::Idle,
            process: LiveProcess::default(),
            auto_advance: true,
            transitioning: false,
            generation: 0,
            launcher,
            config,
            events_tx,
            events_rx,
            settle_timer: None,
            pending_advance: None,
        }
    }

    /// The process slot, for the shutdown path
    pub fn live_process(&self) -> LiveProcess {
        self.process.clone()
    }

    pub fn event_sender(&self) -> mpsc::UnboundedSender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Replace the playlist. Does not start playback.
    pub fn load_playlist(&mut self, tracks: Vec<Track>, start_index: usize) {
        self.playlist.replace(tracks, start_index);
    }

    /// Start playing the track at `index`, replacing whatever is playing.
    ///
    /// Returns as soon as the player is spawned; its end is observed through
    /// `next_event`. The previous process goes through `release` but is not
    /// waited for, so for a short window two player processes may exist.
    /// An advance still pending from an earlier track is dropped.
    ///
    /// Timers need a tokio runtime. Without one the transition guard is
    /// lifted right away instead of after the settle delay.
    pub fn play(&mut self, index: usize) -> Result<Track, PlaybackError> {
        if self.playlist.is_empty() {
            warn!("play({}) on an empty playlist", index);
            return Err(PlaybackError::EmptyPlaylist);
        }

        if self.transitioning {
            warn!("Track transition in progress, rejecting play({})", index);
            return Err(PlaybackError::TransitionInProgress);
        }

        let track = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(PlaybackError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;

        self.transitioning = true;
        self.state = PlaybackState::Starting;
        self.playlist.select(index);

        if let Some(previous) = self.process.take() {
            debug!(generation = previous.generation(), "Releasing previous player");
            release(previous, Some(self.config.kill_grace()));
        }

        self.generation += 1;
        let generation = self.generation;
        self.auto_advance = true;
        self.cancel_pending_advance();
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }

        match self.launcher.launch(&track, generation, self.events_tx.clone()) {
            Ok(handle) => {
                self.process.replace(handle);
                self.state = PlaybackState::Playing;
                info!(generation, index, "Now playing {} ({})", track.display_title(), track.id);

                // The guard lifts after a fixed delay whether or not the player is audible yet
                self.settle_timer = self.schedule(self.config.settle_delay(), SessionEvent::Settled { generation });
                if self.settle_timer.is_none() {
                    self.transitioning = false;
                }
                Ok(track)
            }
            Err(e) => {
                error!(generation, "Player error: {}", e);
                self.state = PlaybackState::Idle;
                self.transitioning = false;

                if self.auto_advance && self.playlist.len() > 1 {
                    info!("Trying next track in {:?}", self.config.spawn_retry_delay());
                    self.schedule_advance(self.config.spawn_retry_delay());
                }
                Err(PlaybackError::SpawnFailed(e.to_string()))
            }
        }
    }

    pub fn play_next(&mut self) -> Result<Track, PlaybackError> {
        match self.playlist.len() {
            0 => return Err(PlaybackError::EmptyPlaylist),
            1 => return Err(PlaybackError::SinglePlaylist),
            _ => {}
        }

        let current = self.playlist.current_index();
        let next = self.playlist.next_index().ok_or(PlaybackError::EmptyPlaylist)?;

        // Unreachable with two or more tracks; kept so a bad index can never loop on itself
        if next == current {
            return Err(PlaybackError::EndOfPlaylist);
        }

        self.play(next)
    }

    pub fn play_previous(&mut self) -> Result<Track, PlaybackError> {
        let previous = self
            .playlist
            .previous_index()
            .ok_or(PlaybackError::EmptyPlaylist)?;

        self.play(previous)
    }

    /// Stop playback and keep the dying process from chaining into the next track
    pub fn stop(&mut self) {
        self.auto_advance = false;
        if self.config.cancel_pending_on_stop {
            self.cancel_pending_advance();
        }
        self.cleanup();
    }

    /// Release the current process and go idle. Safe to call repeatedly.
    pub fn cleanup(&mut self) {
        if let Some(handle) = self.process.take() {
            self.state = PlaybackState::Stopping;
            info!(generation = handle.generation(), "Releasing player process");
            release(handle, Some(self.config.kill_grace()));
        }

        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }
        self.transitioning = false;
        self.state = PlaybackState::Idle;
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            current_track: self.playlist.current_track().cloned(),
            current_index: (!self.playlist.is_empty()).then(|| self.playlist.current_index()),
            playlist: self.playlist.tracks().to_vec(),
            auto_advance: self.auto_advance,
            transitioning: self.transitioning,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Wait for the next process exit or timer
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        self.events_rx.recv().await
    }

    pub fn handle_event(&mut self, event: SessionEvent) -> Option<SessionNotice> {
        match event {
            SessionEvent::ProcessExited { generation, code } => self.on_process_exit(generation, code),
            SessionEvent::Settled { generation } => {
                if generation == self.generation {
                    debug!(generation, "Transition settled");
                    self.transitioning = false;
                    self.settle_timer = None;
                }
                None
            }
            SessionEvent::AdvanceDue => {
                self.pending_advance = None;
                match self.play_next() {
                    Ok(track) => Some(SessionNotice::NowPlaying(track)),
                    Err(e) => {
                        warn!("Auto-advance skipped: {}", e);
                        Some(SessionNotice::AdvanceSkipped(e))
                    }
                }
            }
        }
    }

    fn on_process_exit(&mut self, generation: u64, code: Option<i32>) -> Option<SessionNotice> {
        let Some(handle) = self.process.current().filter(|h| h.generation() == generation) else {
            // A process we already let go of (stopped or replaced)
            debug!(generation, ?code, "Ignoring exit of a released player");
            return None;
        };

        handle.mark_exited();
        self.process.take();
        self.transitioning = false;
        if let Some(timer) = self.settle_timer.take() {
            timer.abort();
        }

        match code {
            Some(0) => {
                info!(generation, "Track finished playing");
                if self.auto_advance && self.playlist.len() > 1 {
                    self.state = PlaybackState::Starting;
                    self.schedule_advance(self.config.advance_delay());
                } else {
                    self.state = PlaybackState::Idle;
                }
                Some(SessionNotice::TrackFinished)
            }
            Some(code) => {
                warn!(generation, code, "Track stopped with non-zero exit code");
                self.state = PlaybackState::Idle;
                Some(SessionNotice::StoppedWithCode(code))
            }
            None => {
                info!(generation, "Player was killed by a signal");
                self.state = PlaybackState::Idle;
                None
            }
        }
    }

    fn schedule_advance(&mut self, delay: Duration) {
        self.cancel_pending_advance();
        self.pending_advance = self.schedule(delay, SessionEvent::AdvanceDue);
    }

    fn cancel_pending_advance(&mut self) {
        if let Some(pending) = self.pending_advance.take() {
            debug!("Cancelling pending auto-advance");
            pending.abort();
        }
    }

    fn schedule(&self, delay: Duration, event: SessionEvent) -> Option<AbortHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No runtime available, dropping scheduled {:?}", event);
            return None;
        };

        let events = self.events_tx.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(event);
        });
        Some(task.abort_handle())
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.auto_advance = false;
        self.cancel_pending_advance();
        self.cleanup();
    }
}
