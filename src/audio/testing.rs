// Test doubles for the player layer

use super::player::{Launcher, PlayerError, ProcessHandle, ProcessSignal};
use super::session::SessionEvent;
use super::Track;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

pub fn sample_tracks(n: usize) -> Vec<Track> {
    (0..n)
        .map(|i| Track::new(format!("id{}", i), format!("Song {}", i), Some(format!("Artist {}", i)), Some(180 + i as u64), None))
        .collect()
}

struct Launch {
    track_id: String,
    signals: mpsc::UnboundedReceiver<ProcessSignal>,
}

/// Launcher that records launches instead of spawning processes.
///
/// Handles carry no pid, so every signal lands in the recorded receiver.
#[derive(Default)]
pub struct FakeLauncher {
    launches: Mutex<Vec<Launch>>,
    failing: AtomicBool,
    failed_attempts: AtomicUsize,
}

impl FakeLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let launcher = Self::default();
        launcher.failing.store(true, Ordering::SeqCst);
        Arc::new(launcher)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }

    pub fn failed_attempts(&self) -> usize {
        self.failed_attempts.load(Ordering::SeqCst)
    }

    pub fn launched_ids(&self) -> Vec<String> {
        self.launches.lock().unwrap().iter().map(|l| l.track_id.clone()).collect()
    }

    /// Drain the signals sent so far to the `n`th successful launch
    pub fn signals(&self, n: usize) -> Vec<ProcessSignal> {
        let mut launches = self.launches.lock().unwrap();
        let mut signals = Vec::new();
        while let Ok(signal) = launches[n].signals.try_recv() {
            signals.push(signal);
        }
        signals
    }
}

impl Launcher for FakeLauncher {
    fn launch(
        &self,
        track: &Track,
        generation: u64,
        _events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<ProcessHandle, PlayerError> {
        if self.failing.load(Ordering::SeqCst) {
            self.failed_attempts.fetch_add(1, Ordering::SeqCst);
            return Err(PlayerError::Spawn {
                binary: "fake-mpv".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.launches.lock().unwrap().push(Launch {
            track_id: track.id.clone(),
            signals: rx,
        });
        Ok(ProcessHandle::new(generation, None, tx))
    }
}
