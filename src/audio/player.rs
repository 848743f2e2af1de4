// External player process management
// mpv does the decoding and output; we only spawn it, watch its exit, and signal it.

use super::session::SessionEvent;
use super::Track;
use crate::config::PlayerConfig;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to signal player process: {0}")]
    Signal(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Terminate, // graceful, SIGTERM
    Kill,      // forced, SIGKILL
}

/// Handle to one spawned player process.
///
/// Cloning is cheap; all clones share the same exit flag. Dropping every
/// clone does not stop the process.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    generation: u64,
    pid: Option<u32>,
    exited: Arc<AtomicBool>,
    control: mpsc::UnboundedSender<ProcessSignal>,
}

impl ProcessHandle {
    /// `control` is the fallback path for signals when there is no pid to
    /// address directly.
    pub fn new(generation: u64, pid: Option<u32>, control: mpsc::UnboundedSender<ProcessSignal>) -> Self {
        Self {
            generation,
            pid,
            exited: Arc::new(AtomicBool::new(false)),
            control,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    pub fn mark_exited(&self) {
        self.exited.store(true, Ordering::SeqCst);
    }

    pub fn terminate(&self) -> Result<(), PlayerError> {
        self.signal(ProcessSignal::Terminate)
    }

    pub fn kill(&self) -> Result<(), PlayerError> {
        self.signal(ProcessSignal::Kill)
    }

    fn signal(&self, signal: ProcessSignal) -> Result<(), PlayerError> {
        #[cfg(unix)]
        {
            if let Some(pid) = self.pid {
                return send_unix_signal(pid, signal);
            }
        }

        self.control.send(signal).map_err(|_| {
            PlayerError::Signal(format!(
                "monitor for player generation {} is gone",
                self.generation
            ))
        })
    }
}

#[cfg(unix)]
fn send_unix_signal(pid: u32, signal: ProcessSignal) -> Result<(), PlayerError> {
    let signo = match signal {
        ProcessSignal::Terminate => libc::SIGTERM,
        ProcessSignal::Kill => libc::SIGKILL,
    };
    let pid = libc::pid_t::try_from(pid)
        .map_err(|_| PlayerError::Signal(format!("pid {} does not fit pid_t", pid)))?;

    // SAFETY: kill(2) only takes plain integers and reports failure via errno
    let rc = unsafe { libc::kill(pid, signo) };
    if rc == -1 {
        Err(PlayerError::Signal(std::io::Error::last_os_error().to_string()))
    } else {
        Ok(())
    }
}

/// The slot holding whichever player process is current.
///
/// Shared between the session and the shutdown path so both tear down the
/// same process.
#[derive(Debug, Clone, Default)]
pub struct LiveProcess {
    slot: Arc<Mutex<Option<ProcessHandle>>>,
}

impl LiveProcess {
    fn lock(&self) -> MutexGuard<'_, Option<ProcessHandle>> {
        // A panic elsewhere must not stop teardown from reaching the handle
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn replace(&self, handle: ProcessHandle) -> Option<ProcessHandle> {
        self.lock().replace(handle)
    }

    pub fn take(&self) -> Option<ProcessHandle> {
        self.lock().take()
    }

    pub fn current(&self) -> Option<ProcessHandle> {
        self.lock().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_none()
    }
}

/// Stop a player process without ever failing.
///
/// Sends a graceful terminate and, when `grace` is given, escalates to a
/// forced kill if the process is still alive once the grace period is over.
/// The escalation runs on its own task; the caller is never blocked.
pub fn release(handle: ProcessHandle, grace: Option<Duration>) {
    if handle.has_exited() {
        debug!(generation = handle.generation(), "Player already exited, nothing to release");
        return;
    }

    match handle.terminate() {
        Ok(()) => {
            debug!(generation = handle.generation(), pid = ?handle.pid(), "Sent terminate to player");
            if let Some(grace) = grace {
                schedule_forced_kill(handle, grace);
            }
        }
        Err(e) => {
            error!(generation = handle.generation(), "Error stopping player: {}", e);
            if let Err(kill_err) = handle.kill() {
                error!(generation = handle.generation(), "Error force killing player: {}", kill_err);
            }
        }
    }
}

fn schedule_forced_kill(handle: ProcessHandle, grace: Duration) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        debug!("No runtime available, skipping forced-kill escalation");
        return;
    };

    runtime.spawn(async move {
        tokio::time::sleep(grace).await;
        if !handle.has_exited() {
            warn!(generation = handle.generation(), "Force killing player process");
            if let Err(e) = handle.kill() {
                error!(generation = handle.generation(), "Error force killing player: {}", e);
            }
        }
    });
}

/// Starts player processes for the session.
///
/// Implementations must report the process's exit as
/// `SessionEvent::ProcessExited` on `events`, tagged with `generation`.
pub trait Launcher: Send + Sync {
    fn launch(
        &self,
        track: &Track,
        generation: u64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<ProcessHandle, PlayerError>;
}

pub struct MpvLauncher {
    config: PlayerConfig,
}

impl MpvLauncher {
    pub fn new(config: PlayerConfig) -> Self {
        Self { config }
    }

    /// Audio only, no terminal, no window, browser identity for the CDN
    pub fn args(&self, track: &Track) -> Vec<String> {
        let mut args = vec![
            "--no-video".to_string(),
            "--quiet".to_string(),
            "--no-terminal".to_string(),
            "--audio-display=no".to_string(),
            format!("--user-agent={}", self.config.user_agent),
        ];
        args.extend(self.config.extra_args.iter().cloned());
        args.push(track.watch_url(&self.config.watch_url_base));
        args
    }
}

impl Launcher for MpvLauncher {
    // Must be called from inside the tokio runtime
    fn launch(
        &self,
        track: &Track,
        generation: u64,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Result<ProcessHandle, PlayerError> {
        let child = Command::new(&self.config.binary)
            .args(self.args(track))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PlayerError::Spawn {
                binary: self.config.binary.clone(),
                source,
            })?;

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let handle = ProcessHandle::new(generation, child.id(), control_tx);
        info!(generation, pid = ?handle.pid(), "Spawned {} for {}", self.config.binary, track.id);

        tokio::spawn(monitor(child, generation, handle.exited.clone(), control_rx, events));
        Ok(handle)
    }
}

async fn monitor(
    mut child: Child,
    generation: u64,
    exited: Arc<AtomicBool>,
    mut control: mpsc::UnboundedReceiver<ProcessSignal>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(signal) = control.recv() => {
                // Only reached on platforms without pid signaling; both map to a hard stop
                debug!(generation, ?signal, "Stopping player through its monitor");
                if let Err(e) = child.start_kill() {
                    warn!(generation, "Failed to stop player: {}", e);
                }
            }
        }
    };

    exited.store(true, Ordering::SeqCst);
    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            error!(generation, "Failed to wait for player: {}", e);
            None
        }
    };
    debug!(generation, ?code, "Player process exited");

    // The session may be gone already during shutdown
    let _ = events.send(SessionEvent::ProcessExited { generation, code });
}
