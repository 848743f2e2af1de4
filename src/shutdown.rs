// Shutdown coordination - make sure mpv never outlives us
// Signals are turned into messages for the menu loop; faults go through a panic hook.

use crate::audio::player::{release, LiveProcess};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

pub const FAULT_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    Interrupt,
    Terminate,
    HangUp,
    Quit,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShutdownSignal::Interrupt => "SIGINT",
            ShutdownSignal::Terminate => "SIGTERM",
            ShutdownSignal::HangUp => "SIGHUP",
            ShutdownSignal::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

/// Start listening for termination signals.
///
/// Must be called inside the runtime. The returned receiver yields one
/// message per delivered signal.
#[cfg(unix)]
pub fn listen() -> std::io::Result<mpsc::UnboundedReceiver<ShutdownSignal>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;
    let mut quit = signal(SignalKind::quit())?;
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                Some(()) = interrupt.recv() => ShutdownSignal::Interrupt,
                Some(()) = terminate.recv() => ShutdownSignal::Terminate,
                Some(()) = hangup.recv() => ShutdownSignal::HangUp,
                Some(()) = quit.recv() => ShutdownSignal::Quit,
                else => break,
            };
            info!("Received {}", received);
            if tx.send(received).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

#[cfg(not(unix))]
pub fn listen() -> std::io::Result<mpsc::UnboundedReceiver<ShutdownSignal>> {
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("Received {}", ShutdownSignal::Interrupt);
            if tx.send(ShutdownSignal::Interrupt).is_err() {
                break;
            }
        }
    });

    Ok(rx)
}

/// The one teardown routine every exit path goes through.
///
/// Holds the same process slot as the session, so running it from a signal
/// path, a panic, and normal exit in any order releases the player once.
#[derive(Debug, Clone)]
pub struct Teardown {
    live: LiveProcess,
    grace: Duration,
}

impl Teardown {
    pub fn new(live: LiveProcess, grace: Duration) -> Self {
        Self { live, grace }
    }

    pub fn run(&self) {
        if let Some(handle) = self.live.take() {
            info!(generation = handle.generation(), "Cleaning up player process");
            release(handle, Some(self.grace));
        }
    }

    /// Release the player on any panic, then exit with status 1
    pub fn install_panic_hook(&self) {
        let teardown = self.clone();
        let default_hook = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |panic_info| {
            default_hook(panic_info);
            let code = teardown.on_fault(&panic_info.to_string());
            std::process::exit(code);
        }));
    }

    /// Cleanup for an unexpected fault. Returns the exit status to use.
    pub fn on_fault(&self, description: &str) -> i32 {
        error!("Uncaught fault: {}", description);
        self.run();
        FAULT_EXIT_CODE
    }
}
