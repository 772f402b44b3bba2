// signals.rs

use std::io;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use signal_hook::consts::SIGINT;
use signal_hook::iterator::{Handle, Signals};
use crate::error::{Result, ShellError};
use crate::util::report;

/// The one foreground process an interrupt is allowed to touch.
#[derive(Debug, Default)]
pub struct ActiveProcess {
    // 0 means no process is active.
    pid: AtomicI32,
}

impl ActiveProcess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, pid: Pid) {
        self.pid.store(pid.as_raw(), Ordering::SeqCst);
    }

    /// Clears the record, but only if it still names `pid`.
    pub fn clear(&self, pid: Pid) {
        let _ = self.pid.compare_exchange(pid.as_raw(), 0, Ordering::SeqCst, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<Pid> {
        match self.pid.load(Ordering::SeqCst) {
            raw if raw > 0 => Some(Pid::from_raw(raw)),
            _ => None,
        }
    }

    /// Terminates the active process, SIGTERM first and SIGKILL if that
    /// cannot be delivered. The record is cleared whatever the outcome.
    /// Returns the pid that was signalled, or `None` when nothing was active.
    pub fn interrupt(&self) -> Result<Option<Pid>> {
        let raw = self.pid.swap(0, Ordering::SeqCst);
        if raw <= 0 {
            return Ok(None);
        }
        let pid = Pid::from_raw(raw);
        if let Err(err) = kill(pid, Signal::SIGTERM) {
            log::debug!("SIGTERM to {} failed ({}), sending SIGKILL", pid, err);
            kill(pid, Signal::SIGKILL).map_err(|source| ShellError::SignalDelivery { pid: raw, source })?;
        }
        Ok(Some(pid))
    }
}

/// Background thread turning SIGINT into `ActiveProcess::interrupt`.
///
/// While it runs the shell itself is never killed by Ctrl-C.
pub struct InterruptWatcher {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl InterruptWatcher {
    pub fn spawn(active: Arc<ActiveProcess>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT])?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("sigint-watcher".into())
            .spawn(move || {
                for _ in signals.forever() {
                    match active.interrupt() {
                        Ok(Some(pid)) => log::info!("interrupted process {}", pid),
                        Ok(None) => log::debug!("SIGINT with no active process"),
                        Err(err) => report(&err),
                    }
                }
            })?;
        Ok(Self { handle, thread: Some(thread) })
    }

    pub fn stop(mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
