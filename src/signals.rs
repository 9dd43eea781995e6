//! Poll-only signal handling.
//!
//! The handlers do exactly one thing: flip an atomic flag. The CGP loop
//! polls [`SignalMonitor::check`] once per generation. SIGTERM and SIGXCPU
//! request a clean stop; the first SIGINT is only noted, and a second SIGINT
//! within [`SIGINT_GENERATIONS_GAP`] generations stops the run with the
//! signal as the exit code.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::{SIGINT, SIGTERM, SIGXCPU};

/// A repeated SIGINT within this many generations is fatal.
pub const SIGINT_GENERATIONS_GAP: usize = 1000;

/// Outcome of a signal poll.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CaughtSignal {
    /// First SIGINT: logged, evolution continues.
    Note(i32),
    /// Stop the run and exit with this signal number.
    Stop(i32),
}

impl CaughtSignal {
    pub fn number(&self) -> i32 {
        match self {
            CaughtSignal::Note(signal) | CaughtSignal::Stop(signal) => *signal,
        }
    }
}

#[derive(Debug)]
pub struct SignalMonitor {
    interrupted: Arc<AtomicBool>,
    terminated: Arc<AtomicBool>,
    cpu_limit: Arc<AtomicBool>,
    interrupted_generation: Option<usize>,
}

impl SignalMonitor {
    /// Installs the flag handlers for SIGINT, SIGTERM and SIGXCPU.
    pub fn install() -> io::Result<Self> {
        let monitor = Self::disconnected();
        signal_hook::flag::register(SIGINT, Arc::clone(&monitor.interrupted))?;
        signal_hook::flag::register(SIGTERM, Arc::clone(&monitor.terminated))?;
        signal_hook::flag::register(SIGXCPU, Arc::clone(&monitor.cpu_limit))?;
        Ok(monitor)
    }

    /// A monitor without registered handlers; its flags never fire.
    pub fn disconnected() -> Self {
        Self {
            interrupted: Arc::new(AtomicBool::new(false)),
            terminated: Arc::new(AtomicBool::new(false)),
            cpu_limit: Arc::new(AtomicBool::new(false)),
            interrupted_generation: None,
        }
    }

    /// Non-blocking poll, called once per generation from the CGP loop.
    pub fn check(&mut self, current_generation: usize) -> Option<CaughtSignal> {
        if self.cpu_limit.swap(false, Ordering::Relaxed) {
            log::warn!("SIGXCPU received");
            return Some(CaughtSignal::Stop(SIGXCPU));
        }

        if self.terminated.swap(false, Ordering::Relaxed) {
            log::warn!("SIGTERM received");
            return Some(CaughtSignal::Stop(SIGTERM));
        }

        if self.interrupted.load(Ordering::Relaxed) {
            if let Some(last) = self.interrupted_generation {
                if last + SIGINT_GENERATIONS_GAP > current_generation {
                    log::warn!("SIGINT received again, terminating");
                    return Some(CaughtSignal::Stop(SIGINT));
                }
            }

            log::warn!("SIGINT received");
            self.interrupted.store(false, Ordering::Relaxed);
            self.interrupted_generation = Some(current_generation);
            return Some(CaughtSignal::Note(SIGINT));
        }

        None
    }
}
