//! The typed event bus carrying evolution state to the log sinks.
//!
//! The coordinator fires [`Event`]s; each sink implements [`Logger`] and
//! reacts to the subset it cares about. Dispatch is synchronous on the
//! emitting thread, and the whole set lives behind one mutex which is the
//! innermost lock of the system.

pub mod csv;
pub mod summary;
pub mod text;

pub use csv::CsvLogger;
pub use summary::SummaryLogger;
pub use text::TextLogger;

use std::fmt;
use std::time::{Duration, Instant};

use crate::ga::{Chromosome, FitnessValue};
use crate::genotype::CircuitGenome;
use crate::history::HistoryEntry;

/// Why the evolution stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FinishReason {
    GenerationLimit,
    TargetFitness,
    Signal(i32),
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::GenerationLimit => write!(f, "Generation limit reached."),
            FinishReason::TargetFitness => write!(f, "Target fitness achieved."),
            FinishReason::Signal(_) => write!(f, "Signal received."),
        }
    }
}

/// One evolution event with the state the sinks may want.
#[derive(Debug)]
pub enum Event<'a> {
    Started {
        entry: &'a HistoryEntry,
    },
    Finished {
        reason: FinishReason,
        entry: &'a HistoryEntry,
        best: &'a Chromosome<CircuitGenome>,
    },
    BetterCgp {
        entry: &'a HistoryEntry,
    },
    BaldwinTriggered {
        entry: &'a HistoryEntry,
    },
    LogTick {
        entry: &'a HistoryEntry,
    },
    Signal {
        signal: i32,
        entry: &'a HistoryEntry,
    },
    BetterPredictor {
        old_fitness: FitnessValue,
        new_fitness: FitnessValue,
    },
    PredictorLengthChangeScheduled {
        new_length: usize,
        entry: &'a HistoryEntry,
    },
    PredictorLengthChangeApplied {
        generation: usize,
        old_length: usize,
        new_length: usize,
        old_used_length: usize,
        new_used_length: usize,
    },
}

/// A log sink.
pub trait Logger: Send {
    fn on_event(&mut self, event: &Event<'_>);
}

/// Fans events out to every registered sink, in registration order.
#[derive(Default)]
pub struct LoggerSet {
    sinks: Vec<Box<dyn Logger>>,
}

impl LoggerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Box<dyn Logger>) {
        self.sinks.push(sink);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    pub fn fire(&mut self, event: &Event<'_>) {
        for sink in self.sinks.iter_mut() {
            sink.on_event(event);
        }
    }
}

impl fmt::Debug for LoggerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoggerSet({} sinks)", self.sinks.len())
    }
}

/// Per-sink elapsed-time tracking, captured when the sink is created.
#[derive(Debug, Clone)]
pub struct LoggerClock {
    wallclock_start: Instant,
    usertime_start: Duration,
}

impl Default for LoggerClock {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggerClock {
    pub fn new() -> Self {
        Self {
            wallclock_start: Instant::now(),
            usertime_start: process_user_time(),
        }
    }

    pub fn wallclock(&self) -> Duration {
        self.wallclock_start.elapsed()
    }

    pub fn usertime(&self) -> Duration {
        process_user_time().saturating_sub(self.usertime_start)
    }

    /// Formats a duration as `XXmYY.ZZZZZZs`.
    pub fn format(duration: Duration) -> String {
        let minutes = duration.as_secs() / 60;
        let seconds = duration.as_secs() % 60;
        let micros = duration.subsec_micros();
        format!("{}m{}.{:06}s", minutes, seconds, micros)
    }
}

/// CPU time this process spent in user mode.
fn process_user_time() -> Duration {
    let mut usage = std::mem::MaybeUninit::<libc::rusage>::zeroed();
    // SAFETY: getrusage fills the buffer we own; a nonzero return leaves it
    // untouched and we fall back to zero.
    let result = unsafe { libc::getrusage(libc::RUSAGE_SELF, usage.as_mut_ptr()) };
    if result == 0 {
        let usage = unsafe { usage.assume_init() };
        Duration::new(
            usage.ru_utime.tv_sec as u64,
            (usage.ru_utime.tv_usec as u32).saturating_mul(1000),
        )
    } else {
        Duration::ZERO
    }
}
