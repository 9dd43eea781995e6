//! Human-readable progress lines, for stdout and for `progress.log`.

use std::io::Write;

use chrono::Local;

use super::{Event, Logger, LoggerClock};

pub struct TextLogger {
    clock: LoggerClock,
    out: Box<dyn Write + Send>,
    /// Prefix every line with a local timestamp (used for `progress.log`).
    timestamps: bool,
}

impl TextLogger {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            clock: LoggerClock::new(),
            out,
            timestamps: false,
        }
    }

    pub fn with_timestamps(out: Box<dyn Write + Send>) -> Self {
        Self {
            clock: LoggerClock::new(),
            out,
            timestamps: true,
        }
    }

    fn line(&mut self, message: &str) {
        let result = if self.timestamps {
            writeln!(
                self.out,
                "[{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                message
            )
        } else {
            writeln!(self.out, "{}", message)
        };
        if result.is_ok() {
            let _ = self.out.flush();
        }
    }
}

impl Logger for TextLogger {
    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::Started { entry } => {
                self.line("Evolution starts now.");
                self.line(&format!(
                    "Generation {}: Fitness predicted / real: {} / {}",
                    entry.generation, entry.predicted_fitness, entry.real_fitness
                ));
            }
            Event::Finished { reason, entry, .. } => {
                self.line(&format!(
                    "Generation {}: Evolution stopped. {}",
                    entry.generation, reason
                ));
            }
            Event::BetterCgp { entry } | Event::LogTick { entry } => {
                let usertime = LoggerClock::format(self.clock.usertime());
                self.line(&format!(
                    "Generation {}: Fitness predicted / real: {} / {}. Usertime {}",
                    entry.generation, entry.predicted_fitness, entry.real_fitness, usertime
                ));
            }
            Event::BaldwinTriggered { entry } => {
                self.line(&format!(
                    "Generation {}: Baldwin triggered. Inaccuracy: {:.5}",
                    entry.generation, entry.fitness_inaccuracy
                ));
            }
            Event::Signal { signal, entry } => {
                self.line(&format!(
                    "Generation {}: Signal {} received",
                    entry.generation, signal
                ));
            }
            Event::BetterPredictor {
                old_fitness,
                new_fitness,
            } => {
                self.line(&format!(
                    "Predictor's fitness changed {} --> {}",
                    old_fitness, new_fitness
                ));
            }
            Event::PredictorLengthChangeScheduled { new_length, entry } => {
                self.line(&format!(
                    "Generation {}: Predictor's length change scheduled {} --> {}",
                    entry.generation, entry.pred_length, new_length
                ));
            }
            Event::PredictorLengthChangeApplied {
                generation,
                old_length,
                new_length,
                ..
            } => {
                self.line(&format!(
                    "Generation {}: Predictor's length change applied   {} --> {}",
                    generation, old_length, new_length
                ));
            }
        }
    }
}
