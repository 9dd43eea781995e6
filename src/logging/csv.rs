//! The `cgp_history.csv` sink: one row per logged history entry.

use std::io::Write;

use super::{Event, Logger, LoggerClock};
use crate::history::HistoryEntry;

pub struct CsvLogger {
    clock: LoggerClock,
    out: Box<dyn Write + Send>,
    last_entry: HistoryEntry,
}

impl CsvLogger {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            clock: LoggerClock::new(),
            out,
            last_entry: HistoryEntry::default(),
        }
    }

    fn print_line(&mut self, entry: &HistoryEntry) {
        let wallclock_minutes = self.clock.wallclock().as_secs_f64() / 60.0;
        let usertime_minutes = self.clock.usertime().as_secs_f64() / 60.0;
        let result = writeln!(
            self.out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            entry.generation,
            entry.predicted_fitness,
            entry.real_fitness,
            entry.fitness_inaccuracy,
            entry.best_real_fitness_ever,
            entry.active_predictor_fitness,
            entry.pred_length,
            entry.pred_used_length,
            entry.cgp_evals,
            entry.velocity,
            entry.delta_generation,
            entry.delta_real_fitness,
            entry.delta_velocity,
            wallclock_minutes,
            usertime_minutes,
        );
        if result.is_ok() {
            let _ = self.out.flush();
        }
    }
}

impl Logger for CsvLogger {
    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::Started { entry } => {
                self.last_entry = **entry;
                let _ = writeln!(
                    self.out,
                    "generation,predicted_fitness,real_fitness,inaccuracy (pred/real),\
                     best_fitness_ever,active_predictor_fitness,pred_length,pred_used_length,\
                     cgp_evals,velocity,delta_generation,delta_fitness,delta_velocity,\
                     wallclock,usertime"
                );
            }
            Event::Finished { entry, .. } => {
                self.print_line(entry);
            }
            Event::BetterCgp { entry } | Event::LogTick { entry } => {
                self.print_line(entry);
                self.last_entry = **entry;
            }
            Event::BaldwinTriggered { entry } | Event::Signal { entry, .. } => {
                self.last_entry = **entry;
            }
            Event::PredictorLengthChangeApplied {
                new_length,
                new_used_length,
                ..
            } => {
                let mut entry = self.last_entry;
                entry.pred_length = *new_length as i64;
                entry.pred_used_length = *new_used_length as i64;
                self.print_line(&entry);
            }
            Event::BetterPredictor { .. } | Event::PredictorLengthChangeScheduled { .. } => {}
        }
    }
}
