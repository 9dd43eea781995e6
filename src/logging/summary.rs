//! The completion sink: writes the resolved configuration at start and the
//! run artifacts at the end of the run into the log directory.
//!
//! Produced files: `config.log`, `summary.log`, `best_circuit.txt`,
//! `best_circuit.chr`, `img_original.png`, `img_noisy.png`, `img_best.png`.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use super::{Event, Logger, LoggerClock};
use crate::fitness::{filter_image, fitness_to_psnr};
use crate::genotype::circuit::format::{dump_compat, dump_readable};
use crate::image::TrainingSet;

pub struct SummaryLogger {
    clock: LoggerClock,
    log_dir: PathBuf,
    config_snapshot: String,
    data: Arc<TrainingSet>,
    summary_to_stdout: bool,
}

impl SummaryLogger {
    pub fn new(
        log_dir: PathBuf,
        config_snapshot: String,
        data: Arc<TrainingSet>,
        summary_to_stdout: bool,
    ) -> Self {
        Self {
            clock: LoggerClock::new(),
            log_dir,
            config_snapshot,
            data,
            summary_to_stdout,
        }
    }

    fn create(&self, name: &str) -> std::io::Result<File> {
        File::create(self.log_dir.join(name))
    }
}

impl Logger for SummaryLogger {
    fn on_event(&mut self, event: &Event<'_>) {
        match event {
            Event::Started { .. } => {
                if let Ok(mut file) = self.create("config.log") {
                    let _ = file.write_all(self.config_snapshot.as_bytes());
                }
            }
            Event::Finished { entry, best, .. } => {
                let fitness = best.fitness.unwrap_or(0.0);

                if let Ok(mut file) = self.create("best_circuit.txt") {
                    let _ = writeln!(file, "Generation: {}", entry.generation);
                    let _ = writeln!(file, "Fitness: {}\n", fitness);
                    let _ = writeln!(file, "CGP Viewer format:");
                    let _ = dump_compat(&best.genome, &mut file);
                    let _ = writeln!(file, "\nReadable format (active nodes marked):");
                    let _ = dump_readable(&best.genome, &mut file);
                }

                if let Ok(mut file) = self.create("best_circuit.chr") {
                    let _ = dump_compat(&best.genome, &mut file);
                }

                let summary = format!(
                    "Final summary:\n\n\
                     Generation: {}\n\
                     Best fitness: {}\n\
                     PSNR: {:.2}\n\
                     CGP evaluations: {}\n\n\
                     Time in user mode: {}\n\
                     Wall clock: {}\n",
                    entry.generation,
                    fitness,
                    fitness_to_psnr(fitness),
                    entry.cgp_evals,
                    LoggerClock::format(self.clock.usertime()),
                    LoggerClock::format(self.clock.wallclock()),
                );

                if let Ok(mut file) = self.create("summary.log") {
                    let _ = file.write_all(summary.as_bytes());
                }
                if self.summary_to_stdout {
                    print!("{}", summary);
                }

                let filtered = filter_image(&best.genome, &self.data.noisy);
                for (name, image) in [
                    ("img_original.png", &self.data.original),
                    ("img_noisy.png", &self.data.noisy),
                    ("img_best.png", &filtered),
                ] {
                    if let Err(error) = image.save_png(&self.log_dir.join(name)) {
                        log::warn!("failed to save {}: {}", name, error);
                    }
                }
            }
            _ => {}
        }
    }
}
