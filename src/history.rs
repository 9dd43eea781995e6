//! The short ring of per-generation evolution metrics.
//!
//! The history keeps the last [`HISTORY_LENGTH`] computed entries plus a
//! `last_change` snapshot: the most recent entry whose real-fitness delta was
//! nonzero. The Baldwin controller reads its velocities; the loggers read
//! whole entries.

use crate::ga::{FitnessOrdering, FitnessValue};

/// Entries retained in the ring.
pub const HISTORY_LENGTH: usize = 7;

/// Metrics of one recorded generation.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HistoryEntry {
    pub generation: usize,
    pub delta_generation: usize,

    /// Best fitness as the active predictor saw it.
    pub predicted_fitness: FitnessValue,
    pub delta_predicted_fitness: FitnessValue,

    /// Best fitness on the full image.
    pub real_fitness: FitnessValue,
    pub delta_real_fitness: FitnessValue,

    /// `predicted / real`.
    pub fitness_inaccuracy: f64,

    pub best_real_fitness_ever: FitnessValue,

    pub active_predictor_fitness: FitnessValue,

    /// `delta_real_fitness / delta_generation`.
    pub velocity: f64,
    pub delta_velocity: f64,

    /// Circuit evaluations spent so far, in pixels.
    pub cgp_evals: u64,

    /// Active predictor length, `-1` outside coevolution.
    pub pred_length: i64,
    /// Effective (deduplicated) predictor length, `-1` outside coevolution.
    pub pred_used_length: i64,
}

#[derive(Debug)]
pub struct History {
    last_change: HistoryEntry,
    entries: [HistoryEntry; HISTORY_LENGTH],
    stored: usize,
    pointer: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Starts with one all-zero sentinel entry, so delta computation and the
    /// Baldwin window always have a predecessor.
    pub fn new() -> Self {
        Self {
            last_change: HistoryEntry::default(),
            entries: [HistoryEntry::default(); HISTORY_LENGTH],
            stored: 1,
            pointer: 1,
        }
    }

    pub fn stored(&self) -> usize {
        self.stored
    }

    fn slot(&self, index: isize) -> usize {
        if self.stored < HISTORY_LENGTH {
            index.rem_euclid(self.stored as isize) as usize
        } else {
            (self.pointer as isize + index).rem_euclid(HISTORY_LENGTH as isize) as usize
        }
    }

    /// Ring access; negative indices count back from the newest entry.
    pub fn get(&self, index: isize) -> &HistoryEntry {
        &self.entries[self.slot(index)]
    }

    pub fn last(&self) -> &HistoryEntry {
        self.get(-1)
    }

    /// The most recent entry with `delta_real_fitness != 0`.
    pub fn last_change(&self) -> &HistoryEntry {
        &self.last_change
    }

    /// Derives a full entry from the measurements of the current generation
    /// and the newest recorded entry.
    #[allow(clippy::too_many_arguments)]
    pub fn calc_entry(
        &self,
        generation: usize,
        real_fitness: FitnessValue,
        predicted_fitness: FitnessValue,
        active_predictor_fitness: FitnessValue,
        cgp_evals: u64,
        pred_length: i64,
        pred_used_length: i64,
    ) -> HistoryEntry {
        let prev = self.last();
        let delta_generation = generation - prev.generation;
        let delta_real_fitness = real_fitness - prev.real_fitness;
        let velocity = delta_real_fitness / delta_generation as f64;

        let best_real_fitness_ever =
            if FitnessOrdering::Maximize.is_better(real_fitness, prev.best_real_fitness_ever) {
                real_fitness
            } else {
                prev.best_real_fitness_ever
            };

        HistoryEntry {
            generation,
            delta_generation,
            predicted_fitness,
            delta_predicted_fitness: predicted_fitness - prev.predicted_fitness,
            real_fitness,
            delta_real_fitness,
            fitness_inaccuracy: predicted_fitness / real_fitness,
            best_real_fitness_ever,
            active_predictor_fitness,
            velocity,
            delta_velocity: velocity - prev.velocity,
            cgp_evals,
            pred_length,
            pred_used_length,
        }
    }

    /// Appends an entry, replacing `last_change` when the real fitness
    /// moved.
    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries[self.pointer] = entry;

        if entry.delta_real_fitness != 0.0 {
            self.last_change = entry;
        }

        if self.stored < HISTORY_LENGTH {
            self.stored += 1;
        }
        self.pointer = (self.pointer + 1) % HISTORY_LENGTH;
    }
}
