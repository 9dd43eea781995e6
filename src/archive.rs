//! Bounded archives of recently-best chromosomes.
//!
//! An archive is a fixed-capacity ring buffer plus a separately retained
//! best-ever slot. Every insert copies the chromosome in, remembers the
//! fitness it arrived with, and optionally re-scores it with an archive-owned
//! scoring function (the circuit archive re-scores on the full image, which
//! makes its entries the authoritative record the predictors are judged
//! against).
//!
//! Indices address the ring: `0` is the oldest retained entry, negative
//! indices count back from the newest (`-1` is the most recent insert).

use crate::ga::{Chromosome, FitnessOrdering, FitnessValue};

#[derive(Debug)]
pub struct Archive<G> {
    chromosomes: Vec<Chromosome<G>>,
    original_fitness: Vec<FitnessValue>,
    best_ever: Option<Chromosome<G>>,
    capacity: usize,
    pointer: usize,
    fitness_ordering: FitnessOrdering,
}

impl<G: Clone> Archive<G> {
    pub fn new(capacity: usize, fitness_ordering: FitnessOrdering) -> Self {
        assert!(capacity > 0);
        Self {
            chromosomes: Vec::with_capacity(capacity),
            original_fitness: Vec::with_capacity(capacity),
            best_ever: None,
            capacity,
            pointer: 0,
            fitness_ordering,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of retained entries, at most the capacity.
    pub fn stored(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn fitness_ordering(&self) -> FitnessOrdering {
        self.fitness_ordering
    }

    /// Maps a ring index to a slot. While partially full, indices wrap
    /// modulo the number of stored entries; once full, modulo the capacity
    /// relative to the ring pointer.
    fn slot(&self, index: isize) -> usize {
        let stored = self.stored() as isize;
        debug_assert!(stored > 0);
        if self.stored() < self.capacity {
            index.rem_euclid(stored) as usize
        } else {
            (self.pointer as isize + index).rem_euclid(self.capacity as isize) as usize
        }
    }

    pub fn get(&self, index: isize) -> &Chromosome<G> {
        &self.chromosomes[self.slot(index)]
    }

    pub fn get_mut(&mut self, index: isize) -> &mut Chromosome<G> {
        let slot = self.slot(index);
        &mut self.chromosomes[slot]
    }

    /// The fitness the entry had at the moment of insertion, before any
    /// archive re-scoring.
    pub fn original_fitness(&self, index: isize) -> FitnessValue {
        self.original_fitness[self.slot(index)]
    }

    pub fn best_ever(&self) -> Option<&Chromosome<G>> {
        self.best_ever.as_ref()
    }

    /// Entries oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &Chromosome<G>> {
        (0..self.stored() as isize).map(|index| self.get(index))
    }

    /// Inserts a copy of the chromosome, keeping its pre-insert fitness in
    /// the original-fitness ledger, and advances the ring pointer. The
    /// best-ever slot is updated if the new entry beats it.
    pub fn insert(&mut self, chromosome: &Chromosome<G>) -> &Chromosome<G> {
        self.insert_entry(chromosome.clone())
    }

    /// As [`insert`](Self::insert), additionally re-scoring the entry with
    /// the archive's own fitness function before it competes for best-ever.
    pub fn insert_rescored(
        &mut self,
        chromosome: &Chromosome<G>,
        fitness: impl FnOnce(&G) -> FitnessValue,
    ) -> &Chromosome<G> {
        let mut entry = chromosome.clone();
        entry.fitness = Some(fitness(&entry.genome));
        self.insert_entry(entry)
    }

    fn insert_entry(&mut self, entry: Chromosome<G>) -> &Chromosome<G> {
        let original = entry.fitness.unwrap_or(0.0);
        let slot = self.pointer;

        if self.chromosomes.len() < self.capacity {
            debug_assert_eq!(slot, self.chromosomes.len());
            self.chromosomes.push(entry);
            self.original_fitness.push(original);
        } else {
            self.chromosomes[slot] = entry;
            self.original_fitness[slot] = original;
        }

        let stored = &self.chromosomes[slot];
        let beats_best = match &self.best_ever {
            None => true,
            Some(best) => self.fitness_ordering.is_better(
                stored.fitness_or_worst(self.fitness_ordering),
                best.fitness_or_worst(self.fitness_ordering),
            ),
        };
        if beats_best {
            self.best_ever = Some(stored.clone());
        }

        self.pointer = (self.pointer + 1) % self.capacity;
        &self.chromosomes[slot]
    }
}
