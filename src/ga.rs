//! The genetic-algorithm substrate shared by both coevolving populations.
//!
//! A [`Chromosome`] pairs a genome with a cached fitness score; `None` marks
//! the score as stale, so a population pass only pays for chromosomes whose
//! genome actually changed. A [`Population`] owns its chromosomes, tracks the
//! current generation and the best slot, and evaluates missing scores in
//! parallel with rayon.
//!
//! Fitness functions are plain closures over `&mut G` (the circular
//! predictor encoding rewrites its own offset while being scored). Offspring
//! protocols are per-genome functions, see
//! [`circuit::offspring`](crate::genotype::circuit::offspring) and
//! [`predictor::offspring`](crate::genotype::predictor::offspring).

use rand::Rng;
use rayon::prelude::*;

/// Fitness scores are PSNR-like ratios, kept as raw doubles.
pub type FitnessValue = f64;

/// Two fitness scores closer than this are considered equal.
pub const FITNESS_EPSILON: FitnessValue = 1e-10;

/// The search goal to optimize towards (maximize or minimize).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FitnessOrdering {
    Maximize,
    Minimize,
}

impl FitnessOrdering {
    #[inline]
    pub fn is_better(&self, what: FitnessValue, compared_to: FitnessValue) -> bool {
        match self {
            FitnessOrdering::Maximize => what > compared_to,
            FitnessOrdering::Minimize => what < compared_to,
        }
    }

    #[inline]
    pub fn is_same(what: FitnessValue, compared_to: FitnessValue) -> bool {
        (what - compared_to).abs() <= FITNESS_EPSILON
    }

    #[inline]
    pub fn is_better_or_same(&self, what: FitnessValue, compared_to: FitnessValue) -> bool {
        self.is_better(what, compared_to) || Self::is_same(what, compared_to)
    }

    /// The worst representable score for this ordering.
    #[inline]
    pub fn worst(&self) -> FitnessValue {
        match self {
            FitnessOrdering::Maximize => FitnessValue::MIN,
            FitnessOrdering::Minimize => FitnessValue::MAX,
        }
    }
}

/// A genome with its cached fitness score. `fitness: None` means the genome
/// changed since it was last scored.
#[derive(Clone, Debug)]
pub struct Chromosome<G> {
    pub genome: G,
    pub fitness: Option<FitnessValue>,
}

impl<G> Chromosome<G> {
    pub fn new(genome: G) -> Self {
        Self {
            genome,
            fitness: None,
        }
    }

    #[inline]
    pub fn fitness_or_worst(&self, ordering: FitnessOrdering) -> FitnessValue {
        self.fitness.unwrap_or_else(|| ordering.worst())
    }
}

#[derive(Debug)]
pub struct Population<G> {
    pub chromosomes: Vec<Chromosome<G>>,
    pub generation: usize,
    pub fitness_ordering: FitnessOrdering,
    best_index: usize,
}

impl<G: Send + Sync> Population<G> {
    /// Builds a population of `size` chromosomes produced by `factory`.
    /// Nothing is evaluated yet.
    pub fn new(size: usize, fitness_ordering: FitnessOrdering, factory: impl FnMut() -> G) -> Self {
        let mut factory = factory;
        Self {
            chromosomes: (0..size).map(|_| Chromosome::new(factory())).collect(),
            generation: 0,
            fitness_ordering,
            best_index: 0,
        }
    }

    pub fn new_empty(fitness_ordering: FitnessOrdering) -> Self {
        Self {
            chromosomes: Vec::new(),
            generation: 0,
            fitness_ordering,
            best_index: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn best_index(&self) -> usize {
        self.best_index
    }

    pub fn best_chromosome(&self) -> &Chromosome<G> {
        &self.chromosomes[self.best_index]
    }

    pub fn best_fitness(&self) -> FitnessValue {
        self.best_chromosome()
            .fitness_or_worst(self.fitness_ordering)
    }

    /// Scores every chromosome whose cached fitness is stale, then refreshes
    /// the best slot.
    pub fn evaluate<F>(&mut self, fitness: F)
    where
        F: Fn(&mut G) -> FitnessValue + Send + Sync,
    {
        self.chromosomes
            .par_iter_mut()
            .filter(|chromosome| chromosome.fitness.is_none())
            .for_each(|chromosome| chromosome.fitness = Some(fitness(&mut chromosome.genome)));
        self.find_new_best();
    }

    /// Scores every chromosome unconditionally. Used after the scoring
    /// context itself changed (new archive entry, new predictor length).
    pub fn reevaluate<F>(&mut self, fitness: F)
    where
        F: Fn(&mut G) -> FitnessValue + Send + Sync,
    {
        self.chromosomes
            .par_iter_mut()
            .for_each(|chromosome| chromosome.fitness = Some(fitness(&mut chromosome.genome)));
        self.find_new_best();
    }

    /// Marks every cached fitness as stale.
    pub fn invalidate_fitness(&mut self) {
        self.chromosomes
            .iter_mut()
            .for_each(|chromosome| chromosome.fitness = None);
    }

    /// Produces offspring, evaluates them and advances the generation
    /// counter.
    pub fn advance<R, O, F>(&mut self, rng: &mut R, offspring: O, fitness: F)
    where
        R: Rng,
        O: FnOnce(&mut Self, &mut R),
        F: Fn(&mut G) -> FitnessValue + Send + Sync,
    {
        offspring(self, rng);
        self.evaluate(fitness);
        self.generation += 1;
    }

    /// Selects the new best slot. Ties go to the later index, and when the
    /// winner is the incumbent, another slot with the same score is preferred
    /// so that neutral mutations can drift through the population.
    fn find_new_best(&mut self) {
        if self.chromosomes.is_empty() {
            return;
        }

        let ordering = self.fitness_ordering;
        let mut best_fitness = self.chromosomes[0].fitness_or_worst(ordering);
        let mut best_index = 0;

        for (index, chromosome) in self.chromosomes.iter().enumerate().skip(1) {
            let fitness = chromosome.fitness_or_worst(ordering);
            if ordering.is_better_or_same(fitness, best_fitness) {
                best_fitness = fitness;
                best_index = index;
            }
        }

        if best_index == self.best_index {
            for (index, chromosome) in self.chromosomes.iter().enumerate() {
                if index != best_index && chromosome.fitness_or_worst(ordering) == best_fitness {
                    best_index = index;
                    break;
                }
            }
        }

        self.best_index = best_index;
    }

    pub fn fitness_mean(&self) -> f64 {
        stats::mean(self.chromosomes.iter().filter_map(|c| c.fitness))
    }

    pub fn fitness_stddev(&self) -> f64 {
        stats::stddev(self.chromosomes.iter().filter_map(|c| c.fitness))
    }
}
