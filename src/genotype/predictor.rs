//! The fitness-predictor genome: a subset of training pixels used as a cheap
//! proxy for the full-image score.
//!
//! The genotype is an array of `max_length` pixel indices. The phenotype is
//! the deduplicated prefix of the currently active length, in one of three
//! encodings:
//!
//! * `permuted`: the genotype itself is duplicate-free, the phenotype is its
//!   prefix,
//! * `repeated`: arbitrary genotype, the phenotype keeps each value on first
//!   occurrence only,
//! * `repeated-circular`: as `repeated`, but the scan starts at a genome
//!   offset chosen during scoring.
//!
//! Alongside the phenotype each genome carries gathered sample arrays (the
//! original pixels and the nine noisy neighbour planes at the selected
//! indices, zero-padded) so the lane kernels can score a circuit against the
//! subset without indirection.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fixedbitset::FixedBitSet;
use rand::Rng;

use crate::ga::{Chromosome, Population};
use crate::image::{padded_len, TrainingSet, WINDOW_SIZE};

/// How the genotype maps to the phenotype.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum PredictorEncoding {
    /// Duplicate-free genotype; the phenotype is its active prefix.
    Permuted,
    /// Arbitrary genotype; duplicates are dropped during the phenotype scan.
    Repeated,
    /// As `repeated`, with a scored starting offset.
    #[value(name = "repeated-circular")]
    RepeatedCircular,
}

impl fmt::Display for PredictorEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredictorEncoding::Permuted => write!(f, "permuted"),
            PredictorEncoding::Repeated => write!(f, "repeated"),
            PredictorEncoding::RepeatedCircular => write!(f, "repeated-circular"),
        }
    }
}

/// Shared predictor evolution parameters. The active length is the one
/// mutable field: the Baldwin controller resizes it at run time, after which
/// every phenotype is recomputed under the coordinator's locks.
#[derive(Debug)]
pub struct PredictorParams {
    pub encoding: PredictorEncoding,
    /// Genotype length, `L_max`.
    pub max_length: usize,
    /// Largest legal gene value (the last pixel index).
    pub max_gene_value: u32,
    /// Mutated loci per mutation, as a fraction of `max_length`.
    pub mutation_rate: f32,
    /// Fraction of the population kept intact per generation.
    pub offspring_elite: f32,
    /// Fraction of the population produced by crossover per generation.
    pub offspring_combine: f32,
    active_length: AtomicUsize,
    pub data: Arc<TrainingSet>,
}

impl PredictorParams {
    pub fn new(
        encoding: PredictorEncoding,
        data: Arc<TrainingSet>,
        max_length: usize,
        initial_length: usize,
        mutation_rate: f32,
        offspring_elite: f32,
        offspring_combine: f32,
    ) -> Arc<Self> {
        let pixel_count = data.pixel_count();
        assert!(max_length > 0 && max_length <= pixel_count);
        assert!(initial_length > 0 && initial_length <= max_length);
        Arc::new(Self {
            encoding,
            max_length,
            max_gene_value: (pixel_count - 1) as u32,
            mutation_rate,
            offspring_elite,
            offspring_combine,
            active_length: AtomicUsize::new(initial_length),
            data,
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.max_gene_value as usize + 1
    }

    /// Currently active genotype prefix length.
    pub fn active_length(&self) -> usize {
        self.active_length.load(Ordering::Acquire)
    }

    /// Resizes the active prefix. Zero is ignored; values beyond the
    /// genotype length are capped. Phenotypes are not touched, the caller
    /// recomputes them.
    pub fn set_active_length(&self, new_length: usize) {
        if new_length == 0 {
            return;
        }
        self.active_length
            .store(new_length.min(self.max_length), Ordering::Release);
    }
}

/// One predictor: the gene array, the derived phenotype and the gathered
/// sample planes.
#[derive(Clone)]
pub struct PredictorGenome {
    params: Arc<PredictorParams>,
    genes: Vec<u32>,
    /// For `permuted`: the set of values present in `genes`.
    /// For the repeated encodings: scratch for the phenotype dedup scan.
    used_values: FixedBitSet,
    circular_offset: usize,
    phenotype: Vec<u32>,
    original_samples: Vec<u8>,
    plane_samples: [Vec<u8>; WINDOW_SIZE],
}

impl PredictorGenome {
    /// Builds a randomized genome with all buffers sized for `max_length`.
    pub fn random<R: Rng>(params: &Arc<PredictorParams>, rng: &mut R) -> Self {
        let capacity = padded_len(params.max_length);
        let mut genome = Self {
            params: Arc::clone(params),
            genes: vec![0; params.max_length],
            used_values: FixedBitSet::with_capacity(params.pixel_count()),
            circular_offset: 0,
            phenotype: Vec::with_capacity(params.max_length),
            original_samples: Vec::with_capacity(capacity),
            plane_samples: std::array::from_fn(|_| Vec::with_capacity(capacity)),
        };
        genome.randomize(rng);
        genome
    }

    pub fn params(&self) -> &Arc<PredictorParams> {
        &self.params
    }

    pub fn genes(&self) -> &[u32] {
        &self.genes
    }

    /// The deduplicated pixel indices actually sampled.
    pub fn phenotype(&self) -> &[u32] {
        &self.phenotype
    }

    /// Effective phenotype length, `U`.
    pub fn used(&self) -> usize {
        self.phenotype.len()
    }

    pub fn circular_offset(&self) -> usize {
        self.circular_offset
    }

    /// Moves the phenotype scan start. Only meaningful for the
    /// `repeated-circular` encoding; the caller recomputes the phenotype.
    pub fn set_circular_offset(&mut self, offset: usize) {
        self.circular_offset = offset;
    }

    /// Original pixels at the phenotype indices, zero-padded.
    pub fn original_samples(&self) -> &[u8] {
        &self.original_samples
    }

    /// Noisy neighbour planes at the phenotype indices, zero-padded.
    pub fn plane_samples(&self) -> &[Vec<u8>; WINDOW_SIZE] {
        &self.plane_samples
    }

    /// Rewrites the whole genotype with random genes (respecting the
    /// permutation invariant where required), resets the offset and derives
    /// the phenotype.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        let modulus = self.params.max_gene_value as usize + 1;
        if self.params.encoding == PredictorEncoding::Permuted {
            self.used_values.clear();
        }

        for locus in 0..self.params.max_length {
            let mut value = rng.gen_range(0..modulus);
            if self.params.encoding == PredictorEncoding::Permuted {
                while self.used_values.contains(value) {
                    value = (value + 1) % modulus;
                }
                self.used_values.insert(value);
            }
            self.genes[locus] = value as u32;
        }

        self.circular_offset = 0;
        self.calculate_phenotype();
    }

    /// Rewrites up to `rate * max_length` random loci, then rederives the
    /// phenotype. In the permuted encoding a replacement value walks forward
    /// modulo the pixel count until it is unused, keeping the genotype
    /// duplicate-free.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R) {
        let cap = (self.params.mutation_rate * self.params.max_length as f32) as usize;
        let changes = rng.gen_range(0..=cap);
        let modulus = self.params.max_gene_value as usize + 1;

        for _ in 0..changes {
            let locus = rng.gen_range(0..self.params.max_length);
            let old_value = self.genes[locus] as usize;
            let mut value = rng.gen_range(0..modulus);

            if self.params.encoding == PredictorEncoding::Permuted {
                while self.used_values.contains(value) && value != old_value {
                    value = (value + 1) % modulus;
                }
                self.used_values.set(old_value, false);
                self.used_values.insert(value);
            }

            self.genes[locus] = value as u32;
        }

        self.calculate_phenotype();
    }

    /// Rederives the phenotype from the genotype, the active length and the
    /// circular offset, then regathers the sample planes.
    pub fn calculate_phenotype(&mut self) {
        let active_length = self.params.active_length();
        self.phenotype.clear();

        match self.params.encoding {
            PredictorEncoding::Permuted => {
                self.phenotype.extend_from_slice(&self.genes[..active_length]);
            }
            PredictorEncoding::Repeated | PredictorEncoding::RepeatedCircular => {
                self.used_values.clear();
                for index in 0..active_length {
                    let locus = (self.circular_offset + index) % self.params.max_length;
                    let value = self.genes[locus];
                    if !self.used_values.contains(value as usize) {
                        self.used_values.insert(value as usize);
                        self.phenotype.push(value);
                    }
                }
            }
        }

        self.gather_samples();
    }

    /// Refills the gathered sample arrays from the phenotype. The buffers
    /// were sized at construction, so this never allocates.
    fn gather_samples(&mut self) {
        let padded = padded_len(self.phenotype.len());
        self.original_samples.clear();
        self.original_samples.resize(padded, 0);
        for plane in self.plane_samples.iter_mut() {
            plane.clear();
            plane.resize(padded, 0);
        }

        let data = &self.params.data;
        for (sample, &pixel) in self.phenotype.iter().enumerate() {
            let index = pixel as usize;
            self.original_samples[sample] = data.original.pixels()[index];
            for (w, plane) in self.plane_samples.iter_mut().enumerate() {
                plane[sample] = data.planes[w][index];
            }
        }
    }
}

impl fmt::Debug for PredictorGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredictorGenome")
            .field("encoding", &self.params.encoding)
            .field("max_length", &self.params.max_length)
            .field("used", &self.used())
            .field("circular_offset", &self.circular_offset)
            .finish()
    }
}

/// Single-point crossover for the repeated encodings: a prefix from mom, the
/// rest from dad, mom's circular offset.
fn crossover_repeated<R: Rng>(
    baby: &mut PredictorGenome,
    mom: &PredictorGenome,
    dad: &PredictorGenome,
    rng: &mut R,
) {
    let length = baby.params.max_length;
    let split = rng.gen_range(0..length);

    baby.genes[..split].copy_from_slice(&mom.genes[..split]);
    baby.genes[split..].copy_from_slice(&dad.genes[split..]);
    baby.circular_offset = mom.circular_offset;
}

/// Single-point crossover for the permuted encoding: scan mom up to the
/// split and dad after it, skipping values already taken, then pad the tail
/// with random unused values so the result is again duplicate-free.
fn crossover_permuted<R: Rng>(
    baby: &mut PredictorGenome,
    mom: &PredictorGenome,
    dad: &PredictorGenome,
    rng: &mut R,
) {
    let length = baby.params.max_length;
    let modulus = baby.params.max_gene_value as usize + 1;
    let split = rng.gen_range(0..length);

    baby.used_values.clear();
    let mut gene_index = 0;
    let mut source = &mom.genes;

    for locus in 0..length {
        let value = source[locus];
        if !baby.used_values.contains(value as usize) {
            baby.genes[gene_index] = value;
            baby.used_values.insert(value as usize);
            gene_index += 1;
        }
        if locus == split {
            source = &dad.genes;
        }
    }

    while gene_index < length {
        let mut value = rng.gen_range(0..modulus);
        while baby.used_values.contains(value) {
            value = (value + 1) % modulus;
        }
        baby.genes[gene_index] = value as u32;
        baby.used_values.insert(value);
        gene_index += 1;
    }

    baby.circular_offset = 0;
}

/// Two-sample tournament; ties go to the first contestant.
fn tournament<'a, R: Rng>(
    population: &'a Population<PredictorGenome>,
    rng: &mut R,
) -> &'a PredictorGenome {
    let ordering = population.fitness_ordering;
    let red = &population.chromosomes[rng.gen_range(0..population.size())];
    let blue = &population.chromosomes[rng.gen_range(0..population.size())];

    if ordering.is_better_or_same(
        red.fitness_or_worst(ordering),
        blue.fitness_or_worst(ordering),
    ) {
        &red.genome
    } else {
        &blue.genome
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum OffspringOp {
    Random,
    Crossover,
    Elite,
}

/// Composes the next generation: `ceil(N * elite)` best kept intact,
/// `ceil(N * combine)` from tournament parents via crossover plus mutation,
/// the remainder randomized from scratch. All non-elite offspring get stale
/// fitness.
pub fn offspring<R: Rng>(population: &mut Population<PredictorGenome>, rng: &mut R) {
    let size = population.size();
    if size == 0 {
        return;
    }
    let params = Arc::clone(population.chromosomes[0].genome.params());
    let ordering = population.fitness_ordering;

    let elite_count = (size as f32 * params.offspring_elite).ceil() as usize;
    let crossover_count = (size as f32 * params.offspring_combine).ceil() as usize;
    debug_assert!(elite_count + crossover_count <= size);

    let mut ops = vec![OffspringOp::Random; size];

    for _ in 0..elite_count {
        let mut best_fitness = ordering.worst();
        let mut best_index = None;
        for (index, chromosome) in population.chromosomes.iter().enumerate() {
            if ops[index] != OffspringOp::Elite {
                let fitness = chromosome.fitness_or_worst(ordering);
                if ordering.is_better(fitness, best_fitness) {
                    best_fitness = fitness;
                    best_index = Some(index);
                }
            }
        }
        if let Some(index) = best_index {
            ops[index] = OffspringOp::Elite;
        }
    }

    let mut assigned = 0;
    for op in ops.iter_mut() {
        if assigned == crossover_count {
            break;
        }
        if *op != OffspringOp::Elite {
            *op = OffspringOp::Crossover;
            assigned += 1;
        }
    }

    let mut children = Vec::with_capacity(size);
    for (index, op) in ops.iter().enumerate() {
        match op {
            OffspringOp::Elite => children.push(population.chromosomes[index].clone()),
            OffspringOp::Crossover => {
                let mut baby = population.chromosomes[index].genome.clone();
                {
                    let mom = tournament(population, rng);
                    let dad = tournament(population, rng);
                    match params.encoding {
                        PredictorEncoding::Permuted => {
                            crossover_permuted(&mut baby, mom, dad, rng)
                        }
                        _ => crossover_repeated(&mut baby, mom, dad, rng),
                    }
                }
                baby.mutate(rng);
                children.push(Chromosome {
                    genome: baby,
                    fitness: None,
                });
            }
            OffspringOp::Random => {
                let mut genome = population.chromosomes[index].genome.clone();
                genome.randomize(rng);
                children.push(Chromosome {
                    genome,
                    fitness: None,
                });
            }
        }
    }

    population.chromosomes = children;
}
