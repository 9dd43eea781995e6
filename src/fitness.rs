//! The fitness kernel.
//!
//! A circuit is scored by the sum of squared differences between its output
//! and the original pixel, over either every pixel of the training image or
//! the subset selected by a predictor; the score is the PSNR-like ratio
//! `255^2 * N / sum` (higher is better). A predictor is scored by how
//! closely it tracks the archived circuits' stored scores (mean absolute
//! deviation, lower is better).
//!
//! Every path exists twice: a scalar loop over the per-pixel windows, and a
//! block loop feeding 16 or 32 pixels at a time through
//! [`CircuitGenome::evaluate_lanes`] using the preprocessed neighbour
//! planes. The paths are bit-exact; the kernel width is a startup choice.
//! A shared atomic counter tracks how many circuit evaluations were spent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::Rng;

use crate::archive::Archive;
use crate::ga::FitnessValue;
use crate::genotype::circuit::INPUTS;
use crate::genotype::{CircuitGenome, PredictorGenome};
use crate::image::{padded_len, Image, TrainingSet, WINDOW_SIZE};

/// How many tries (including the inherited offset) the circular encoding
/// gets to pick its phenotype offset while being scored.
pub const CIRCULAR_OFFSET_TRIES: usize = 3;

/// Which evaluation path the kernel uses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum KernelWidth {
    Scalar,
    Lanes16,
    #[default]
    Lanes32,
}

impl KernelWidth {
    pub fn label(&self) -> &'static str {
        match self {
            KernelWidth::Scalar => "scalar",
            KernelWidth::Lanes16 => "lanes16",
            KernelWidth::Lanes32 => "lanes32",
        }
    }
}

impl std::fmt::Display for KernelWidth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The squared-difference coefficient turning a diff sum into the
/// PSNR-like score.
#[inline]
fn psnr_coefficient(sample_count: usize) -> f64 {
    255.0 * 255.0 * sample_count as f64
}

/// Converts a fitness score to decibels.
pub fn fitness_to_psnr(fitness: FitnessValue) -> f64 {
    10.0 * fitness.log10()
}

/// Converts a target PSNR in decibels to a fitness score.
pub fn psnr_to_fitness(psnr: f64) -> FitnessValue {
    10f64.powf(psnr / 10.0)
}

/// Scores circuits and predictors against one training set.
#[derive(Debug)]
pub struct Evaluator {
    data: Arc<TrainingSet>,
    kernel: KernelWidth,
    full_image_coefficient: f64,
    evals: AtomicU64,
}

impl Evaluator {
    pub fn new(data: Arc<TrainingSet>, kernel: KernelWidth) -> Self {
        let full_image_coefficient = psnr_coefficient(data.pixel_count());
        Self {
            data,
            kernel,
            full_image_coefficient,
            evals: AtomicU64::new(0),
        }
    }

    pub fn data(&self) -> &Arc<TrainingSet> {
        &self.data
    }

    pub fn kernel(&self) -> KernelWidth {
        self.kernel
    }

    /// Total circuit evaluations spent so far, in pixels.
    pub fn cgp_evals(&self) -> u64 {
        self.evals.load(Ordering::Relaxed)
    }

    /// Full-image circuit fitness: the expensive, authoritative score.
    pub fn evaluate_circuit(&self, genome: &CircuitGenome) -> FitnessValue {
        let sum = match self.kernel {
            KernelWidth::Scalar => self.sqdiffsum_scalar(genome),
            KernelWidth::Lanes16 => self.sqdiffsum_lanes::<16>(
                genome,
                self.data.original.pixels(),
                &self.data.planes,
            ),
            KernelWidth::Lanes32 => self.sqdiffsum_lanes::<32>(
                genome,
                self.data.original.pixels(),
                &self.data.planes,
            ),
        };
        self.full_image_coefficient / sum
    }

    /// Predicted circuit fitness: scored only on the pixels the predictor
    /// selected, with the coefficient scaled accordingly.
    pub fn predict_circuit(
        &self,
        genome: &CircuitGenome,
        predictor: &PredictorGenome,
    ) -> FitnessValue {
        let coefficient = psnr_coefficient(predictor.used());
        let sum = match self.kernel {
            KernelWidth::Scalar => self.sqdiffsum_predictor_scalar(genome, predictor),
            KernelWidth::Lanes16 => {
                let original = &predictor.original_samples()[..predictor.used()];
                self.sqdiffsum_lanes::<16>(genome, original, predictor.plane_samples())
            }
            KernelWidth::Lanes32 => {
                let original = &predictor.original_samples()[..predictor.used()];
                self.sqdiffsum_lanes::<32>(genome, original, predictor.plane_samples())
            }
        };
        coefficient / sum
    }

    /// The fitness wired into the circuit population: predicted when an
    /// active predictor exists, authoritative otherwise.
    pub fn eval_or_predict(
        &self,
        predictor_archive: &Archive<PredictorGenome>,
        genome: &CircuitGenome,
    ) -> FitnessValue {
        if predictor_archive.stored() > 0 {
            self.predict_circuit(genome, &predictor_archive.get(0).genome)
        } else {
            self.evaluate_circuit(genome)
        }
    }

    /// Predictor fitness: the mean absolute deviation between each archived
    /// circuit's stored score and its score under this predictor
    /// (minimisation). The circular encoding additionally probes
    /// [`CIRCULAR_OFFSET_TRIES`] phenotype offsets and keeps the best.
    pub fn score_predictor(
        &self,
        circuit_archive: &Archive<CircuitGenome>,
        predictor: &mut PredictorGenome,
    ) -> FitnessValue {
        use crate::genotype::PredictorEncoding;
        if predictor.params().encoding == PredictorEncoding::RepeatedCircular {
            self.score_circular_predictor(circuit_archive, predictor, &mut rand::thread_rng())
        } else {
            self.deviation_from_archive(circuit_archive, predictor)
        }
    }

    fn deviation_from_archive(
        &self,
        circuit_archive: &Archive<CircuitGenome>,
        predictor: &PredictorGenome,
    ) -> FitnessValue {
        let mut sum = 0.0;
        for circuit in circuit_archive.iter() {
            let predicted = self.predict_circuit(&circuit.genome, predictor);
            sum += (circuit.fitness.unwrap_or(0.0) - predicted).abs();
        }
        sum / circuit_archive.stored() as f64
    }

    fn score_circular_predictor<R: Rng>(
        &self,
        circuit_archive: &Archive<CircuitGenome>,
        predictor: &mut PredictorGenome,
        rng: &mut R,
    ) -> FitnessValue {
        let mut best_offset = predictor.circular_offset();
        let mut best_fitness = self.deviation_from_archive(circuit_archive, predictor);

        for _ in 1..CIRCULAR_OFFSET_TRIES {
            let offset = rng.gen_range(0..predictor.params().max_length);
            predictor.set_circular_offset(offset);
            predictor.calculate_phenotype();

            let fitness = self.deviation_from_archive(circuit_archive, predictor);
            if fitness < best_fitness {
                best_offset = offset;
                best_fitness = fitness;
            }
        }

        if predictor.circular_offset() != best_offset {
            predictor.set_circular_offset(best_offset);
            predictor.calculate_phenotype();
        }
        best_fitness
    }

    /// Scalar path over every training window.
    fn sqdiffsum_scalar(&self, genome: &CircuitGenome) -> f64 {
        let original = self.data.original.pixels();
        let mut sum = 0.0;
        for (window, &expected) in self.data.windows.iter().zip(original.iter()) {
            let diff = genome.evaluate(window) as i32 - expected as i32;
            sum += (diff * diff) as f64;
        }
        self.evals
            .fetch_add(original.len() as u64, Ordering::Relaxed);
        sum
    }

    /// Scalar path over the predictor's pixel subset.
    fn sqdiffsum_predictor_scalar(
        &self,
        genome: &CircuitGenome,
        predictor: &PredictorGenome,
    ) -> f64 {
        let original = self.data.original.pixels();
        let mut sum = 0.0;
        for &pixel in predictor.phenotype() {
            let index = pixel as usize;
            let diff = genome.evaluate(&self.data.windows[index]) as i32 - original[index] as i32;
            sum += (diff * diff) as f64;
        }
        self.evals
            .fetch_add(predictor.used() as u64, Ordering::Relaxed);
        sum
    }

    /// Lane path: feeds `W` consecutive sample positions at a time through
    /// the circuit. The planes are zero-padded, so the slices always split
    /// into whole blocks; only the first `count` lanes of a trailing partial
    /// block contribute to the sum.
    fn sqdiffsum_lanes<const W: usize>(
        &self,
        genome: &CircuitGenome,
        original: &[u8],
        planes: &[Vec<u8>; WINDOW_SIZE],
    ) -> f64 {
        let total = original.len();
        let padded = padded_len(total);
        let blocks: [&[[u8; W]]; WINDOW_SIZE] =
            std::array::from_fn(|w| bytemuck::cast_slice(&planes[w][..padded]));

        let mut sum = 0.0;
        let mut offset = 0;

        while offset < total {
            let count = W.min(total - offset);
            let block = offset / W;
            let inputs: [[u8; W]; INPUTS] = std::array::from_fn(|w| blocks[w][block]);

            let outputs = genome.evaluate_lanes(&inputs);
            for lane in 0..count {
                let diff = outputs[lane] as i32 - original[offset + lane] as i32;
                sum += (diff * diff) as f64;
            }

            self.evals.fetch_add(count as u64, Ordering::Relaxed);
            offset += count;
        }

        sum
    }
}

/// Runs the circuit over every pixel of `input`, producing the filtered
/// image.
pub fn filter_image(genome: &CircuitGenome, input: &Image) -> Image {
    let mut filtered = Image::new(input.width(), input.height());
    for y in 0..input.height() {
        for x in 0..input.width() {
            let window = input.window(x, y);
            filtered.set_pixel(x, y, genome.evaluate(&window));
        }
    }
    filtered
}
