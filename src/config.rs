//! Command-line options, validation and the resolved-configuration
//! snapshot written to `config.log`.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

use crate::baldwin::{BaldwinConfig, VelocityStrategy};
use crate::coevolution::Algorithm;
use crate::fitness::{psnr_to_fitness, KernelWidth};
use crate::ga::FitnessValue;
use crate::genotype::PredictorEncoding;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the baldwin algorithm cannot use the permuted predictor encoding")]
    BaldwinWithPermuted,
    #[error("invalid value for {option}: {reason}")]
    InvalidValue {
        option: &'static str,
        reason: &'static str,
    },
}

/// All recognized options. Defaults reproduce the stock configuration.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "coco",
    version,
    about = "Evolves image-denoising CGP filters, optionally coevolved with fitness predictors"
)]
pub struct Options {
    /// Original (clean) image filename.
    #[arg(long = "original", short = 'i')]
    pub original: PathBuf,

    /// Noisy image filename.
    #[arg(long = "noisy", short = 'n')]
    pub noisy: PathBuf,

    /// Evolution algorithm.
    #[arg(long, short = 'a', value_enum, default_value_t = Algorithm::Predictors)]
    pub algorithm: Algorithm,

    /// PRNG seed; derived from the clock when absent.
    #[arg(long = "random-seed", short = 'r')]
    pub random_seed: Option<u64>,

    /// Stop after this many CGP generations.
    #[arg(long = "max-generations", short = 'g', default_value_t = 50_000)]
    pub max_generations: usize,

    /// Stop after reaching this PSNR (0 disables). Ignored when
    /// --target-fitness is given; the conversion is F = 10^(PSNR/10).
    #[arg(long = "target-psnr", default_value_t = 0.0)]
    pub target_psnr: f64,

    /// Stop after reaching this fitness (0 disables).
    #[arg(long = "target-fitness", default_value_t = 0.0)]
    pub target_fitness: f64,

    /// Results directory; omitted means stdout logging only.
    #[arg(long = "log-dir", short = 'l')]
    pub log_dir: Option<PathBuf>,

    /// Periodic logging interval in generations; 0 logs only fitness
    /// changes.
    #[arg(long = "log-interval", short = 'k', default_value_t = 0)]
    pub log_interval: usize,

    /// Evaluation kernel width.
    #[arg(long = "kernel", value_enum, default_value_t = KernelWidth::Lanes32)]
    pub kernel: KernelWidth,

    /// Maximum number of mutated genes per CGP mutation.
    #[arg(long = "cgp-mutate", short = 'm', default_value_t = 5)]
    pub cgp_mutate: usize,

    /// CGP population size (1 elite + offspring).
    #[arg(long = "cgp-population-size", short = 'p', default_value_t = 8)]
    pub cgp_population_size: usize,

    /// CGP archive capacity.
    #[arg(long = "cgp-archive-size", short = 's', default_value_t = 10)]
    pub cgp_archive_size: usize,

    /// Maximal predictor size as a fraction of the image.
    #[arg(long = "pred-size", short = 'S', default_value_t = 0.25)]
    pub pred_size: f32,

    /// Predictor mutation rate as a fraction of the genotype.
    #[arg(long = "pred-mutate", short = 'M', default_value_t = 0.05)]
    pub pred_mutation_rate: f32,

    /// Predictor population size.
    #[arg(long = "pred-population-size", short = 'P', default_value_t = 10)]
    pub pred_population_size: usize,

    /// Predictor genome encoding. Defaults to permuted, or repeated for
    /// the baldwin algorithm.
    #[arg(long = "pred-type", short = 'T', value_enum)]
    pub pred_type: Option<PredictorEncoding>,

    /// Fraction of the predictor population kept as elite.
    #[arg(long = "pred-elite", default_value_t = 0.25)]
    pub pred_offspring_elite: f32,

    /// Fraction of the predictor population produced by crossover.
    #[arg(long = "pred-combine", default_value_t = 0.5)]
    pub pred_offspring_combine: f32,

    /// Minimal generation gap between evolution-parameter updates in
    /// baldwin mode; 0 updates only on fitness changes.
    #[arg(long = "baldwin-interval", short = 'b', default_value_t = 0)]
    pub baldwin_interval: usize,

    /// Initial predictor size as a fraction of the image (baldwin or
    /// circular encoding only); 0 means the maximal size.
    #[arg(long = "bw-pred-initial-size", short = 'I', default_value_t = 0.0)]
    pub bw_pred_initial_size: f32,

    /// Minimal predictor size as a fraction of the image.
    #[arg(long = "bw-pred-min-size", short = 'N', default_value_t = 0.0)]
    pub bw_pred_min_size: f32,

    /// Velocity strategy of the baldwin controller.
    #[arg(long = "bw-alg", value_enum, default_value_t = VelocityStrategy::Last)]
    pub bw_algorithm: VelocityStrategy,

    /// Use absolute increments (fractions of the maximal size) instead of
    /// multiplicative coefficients.
    #[arg(long = "bw-by-max-length")]
    pub bw_by_max_length: bool,

    #[arg(long = "bw-inac-tol", default_value_t = 1.2)]
    pub bw_inaccuracy_tolerance: f64,

    #[arg(long = "bw-inac-coef", default_value_t = 2.0)]
    pub bw_inaccuracy_coef: f64,

    #[arg(long = "bw-zero-eps", default_value_t = 0.001)]
    pub bw_zero_epsilon: f64,

    #[arg(long = "bw-slow-thr", default_value_t = 0.1)]
    pub bw_slow_threshold: f64,

    #[arg(long = "bw-zero-coef", default_value_t = 0.93)]
    pub bw_zero_coef: f64,

    #[arg(long = "bw-decr-coef", default_value_t = 0.97)]
    pub bw_decrease_coef: f64,

    #[arg(long = "bw-slow-coef", default_value_t = 1.03)]
    pub bw_increase_slow_coef: f64,

    #[arg(long = "bw-fast-coef", default_value_t = 1.0)]
    pub bw_increase_fast_coef: f64,

    #[arg(long = "bw-zero-inc", default_value_t = -0.07, allow_negative_numbers = true)]
    pub bw_zero_increment_percent: f32,

    #[arg(long = "bw-decr-inc", default_value_t = -0.03, allow_negative_numbers = true)]
    pub bw_decrease_increment_percent: f32,

    #[arg(long = "bw-slow-inc", default_value_t = 0.03, allow_negative_numbers = true)]
    pub bw_increase_slow_increment_percent: f32,

    #[arg(long = "bw-fast-inc", default_value_t = 0.0, allow_negative_numbers = true)]
    pub bw_increase_fast_increment_percent: f32,
}

/// Predictor sizes resolved against the actual image.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PredictorSizes {
    pub min: usize,
    pub max: usize,
    pub initial: usize,
}

impl Options {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algorithm == Algorithm::Baldwin
            && self.resolved_encoding() == PredictorEncoding::Permuted
        {
            return Err(ConfigError::BaldwinWithPermuted);
        }
        if self.cgp_population_size < 2 {
            return Err(ConfigError::InvalidValue {
                option: "--cgp-population-size",
                reason: "the population needs the elite and at least one offspring",
            });
        }
        if self.algorithm.is_coevolution() {
            if !(self.pred_size > 0.0 && self.pred_size <= 1.0) {
                return Err(ConfigError::InvalidValue {
                    option: "--pred-size",
                    reason: "must be a fraction in (0, 1]",
                });
            }
            if self.pred_population_size == 0 {
                return Err(ConfigError::InvalidValue {
                    option: "--pred-population-size",
                    reason: "must be at least 1",
                });
            }
            let children = self.pred_offspring_elite + self.pred_offspring_combine;
            if !(0.0..=1.0).contains(&children) {
                return Err(ConfigError::InvalidValue {
                    option: "--pred-elite/--pred-combine",
                    reason: "elite and crossover fractions must sum to at most 1",
                });
            }
        }
        Ok(())
    }

    /// The explicit seed, or one derived from the clock: processes started
    /// within the same second must still diverge.
    pub fn resolved_seed(&self) -> u64 {
        self.random_seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_micros() as u64)
                .unwrap_or(0)
        })
    }

    /// `--target-fitness` wins over `--target-psnr`; zero disables both.
    pub fn resolved_target_fitness(&self) -> FitnessValue {
        if self.target_fitness != 0.0 {
            self.target_fitness
        } else if self.target_psnr != 0.0 {
            psnr_to_fitness(self.target_psnr)
        } else {
            0.0
        }
    }

    pub fn resolved_encoding(&self) -> PredictorEncoding {
        self.pred_type.unwrap_or(match self.algorithm {
            Algorithm::Baldwin => PredictorEncoding::Repeated,
            _ => PredictorEncoding::Permuted,
        })
    }

    /// Converts the fractional predictor sizes to pixel counts. A custom
    /// initial size applies only where it can differ from the maximum:
    /// baldwin mode or the circular encoding.
    pub fn resolve_predictor_sizes(&self, pixel_count: usize) -> PredictorSizes {
        let max = ((self.pred_size * pixel_count as f32) as usize)
            .clamp(1, pixel_count);
        let min = ((self.bw_pred_min_size * pixel_count as f32) as usize).min(max);

        let initial_applies = self.algorithm == Algorithm::Baldwin
            || self.resolved_encoding() == PredictorEncoding::RepeatedCircular;
        let initial = if self.bw_pred_initial_size != 0.0 && initial_applies {
            ((self.bw_pred_initial_size * pixel_count as f32) as usize).clamp(1, max)
        } else {
            max
        };

        PredictorSizes { min, max, initial }
    }

    /// The Baldwin controller configuration for the resolved sizes.
    /// Absolute increments are fractions of the maximal size.
    pub fn baldwin_config(&self, sizes: PredictorSizes) -> BaldwinConfig {
        let increment = |percent: f32| (percent * sizes.max as f32) as i64;
        BaldwinConfig {
            strategy: self.bw_algorithm,
            use_absolute_increments: self.bw_by_max_length,
            min_length: sizes.min,
            max_length: sizes.max,
            inaccuracy_tolerance: self.bw_inaccuracy_tolerance,
            inaccuracy_coef: self.bw_inaccuracy_coef,
            zero_epsilon: self.bw_zero_epsilon,
            slow_threshold: self.bw_slow_threshold,
            zero_coef: self.bw_zero_coef,
            decrease_coef: self.bw_decrease_coef,
            increase_slow_coef: self.bw_increase_slow_coef,
            increase_fast_coef: self.bw_increase_fast_coef,
            zero_increment: increment(self.bw_zero_increment_percent),
            decrease_increment: increment(self.bw_decrease_increment_percent),
            increase_slow_increment: increment(self.bw_increase_slow_increment_percent),
            increase_fast_increment: increment(self.bw_increase_fast_increment_percent),
        }
    }

    /// Human-readable snapshot of the resolved configuration
    /// (`config.log`).
    pub fn snapshot(&self, seed: u64) -> String {
        let mut out = String::new();
        let mut line = |key: &str, value: String| {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value);
            out.push('\n');
        };

        line("original image", self.original.display().to_string());
        line("noisy image", self.noisy.display().to_string());
        line("algorithm", self.algorithm.to_string());
        line("random seed", seed.to_string());
        line("max generations", self.max_generations.to_string());
        line(
            "target fitness",
            self.resolved_target_fitness().to_string(),
        );
        line(
            "log dir",
            self.log_dir
                .as_ref()
                .map(|dir| dir.display().to_string())
                .unwrap_or_default(),
        );
        line("log interval", self.log_interval.to_string());
        line("kernel", self.kernel.label().to_string());
        line("cgp mutated genes", self.cgp_mutate.to_string());
        line("cgp population size", self.cgp_population_size.to_string());
        line("cgp archive size", self.cgp_archive_size.to_string());

        if self.algorithm.is_coevolution() {
            line("pred size", self.pred_size.to_string());
            line("pred mutation rate", self.pred_mutation_rate.to_string());
            line(
                "pred population size",
                self.pred_population_size.to_string(),
            );
            line("pred encoding", self.resolved_encoding().to_string());
            line("pred elite", self.pred_offspring_elite.to_string());
            line("pred combine", self.pred_offspring_combine.to_string());
        }

        if self.algorithm == Algorithm::Baldwin {
            line("baldwin interval", self.baldwin_interval.to_string());
            line("bw algorithm", self.bw_algorithm.to_string());
            line("bw absolute increments", self.bw_by_max_length.to_string());
            line(
                "bw initial size",
                self.bw_pred_initial_size.to_string(),
            );
            line("bw min size", self.bw_pred_min_size.to_string());
            line(
                "bw inaccuracy tol/coef",
                format!(
                    "{}/{}",
                    self.bw_inaccuracy_tolerance, self.bw_inaccuracy_coef
                ),
            );
            line(
                "bw zero eps/coef",
                format!("{}/{}", self.bw_zero_epsilon, self.bw_zero_coef),
            );
            line("bw decrease coef", self.bw_decrease_coef.to_string());
            line(
                "bw slow thr/coef",
                format!("{}/{}", self.bw_slow_threshold, self.bw_increase_slow_coef),
            );
            line("bw fast coef", self.bw_increase_fast_coef.to_string());
        }

        out
    }
}
