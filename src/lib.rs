//! Evolution of image-denoising filters expressed as CGP circuits over
//! 8-bit pixels, with the expensive fitness function approximated by a
//! coevolving population of *fitness predictors* (sparse pixel subsets).
//!
//! There are three main elements:
//! * the [genotypes](crate::genotype): CGP circuits and pixel-subset
//!   predictors,
//! * the [fitness kernel](crate::fitness): PSNR-derived scoring over the
//!   full image or a predictor subset, with bit-exact scalar and 16/32-lane
//!   paths,
//! * the [coordinator](crate::coevolution): two asynchronous loops sharing
//!   bounded archives under three documented locks, optionally driven by the
//!   [Baldwin controller](crate::baldwin) which resizes the active predictor
//!   from the observed fitness velocity.
//!
//! ## Quick usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use coco::archive::Archive;
//! use coco::coevolution::{Algorithm, Coevolution, Settings};
//! use coco::fitness::{Evaluator, KernelWidth};
//! use coco::ga::{FitnessOrdering, Population};
//! use coco::genotype::CircuitGenome;
//! use coco::image::{Image, TrainingSet};
//! use coco::logging::LoggerSet;
//! use coco::signals::SignalMonitor;
//! use rand::rngs::SmallRng;
//! use rand::SeedableRng;
//!
//! let original = Image::load("lena.png".as_ref()).unwrap();
//! let noisy = Image::load("lena_noisy.png".as_ref()).unwrap();
//! let data = Arc::new(TrainingSet::new(original, noisy).unwrap());
//! let evaluator = Arc::new(Evaluator::new(Arc::clone(&data), KernelWidth::Lanes32));
//!
//! let mut rng = SmallRng::seed_from_u64(42);
//! let circuits = Population::new(8, FitnessOrdering::Maximize, || {
//!     CircuitGenome::random(&mut rng)
//! });
//!
//! let settings = Settings {
//!     algorithm: Algorithm::Cgp,
//!     max_generations: 10_000,
//!     target_fitness: 0.0,
//!     log_interval: 0,
//!     baldwin_interval: 0,
//!     cgp_mutation_cap: 5,
//! };
//! let mut evolution = Coevolution::new(
//!     settings,
//!     None,
//!     None,
//!     evaluator,
//!     circuits,
//!     Archive::new(10, FitnessOrdering::Maximize),
//!     Population::new_empty(FitnessOrdering::Minimize),
//!     Archive::new(1, FitnessOrdering::Minimize),
//!     LoggerSet::new(),
//! );
//! evolution.bootstrap();
//! evolution.run(SignalMonitor::disconnected(), 42);
//! ```

pub mod archive;
pub mod baldwin;
pub mod coevolution;
pub mod config;
pub mod fitness;
pub mod ga;
pub mod genotype;
pub mod history;
pub mod image;
pub mod logging;
pub mod signals;
