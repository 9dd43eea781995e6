//! The two genome variants of the coevolution: CGP circuits and fitness
//! predictors.
//!
//! Each variant supplies its own randomize/mutate/crossover operations and an
//! `offspring` function implementing its reproduction protocol; the shared
//! population machinery lives in [`crate::ga`].

pub mod circuit;
pub mod predictor;

pub use circuit::CircuitGenome;
pub use predictor::{PredictorEncoding, PredictorGenome, PredictorParams};
