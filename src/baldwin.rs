//! The Baldwin controller: a feedback regulator mapping the recent history
//! of real-fitness velocity to a new active predictor length.
//!
//! Every decision runs the same cascade, first match wins:
//!
//! 1. inaccuracy above tolerance → large corrective bump,
//! 2. |velocity| within the zero band → *zero* rule,
//! 3. negative velocity → *decrease* rule,
//! 4. small positive velocity → *slow increase* rule,
//! 5. otherwise → *fast increase* rule.
//!
//! Rules are multiplicative or additive depending on the configured
//! increment mode; the symreg strategy replaces steps 2-5 with a fixed
//! polynomial over the last seven velocities. The result is clamped to the
//! configured bounds and `None` is returned when nothing would change.

use crate::history::History;

/// How the controller condenses the history into one velocity.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum VelocityStrategy {
    /// Newest velocity.
    Last,
    /// Median of the last three.
    Median3,
    /// Mean of the last three.
    Avg3,
    /// Weighted mean of the last seven, weights 7..1.
    #[value(name = "avg7w")]
    Avg7Weighted,
    /// Fixed symbolic-regression polynomial over the last seven.
    #[value(name = "symreg")]
    SymbolicRegression,
}

impl std::fmt::Display for VelocityStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VelocityStrategy::Last => write!(f, "last"),
            VelocityStrategy::Median3 => write!(f, "median3"),
            VelocityStrategy::Avg3 => write!(f, "avg3"),
            VelocityStrategy::Avg7Weighted => write!(f, "avg7w"),
            VelocityStrategy::SymbolicRegression => write!(f, "symreg"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BaldwinConfig {
    pub strategy: VelocityStrategy,
    pub use_absolute_increments: bool,

    pub min_length: usize,
    pub max_length: usize,

    pub inaccuracy_tolerance: f64,
    pub inaccuracy_coef: f64,
    pub zero_epsilon: f64,
    pub slow_threshold: f64,

    pub zero_coef: f64,
    pub decrease_coef: f64,
    pub increase_slow_coef: f64,
    pub increase_fast_coef: f64,

    pub zero_increment: i64,
    pub decrease_increment: i64,
    pub increase_slow_increment: i64,
    pub increase_fast_increment: i64,
}

/// The pending-length handoff between the CGP loop (producer) and the
/// predictor loop (consumer).
#[derive(Debug, Default)]
pub struct BaldwinState {
    pub pending_length: Option<usize>,
    pub last_applied_generation: usize,
}

impl BaldwinConfig {
    /// Computes the condensed velocity for the non-symreg strategies.
    fn velocity(&self, history: &History) -> f64 {
        match self.strategy {
            VelocityStrategy::Last => history.get(-1).velocity,
            VelocityStrategy::Avg3 => {
                // with fewer than 3 entries the ring yields duplicates,
                // which is fine
                let a = history.get(-1).velocity;
                let b = history.get(-2).velocity;
                let c = history.get(-3).velocity;
                (a + b + c) / 3.0
            }
            VelocityStrategy::Median3 => {
                let a = history.get(-1).velocity;
                let b = history.get(-2).velocity;
                let c = history.get(-3).velocity;
                if a >= b && a >= c {
                    if b > c {
                        b
                    } else {
                        c
                    }
                } else if b >= a && b >= c {
                    if a > c {
                        a
                    } else {
                        c
                    }
                } else if a > b {
                    a
                } else {
                    b
                }
            }
            VelocityStrategy::Avg7Weighted => {
                let mut sum = 0.0;
                let mut divider = 0.0;
                for i in 1..=history.stored() as isize {
                    let velocity = history.get(-i).velocity;
                    let weight = (8 - i) as f64;
                    log::trace!("avg7w term: {} * {}", velocity, weight);
                    sum += velocity * weight;
                    divider += weight;
                }
                log::trace!("avg7w: {} / {} = {}", sum, divider, sum / divider);
                sum / divider
            }
            VelocityStrategy::SymbolicRegression => {
                unreachable!("symreg bypasses the velocity cascade")
            }
        }
    }

    /// The symbolic-regression length coefficient over the last seven
    /// velocities.
    fn symreg_coefficient(&self, history: &History) -> f64 {
        let a = history.get(-1).velocity;
        let b = history.get(-2).velocity;
        let c = history.get(-3).velocity;
        let d = history.get(-4).velocity;
        let e = history.get(-5).velocity;
        let f = history.get(-6).velocity;
        let g = history.get(-7).velocity;

        0.984805307321727 + 2.92388275504055 * e + 55.5973782292397 * b * g
            + 11.5809571875034 * b * d
            + 1.97691040282476 * d * f
            - 0.144536309148617 * a
            - 2.76098000498705 * c * e
            - 1.97691040282476 * d * d
    }

    fn resize(&self, old_length: usize, coef: f64, increment: i64) -> i64 {
        if self.use_absolute_increments {
            old_length as i64 + increment
        } else {
            (old_length as f64 * coef).round() as i64
        }
    }

    /// Returns the new active predictor length, or `None` when the cascade
    /// lands on the current length.
    pub fn new_predictor_length(&self, history: &History, old_length: usize) -> Option<usize> {
        let last = history.get(-1);

        let mut new_length = if last.fitness_inaccuracy > self.inaccuracy_tolerance {
            (old_length as f64 * self.inaccuracy_coef).round() as i64
        } else if self.strategy == VelocityStrategy::SymbolicRegression {
            (old_length as f64 * self.symreg_coefficient(history)).round() as i64
        } else {
            let velocity = self.velocity(history);

            if velocity.abs() <= self.zero_epsilon {
                self.resize(old_length, self.zero_coef, self.zero_increment)
            } else if velocity < 0.0 {
                self.resize(old_length, self.decrease_coef, self.decrease_increment)
            } else if velocity <= self.slow_threshold {
                self.resize(old_length, self.increase_slow_coef, self.increase_slow_increment)
            } else {
                self.resize(old_length, self.increase_fast_coef, self.increase_fast_increment)
            }
        };

        new_length = new_length.max(self.min_length as i64);
        if self.max_length > 0 {
            new_length = new_length.min(self.max_length as i64);
        }

        if new_length > 0 && new_length != old_length as i64 {
            Some(new_length as usize)
        } else {
            None
        }
    }
}
