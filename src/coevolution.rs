//! The coevolution coordinator: two asynchronous loops over shared state.
//!
//! The CGP loop evolves circuits against the active predictor; the predictor
//! loop evolves predictors against the circuit archive. The shared state is
//! split across three mutexes whose contents are exactly the data each
//! critical region couples:
//!
//! * [`CircuitScoring`]: the predictor archive together with the circuit
//!   population it scores (the active predictor is archive slot 0),
//! * [`PredictorScoring`]: the circuit archive together with the predictor
//!   population judged on it,
//! * [`BaldwinState`]: the pending-length handoff.
//!
//! LOCK ORDER (the single source of truth): `baldwin` before
//! `predictor_scoring` before `circuit_scoring`, and the logger set strictly
//! innermost. A thread may skip levels but never acquires a coarser lock
//! while holding a finer one.
//!
//! Cross-loop visibility: a predictor-archive insert is seen by the next
//! CGP acquisition of `circuit_scoring`; a circuit-archive insert by the
//! next predictor acquisition of `predictor_scoring`; a Baldwin publish by
//! the next predictor iteration. The CGP loop owns termination: it sets the
//! `finished` flag, the predictor loop notices at its next top-of-loop
//! check. Neither loop aborts mid-generation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::archive::Archive;
use crate::baldwin::{BaldwinConfig, BaldwinState};
use crate::fitness::Evaluator;
use crate::ga::{Chromosome, Population};
use crate::genotype::{circuit, predictor, CircuitGenome, PredictorGenome, PredictorParams};
use crate::history::History;
use crate::logging::{Event, FinishReason, LoggerSet};
use crate::signals::{CaughtSignal, SignalMonitor};

/// Which evolution variant runs.
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Algorithm {
    /// Plain CGP, every candidate scored on the full image.
    Cgp,
    /// CGP coevolving with fixed-size fitness predictors.
    #[value(name = "coev", alias = "predictors")]
    Predictors,
    /// Coevolution with the Baldwin predictor-resizing controller.
    Baldwin,
}

impl Algorithm {
    pub fn is_coevolution(&self) -> bool {
        !matches!(self, Algorithm::Cgp)
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Cgp => write!(f, "cgp"),
            Algorithm::Predictors => write!(f, "coev"),
            Algorithm::Baldwin => write!(f, "baldwin"),
        }
    }
}

/// Run-control knobs of the coordinator.
#[derive(Clone, Debug)]
pub struct Settings {
    pub algorithm: Algorithm,
    pub max_generations: usize,
    /// Stop once the best full-image fitness reaches this; zero disables.
    pub target_fitness: f64,
    /// Fire a periodic log tick every this many generations; zero disables.
    pub log_interval: usize,
    /// Minimal generation gap between Baldwin updates; zero means only on
    /// fitness improvement.
    pub baldwin_interval: usize,
    pub cgp_mutation_cap: usize,
}

/// Guarded by the `circuit_scoring` mutex: the circuit population and the
/// predictor archive whose slot 0 scores it.
#[derive(Debug)]
pub struct CircuitScoring {
    pub circuits: Population<CircuitGenome>,
    pub predictor_archive: Archive<PredictorGenome>,
}

/// Guarded by the `predictor_scoring` mutex: the predictor population and
/// the circuit archive it is judged against.
#[derive(Debug)]
pub struct PredictorScoring {
    pub predictors: Population<PredictorGenome>,
    pub circuit_archive: Archive<CircuitGenome>,
}

/// Poison-tolerant lock acquisition: a panicking logger thread must not take
/// the evolution down with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug)]
pub struct Coevolution {
    settings: Settings,
    baldwin_config: Option<BaldwinConfig>,
    predictor_params: Option<Arc<PredictorParams>>,
    evaluator: Arc<Evaluator>,

    circuit_scoring: Mutex<CircuitScoring>,
    predictor_scoring: Mutex<PredictorScoring>,
    baldwin: Mutex<BaldwinState>,
    finished: AtomicBool,
    loggers: Mutex<LoggerSet>,
}

impl Coevolution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        baldwin_config: Option<BaldwinConfig>,
        predictor_params: Option<Arc<PredictorParams>>,
        evaluator: Arc<Evaluator>,
        circuits: Population<CircuitGenome>,
        circuit_archive: Archive<CircuitGenome>,
        predictors: Population<PredictorGenome>,
        predictor_archive: Archive<PredictorGenome>,
        loggers: LoggerSet,
    ) -> Self {
        Self {
            settings,
            baldwin_config,
            predictor_params,
            evaluator,
            circuit_scoring: Mutex::new(CircuitScoring {
                circuits,
                predictor_archive,
            }),
            predictor_scoring: Mutex::new(PredictorScoring {
                predictors,
                circuit_archive,
            }),
            baldwin: Mutex::new(BaldwinState::default()),
            finished: AtomicBool::new(false),
            loggers: Mutex::new(loggers),
        }
    }

    pub fn evaluator(&self) -> &Arc<Evaluator> {
        &self.evaluator
    }

    /// The best circuit of the run: the archive's best-ever entry in
    /// coevolution, the population elite otherwise.
    pub fn best_circuit(&self) -> Chromosome<CircuitGenome> {
        if self.settings.algorithm.is_coevolution() {
            let exchange = lock(&self.predictor_scoring);
            if let Some(best) = exchange.circuit_archive.best_ever() {
                return best.clone();
            }
        }
        lock(&self.circuit_scoring).circuits.best_chromosome().clone()
    }

    /// Initial evaluation and archive seeding, before the loops start. This
    /// establishes the invariant that real fitness is positive before the
    /// history is ever queried, and that both archives are non-empty in
    /// coevolution mode.
    pub fn bootstrap(&mut self) {
        let evaluator = Arc::clone(&self.evaluator);

        let scoring = self
            .circuit_scoring
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let CircuitScoring {
            circuits,
            predictor_archive,
        } = scoring;
        {
            let predictor_archive = &*predictor_archive;
            circuits.evaluate(|genome| evaluator.eval_or_predict(predictor_archive, genome));
        }

        if self.settings.algorithm.is_coevolution() {
            let best_circuit = circuits.best_chromosome().clone();

            let exchange = self
                .predictor_scoring
                .get_mut()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let PredictorScoring {
                predictors,
                circuit_archive,
            } = exchange;

            circuit_archive.insert_rescored(&best_circuit, |genome| {
                evaluator.evaluate_circuit(genome)
            });
            let circuit_archive = &*circuit_archive;
            predictors.evaluate(|genome| evaluator.score_predictor(circuit_archive, genome));
            predictor_archive.insert(&predictors.best_chromosome().clone());
        }
    }

    /// Runs the configured algorithm to completion and returns the process
    /// exit code (zero, or the number of a fatal signal).
    pub fn run(&self, mut signals: SignalMonitor, seed: u64) -> i32 {
        let mut cgp_rng = SmallRng::seed_from_u64(seed);

        if !self.settings.algorithm.is_coevolution() {
            return self.cgp_loop(&mut cgp_rng, &mut signals);
        }

        let mut predictor_rng = SmallRng::seed_from_u64(seed ^ 0x9E37_79B9_7F4A_7C15);
        std::thread::scope(|scope| {
            scope.spawn(move || self.predictor_loop(&mut predictor_rng));
            self.cgp_loop(&mut cgp_rng, &mut signals)
        })
    }

    /// The CGP side: one (1+λ) generation per iteration, stop-condition
    /// checks, archive exchange, Baldwin scheduling, history and events.
    fn cgp_loop(&self, rng: &mut SmallRng, signals: &mut SignalMonitor) -> i32 {
        let settings = &self.settings;
        let evaluator = &self.evaluator;
        let coevolution = settings.algorithm.is_coevolution();
        let mut history = History::new();

        lock(&self.loggers).fire(&Event::Started {
            entry: history.last(),
        });

        loop {
            // advance to the next generation
            let (generation, new_best_fitness, best_circuit, is_better) = {
                let mut scoring = lock(&self.circuit_scoring);
                let CircuitScoring {
                    circuits,
                    predictor_archive,
                } = &mut *scoring;

                let parent_index = circuits.best_index();
                let predictor_archive = &*predictor_archive;
                circuits.advance(
                    rng,
                    |population, rng| {
                        circuit::offspring(population, settings.cgp_mutation_cap, rng)
                    },
                    |genome| evaluator.eval_or_predict(predictor_archive, genome),
                );

                let parent_fitness =
                    circuits.chromosomes[parent_index].fitness_or_worst(circuits.fitness_ordering);
                let new_best = circuits.best_fitness();
                (
                    circuits.generation,
                    new_best,
                    circuits.best_chromosome().clone(),
                    circuits.fitness_ordering.is_better(new_best, parent_fitness),
                )
            };

            // stop conditions
            let received = signals.check(generation);
            let mut finish_reason = None;
            if generation >= settings.max_generations {
                finish_reason = Some(FinishReason::GenerationLimit);
            }
            if settings.target_fitness != 0.0 && new_best_fitness >= settings.target_fitness {
                finish_reason = Some(FinishReason::TargetFitness);
            }
            if let Some(CaughtSignal::Stop(signal)) = received {
                finish_reason = Some(FinishReason::Signal(signal));
            }
            if finish_reason.is_some() {
                self.finished.store(true, Ordering::Release);
            }

            let log_tick_now =
                settings.log_interval != 0 && generation % settings.log_interval == 0;
            let apply_baldwin_now = self.should_apply_baldwin(is_better, generation);
            let need_history_append = is_better || apply_baldwin_now;
            let need_history_calc = need_history_append
                || log_tick_now
                || received.is_some()
                || finish_reason.is_some();

            // archive exchange and authoritative fitness
            let (predicted_fitness, real_fitness) = if !coevolution {
                (-1.0, new_best_fitness)
            } else if is_better {
                let real = {
                    let mut exchange = lock(&self.predictor_scoring);
                    let PredictorScoring {
                        predictors,
                        circuit_archive,
                    } = &mut *exchange;

                    let real = circuit_archive
                        .insert_rescored(&best_circuit, |genome| {
                            evaluator.evaluate_circuit(genome)
                        })
                        .fitness
                        .unwrap_or(0.0);

                    // the new entry re-judges every predictor, including the
                    // archived active one
                    let circuit_archive = &*circuit_archive;
                    predictors
                        .reevaluate(|genome| evaluator.score_predictor(circuit_archive, genome));

                    let mut scoring = lock(&self.circuit_scoring);
                    if scoring.predictor_archive.stored() > 0 {
                        let active = scoring.predictor_archive.get_mut(0);
                        active.fitness =
                            Some(evaluator.score_predictor(circuit_archive, &mut active.genome));
                    }
                    real
                };
                (new_best_fitness, real)
            } else if need_history_calc {
                (
                    new_best_fitness,
                    evaluator.evaluate_circuit(&best_circuit.genome),
                )
            } else {
                (new_best_fitness, 0.0)
            };

            // schedule a predictor resize; the predictor loop applies it
            let mut scheduled_length = None;
            if apply_baldwin_now {
                if let (Some(config), Some(params)) =
                    (&self.baldwin_config, &self.predictor_params)
                {
                    if let Some(new_length) =
                        config.new_predictor_length(&history, params.active_length())
                    {
                        lock(&self.baldwin).pending_length = Some(new_length);
                        scheduled_length = Some(new_length);
                    }
                }
            }

            // current history entry and events
            if need_history_calc {
                let (active_predictor_fitness, pred_length, pred_used_length) = if coevolution {
                    let scoring = lock(&self.circuit_scoring);
                    let active = scoring.predictor_archive.get(0);
                    let params_length = self
                        .predictor_params
                        .as_ref()
                        .map(|params| params.active_length() as i64)
                        .unwrap_or(-1);
                    (
                        active.fitness.unwrap_or(-1.0),
                        params_length,
                        active.genome.used() as i64,
                    )
                } else {
                    (-1.0, -1, -1)
                };

                let entry = history.calc_entry(
                    generation,
                    real_fitness,
                    predicted_fitness,
                    active_predictor_fitness,
                    evaluator.cgp_evals(),
                    pred_length,
                    pred_used_length,
                );
                if need_history_append {
                    history.append(entry);
                }

                log::debug!(
                    "generation {}: predicted {} real {} (population mean {:.3})",
                    generation,
                    predicted_fitness,
                    real_fitness,
                    lock(&self.circuit_scoring).circuits.fitness_mean(),
                );

                {
                    let mut loggers = lock(&self.loggers);
                    if is_better {
                        loggers.fire(&Event::BetterCgp { entry: &entry });
                    } else if log_tick_now {
                        loggers.fire(&Event::LogTick { entry: &entry });
                    }
                    if apply_baldwin_now {
                        loggers.fire(&Event::BaldwinTriggered { entry: &entry });
                    }
                    if let Some(signal) = received {
                        loggers.fire(&Event::Signal {
                            signal: signal.number(),
                            entry: &entry,
                        });
                    }
                    if let Some(new_length) = scheduled_length {
                        loggers.fire(&Event::PredictorLengthChangeScheduled {
                            new_length,
                            entry: &entry,
                        });
                    }
                }

                if let Some(reason) = finish_reason {
                    // quiesce both sides so the summary reads a consistent
                    // final state
                    let exchange = lock(&self.predictor_scoring);
                    let scoring = lock(&self.circuit_scoring);
                    let best = if coevolution {
                        exchange
                            .circuit_archive
                            .best_ever()
                            .unwrap_or_else(|| scoring.circuits.best_chromosome())
                    } else {
                        scoring.circuits.best_chromosome()
                    };
                    lock(&self.loggers).fire(&Event::Finished {
                        reason,
                        entry: &entry,
                        best,
                    });
                }
            }

            if let Some(CaughtSignal::Stop(signal)) = received {
                return signal;
            }
            if finish_reason.is_some() {
                return 0;
            }
        }
    }

    fn should_apply_baldwin(&self, is_better: bool, generation: usize) -> bool {
        if self.settings.algorithm != Algorithm::Baldwin {
            return false;
        }
        if is_better {
            return true;
        }
        if self.settings.baldwin_interval == 0 {
            return false;
        }
        let last_applied = lock(&self.baldwin).last_applied_generation;
        generation - last_applied >= self.settings.baldwin_interval
    }

    /// The predictor side: one generation per iteration, pending-length
    /// application, archive promotion of a better predictor.
    fn predictor_loop(&self, rng: &mut SmallRng) {
        let evaluator = &self.evaluator;
        let Some(params) = self.predictor_params.as_ref() else {
            return;
        };

        while !self.finished.load(Ordering::Acquire) {
            {
                let mut exchange = lock(&self.predictor_scoring);
                let PredictorScoring {
                    predictors,
                    circuit_archive,
                } = &mut *exchange;
                let circuit_archive = &*circuit_archive;
                predictors.advance(
                    rng,
                    |population, rng| predictor::offspring(population, rng),
                    |genome| evaluator.score_predictor(circuit_archive, genome),
                );
            }

            self.apply_pending_length(params, evaluator);

            // promote a better predictor into the archive (minimisation)
            let (best_fitness, best_predictor) = {
                let exchange = lock(&self.predictor_scoring);
                (
                    exchange.predictors.best_fitness(),
                    exchange.predictors.best_chromosome().clone(),
                )
            };
            let (ordering, active_fitness) = {
                let scoring = lock(&self.circuit_scoring);
                let archive = &scoring.predictor_archive;
                (
                    archive.fitness_ordering(),
                    archive.get(0).fitness_or_worst(archive.fitness_ordering()),
                )
            };

            if ordering.is_better(best_fitness, active_fitness) {
                lock(&self.loggers).fire(&Event::BetterPredictor {
                    old_fitness: active_fitness,
                    new_fitness: best_fitness,
                });

                let mut scoring = lock(&self.circuit_scoring);
                let CircuitScoring {
                    circuits,
                    predictor_archive,
                } = &mut *scoring;
                predictor_archive.insert(&best_predictor);
                circuits.invalidate_fitness();
            }
        }
    }

    /// Commits a pending Baldwin resize: updates the shared length, rebuilds
    /// every phenotype, re-scores the predictor population and the active
    /// predictor. Runs entirely under the Baldwin lock so at most one resize
    /// is in flight.
    fn apply_pending_length(&self, params: &Arc<PredictorParams>, evaluator: &Arc<Evaluator>) {
        let mut baldwin = lock(&self.baldwin);
        let Some(new_length) = baldwin.pending_length else {
            return;
        };

        let old_length = params.active_length();
        let (generation, old_used_length) = {
            let scoring = lock(&self.circuit_scoring);
            (
                scoring.circuits.generation,
                scoring.predictor_archive.get(0).genome.used(),
            )
        };

        params.set_active_length(new_length);
        let applied_length = params.active_length();

        {
            let mut exchange = lock(&self.predictor_scoring);
            for chromosome in exchange.predictors.chromosomes.iter_mut() {
                chromosome.genome.calculate_phenotype();
            }
        }
        let new_used_length = {
            let mut scoring = lock(&self.circuit_scoring);
            let active = scoring.predictor_archive.get_mut(0);
            active.genome.calculate_phenotype();
            active.genome.used()
        };

        {
            let mut exchange = lock(&self.predictor_scoring);
            let PredictorScoring {
                predictors,
                circuit_archive,
            } = &mut *exchange;
            let circuit_archive = &*circuit_archive;
            predictors.reevaluate(|genome| evaluator.score_predictor(circuit_archive, genome));

            let mut scoring = lock(&self.circuit_scoring);
            let active = scoring.predictor_archive.get_mut(0);
            active.fitness = Some(evaluator.score_predictor(circuit_archive, &mut active.genome));
        }

        lock(&self.loggers).fire(&Event::PredictorLengthChangeApplied {
            generation,
            old_length,
            new_length: applied_length,
            old_used_length,
            new_used_length,
        });

        baldwin.last_applied_generation = generation;
        baldwin.pending_length = None;
    }
}
