//! The evolution driver: configuration, image loading, population and
//! archive setup, bootstrap, then the coordinator loops until a stop
//! condition fires.

use std::fs::File;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rand::rngs::SmallRng;
use rand::SeedableRng;

use coco::archive::Archive;
use coco::coevolution::{Algorithm, Coevolution, Settings};
use coco::config::Options;
use coco::fitness::Evaluator;
use coco::ga::{FitnessOrdering, Population};
use coco::genotype::{CircuitGenome, PredictorGenome, PredictorParams};
use coco::image::{Image, TrainingSet};
use coco::logging::{CsvLogger, LoggerSet, SummaryLogger, TextLogger};
use coco::signals::SignalMonitor;

fn main() {
    env_logger::init();
    let exit_code = match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error:#}");
            eprintln!("Run with --help to see available options.");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run() -> anyhow::Result<i32> {
    let options = Options::parse();
    options.validate()?;
    let seed = options.resolved_seed();

    let original =
        Image::load(&options.original).context("failed to load the original image")?;
    let noisy = Image::load(&options.noisy).context("failed to load the noisy image")?;
    let data = Arc::new(TrainingSet::new(original, noisy)?);

    log::info!(
        "{}x{} pixels, {} kernel, seed {}",
        data.original.width(),
        data.original.height(),
        options.kernel.label(),
        seed
    );

    let evaluator = Arc::new(Evaluator::new(Arc::clone(&data), options.kernel));
    let mut rng = SmallRng::seed_from_u64(seed);

    let circuits = Population::new(
        options.cgp_population_size,
        FitnessOrdering::Maximize,
        || CircuitGenome::random(&mut rng),
    );

    let (predictors, predictor_params, baldwin_config) = if options.algorithm.is_coevolution() {
        let sizes = options.resolve_predictor_sizes(data.pixel_count());
        let params = PredictorParams::new(
            options.resolved_encoding(),
            Arc::clone(&data),
            sizes.max,
            sizes.initial,
            options.pred_mutation_rate,
            options.pred_offspring_elite,
            options.pred_offspring_combine,
        );
        let predictors = Population::new(
            options.pred_population_size,
            FitnessOrdering::Minimize,
            || PredictorGenome::random(&params, &mut rng),
        );

        let baldwin_config = (options.algorithm == Algorithm::Baldwin).then(|| {
            let config = options.baldwin_config(sizes);
            if config.use_absolute_increments {
                log::info!(
                    "absolute increments (pixels): zero {}, decrease {}, slow {}, fast {}",
                    config.zero_increment,
                    config.decrease_increment,
                    config.increase_slow_increment,
                    config.increase_fast_increment
                );
            }
            config
        });

        (predictors, Some(params), baldwin_config)
    } else {
        (
            Population::new_empty(FitnessOrdering::Minimize),
            None,
            None,
        )
    };

    let circuit_archive = Archive::new(options.cgp_archive_size, FitnessOrdering::Maximize);
    let predictor_archive = Archive::new(1, FitnessOrdering::Minimize);

    let mut loggers = LoggerSet::new();
    loggers.add(Box::new(TextLogger::new(Box::new(std::io::stdout()))));
    if let Some(log_dir) = &options.log_dir {
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        let progress = File::create(log_dir.join("progress.log"))
            .context("failed to open progress.log for writing")?;
        loggers.add(Box::new(TextLogger::with_timestamps(Box::new(progress))));

        let csv = File::create(log_dir.join("cgp_history.csv"))
            .context("failed to open cgp_history.csv for writing")?;
        loggers.add(Box::new(CsvLogger::new(Box::new(csv))));

        loggers.add(Box::new(SummaryLogger::new(
            log_dir.clone(),
            options.snapshot(seed),
            Arc::clone(&data),
            true,
        )));
    }

    println!("Configuration:\n{}", options.snapshot(seed));

    let settings = Settings {
        algorithm: options.algorithm,
        max_generations: options.max_generations,
        target_fitness: options.resolved_target_fitness(),
        log_interval: options.log_interval,
        baldwin_interval: options.baldwin_interval,
        cgp_mutation_cap: options.cgp_mutate,
    };

    let mut evolution = Coevolution::new(
        settings,
        baldwin_config,
        predictor_params,
        evaluator,
        circuits,
        circuit_archive,
        predictors,
        predictor_archive,
        loggers,
    );
    evolution.bootstrap();

    let signals = SignalMonitor::install().context("failed to install signal handlers")?;
    Ok(evolution.run(signals, seed))
}
