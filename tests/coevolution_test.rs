#[cfg(test)]
mod coevolution_tests {
    use std::sync::Arc;

    use coco::archive::Archive;
    use coco::baldwin::VelocityStrategy;
    use coco::coevolution::{Algorithm, Coevolution, Settings};
    use coco::config::Options;
    use coco::fitness::{Evaluator, KernelWidth};
    use coco::ga::{FitnessOrdering, Population};
    use coco::genotype::{CircuitGenome, PredictorEncoding, PredictorGenome, PredictorParams};
    use coco::image::{Image, TrainingSet};
    use coco::logging::LoggerSet;
    use coco::signals::SignalMonitor;
    use clap::Parser;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    /// A smooth gradient with every third pixel blown out to white.
    fn salted_training_set() -> Arc<TrainingSet> {
        let width = 16;
        let height = 16;
        let mut original = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                original.push(((x + y) * 8) as u8);
            }
        }
        let noisy: Vec<u8> = original
            .iter()
            .enumerate()
            .map(|(index, &pixel)| if index % 3 == 0 { 255 } else { pixel })
            .collect();

        Arc::new(
            TrainingSet::new(
                Image::from_pixels(width, height, original),
                Image::from_pixels(width, height, noisy),
            )
            .unwrap(),
        )
    }

    fn settings(algorithm: Algorithm, max_generations: usize) -> Settings {
        Settings {
            algorithm,
            max_generations,
            target_fitness: 0.0,
            log_interval: 0,
            baldwin_interval: 0,
            cgp_mutation_cap: 5,
        }
    }

    fn coevolution_setup(
        algorithm: Algorithm,
        encoding: PredictorEncoding,
        max_generations: usize,
        initial_fraction_of_max: usize,
        seed: u64,
    ) -> Coevolution {
        let data = salted_training_set();
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&data), KernelWidth::Lanes32));
        let mut rng = SmallRng::seed_from_u64(seed);

        let circuits = Population::new(8, FitnessOrdering::Maximize, || {
            CircuitGenome::random(&mut rng)
        });

        let max_length = data.pixel_count() / 4;
        let params = PredictorParams::new(
            encoding,
            Arc::clone(&data),
            max_length,
            max_length / initial_fraction_of_max,
            0.05,
            0.25,
            0.5,
        );
        let predictors = Population::new(10, FitnessOrdering::Minimize, || {
            PredictorGenome::random(&params, &mut rng)
        });

        let baldwin_config = (algorithm == Algorithm::Baldwin).then(|| {
            let options = Options::try_parse_from([
                "coco",
                "--original",
                "a.png",
                "--noisy",
                "b.png",
                "--algorithm",
                "baldwin",
            ])
            .unwrap();
            let mut config = options.baldwin_config(coco::config::PredictorSizes {
                min: 4,
                max: max_length,
                initial: max_length / initial_fraction_of_max,
            });
            config.strategy = VelocityStrategy::Last;
            config
        });

        Coevolution::new(
            settings(algorithm, max_generations),
            baldwin_config,
            Some(params),
            Arc::clone(&evaluator),
            circuits,
            Archive::new(10, FitnessOrdering::Maximize),
            predictors,
            Archive::new(1, FitnessOrdering::Minimize),
            LoggerSet::new(),
        )
    }

    #[test]
    fn test_plain_cgp_runs_to_the_generation_limit() {
        let data = salted_training_set();
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&data), KernelWidth::Lanes32));
        let mut rng = SmallRng::seed_from_u64(61);

        let circuits = Population::new(8, FitnessOrdering::Maximize, || {
            CircuitGenome::random(&mut rng)
        });

        let mut evolution = Coevolution::new(
            settings(Algorithm::Cgp, 200),
            None,
            None,
            evaluator,
            circuits,
            Archive::new(10, FitnessOrdering::Maximize),
            Population::new_empty(FitnessOrdering::Minimize),
            Archive::new(1, FitnessOrdering::Minimize),
            LoggerSet::new(),
        );
        evolution.bootstrap();

        let exit_code = evolution.run(SignalMonitor::disconnected(), 61);
        assert_eq!(exit_code, 0);
        assert!(evolution.best_circuit().fitness.is_some());
    }

    #[test]
    fn test_coevolution_beats_the_identity_filter() {
        let mut evolution = coevolution_setup(
            Algorithm::Predictors,
            PredictorEncoding::Permuted,
            2000,
            1,
            62,
        );
        evolution.bootstrap();

        let exit_code = evolution.run(SignalMonitor::disconnected(), 62);
        assert_eq!(exit_code, 0);

        let data = Arc::clone(evolution.evaluator().data());
        let identity_fitness = data.original.psnr(&data.noisy);
        let best = evolution.best_circuit();
        assert!(
            best.fitness.unwrap_or(0.0) >= identity_fitness,
            "best {:?} did not reach the identity baseline {}",
            best.fitness,
            identity_fitness
        );
    }

    #[test]
    fn test_baldwin_mode_completes_and_keeps_the_phenotype_consistent() {
        let mut evolution = coevolution_setup(
            Algorithm::Baldwin,
            PredictorEncoding::Repeated,
            500,
            2,
            63,
        );
        evolution.bootstrap();

        let exit_code = evolution.run(SignalMonitor::disconnected(), 63);
        assert_eq!(exit_code, 0);
        assert!(evolution.best_circuit().fitness.is_some());
    }

    #[test]
    fn test_circular_encoding_runs_under_coevolution() {
        let mut evolution = coevolution_setup(
            Algorithm::Predictors,
            PredictorEncoding::RepeatedCircular,
            300,
            2,
            64,
        );
        evolution.bootstrap();
        assert_eq!(evolution.run(SignalMonitor::disconnected(), 64), 0);
    }

    #[test]
    fn test_target_fitness_stops_early() {
        let data = salted_training_set();
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&data), KernelWidth::Lanes32));
        let mut rng = SmallRng::seed_from_u64(65);

        let circuits = Population::new(8, FitnessOrdering::Maximize, || {
            CircuitGenome::random(&mut rng)
        });

        let mut settings = settings(Algorithm::Cgp, 1_000_000);
        settings.target_fitness = 1e-9; // any positive score reaches this

        let mut evolution = Coevolution::new(
            settings,
            None,
            None,
            evaluator,
            circuits,
            Archive::new(10, FitnessOrdering::Maximize),
            Population::new_empty(FitnessOrdering::Minimize),
            Archive::new(1, FitnessOrdering::Minimize),
            LoggerSet::new(),
        );
        evolution.bootstrap();
        assert_eq!(evolution.run(SignalMonitor::disconnected(), 65), 0);
    }
}
