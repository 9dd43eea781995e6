#[cfg(test)]
mod archive_tests {
    use coco::archive::Archive;
    use coco::ga::{Chromosome, FitnessOrdering};

    fn entry(genome: u32, fitness: f64) -> Chromosome<u32> {
        Chromosome {
            genome,
            fitness: Some(fitness),
        }
    }

    #[test]
    fn test_partially_full_archive_is_insertion_ordered() {
        let mut archive = Archive::new(3, FitnessOrdering::Maximize);
        archive.insert(&entry(1, 0.1));
        archive.insert(&entry(2, 0.2));

        assert_eq!(archive.stored(), 2);
        assert_eq!(archive.get(0).genome, 1);
        assert_eq!(archive.get(1).genome, 2);
        assert_eq!(archive.get(-1).genome, 2);
    }

    #[test]
    fn test_full_archive_wraps_to_the_most_recent_inserts() {
        let mut archive = Archive::new(3, FitnessOrdering::Maximize);
        for (genome, fitness) in [(1, 0.5), (2, 0.9), (3, 0.3), (4, 0.4), (5, 0.1)] {
            archive.insert(&entry(genome, fitness));
        }

        assert_eq!(archive.stored(), 3);
        assert_eq!(archive.get(0).genome, 3);
        assert_eq!(archive.get(1).genome, 4);
        assert_eq!(archive.get(2).genome, 5);
        assert_eq!(archive.get(-1).genome, 5);

        // best ever survives eviction
        let best = archive.best_ever().expect("nonempty archive has a best");
        assert_eq!(best.genome, 2);
        assert_eq!(best.fitness, Some(0.9));
    }

    #[test]
    fn test_iter_returns_ring_order() {
        let mut archive = Archive::new(3, FitnessOrdering::Maximize);
        for genome in 1..=5 {
            archive.insert(&entry(genome, genome as f64));
        }
        let order: Vec<u32> = archive.iter().map(|chromosome| chromosome.genome).collect();
        assert_eq!(order, vec![3, 4, 5]);
    }

    #[test]
    fn test_best_ever_never_worsens() {
        let mut archive = Archive::new(2, FitnessOrdering::Maximize);
        let mut best_so_far = f64::MIN;

        for (step, fitness) in [0.3, 0.8, 0.2, 0.5, 0.9, 0.1].into_iter().enumerate() {
            archive.insert(&entry(step as u32, fitness));
            best_so_far = best_so_far.max(fitness);
            assert_eq!(archive.best_ever().unwrap().fitness, Some(best_so_far));
        }
    }

    #[test]
    fn test_minimising_archive_prefers_lower_scores() {
        let mut archive = Archive::new(2, FitnessOrdering::Minimize);
        archive.insert(&entry(1, 5.0));
        archive.insert(&entry(2, 2.0));
        archive.insert(&entry(3, 9.0));
        assert_eq!(archive.best_ever().unwrap().genome, 2);
    }

    #[test]
    fn test_original_fitness_survives_rescoring() {
        let mut archive = Archive::new(2, FitnessOrdering::Maximize);
        archive.insert_rescored(&entry(1, 0.25), |_| 0.75);

        assert_eq!(archive.original_fitness(0), 0.25);
        assert_eq!(archive.get(0).fitness, Some(0.75));
        // best-ever competes with the rescored value
        assert_eq!(archive.best_ever().unwrap().fitness, Some(0.75));
    }

    #[test]
    fn test_unscored_insert_records_zero_original_fitness() {
        let mut archive = Archive::new(1, FitnessOrdering::Maximize);
        archive.insert(&Chromosome {
            genome: 7u32,
            fitness: None,
        });
        assert_eq!(archive.original_fitness(0), 0.0);
    }
}
