#[cfg(test)]
mod history_tests {
    use approx::assert_relative_eq;
    use coco::history::{History, HistoryEntry, HISTORY_LENGTH};

    #[test]
    fn test_starts_with_a_zero_sentinel() {
        let history = History::new();
        assert_eq!(history.stored(), 1);
        assert_eq!(history.last().generation, 0);
        assert_eq!(history.last().real_fitness, 0.0);
    }

    #[test]
    fn test_calc_entry_derives_deltas_and_velocity() {
        let mut history = History::new();

        let first = history.calc_entry(10, 2.0, 2.4, 0.5, 1000, 100, 90);
        assert_eq!(first.delta_generation, 10);
        assert_relative_eq!(first.delta_real_fitness, 2.0);
        assert_relative_eq!(first.velocity, 0.2);
        assert_relative_eq!(first.fitness_inaccuracy, 1.2);
        assert_relative_eq!(first.best_real_fitness_ever, 2.0);
        history.append(first);

        let second = history.calc_entry(14, 3.0, 3.0, 0.4, 2000, 100, 85);
        assert_eq!(second.delta_generation, 4);
        assert_relative_eq!(second.velocity, 0.25);
        assert_relative_eq!(second.delta_velocity, 0.05);
        assert_relative_eq!(second.best_real_fitness_ever, 3.0);
        history.append(second);

        // a worse real fitness keeps the best-ever watermark
        let third = history.calc_entry(20, 2.5, 2.5, 0.4, 3000, 100, 85);
        assert_relative_eq!(third.best_real_fitness_ever, 3.0);
    }

    #[test]
    fn test_ring_keeps_the_newest_seven() {
        let mut history = History::new();
        for generation in 1..=10 {
            let entry = HistoryEntry {
                generation,
                ..HistoryEntry::default()
            };
            history.append(entry);
        }

        assert_eq!(history.stored(), HISTORY_LENGTH);
        assert_eq!(history.last().generation, 10);
        for back in 1..=HISTORY_LENGTH {
            assert_eq!(history.get(-(back as isize)).generation, 11 - back);
        }
    }

    #[test]
    fn test_last_change_tracks_real_fitness_movement() {
        let mut history = History::new();

        history.append(HistoryEntry {
            generation: 5,
            delta_real_fitness: 0.5,
            ..HistoryEntry::default()
        });
        assert_eq!(history.last_change().generation, 5);

        history.append(HistoryEntry {
            generation: 9,
            delta_real_fitness: 0.0,
            ..HistoryEntry::default()
        });
        assert_eq!(history.last_change().generation, 5);

        history.append(HistoryEntry {
            generation: 12,
            delta_real_fitness: -0.1,
            ..HistoryEntry::default()
        });
        assert_eq!(history.last_change().generation, 12);
    }
}
