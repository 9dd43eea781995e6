#[cfg(test)]
mod baldwin_tests {
    use approx::assert_relative_eq;
    use coco::baldwin::{BaldwinConfig, VelocityStrategy};
    use coco::history::{History, HistoryEntry};

    fn config(strategy: VelocityStrategy) -> BaldwinConfig {
        BaldwinConfig {
            strategy,
            use_absolute_increments: false,
            min_length: 0,
            max_length: 10_000,
            inaccuracy_tolerance: 1.2,
            inaccuracy_coef: 2.0,
            zero_epsilon: 0.001,
            slow_threshold: 0.1,
            zero_coef: 0.93,
            decrease_coef: 0.97,
            increase_slow_coef: 1.03,
            increase_fast_coef: 1.0,
            zero_increment: -70,
            decrease_increment: -30,
            increase_slow_increment: 30,
            increase_fast_increment: 0,
        }
    }

    fn history_with(velocities: &[f64], inaccuracy: f64) -> History {
        let mut history = History::new();
        for (step, &velocity) in velocities.iter().enumerate() {
            history.append(HistoryEntry {
                generation: step + 1,
                velocity,
                fitness_inaccuracy: inaccuracy,
                ..HistoryEntry::default()
            });
        }
        history
    }

    #[test]
    fn test_inaccuracy_rule_wins_over_everything() {
        let config = config(VelocityStrategy::Last);
        let history = history_with(&[0.5], 1.5);
        assert_eq!(config.new_predictor_length(&history, 1000), Some(2000));
    }

    #[test]
    fn test_zero_velocity_shrinks() {
        let config = config(VelocityStrategy::Last);
        let history = history_with(&[0.0], 1.0);
        assert_eq!(config.new_predictor_length(&history, 1000), Some(930));
    }

    #[test]
    fn test_negative_velocity_shrinks_gently() {
        let config = config(VelocityStrategy::Last);
        let history = history_with(&[-0.5], 1.0);
        assert_eq!(config.new_predictor_length(&history, 1000), Some(970));
    }

    #[test]
    fn test_slow_growth_extends() {
        let config = config(VelocityStrategy::Last);
        let history = history_with(&[0.05], 1.0);
        assert_eq!(config.new_predictor_length(&history, 1000), Some(1030));
    }

    #[test]
    fn test_fast_growth_with_unit_coef_reports_no_change() {
        let config = config(VelocityStrategy::Last);
        let history = history_with(&[0.5], 1.0);
        assert_eq!(config.new_predictor_length(&history, 1000), None);
    }

    #[test]
    fn test_absolute_increment_mode() {
        let mut config = config(VelocityStrategy::Last);
        config.use_absolute_increments = true;

        let shrink = history_with(&[0.0], 1.0);
        assert_eq!(config.new_predictor_length(&shrink, 1000), Some(930));

        let grow = history_with(&[0.05], 1.0);
        assert_eq!(config.new_predictor_length(&grow, 1000), Some(1030));
    }

    #[test]
    fn test_result_is_clamped_to_the_configured_bounds() {
        let mut config = config(VelocityStrategy::Last);
        config.min_length = 995;
        let shrink = history_with(&[0.0], 1.0);
        assert_eq!(config.new_predictor_length(&shrink, 1000), Some(995));

        config.min_length = 0;
        config.max_length = 1500;
        let bump = history_with(&[0.5], 1.5);
        assert_eq!(config.new_predictor_length(&bump, 1000), Some(1500));
    }

    #[test]
    fn test_median3_takes_the_middle_velocity() {
        let config = config(VelocityStrategy::Median3);
        // newest last: get(-1) = 0.4, get(-2) = -0.2, get(-3) = 0.05
        let history = history_with(&[0.05, -0.2, 0.4], 1.0);
        // median of {0.4, -0.2, 0.05} is 0.05 -> slow increase
        assert_eq!(config.new_predictor_length(&history, 1000), Some(1030));
    }

    #[test]
    fn test_avg3_averages_the_newest_three() {
        let config = config(VelocityStrategy::Avg3);
        let history = history_with(&[10.0, -0.15, -0.15, 0.0], 1.0);
        // (0 - 0.15 - 0.15) / 3 = -0.1 -> decrease
        assert_eq!(config.new_predictor_length(&history, 1000), Some(970));
    }

    #[test]
    fn test_avg7w_weights_recent_velocities_higher() {
        let config = config(VelocityStrategy::Avg7Weighted);
        // single recorded velocity plus the zero sentinel: weighted mean
        // (0.2 * 7 + 0 * 6) / 13 ~ 0.1077 -> fast increase, coef 1.0
        let history = history_with(&[0.2], 1.0);
        assert_eq!(config.new_predictor_length(&history, 1000), None);

        // the same velocity diluted by six stale zeros drops under the slow
        // threshold -> slow increase
        let diluted = history_with(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.2], 1.0);
        assert_eq!(config.new_predictor_length(&diluted, 1000), Some(1030));
    }

    #[test]
    fn test_symreg_polynomial_drives_the_length_directly() {
        let config = config(VelocityStrategy::SymbolicRegression);

        // all-zero velocities reduce the polynomial to its constant term
        let history = history_with(&[0.0; 7], 1.0);
        // round(1000 * 0.984805...) = 985
        assert_eq!(config.new_predictor_length(&history, 1000), Some(985));
    }

    #[test]
    fn test_symreg_constant_term() {
        // the polynomial's value with a single nonzero newest velocity:
        // constant - 0.144536 * v
        let config = config(VelocityStrategy::SymbolicRegression);
        let history = history_with(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0], 1.0);
        let expected = (1000.0 * (0.984805307321727_f64 - 0.144536309148617)).round() as usize;
        assert_eq!(
            config.new_predictor_length(&history, 1000),
            Some(expected)
        );
        assert_relative_eq!(expected as f64, 840.0);
    }
}
