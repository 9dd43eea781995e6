#[cfg(test)]
mod format_tests {
    use coco::genotype::circuit::format::{dump_compat_string, parse_compat, ParseError};
    use coco::genotype::circuit::{CircuitGenome, NODES};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_round_trip_preserves_the_genome() {
        let mut rng = SmallRng::seed_from_u64(11);

        for _ in 0..20 {
            let genome = CircuitGenome::random(&mut rng);
            let serialized = dump_compat_string(&genome);
            let parsed = parse_compat(&serialized).expect("round trip failed");

            assert_eq!(parsed.outputs, genome.outputs);
            assert!(parsed
                .nodes
                .iter()
                .zip(genome.nodes.iter())
                .all(|(a, b)| a == b));
            for index in 0..NODES {
                assert_eq!(parsed.is_active(index), genome.is_active(index));
            }
        }
    }

    #[test]
    fn test_serialized_form_starts_with_the_grid_header() {
        let mut rng = SmallRng::seed_from_u64(12);
        let serialized = dump_compat_string(&CircuitGenome::random(&mut rng));
        assert!(serialized.starts_with("{9, 1, 8, 4, 2, 1, 16}"));
        assert!(serialized.ends_with(")\n"));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert!(matches!(
            parse_compat("not a circuit"),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(
            parse_compat("{9, 1, 8, 4, 2, 1}"),
            Err(ParseError::Malformed(_))
        ));

        let mut rng = SmallRng::seed_from_u64(13);
        let serialized = dump_compat_string(&CircuitGenome::random(&mut rng));
        let truncated = &serialized[..serialized.len() / 2];
        assert!(matches!(
            parse_compat(truncated),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_mismatched_grid_is_distinguished_from_garbage() {
        let mut rng = SmallRng::seed_from_u64(14);
        let serialized = dump_compat_string(&CircuitGenome::random(&mut rng));
        let other_grid = serialized.replacen("{9, 1, 8, 4", "{9, 1, 16, 4", 1);
        assert!(matches!(
            parse_compat(&other_grid),
            Err(ParseError::GridMismatch(_))
        ));
    }
}
