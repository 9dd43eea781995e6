#[cfg(test)]
mod circuit_tests {
    use coco::genotype::circuit::{
        self, CircuitGenome, Node, NodeFunction, COLS, INPUTS, LBACK, NODES, ROWS,
    };
    use coco::ga::{Chromosome, FitnessOrdering, Population};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// A circuit where every node is `identity` on primary input 0 and the
    /// output reads the node in the top-right grid corner.
    fn all_identity_circuit() -> CircuitGenome {
        let mut genome = CircuitGenome::new();
        for node in genome.nodes.iter_mut() {
            *node = Node {
                inputs: [0, 0],
                function: NodeFunction::Identity,
            };
        }
        genome.outputs[0] = INPUTS + circuit::node_index(COLS - 1, 0);
        genome.find_active();
        genome
    }

    fn active_mask(genome: &CircuitGenome) -> Vec<bool> {
        (0..NODES).map(|index| genome.is_active(index)).collect()
    }

    /// Reachability from the outputs, computed independently of the genome's
    /// own bookkeeping.
    fn reachable_mask(genome: &CircuitGenome) -> Vec<bool> {
        let mut reachable = vec![false; NODES];
        let mut stack: Vec<usize> = genome
            .outputs
            .iter()
            .filter(|&&output| output >= INPUTS)
            .map(|&output| output - INPUTS)
            .collect();

        while let Some(index) = stack.pop() {
            if reachable[index] {
                continue;
            }
            reachable[index] = true;
            for &input in &genome.nodes[index].inputs {
                if input >= INPUTS {
                    stack.push(input - INPUTS);
                }
            }
        }
        reachable
    }

    #[test]
    fn test_all_identity_circuit_passes_input_through() {
        let genome = all_identity_circuit();
        let mut rng = SmallRng::seed_from_u64(1);

        for _ in 0..100 {
            let mut window = [0u8; INPUTS];
            rng.fill(&mut window);
            assert_eq!(genome.evaluate(&window), window[0]);
        }
    }

    #[test]
    fn test_lane_paths_agree_with_scalar_on_reference_circuit() {
        let genome = all_identity_circuit();
        let mut rng = SmallRng::seed_from_u64(2);

        let mut window = [0u8; INPUTS];
        rng.fill(&mut window);
        let expected = genome.evaluate(&window);

        let inputs16: [[u8; 16]; INPUTS] = std::array::from_fn(|w| [window[w]; 16]);
        let inputs32: [[u8; 32]; INPUTS] = std::array::from_fn(|w| [window[w]; 32]);

        assert_eq!(genome.evaluate_lanes(&inputs16), [expected; 16]);
        assert_eq!(genome.evaluate_lanes(&inputs32), [expected; 32]);
    }

    #[test]
    fn test_lane_paths_agree_with_scalar_on_random_circuits() {
        let mut rng = SmallRng::seed_from_u64(3);

        for _ in 0..50 {
            let genome = CircuitGenome::random(&mut rng);

            let mut inputs32 = [[0u8; 32]; INPUTS];
            for plane in inputs32.iter_mut() {
                rng.fill(plane.as_mut_slice());
            }
            let outputs32 = genome.evaluate_lanes(&inputs32);

            let inputs16_lo: [[u8; 16]; INPUTS] =
                std::array::from_fn(|w| inputs32[w][..16].try_into().unwrap());
            let outputs16 = genome.evaluate_lanes(&inputs16_lo);

            for lane in 0..32 {
                let window: [u8; INPUTS] = std::array::from_fn(|w| inputs32[w][lane]);
                let scalar = genome.evaluate(&window);
                assert_eq!(outputs32[lane], scalar, "lane {} diverged", lane);
                if lane < 16 {
                    assert_eq!(outputs16[lane], scalar);
                }
            }
        }
    }

    #[test]
    fn test_output_to_first_node_leaves_one_active() {
        let mut rng = SmallRng::seed_from_u64(4);
        let mut genome = CircuitGenome::random(&mut rng);

        genome.outputs[0] = INPUTS;
        genome.nodes[0].inputs = [0, 1];
        genome.find_active();

        assert_eq!(genome.active_count(), 1);
        assert!(genome.is_active(0));
    }

    #[test]
    fn test_active_mask_matches_reachability_after_mutations() {
        let mut rng = SmallRng::seed_from_u64(5);
        let mut genome = CircuitGenome::random(&mut rng);

        for _ in 0..500 {
            genome.mutate(5, &mut rng);
            assert_eq!(active_mask(&genome), reachable_mask(&genome));
        }
    }

    #[test]
    fn test_find_active_is_idempotent() {
        let mut rng = SmallRng::seed_from_u64(6);

        for _ in 0..20 {
            let mut genome = CircuitGenome::random(&mut rng);
            genome.find_active();
            let first = active_mask(&genome);
            genome.find_active();
            assert_eq!(first, active_mask(&genome));
        }
    }

    #[test]
    fn test_mutation_respects_addressing_rules() {
        let mut rng = SmallRng::seed_from_u64(7);
        let mut genome = CircuitGenome::random(&mut rng);

        for _ in 0..1000 {
            genome.mutate(5, &mut rng);

            for (index, node) in genome.nodes.iter().enumerate() {
                let col = circuit::node_col(index);
                let minimum = (ROWS as isize * (col as isize - LBACK as isize)
                    + INPUTS as isize)
                    .max(INPUTS as isize) as usize;
                let maximum = ROWS * col + INPUTS;

                for &input in &node.inputs {
                    let legal = input < INPUTS || (input >= minimum && input < maximum);
                    assert!(legal, "node {} reads illegal address {}", index, input);
                }
            }
            for &output in &genome.outputs {
                assert!((INPUTS..INPUTS + NODES).contains(&output));
            }
        }
    }

    #[test]
    fn test_function_semantics() {
        assert_eq!(NodeFunction::Const255.apply(1, 2), 255);
        assert_eq!(NodeFunction::Identity.apply(7, 9), 7);
        assert_eq!(NodeFunction::Inversion.apply(1, 0), 254);
        assert_eq!(NodeFunction::Not1Or2.apply(0b1100_0000, 0b0000_0001), 0b0011_1111 | 1);
        assert_eq!(NodeFunction::Nand.apply(0xFF, 0x0F), 0xF0);
        assert_eq!(NodeFunction::RightShift1.apply(0x81, 0), 0x40);
        assert_eq!(NodeFunction::RightShift2.apply(0x81, 0), 0x20);
        assert_eq!(NodeFunction::Swap.apply(0xAB, 0xCD), 0xBD);
        assert_eq!(NodeFunction::Add.apply(200, 100), 44);
        assert_eq!(NodeFunction::AddSaturated.apply(200, 100), 255);
        // halved-add average: one LSB below the widening average when both
        // operands are odd
        assert_eq!(NodeFunction::Average.apply(3, 5), 3);
        assert_eq!(NodeFunction::Average.apply(4, 6), 5);
        assert_eq!(NodeFunction::Max.apply(3, 200), 200);
        assert_eq!(NodeFunction::Min.apply(3, 200), 3);
    }

    #[test]
    fn test_offspring_keeps_the_elite_and_invalidates_children() {
        let mut rng = SmallRng::seed_from_u64(8);
        let mut population = Population::new(8, FitnessOrdering::Maximize, || {
            CircuitGenome::random(&mut rng)
        });
        population.evaluate(|_| 1.0);

        let elite_index = population.best_index();
        let elite = population.chromosomes[elite_index].genome.clone();

        circuit::offspring(&mut population, 5, &mut rng);

        for (index, chromosome) in population.chromosomes.iter().enumerate() {
            if index == elite_index {
                assert!(chromosome.fitness.is_some());
                assert_eq!(chromosome.genome.outputs, elite.outputs);
                assert!(chromosome
                    .genome
                    .nodes
                    .iter()
                    .zip(elite.nodes.iter())
                    .all(|(a, b)| a == b));
            } else {
                assert!(chromosome.fitness.is_none(), "offspring {} kept fitness", index);
            }
        }

        let _: Chromosome<CircuitGenome> = population.best_chromosome().clone();
    }
}
