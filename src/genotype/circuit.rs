//! The CGP circuit genome: a feed-forward grid of two-input byte functions.
//!
//! The grid shape is fixed at compile time, like the filter windows it
//! consumes: 9 primary inputs (one 3x3 neighbourhood), an 8x4 node grid with
//! level-back 1, and a single primary output. Nodes are stored column-major,
//! addressed as `INPUTS + index`, and each node may read the primary inputs
//! or the previous column.
//!
//! Evaluation skips inactive nodes, so mutating an inactive gene is free;
//! the active mask is refreshed after every structural change.

pub mod format;

use fixedbitset::FixedBitSet;
use rand::Rng;

use crate::ga::Population;

/// Primary inputs: the 3x3 pixel neighbourhood.
pub const INPUTS: usize = 9;
/// Primary outputs: the filtered center pixel.
pub const OUTPUTS: usize = 1;
/// Grid columns.
pub const COLS: usize = 8;
/// Grid rows.
pub const ROWS: usize = 4;
/// How many columns back a node input may reach.
pub const LBACK: usize = 1;
/// Inputs per node.
pub const NODE_ARITY: usize = 2;
/// Total grid nodes.
pub const NODES: usize = COLS * ROWS;
/// Genes per node: two inputs and a function code.
const NODE_GENES: usize = NODE_ARITY + 1;
/// Gene index of the first primary-output gene.
const OUTPUT_GENES_INDEX: usize = NODE_GENES * NODES;
/// Total genes in a genome.
pub const GENOME_LENGTH: usize = OUTPUT_GENES_INDEX + OUTPUTS;

/// The function alphabet, 16 operations over `u8`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeFunction {
    Const255 = 0,
    Identity,
    Inversion,
    Or,
    Not1Or2,
    And,
    Nand,
    Xor,
    RightShift1,
    RightShift2,
    Swap,
    Add,
    AddSaturated,
    Average,
    Max,
    Min,
}

/// Number of functions in the alphabet.
pub const FUNCTION_COUNT: usize = 16;

const FUNCTIONS: [NodeFunction; FUNCTION_COUNT] = [
    NodeFunction::Const255,
    NodeFunction::Identity,
    NodeFunction::Inversion,
    NodeFunction::Or,
    NodeFunction::Not1Or2,
    NodeFunction::And,
    NodeFunction::Nand,
    NodeFunction::Xor,
    NodeFunction::RightShift1,
    NodeFunction::RightShift2,
    NodeFunction::Swap,
    NodeFunction::Add,
    NodeFunction::AddSaturated,
    NodeFunction::Average,
    NodeFunction::Max,
    NodeFunction::Min,
];

impl NodeFunction {
    pub fn from_code(code: usize) -> Option<Self> {
        FUNCTIONS.get(code).copied()
    }

    pub fn code(self) -> usize {
        self as usize
    }

    /// Applies the function to one pair of bytes.
    ///
    /// The average is computed as `(a >> 1) + (b >> 1)`: one LSB of drift
    /// against a widening average, but identical in every evaluation path.
    #[inline]
    pub fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            NodeFunction::Const255 => 255,
            NodeFunction::Identity => a,
            NodeFunction::Inversion => 255 - a,
            NodeFunction::Or => a | b,
            NodeFunction::Not1Or2 => !a | b,
            NodeFunction::And => a & b,
            NodeFunction::Nand => !(a & b),
            NodeFunction::Xor => a ^ b,
            NodeFunction::RightShift1 => a >> 1,
            NodeFunction::RightShift2 => a >> 2,
            NodeFunction::Swap => ((a & 0x0F) << 4) | (b & 0x0F),
            NodeFunction::Add => a.wrapping_add(b),
            NodeFunction::AddSaturated => a.saturating_add(b),
            NodeFunction::Average => (a >> 1) + (b >> 1),
            NodeFunction::Max => a.max(b),
            NodeFunction::Min => a.min(b),
        }
    }
}

/// One grid node: two input addresses and a function code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub inputs: [usize; NODE_ARITY],
    pub function: NodeFunction,
}

/// A complete circuit: the node grid, the primary output addresses and the
/// derived active mask.
#[derive(Clone, Debug)]
pub struct CircuitGenome {
    pub nodes: [Node; NODES],
    pub outputs: [usize; OUTPUTS],
    active: FixedBitSet,
}

impl Default for CircuitGenome {
    fn default() -> Self {
        Self::new()
    }
}

/// Grid column of a node index.
#[inline]
pub fn node_col(index: usize) -> usize {
    index / ROWS
}

/// Grid row of a node index.
#[inline]
pub fn node_row(index: usize) -> usize {
    index % ROWS
}

/// Node index at the given grid position.
#[inline]
pub fn node_index(col: usize, row: usize) -> usize {
    ROWS * col + row
}

/// Uniformly samples a legal input address for a node in the given column:
/// any primary input, or any node in the level-back window of columns.
fn random_input_address<R: Rng>(col: usize, rng: &mut R) -> usize {
    let minimum = (ROWS as isize * (col as isize - LBACK as isize) + INPUTS as isize)
        .max(INPUTS as isize) as usize;
    let maximum = ROWS * col + INPUTS;

    let choice = rng.gen_range(0..INPUTS + (maximum - minimum));
    if choice < INPUTS {
        choice
    } else {
        minimum + (choice - INPUTS)
    }
}

impl CircuitGenome {
    /// An all-zero circuit; callers randomize or load into it.
    pub fn new() -> Self {
        Self {
            nodes: [Node {
                inputs: [0; NODE_ARITY],
                function: NodeFunction::Const255,
            }; NODES],
            outputs: [INPUTS; OUTPUTS],
            active: FixedBitSet::with_capacity(NODES),
        }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut genome = Self::new();
        genome.randomize(rng);
        genome
    }

    /// Rewrites every gene with a random legal value and refreshes the
    /// active mask.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        for gene in 0..GENOME_LENGTH {
            self.randomize_gene(gene, rng);
        }
        self.find_active();
    }

    /// Replaces the gene at `locus` with a random legal value. Does not
    /// refresh the active mask.
    fn randomize_gene<R: Rng>(&mut self, locus: usize, rng: &mut R) {
        if locus < OUTPUT_GENES_INDEX {
            let node_index = locus / NODE_GENES;
            let gene_index = locus % NODE_GENES;

            if gene_index == NODE_ARITY {
                let code = rng.gen_range(0..FUNCTION_COUNT);
                self.nodes[node_index].function = FUNCTIONS[code];
            } else {
                self.nodes[node_index].inputs[gene_index] =
                    random_input_address(node_col(node_index), rng);
            }
        } else {
            let index = locus - OUTPUT_GENES_INDEX;
            self.outputs[index] = rng.gen_range(INPUTS..INPUTS + NODES);
        }
    }

    /// Performs up to `cap` point mutations (the count is uniform in
    /// `0..=cap`) and refreshes the active mask.
    pub fn mutate<R: Rng>(&mut self, cap: usize, rng: &mut R) {
        let genes_to_change = rng.gen_range(0..=cap.min(GENOME_LENGTH));
        for _ in 0..genes_to_change {
            let locus = rng.gen_range(0..GENOME_LENGTH);
            self.randomize_gene(locus, rng);
        }
        self.find_active();
    }

    /// Recomputes the active mask: a node is active iff it is a transitive
    /// predecessor of some primary output. Walking the grid backwards once
    /// is sufficient because inputs always point to lower addresses.
    pub fn find_active(&mut self) {
        self.active.clear();

        for &output in &self.outputs {
            if output >= INPUTS {
                self.active.insert(output - INPUTS);
            }
        }

        for index in (0..NODES).rev() {
            if !self.active.contains(index) {
                continue;
            }
            for &input in &self.nodes[index].inputs {
                if input >= INPUTS {
                    self.active.insert(input - INPUTS);
                }
            }
        }
    }

    #[inline]
    pub fn is_active(&self, node: usize) -> bool {
        self.active.contains(node)
    }

    pub fn active_count(&self) -> usize {
        self.active.count_ones(..)
    }

    /// Evaluates the circuit on one window, scalar path.
    pub fn evaluate(&self, window: &[u8; INPUTS]) -> u8 {
        let mut values = [0u8; INPUTS + NODES];
        values[..INPUTS].copy_from_slice(window);

        for index in 0..NODES {
            if !self.active.contains(index) {
                continue;
            }
            let node = &self.nodes[index];
            let a = values[node.inputs[0]];
            let b = values[node.inputs[1]];
            values[INPUTS + index] = node.function.apply(a, b);
        }

        values[self.outputs[0]]
    }

    /// Evaluates the circuit on `W` windows at once. `inputs[w]` holds the
    /// w-th neighbour of each of the `W` pixels. Bit-exact with the scalar
    /// path; the per-lane loops compile down to the 16- and 32-byte vector
    /// kernels on targets that have them.
    pub fn evaluate_lanes<const W: usize>(&self, inputs: &[[u8; W]; INPUTS]) -> [u8; W] {
        let mut values = [[0u8; W]; INPUTS + NODES];
        values[..INPUTS].copy_from_slice(inputs);

        for index in 0..NODES {
            if !self.active.contains(index) {
                continue;
            }
            let node = &self.nodes[index];
            let (a, b) = (node.inputs[0], node.inputs[1]);
            let mut out = [0u8; W];
            let function = node.function;
            for lane in 0..W {
                out[lane] = function.apply(values[a][lane], values[b][lane]);
            }
            values[INPUTS + index] = out;
        }

        values[self.outputs[0]]
    }
}

/// (1+λ) offspring: the elite keeps its slot and score, every other slot is
/// overwritten by a mutated copy of the elite with stale fitness.
pub fn offspring<R: Rng>(
    population: &mut Population<CircuitGenome>,
    mutation_cap: usize,
    rng: &mut R,
) {
    let parent_index = population.best_index();
    let parent = population.chromosomes[parent_index].genome.clone();

    for (index, chromosome) in population.chromosomes.iter_mut().enumerate() {
        if index == parent_index {
            continue;
        }
        chromosome.genome.clone_from(&parent);
        chromosome.genome.mutate(mutation_cap, rng);
        chromosome.fitness = None;
    }
}
