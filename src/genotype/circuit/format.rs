//! Circuit serialisation in the CGP-viewer compatible format.
//!
//! The format is a single line:
//!
//! ```text
//! {inputs, outputs, cols, rows, arity, 1, functions}([9] 0, 1, 3)...(37)
//! ```
//!
//! a header of grid parameters, one `([address] in0, in1, fn)` group per
//! node, and the primary output addresses in parentheses. Parsing
//! distinguishes malformed input from a well-formed circuit whose grid does
//! not match this build.

use std::io::{self, Write};

use itertools::Itertools;

use super::{
    node_index, CircuitGenome, Node, NodeFunction, COLS, FUNCTION_COUNT, INPUTS, NODES, NODE_ARITY,
    OUTPUTS, ROWS,
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed circuit description: {0}")]
    Malformed(&'static str),
    #[error("circuit shape {0} does not match the compiled grid")]
    GridMismatch(String),
}

/// Writes the genome in the CGP-viewer compatible format.
pub fn dump_compat(genome: &CircuitGenome, out: &mut impl Write) -> io::Result<()> {
    write!(
        out,
        "{{{}, {}, {}, {}, {}, {}, {}}}",
        INPUTS, OUTPUTS, COLS, ROWS, NODE_ARITY, 1, FUNCTION_COUNT
    )?;

    for (index, node) in genome.nodes.iter().enumerate() {
        write!(
            out,
            "([{}] {}, {}, {})",
            INPUTS + index,
            node.inputs[0],
            node.inputs[1],
            node.function.code()
        )?;
    }

    writeln!(out, "({})", genome.outputs.iter().join(","))
}

pub fn dump_compat_string(genome: &CircuitGenome) -> String {
    let mut buffer = Vec::new();
    dump_compat(genome, &mut buffer).expect("writing to a Vec cannot fail");
    String::from_utf8(buffer).expect("the compat format is ASCII")
}

/// Writes the genome as a grid of node groups, one row per line, with the
/// primary output addresses in the rightmost column.
pub fn dump_readable(genome: &CircuitGenome, out: &mut impl Write) -> io::Result<()> {
    writeln!(
        out,
        "Inputs: {}\nOutputs: {}\nSize: {} x {}\nBlocks: {}-ary, {} output(s), {} functions",
        INPUTS, OUTPUTS, COLS, ROWS, NODE_ARITY, 1, FUNCTION_COUNT
    )?;

    for row in 0..ROWS {
        for col in 0..COLS {
            let index = node_index(col, row);
            let node = &genome.nodes[index];
            let marker = if genome.is_active(index) { '*' } else { ' ' };
            write!(
                out,
                "([{:2}]{} {:2}, {:2}, {:2})  ",
                INPUTS + index,
                marker,
                node.inputs[0],
                node.inputs[1],
                node.function.code()
            )?;
        }
        if row < OUTPUTS {
            write!(out, "  ({:2})", genome.outputs[row])?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// A cursor over the serialized text. Whitespace between tokens is
/// insignificant.
struct Scanner<'a> {
    rest: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn skip_whitespace(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn expect(&mut self, token: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        let mut chars = self.rest.chars();
        match chars.next() {
            Some(c) if c == token => {
                self.rest = chars.as_str();
                Ok(())
            }
            _ => Err(ParseError::Malformed("unexpected token")),
        }
    }

    fn number(&mut self) -> Result<usize, ParseError> {
        self.skip_whitespace();
        let digits = self
            .rest
            .char_indices()
            .take_while(|(_, c)| c.is_ascii_digit())
            .count();
        if digits == 0 {
            return Err(ParseError::Malformed("expected a number"));
        }
        let (number, rest) = self.rest.split_at(digits);
        self.rest = rest;
        number
            .parse()
            .map_err(|_| ParseError::Malformed("number out of range"))
    }
}

/// Parses a circuit in the compat format and recomputes its active mask.
pub fn parse_compat(input: &str) -> Result<CircuitGenome, ParseError> {
    let mut scanner = Scanner::new(input);

    scanner.expect('{')?;
    let mut header = [0usize; 7];
    for (index, value) in header.iter_mut().enumerate() {
        if index > 0 {
            scanner.expect(',')?;
        }
        *value = scanner.number()?;
    }
    scanner.expect('}')?;

    let expected = [INPUTS, OUTPUTS, COLS, ROWS, NODE_ARITY, 1, FUNCTION_COUNT];
    if header != expected {
        return Err(ParseError::GridMismatch(format!(
            "{{{}, {}, {}, {}, {}, {}, {}}}",
            header[0], header[1], header[2], header[3], header[4], header[5], header[6]
        )));
    }

    let mut genome = CircuitGenome::new();

    for index in 0..NODES {
        scanner.expect('(')?;
        scanner.expect('[')?;
        let address = scanner.number()?;
        if address != INPUTS + index {
            return Err(ParseError::Malformed("node addresses out of order"));
        }
        scanner.expect(']')?;
        let input0 = scanner.number()?;
        scanner.expect(',')?;
        let input1 = scanner.number()?;
        scanner.expect(',')?;
        let code = scanner.number()?;
        scanner.expect(')')?;

        if input0 >= INPUTS + NODES || input1 >= INPUTS + NODES {
            return Err(ParseError::Malformed("node input address out of range"));
        }
        genome.nodes[index] = Node {
            inputs: [input0, input1],
            function: NodeFunction::from_code(code)
                .ok_or(ParseError::Malformed("unknown function code"))?,
        };
    }

    scanner.expect('(')?;
    for (index, output) in genome.outputs.iter_mut().enumerate() {
        if index > 0 {
            scanner.expect(',')?;
        }
        let address = scanner.number()?;
        if address >= INPUTS + NODES {
            return Err(ParseError::Malformed("output address out of range"));
        }
        *output = address;
    }
    scanner.expect(')')?;

    genome.find_active();
    Ok(genome)
}
