//! Applies a serialized circuit to an image.
//!
//! Exit codes: 0 success, 1 I/O or argument failure, 2 malformed circuit
//! file, 3 circuit shape incompatible with this build's grid.

use std::path::PathBuf;

use clap::Parser;

use coco::fitness::filter_image;
use coco::genotype::circuit::format::{parse_compat, ParseError};
use coco::image::Image;

#[derive(Parser, Debug)]
#[command(
    name = "coco_apply",
    version,
    about = "Filters an image with an evolved CGP circuit"
)]
struct Options {
    /// Circuit filename (CGP-viewer compatible format).
    #[arg(long, short = 'c')]
    chromosome: PathBuf,

    /// Input image filename.
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Output image filename.
    #[arg(long, short = 'o')]
    output: PathBuf,
}

fn main() {
    env_logger::init();
    std::process::exit(run());
}

fn run() -> i32 {
    let options = Options::parse();

    let serialized = match std::fs::read_to_string(&options.chromosome) {
        Ok(serialized) => serialized,
        Err(error) => {
            eprintln!("failed to read the circuit file: {}", error);
            return 1;
        }
    };

    let genome = match parse_compat(&serialized) {
        Ok(genome) => genome,
        Err(error @ ParseError::Malformed(_)) => {
            eprintln!("{}", error);
            return 2;
        }
        Err(error @ ParseError::GridMismatch(_)) => {
            eprintln!("{}", error);
            return 3;
        }
    };

    let input = match Image::load(&options.input) {
        Ok(input) => input,
        Err(error) => {
            eprintln!("{}", error);
            return 1;
        }
    };

    let filtered = filter_image(&genome, &input);
    if let Err(error) = filtered.save_png(&options.output) {
        eprintln!("{}", error);
        return 1;
    }

    0
}
