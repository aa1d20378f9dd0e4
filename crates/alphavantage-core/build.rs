use std::env;
use std::fs;
use std::path::PathBuf;

use alphavantage_codegen::{render, Corpus, CATALOGUE_FILE};

fn main() {
    let manifest_dir =
        PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("cargo sets CARGO_MANIFEST_DIR"));
    let spec_dir = manifest_dir.join("spec");
    println!("cargo:rerun-if-changed={}", spec_dir.display());

    let corpus = Corpus::load(&spec_dir)
        .unwrap_or_else(|error| panic!("invalid specification corpus: {error}"));
    let source =
        render(&corpus).unwrap_or_else(|error| panic!("failed to render catalogue: {error}"));

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    fs::write(out_dir.join(CATALOGUE_FILE), source)
        .unwrap_or_else(|error| panic!("failed to write catalogue: {error}"));
}
