mod cli;
mod config;
mod engine;
mod git;
mod model;
mod recovery;
mod store;

use std::process;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
