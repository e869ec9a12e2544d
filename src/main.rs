// CLI binary entry point for tagscout

mod cli;

use clap::Parser;
use std::process;

fn main() {
    lovely_env_logger::init_default();
    let config = cli::Config::parse();

    if let Err(e) = cli::run(config) {
        eprintln!("✗ {:#}", e);
        process::exit(1);
    }
}
