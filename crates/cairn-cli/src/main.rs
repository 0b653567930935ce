use std::process;
use std::str::FromStr;

use clap::Parser;
use log::{debug, error, info, LevelFilter};

use cairn_cli::{args::Args, run};

fn main() {
    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level '{}', defaulting to 'warn'",
            args.log_level
        );
        LevelFilter::Warn
    });
    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting cairn");
    debug!(args:?; "Parsed arguments");

    if let Err(err) = run(&args) {
        error!(err:%; "Rendering failed");
        process::exit(1);
    }
}
