mod benchmark;
mod cli;
mod commands;
mod config;
mod corpus;
mod error;
mod evaluation;
mod model;
mod normalize;
mod reconcile;
mod retriever;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::RagError;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        let code = err
            .downcast_ref::<RagError>()
            .map(RagError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Manifest(args) => commands::manifest::run(args),
        Commands::Query(args) => commands::query::run(args),
        Commands::Eval(args) => commands::eval::run(args),
        Commands::Reconcile(args) => commands::reconcile::run(args),
        Commands::Status(args) => commands::status::run(args),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
