//! Sordello CLI Binary
//!
//! Command-line interface for tracking and extracting Ableton Live sets.

use clap::Parser;
use sordello::cli::{exit_code, load_config, map_error, Cli, RunContext};
use sordello::config::SordelloConfig;
use sordello::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();
    let project_root = cli.command.project_root();

    let config = match load_config(&project_root, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    };

    let logging_config = build_logging_config(&cli, &config);
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(command = cli.command.name(), "Sordello CLI starting");

    let context = match RunContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error opening record store: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    }
}

/// CLI flags override the loaded configuration.
fn build_logging_config(cli: &Cli, config: &SordelloConfig) -> LoggingConfig {
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        logging.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        logging.output = output.clone();
    }
    logging
}
