//! ucsc_bcbio
#![deny(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::process::ExitCode;
use std::time::Instant;
use ucsc_bcbio::cli::UcscBcbio;
use ucsc_bcbio::invoke::{DryRunner, IntoExitCode, LocalRunner, Runner};
use ucsc_bcbio::logging::init_logging;
use ucsc_bcbio::settings::Settings;
use ucsc_bcbio::utils::print_error_chain;

fn inner_main() -> Result<ExitCode> {
    let start = Instant::now();
    let args = UcscBcbio::parse();
    init_logging(args.verbose);

    let settings = Settings::load(args.settings.as_deref())?;
    let cwd = std::env::current_dir().context("Unable to get the current directory")?;
    let config = args.to_run_config(&cwd)?;

    let mut local = LocalRunner;
    let mut dry = DryRunner::default();
    let runner: &mut dyn Runner = if config.dry() {
        println!("{}", serde_json::to_string_pretty(&config)?);
        &mut dry
    } else {
        &mut local
    };

    let status = ucsc_bcbio::run(&config, &settings, runner)?;
    if config.dry() {
        info!("dry run printed {} commands", dry.commands().len());
    }
    info!("----- {:.0} seconds -----", start.elapsed().as_secs_f64());
    Ok(status.into_exit_code())
}

fn main() -> ExitCode {
    match inner_main() {
        Ok(exit_code) => exit_code,
        Err(err) => {
            print_error_chain(&err);
            ExitCode::FAILURE
        }
    }
}
