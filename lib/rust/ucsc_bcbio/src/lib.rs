//! Run the bcbio-nextgen variant calling pipeline from a container.
//!
//! The wrapper stages what bcbio needs (the GATK archive, reference data
//! linked under the biodata mount, and a project YAML), runs
//! `bcbio_nextgen.py`, and collects its outputs into the output directory.
#![deny(future_incompatible, nonstandard_style, rust_2018_idioms)]

pub mod cli;
pub mod collect;
pub mod errors;
pub mod gatk;
pub mod invoke;
pub mod logging;
pub mod project;
pub mod reference;
pub mod run_config;
pub mod settings;
pub mod system;
pub mod utils;
pub mod workflow;

use anyhow::{Context, Result};
use invoke::{PipelineCommand, Runner};
use log::{info, warn};
use run_config::RunConfig;
use settings::Settings;
use std::process::ExitStatus;

/// The command that runs the project YAML through bcbio.
pub fn bcbio_command(config: &RunConfig, settings: &Settings) -> PipelineCommand {
    PipelineCommand::new(&settings.bcbio_exe)
        .arg(config.project_yaml())
        .arg("-n")
        .arg(config.num_cores.to_string())
        .envs(settings.child_env())
        .current_dir(config.work_dir())
}

/// Stage everything bcbio needs, run it, and collect its outputs.
/// Returns bcbio's exit status; outputs are only collected when it succeeds.
pub fn run(config: &RunConfig, settings: &Settings, runner: &mut dyn Runner) -> Result<ExitStatus> {
    info!("running {} as {}", config.workflows(), config.run_name());
    for dir in [config.work_dir(), config.output_dir().to_path_buf()] {
        std::fs::create_dir_all(&dir).with_context(|| dir.display().to_string())?;
    }

    gatk::register_gatk(&config.gatk_file, settings, runner)?;
    reference::resolve_reference(config, settings, runner)?;
    project::write_project(config, settings)?;

    let status = runner.run(&bcbio_command(config, settings))?;
    if !status.success() {
        warn!("bcbio failed ({status}), not collecting outputs");
        return Ok(status);
    }

    if config.dry() {
        info!("dry run, not collecting outputs");
    } else {
        collect::collect_run_outputs(config, settings)?;
    }
    Ok(status)
}
