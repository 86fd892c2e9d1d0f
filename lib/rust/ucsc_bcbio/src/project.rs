//! Render the bcbio project YAML for the selected workflows.

use crate::run_config::RunConfig;
use crate::settings::Settings;
use crate::workflow::Workflow;
use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

const GERMLINE_TEMPLATE: &str = "germline.yaml";
const SOMATIC_TEMPLATE: &str = "somatic.yaml";

#[derive(Serialize)]
struct SampleContext {
    description: String,
    files: Vec<String>,
    phenotype: &'static str,
}

#[derive(Serialize)]
struct ProjectContext {
    run_name: String,
    genome_build: String,
    aligner: String,
    work_dir: String,
    upload_dir: String,
    bed_file: Option<String>,
    structural_variants: bool,
    normal_files: Vec<String>,
    samples: Vec<SampleContext>,
}

fn path_strings(paths: &[PathBuf]) -> Vec<String> {
    paths.iter().map(|p| p.display().to_string()).collect()
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

impl ProjectContext {
    fn new(config: &RunConfig, settings: &Settings) -> ProjectContext {
        let normal_files = path_strings(config.inputs.normal_germline());
        let samples = if config.workflows.is_somatic() {
            vec![
                SampleContext {
                    description: format!("{}-normal", config.run_name),
                    files: normal_files.clone(),
                    phenotype: "normal",
                },
                SampleContext {
                    description: format!("{}-tumor", config.run_name),
                    files: path_strings(config.inputs.tumor()),
                    phenotype: "tumor",
                },
            ]
        } else {
            Vec::new()
        };
        ProjectContext {
            run_name: config.run_name.clone(),
            genome_build: settings.genome_build.clone(),
            aligner: settings.aligner.clone(),
            work_dir: path_string(&config.work_dir()),
            upload_dir: path_string(&config.upload_dir()),
            bed_file: config.bed_file.as_deref().map(path_string),
            structural_variants: config.workflows.structural_variants(),
            normal_files,
            samples,
        }
    }
}

/// Render the project YAML that bcbio_nextgen.py runs.
pub fn render_project(config: &RunConfig, settings: &Settings) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        (GERMLINE_TEMPLATE, include_str!("templates/germline.yaml")),
        (SOMATIC_TEMPLATE, include_str!("templates/somatic.yaml")),
    ])?;
    let template = match config.workflows.variant_calling() {
        Workflow::SomaticVariantCalling => SOMATIC_TEMPLATE,
        _ => GERMLINE_TEMPLATE,
    };
    let context = TeraContext::from_serialize(ProjectContext::new(config, settings))?;
    tera.render(template, &context)
        .with_context(|| format!("rendering the {} project", config.workflows))
}

/// Render the project YAML and write it where bcbio and the user can see it.
pub fn write_project(config: &RunConfig, settings: &Settings) -> Result<PathBuf> {
    let yaml = render_project(config, settings)?;
    debug!("bcbio project:\n{yaml}");
    let path = config.project_yaml();
    std::fs::write(&path, yaml).with_context(|| path.display().to_string())?;
    info!("wrote {} project to {}", config.workflows, path.display());
    Ok(path)
}
