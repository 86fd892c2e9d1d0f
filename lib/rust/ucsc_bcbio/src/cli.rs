use crate::reference::ReferenceDataSource;
use crate::run_config::{InputFileSet, RunConfig};
use crate::utils::{absolute_from, validate_run_name, ExistingPath};
use crate::workflow::{Workflow, WorkflowSelection};
use anyhow::Result;
use clap::{self, value_parser, Parser};
use std::path::{Path, PathBuf};

/// Run the bcbio-nextgen variant calling pipeline on a set of reads.
#[derive(Parser, Debug, Clone)]
#[clap(name = "ucsc_bcbio", version)]
pub struct UcscBcbio {
    /// Tumor reads for somatic variant calling, e.g. both files of a pair of
    /// paired end FASTQs. Multiple files can be given separated by spaces.
    #[clap(short = 't', long = "tumor_input", num_args = 1.., value_name = "FILE")]
    pub tumor_input: Vec<ExistingPath>,

    /// Normal reads for somatic variant calling, or the sample's reads for
    /// germline variant calling. Multiple files can be given separated by spaces.
    #[clap(
        short = 'n',
        long = "normal_germline_input",
        num_args = 1..,
        value_name = "FILE"
    )]
    pub normal_germline_input: Vec<ExistingPath>,

    /// Number of cores bcbio uses for processing.
    #[clap(
        short = 'c',
        long = "num_cores",
        default_value_t = 16,
        value_parser = value_parser!(u32).range(1..)
    )]
    pub num_cores: u32,

    /// Path to the GATK archive, e.g. /path/to/GenomeAnalysisTK.tar.bz2.
    #[clap(short = 'g', long = "GATK_file", value_name = "PATH")]
    pub gatk_file: ExistingPath,

    /// Workflow to run: germline-variant-calling, somatic-variant-calling or
    /// structural-variant-calling. May be given more than once; structural
    /// variant calling must be combined with one of the others.
    #[clap(short = 'W', long = "workflow", required = true, value_name = "NAME")]
    pub workflow: Vec<Workflow>,

    /// BED file of the targeted regions, for whole exome sequencing.
    #[clap(short = 'b', long = "WES_bed_file", value_name = "PATH")]
    pub bed_file: Option<ExistingPath>,

    /// Also run structural variant calling.
    #[clap(short = 's', long = "include_sv")]
    pub include_sv: bool,

    /// Name of the run, used for sample descriptions and batches [a-zA-Z0-9_-]+.
    #[clap(
        short = 'r',
        long = "run_name",
        default_value = "ucsc_bcbio",
        value_parser = validate_run_name
    )]
    pub run_name: String,

    /// Directory where the reference data is, or should be downloaded to.
    #[clap(
        short = 'd',
        long = "data_dir",
        value_name = "DIR",
        conflicts_with = "data_file"
    )]
    pub data_dir: Option<PathBuf>,

    /// Tarball of a reference data directory.
    #[clap(short = 'f', long = "data_file", value_name = "TAR")]
    pub data_file: Option<ExistingPath>,

    /// Directory the output files are collected into. Defaults to ./final.
    #[clap(short = 'o', long = "output_dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Settings file for the container environment.
    /// Defaults to settings.toml next to the executable.
    #[clap(long, value_name = "TOML")]
    pub settings: Option<ExistingPath>,

    /// Do not execute the pipeline.
    /// Stage the reference data, write the project YAML, and print the commands that would run.
    #[clap(long)]
    pub dry: bool,

    /// Log debug messages.
    #[clap(short = 'v', long)]
    pub verbose: bool,
}

impl UcscBcbio {
    /// Validate the arguments into a run rooted at `cwd`.
    pub fn to_run_config(&self, cwd: &Path) -> Result<RunConfig> {
        let workflows = WorkflowSelection::new(self.workflow.iter().copied(), self.include_sv)?;
        let inputs = InputFileSet::new(
            self.tumor_input.iter().cloned().map(PathBuf::from).collect(),
            self.normal_germline_input
                .iter()
                .cloned()
                .map(PathBuf::from)
                .collect(),
        );
        inputs.validate_for(&workflows)?;

        let reference = ReferenceDataSource::from_args(
            self.data_dir.as_deref().map(|dir| absolute_from(cwd, dir)),
            self.data_file.clone().map(PathBuf::from),
        )?;
        let output_dir = match &self.output_dir {
            Some(dir) => absolute_from(cwd, dir),
            None => cwd.join("final"),
        };

        Ok(RunConfig {
            run_name: self.run_name.clone(),
            inputs,
            reference,
            workflows,
            num_cores: self.num_cores,
            bed_file: self.bed_file.clone().map(PathBuf::from),
            gatk_file: self.gatk_file.clone().into(),
            working_dir: cwd.to_path_buf(),
            output_dir,
            dry: self.dry,
        })
    }
}
