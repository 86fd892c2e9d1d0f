use crate::reference::ReferenceDataSource;
use crate::workflow::{Workflow, WorkflowSelection};
use anyhow::{ensure, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Read files for one run, in the order they were given.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InputFileSet {
    pub(crate) tumor: Vec<PathBuf>,
    pub(crate) normal_germline: Vec<PathBuf>,
}

impl InputFileSet {
    pub fn new(tumor: Vec<PathBuf>, normal_germline: Vec<PathBuf>) -> InputFileSet {
        InputFileSet {
            tumor,
            normal_germline,
        }
    }

    pub fn tumor(&self) -> &[PathBuf] {
        &self.tumor
    }

    pub fn normal_germline(&self) -> &[PathBuf] {
        &self.normal_germline
    }

    /// Check that the inputs are the ones the selected variant calling needs.
    pub fn validate_for(&self, workflows: &WorkflowSelection) -> Result<()> {
        match workflows.variant_calling() {
            Workflow::SomaticVariantCalling => {
                ensure!(
                    !self.tumor.is_empty(),
                    "{} requires tumor reads, given with --tumor_input",
                    Workflow::SomaticVariantCalling
                );
                ensure!(
                    !self.normal_germline.is_empty(),
                    "{} requires matched normal reads, given with --normal_germline_input",
                    Workflow::SomaticVariantCalling
                );
            }
            Workflow::GermlineVariantCalling => {
                ensure!(
                    !self.normal_germline.is_empty(),
                    "{} requires sample reads, given with --normal_germline_input",
                    Workflow::GermlineVariantCalling
                );
                ensure!(
                    self.tumor.is_empty(),
                    "--tumor_input cannot be used with {}",
                    Workflow::GermlineVariantCalling
                );
            }
            Workflow::StructuralVariantCalling => {}
        }
        Ok(())
    }
}

/// Everything one invocation needs, validated up front and not changed afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub(crate) run_name: String,
    pub(crate) inputs: InputFileSet,
    pub(crate) reference: ReferenceDataSource,
    pub(crate) workflows: WorkflowSelection,
    pub(crate) num_cores: u32,
    pub(crate) bed_file: Option<PathBuf>,
    pub(crate) gatk_file: PathBuf,
    pub(crate) working_dir: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) dry: bool,
}

impl RunConfig {
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn workflows(&self) -> &WorkflowSelection {
        &self.workflows
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn dry(&self) -> bool {
        self.dry
    }

    /// Directory bcbio runs in and keeps its intermediate files.
    pub fn work_dir(&self) -> PathBuf {
        self.working_dir.join("work")
    }

    /// Directory bcbio uploads its final files to, before they are collected.
    pub fn upload_dir(&self) -> PathBuf {
        self.work_dir().join("upload")
    }

    /// Reference data directory used for tarball extraction and downloads.
    pub fn default_data_dir(&self) -> PathBuf {
        self.working_dir.join("data")
    }

    pub fn project_yaml(&self) -> PathBuf {
        self.working_dir.join("bcbio_project.yaml")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// A germline or somatic run rooted at `working_dir`, downloading its reference data.
    pub(crate) fn test_config(working_dir: &Path, workflows: WorkflowSelection) -> RunConfig {
        let tumor = if workflows.is_somatic() {
            vec![
                working_dir.join("tumor_1.fq.gz"),
                working_dir.join("tumor_2.fq.gz"),
            ]
        } else {
            Vec::new()
        };
        RunConfig {
            run_name: "syn3".to_string(),
            inputs: InputFileSet::new(
                tumor,
                vec![
                    working_dir.join("normal_1.fq.gz"),
                    working_dir.join("normal_2.fq.gz"),
                ],
            ),
            reference: ReferenceDataSource::Download,
            workflows,
            num_cores: 4,
            bed_file: None,
            gatk_file: working_dir.join("GenomeAnalysisTK.tar.bz2"),
            working_dir: working_dir.to_path_buf(),
            output_dir: working_dir.join("final"),
            dry: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Workflow::{GermlineVariantCalling, SomaticVariantCalling};

    fn files(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_somatic_needs_both_inputs() -> Result<()> {
        let somatic = WorkflowSelection::new([SomaticVariantCalling], false)?;
        assert!(InputFileSet::new(files(&["t.fq"]), files(&["n.fq"]))
            .validate_for(&somatic)
            .is_ok());
        assert!(InputFileSet::new(Vec::new(), files(&["n.fq"]))
            .validate_for(&somatic)
            .is_err());
        assert!(InputFileSet::new(files(&["t.fq"]), Vec::new())
            .validate_for(&somatic)
            .is_err());
        Ok(())
    }

    #[test]
    fn test_germline_rejects_tumor_input() -> Result<()> {
        let germline = WorkflowSelection::new([GermlineVariantCalling], true)?;
        assert!(InputFileSet::new(Vec::new(), files(&["s_1.fq", "s_2.fq"]))
            .validate_for(&germline)
            .is_ok());
        assert!(InputFileSet::new(Vec::new(), Vec::new())
            .validate_for(&germline)
            .is_err());
        let err = InputFileSet::new(files(&["t.fq"]), files(&["s.fq"]))
            .validate_for(&germline)
            .unwrap_err();
        assert!(err.to_string().contains("--tumor_input"), "{err}");
        Ok(())
    }

    #[test]
    fn test_derived_directories() -> Result<()> {
        let config = testing::test_config(
            Path::new("/runs/a"),
            WorkflowSelection::new([GermlineVariantCalling], false)?,
        );
        assert_eq!(config.work_dir(), Path::new("/runs/a/work"));
        assert_eq!(config.upload_dir(), Path::new("/runs/a/work/upload"));
        assert_eq!(config.default_data_dir(), Path::new("/runs/a/data"));
        assert_eq!(config.project_yaml(), Path::new("/runs/a/bcbio_project.yaml"));
        Ok(())
    }
}
