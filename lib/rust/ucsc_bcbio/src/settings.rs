//! Explicit configuration for the parts of the container environment the
//! wrapper depends on. Everything here has a default that matches the
//! `bcbio/bcbio` image, and a `settings.toml` overrides individual keys.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File name looked up next to the running executable when `--settings` is not given.
pub const SETTINGS_FILE_NAME: &str = "settings.toml";

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Directory inside the container where bcbio expects `galaxy` and `genomes`.
    pub biodata_mount: PathBuf,
    /// Large scratch directory exported to every child process as TMPDIR.
    /// Reference data alone can exceed 15GB.
    pub tmp_dir: Option<PathBuf>,
    /// The bcbio pipeline executable.
    pub bcbio_exe: String,
    /// The bcbio helper that installs a GATK archive into the container.
    pub gatk_register_exe: String,
    /// Where `gatk-register` installs GATK. A populated directory skips registration.
    pub gatk_install_dir: PathBuf,
    /// Genome build passed to bcbio for both download and analysis.
    pub genome_build: String,
    /// Aligner indices to download and the aligner used by the analysis.
    pub aligner: String,
    /// Glob patterns, relative to the bcbio upload directory, of the files to collect.
    pub output_globs: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            biodata_mount: PathBuf::from("/mnt/biodata"),
            tmp_dir: None,
            bcbio_exe: "bcbio_nextgen.py".to_string(),
            gatk_register_exe: "gatk-register".to_string(),
            gatk_install_dir: PathBuf::from("/tmp/gatk"),
            genome_build: "GRCh37".to_string(),
            aligner: "bwa".to_string(),
            output_globs: vec!["**/*".to_string()],
        }
    }
}

macro_rules! warn_non_default {
    ($settings:expr, $defaults:expr, $($field:ident),+) => {
        $(
            if $settings.$field != $defaults.$field {
                warn!("using non-default {} = {:?}", stringify!($field), $settings.$field);
            }
        )+
    };
}

impl Settings {
    /// Load settings from `path`, or from `settings.toml` next to the running
    /// executable, falling back to the defaults when neither exists.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let settings = match path {
            Some(path) => Settings::from_file(path)?,
            None => {
                let beside_exe = std::env::current_exe()
                    .context("Unable to locate the running executable")?
                    .with_file_name(SETTINGS_FILE_NAME);
                if beside_exe.exists() {
                    Settings::from_file(&beside_exe)?
                } else {
                    info!(
                        "could not find {} at {}, using default settings",
                        SETTINGS_FILE_NAME,
                        beside_exe.display()
                    );
                    Settings::default()
                }
            }
        };
        settings.warn_non_default();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Settings> {
        let s = std::fs::read_to_string(path).with_context(|| path.display().to_string())?;
        Settings::from_toml(&s).with_context(|| path.display().to_string())
    }

    pub fn from_toml(s: &str) -> Result<Settings> {
        Ok(toml::from_str(s)?)
    }

    fn warn_non_default(&self) {
        let defaults = Settings::default();
        warn_non_default!(
            self,
            defaults,
            biodata_mount,
            tmp_dir,
            bcbio_exe,
            gatk_register_exe,
            gatk_install_dir,
            genome_build,
            aligner,
            output_globs
        );
    }

    /// Environment variables every child process is started with.
    pub fn child_env(&self) -> Vec<(String, PathBuf)> {
        self.tmp_dir
            .iter()
            .map(|dir| ("TMPDIR".to_string(), dir.clone()))
            .collect()
    }

    pub fn galaxy_mount(&self) -> PathBuf {
        self.biodata_mount.join("galaxy")
    }

    pub fn genomes_mount(&self) -> PathBuf {
        self.biodata_mount.join("genomes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_empty_toml_is_default() -> Result<()> {
        assert_eq!(Settings::from_toml("")?, Settings::default());
        Ok(())
    }

    #[test]
    fn test_partial_override() -> Result<()> {
        let settings = Settings::from_toml(
            r#"
            biodata_mount = "/scratch/biodata"
            tmp_dir = "/scratch/tmp"
            output_globs = ["**/*.vcf.gz", "**/*.bam"]
            "#,
        )?;
        assert_eq!(settings.biodata_mount, PathBuf::from("/scratch/biodata"));
        assert_eq!(settings.galaxy_mount(), PathBuf::from("/scratch/biodata/galaxy"));
        assert_eq!(settings.genomes_mount(), PathBuf::from("/scratch/biodata/genomes"));
        assert_eq!(settings.output_globs, vec!["**/*.vcf.gz", "**/*.bam"]);
        assert_eq!(settings.bcbio_exe, "bcbio_nextgen.py");
        assert_eq!(
            settings.child_env(),
            vec![("TMPDIR".to_string(), PathBuf::from("/scratch/tmp"))]
        );
        Ok(())
    }

    #[test]
    fn test_no_tmpdir_means_no_env() {
        assert!(Settings::default().child_env().is_empty());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(Settings::from_toml("biodata = \"/x\"").is_err());
    }

    #[test]
    fn test_load_explicit_path() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "genome_build = \"hg38\"\n")?;
        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.genome_build, "hg38");
        assert_eq!(settings.aligner, "bwa");

        let missing = dir.path().join("missing.toml");
        let err = Settings::load(Some(&missing)).unwrap_err();
        assert!(err.to_string().contains("missing.toml"), "{err}");
        Ok(())
    }
}
