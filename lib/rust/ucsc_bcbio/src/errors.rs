use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Failures while staging reference data or tools for bcbio.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(
        "the reference data mount {0} is not writable; mount a writable volume there \
         or point biodata_mount at one in the settings file"
    )]
    MountNotWritable(PathBuf),

    #[error("{link} already exists and does not point at {target}")]
    LinkConflict { link: PathBuf, target: PathBuf },

    #[error("extracting reference data from {tarball} failed ({status})")]
    ExtractionFailed { tarball: PathBuf, status: ExitStatus },

    #[error("downloading reference data into {data_dir} failed ({status})")]
    DownloadFailed { data_dir: PathBuf, status: ExitStatus },

    #[error("registering the GATK archive {archive} failed ({status})")]
    GatkRegistrationFailed { archive: PathBuf, status: ExitStatus },
}
