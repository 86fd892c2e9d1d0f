//! Make bcbio's reference data available under the biodata mount.
//!
//! bcbio looks for its reference data in `<mount>/galaxy` and
//! `<mount>/genomes`. The data itself lives in a directory on the host,
//! either given by the user, extracted from a tarball, or downloaded by
//! bcbio, and the mount entries are symlinks into it.

use crate::errors::SetupError;
use crate::invoke::{PipelineCommand, Runner};
use crate::run_config::RunConfig;
use crate::settings::Settings;
use crate::system::{write_system_yaml, BCBIO_SYSTEM_YAML};
use crate::utils::is_populated;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Present in a data directory while a download into it has not finished.
const DOWNLOAD_IN_PROGRESS: &str = ".ucsc_bcbio_download_in_progress";

/// Where the reference data comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "path", rename_all = "lowercase")]
pub enum ReferenceDataSource {
    /// A directory that is used as-is when populated, and downloaded into when empty.
    Directory(PathBuf),
    /// A gzipped tarball of a bcbio data directory.
    Tarball(PathBuf),
    /// Download into the default data directory unless it is already populated.
    Download,
}

impl ReferenceDataSource {
    pub fn from_args(data_dir: Option<PathBuf>, data_file: Option<PathBuf>) -> Result<Self> {
        Ok(match (data_dir, data_file) {
            (Some(_), Some(_)) => bail!("--data_dir and --data_file cannot be used together"),
            (Some(dir), None) => ReferenceDataSource::Directory(dir),
            (None, Some(tarball)) => ReferenceDataSource::Tarball(tarball),
            (None, None) => ReferenceDataSource::Download,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    pub data_dir: PathBuf,
    pub downloaded: bool,
}

/// Stage the reference data for `config` and link it under the biodata mount.
pub fn resolve_reference(
    config: &RunConfig,
    settings: &Settings,
    runner: &mut dyn Runner,
) -> Result<ResolvedReference> {
    let data_dir = match &config.reference {
        ReferenceDataSource::Directory(dir) => dir.clone(),
        ReferenceDataSource::Tarball(_) | ReferenceDataSource::Download => {
            config.default_data_dir()
        }
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating reference data directory {}", data_dir.display()))?;

    let download = match &config.reference {
        ReferenceDataSource::Tarball(tarball) => {
            extract_tarball(tarball, &data_dir, settings, runner)?;
            false
        }
        ReferenceDataSource::Directory(_) | ReferenceDataSource::Download => {
            needs_download(&data_dir)?
        }
    };

    let galaxy = data_dir.join("galaxy");
    let genomes = data_dir.join("genomes");
    if download {
        prepare_download(&data_dir, settings, config.dry)?;
    } else {
        for dir in [&galaxy, &genomes] {
            if !dir.is_dir() {
                warn!(
                    "{} does not exist; {} may not be a bcbio data directory",
                    dir.display(),
                    data_dir.display()
                );
            }
        }
    }

    link_into_mount(&galaxy, &settings.galaxy_mount(), config.dry)?;
    link_into_mount(&genomes, &settings.genomes_mount(), config.dry)?;

    if download {
        download_reference(&data_dir, settings, runner, config.dry)?;
    }

    info!("bcbio reference data dir: {}", data_dir.display());
    Ok(ResolvedReference {
        data_dir,
        downloaded: download,
    })
}

/// An empty data directory, or one holding an unfinished download, is downloaded into.
fn needs_download(data_dir: &Path) -> Result<bool> {
    if data_dir.join(DOWNLOAD_IN_PROGRESS).exists() {
        warn!(
            "the previous download into {} did not finish, downloading again",
            data_dir.display()
        );
        return Ok(true);
    }
    let populated =
        is_populated(data_dir).with_context(|| format!("reading {}", data_dir.display()))?;
    if populated {
        info!(
            "reference data directory {} is not empty, skipping download",
            data_dir.display()
        );
    }
    Ok(!populated)
}

/// Mark the download as started and lay out the directories bcbio fills in.
fn prepare_download(data_dir: &Path, settings: &Settings, dry: bool) -> Result<()> {
    let galaxy = data_dir.join("galaxy");
    let genomes = data_dir.join("genomes");
    if dry {
        info!(
            "would create {} and {} with {}",
            galaxy.display(),
            genomes.display(),
            BCBIO_SYSTEM_YAML
        );
        return Ok(());
    }
    let marker = data_dir.join(DOWNLOAD_IN_PROGRESS);
    std::fs::write(&marker, "").with_context(|| marker.display().to_string())?;
    for dir in [&galaxy, &genomes] {
        std::fs::create_dir_all(dir).with_context(|| dir.display().to_string())?;
    }
    write_system_yaml(&galaxy, settings)?;
    Ok(())
}

fn extract_tarball(
    tarball: &Path,
    data_dir: &Path,
    settings: &Settings,
    runner: &mut dyn Runner,
) -> Result<()> {
    info!("extracting {} into {}", tarball.display(), data_dir.display());
    let cmd = PipelineCommand::new("tar")
        .arg("-xzf")
        .arg(tarball)
        .arg("-C")
        .arg(data_dir)
        .envs(settings.child_env());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(SetupError::ExtractionFailed {
            tarball: tarball.to_path_buf(),
            status,
        }
        .into());
    }
    Ok(())
}

fn download_reference(
    data_dir: &Path,
    settings: &Settings,
    runner: &mut dyn Runner,
    dry: bool,
) -> Result<()> {
    info!(
        "downloading {} reference data with {} indices into {}",
        settings.genome_build,
        settings.aligner,
        data_dir.display()
    );
    let cmd = PipelineCommand::new(&settings.bcbio_exe)
        .arg("upgrade")
        .arg("--data")
        .arg("--genomes")
        .arg(&settings.genome_build)
        .arg("--aligners")
        .arg(&settings.aligner)
        .envs(settings.child_env());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(SetupError::DownloadFailed {
            data_dir: data_dir.to_path_buf(),
            status,
        }
        .into());
    }
    if !dry {
        let marker = data_dir.join(DOWNLOAD_IN_PROGRESS);
        std::fs::remove_file(&marker).with_context(|| marker.display().to_string())?;
    }
    Ok(())
}

/// Create the symlink `link` -> `target`. A link that already points at
/// `target` is left alone; anything else at `link` is a conflict.
fn link_into_mount(target: &Path, link: &Path, dry: bool) -> Result<()> {
    match link.symlink_metadata() {
        Ok(meta) if meta.file_type().is_symlink() => {
            let existing = std::fs::read_link(link).with_context(|| link.display().to_string())?;
            if existing == target {
                debug!("{} already points at {}", link.display(), target.display());
                return Ok(());
            }
            return Err(conflict(link, target));
        }
        Ok(_) => return Err(conflict(link, target)),
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(err).with_context(|| link.display().to_string()),
    }

    if dry {
        info!("would link {} -> {}", link.display(), target.display());
        return Ok(());
    }

    if let Some(mount) = link.parent() {
        std::fs::create_dir_all(mount).map_err(|err| not_writable(err, mount))?;
    }
    std::os::unix::fs::symlink(target, link).map_err(|err| match link.parent() {
        Some(mount) => not_writable(err, mount),
        None => anyhow::Error::new(err),
    })?;
    info!("linked {} -> {}", link.display(), target.display());
    Ok(())
}

fn conflict(link: &Path, target: &Path) -> anyhow::Error {
    SetupError::LinkConflict {
        link: link.to_path_buf(),
        target: target.to_path_buf(),
    }
    .into()
}

fn not_writable(err: std::io::Error, mount: &Path) -> anyhow::Error {
    let read_only = err.raw_os_error() == Some(libc::EROFS);
    if read_only || err.kind() == ErrorKind::PermissionDenied {
        SetupError::MountNotWritable(mount.to_path_buf()).into()
    } else {
        anyhow::Error::new(err).context(mount.display().to_string())
    }
}
