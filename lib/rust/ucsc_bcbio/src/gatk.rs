use crate::errors::SetupError;
use crate::invoke::{PipelineCommand, Runner};
use crate::settings::Settings;
use crate::utils::is_populated;
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatkRegistration {
    /// The container's GATK directory was already populated.
    AlreadyInstalled,
    Registered,
}

/// Install the GATK archive into the container with bcbio's `gatk-register`,
/// unless GATK is already installed.
pub fn register_gatk(
    archive: &Path,
    settings: &Settings,
    runner: &mut dyn Runner,
) -> Result<GatkRegistration> {
    let install_dir = &settings.gatk_install_dir;
    if is_populated(install_dir).with_context(|| install_dir.display().to_string())? {
        warn!(
            "The container's GATK directory {} is not empty, skipping GATK install",
            install_dir.display()
        );
        return Ok(GatkRegistration::AlreadyInstalled);
    }

    let cmd = PipelineCommand::new(&settings.gatk_register_exe)
        .arg(archive)
        .envs(settings.child_env());
    let status = runner.run(&cmd)?;
    if !status.success() {
        return Err(SetupError::GatkRegistrationFailed {
            archive: archive.to_path_buf(),
            status,
        }
        .into());
    }
    info!("GATK file {} registered", archive.display());
    Ok(GatkRegistration::Registered)
}
