use crate::settings::Settings;
use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::{Context as TeraContext, Tera};

pub const BCBIO_SYSTEM_YAML: &str = "bcbio_system.yaml";

/// Cores written into bcbio_system.yaml when the machine's count is unknown.
const DEFAULT_CORE_COUNT: usize = 16;

#[derive(Serialize)]
struct SystemContext {
    core_count: usize,
    galaxy_config: String,
    tmp_dir: Option<String>,
}

fn machine_core_count() -> usize {
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(err) => {
            warn!("could not get the machine's core count ({err}), using {DEFAULT_CORE_COUNT}");
            DEFAULT_CORE_COUNT
        }
    }
}

fn render_system_yaml(settings: &Settings, core_count: usize) -> Result<String> {
    let mut tera = Tera::default();
    tera.add_raw_template(BCBIO_SYSTEM_YAML, include_str!("templates/bcbio_system.yaml"))?;
    let context = TeraContext::from_serialize(SystemContext {
        core_count,
        galaxy_config: format!("{}/", settings.galaxy_mount().display()),
        tmp_dir: settings
            .tmp_dir
            .as_ref()
            .map(|d| d.display().to_string()),
    })?;
    tera.render(BCBIO_SYSTEM_YAML, &context)
        .with_context(|| format!("rendering {BCBIO_SYSTEM_YAML}"))
}

/// Write bcbio_system.yaml into `galaxy_dir`, describing this machine's
/// resources to bcbio. Returns the path written.
pub fn write_system_yaml(galaxy_dir: &Path, settings: &Settings) -> Result<PathBuf> {
    let yaml = render_system_yaml(settings, machine_core_count())?;
    let path = galaxy_dir.join(BCBIO_SYSTEM_YAML);
    std::fs::write(&path, yaml).with_context(|| path.display().to_string())?;
    info!("wrote {}", path.display());
    Ok(path)
}
