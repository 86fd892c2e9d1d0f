use crate::run_config::RunConfig;
use crate::settings::Settings;
use anyhow::{Context, Result};
use glob::{glob, Pattern};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Link `src` to `dest`, copying when a hard link is not possible,
/// e.g. across filesystems. An existing `dest` is replaced.
fn link_or_copy(src: &Path, dest: &Path) -> Result<()> {
    if dest.symlink_metadata().is_ok() {
        std::fs::remove_file(dest).with_context(|| dest.display().to_string())?;
    }
    if let Err(err) = std::fs::hard_link(src, dest) {
        debug!("hard link {} failed ({err}), copying", dest.display());
        std::fs::copy(src, dest)
            .with_context(|| format!("copying {} to {}", src.display(), dest.display()))?;
    }
    Ok(())
}

/// Collect the files under `upload_dir` matching any of `patterns` into
/// `output_dir`, keeping their paths relative to `upload_dir`.
/// Returns the collected files in `output_dir`.
pub fn collect_outputs(
    upload_dir: &Path,
    output_dir: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>> {
    if !upload_dir.is_dir() {
        warn!("bcbio upload directory {} does not exist", upload_dir.display());
        return Ok(Vec::new());
    }
    let root = upload_dir
        .to_str()
        .with_context(|| format!("{} is not valid UTF-8", upload_dir.display()))?;
    let root = Pattern::escape(root);

    let mut matches = BTreeSet::new();
    for pattern in patterns {
        let full = format!("{root}/{pattern}");
        for entry in glob(&full).with_context(|| format!("invalid output pattern {pattern}"))? {
            let path = entry?;
            if path.is_file() {
                matches.insert(path);
            }
        }
    }

    std::fs::create_dir_all(output_dir).with_context(|| output_dir.display().to_string())?;
    let mut collected = Vec::with_capacity(matches.len());
    for src in matches {
        let dest = output_dir.join(src.strip_prefix(upload_dir)?);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).with_context(|| parent.display().to_string())?;
        }
        link_or_copy(&src, &dest)?;
        collected.push(dest);
    }
    info!(
        "collected {} files into {}",
        collected.len(),
        output_dir.display()
    );
    Ok(collected)
}

/// Collect a finished run's outputs, and the project YAML it ran, into the output directory.
pub fn collect_run_outputs(config: &RunConfig, settings: &Settings) -> Result<Vec<PathBuf>> {
    let mut collected =
        collect_outputs(&config.upload_dir(), &config.output_dir, &settings.output_globs)?;
    let project = config.project_yaml();
    if let Some(name) = project.file_name() {
        let dest = config.output_dir.join(name);
        std::fs::copy(&project, &dest)
            .with_context(|| format!("copying {} to {}", project.display(), dest.display()))?;
        collected.push(dest);
    }
    Ok(collected)
}
