use super::load_forest;
use crate::{config::Config, info, success, types::PkgMeta, warn};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Check the package files of mirrored repositories against their indexes
pub fn verify(config: &Config) -> Result<()> {
    let forest = load_forest(config)?;
    let targets: Vec<(&Arc<PkgMeta>, PathBuf)> = forest
        .catalogs()
        .flat_map(|(_, catalog)| catalog.iter())
        .filter_map(|pkg| {
            let mirror = pkg.repository.as_ref()?.mirror.as_ref()?;
            Some((pkg, mirror.join(&pkg.filename)))
        })
        .collect();
    if targets.is_empty() {
        info!("No mirrored repository to verify.");
        return Ok(());
    }

    info!("Verifying {} package files...", targets.len());
    let failures = check_all(&targets);
    for failure in &failures {
        warn!("{}", failure);
    }
    if !failures.is_empty() {
        bail!(
            "{} of {} package files failed verification",
            failures.len(),
            targets.len()
        );
    }

    success!("All {} package files are intact.", targets.len());
    Ok(())
}

fn check_all(targets: &[(&Arc<PkgMeta>, PathBuf)]) -> Vec<String> {
    targets
        .par_iter()
        .filter_map(|(pkg, path)| {
            check_file(pkg, path)
                .err()
                .map(|e| format!("{}: {:#}", pkg, e))
        })
        .collect()
}

fn check_file(pkg: &PkgMeta, path: &Path) -> Result<()> {
    let meta = fs::metadata(path).with_context(|| format!("{} is missing", path.display()))?;
    if let Some(size) = pkg.size {
        if meta.len() != size {
            bail!("size mismatch: expected {}, found {}", size, meta.len());
        }
    }
    if let Some(checksum) = &pkg.checksum {
        if !checksum.matches_file(path)? {
            bail!("checksum mismatch for {}", path.display());
        }
    }
    Ok(())
}
