mod packages;
mod table;
mod unresolved;
mod verify;

use crate::{
    config::{Config, Opts, SubCmd},
    info,
    solver::{DependencyForest, PackageCatalog},
    source,
};

use anyhow::{Context, Result};

pub fn fulfill_command(config: &Config, opts: &Opts) -> Result<()> {
    match &opts.subcmd {
        SubCmd::Packages(cmd) => packages::packages(config, cmd),
        SubCmd::Unresolved => unresolved::unresolved(config),
        SubCmd::Verify => verify::verify(config),
    }
}

/// Load every configured repository into the forest, at its priority key
pub fn load_forest(config: &Config) -> Result<DependencyForest> {
    let mut forest = DependencyForest::new();
    for (name, repo_config) in config.repositories() {
        let (repo, driver) = source::open(name, repo_config);
        info!("Loading repository {}...", repo);
        let tree = forest.add_tree(repo.priority);
        source::load(&repo, driver.as_ref(), repo_config, &mut |pkg| tree.add(pkg))
            .with_context(|| format!("Failed to load repository {}", repo))?;
    }
    Ok(forest)
}

/// Load every configured repository into a single catalog
pub fn load_catalog(config: &Config) -> Result<PackageCatalog> {
    let mut catalog = PackageCatalog::new();
    for (name, repo_config) in config.repositories() {
        let (repo, driver) = source::open(name, repo_config);
        info!("Loading repository {}...", repo);
        source::load(&repo, driver.as_ref(), repo_config, &mut |pkg| catalog.add(pkg))
            .with_context(|| format!("Failed to load repository {}", repo))?;
    }
    Ok(catalog)
}
