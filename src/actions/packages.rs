use super::{load_forest, table};
use crate::{
    config::{Config, PackagesCmd, Requirements},
    info, success,
    solver::{DependencyForest, MandatoryPolicy},
    types::{PkgMeta, RequirementGroup},
    warn,
};

use anyhow::Result;
use std::sync::Arc;

pub fn packages(config: &Config, cmd: &PackagesCmd) -> Result<()> {
    let forest = load_forest(config)?;
    let requirements = match &cmd.requirements {
        Some(path) => Some(Requirements::from_file(path)?),
        None => None,
    };

    let pkgs = select(&forest, requirements.as_ref(), cmd.mandatory)?;
    table::show_packages(&mut std::io::stdout(), &pkgs)
}

/// Without requirements or a mandatory policy, everything is selected
fn select(
    forest: &DependencyForest,
    requirements: Option<&Requirements>,
    mandatory: Option<MandatoryPolicy>,
) -> Result<Vec<Arc<PkgMeta>>> {
    let mandatory = mandatory.or_else(|| requirements.and_then(|r| r.mandatory));
    if requirements.is_none() && mandatory.is_none() {
        info!("No requirements given, listing all packages...");
        return Ok(forest
            .catalogs()
            .flat_map(|(_, catalog)| catalog.iter().cloned())
            .collect());
    }

    let mut groups: Vec<RequirementGroup> = Vec::new();
    if let Some(requirements) = requirements {
        groups.extend(requirements.package_relations()?);
        let traversal = requirements.traversal()?;
        if !traversal.is_empty() {
            for (_, catalog) in forest.catalogs() {
                groups.extend(catalog.iter().filter_map(|pkg| traversal.visit(pkg)));
            }
        }
    }
    if let Some(policy) = mandatory {
        groups.extend(forest.mandatory_requirements(policy));
    }

    info!("Resolving {} requirements...", groups.len());
    let res = forest.resolve(&groups);
    if !res.unresolved.is_empty() {
        warn!(
            "{} requirements could not be resolved",
            res.unresolved.len()
        );
    }
    success!("Selected {} packages.", res.packages.len());
    Ok(res.packages)
}
