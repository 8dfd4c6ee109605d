use super::catalog::PackageCatalog;
use crate::types::{PkgId, PkgMeta, PkgRelation, RequirementGroup, VersionRange};
use crate::{debug, warn};

use clap::ValueEnum;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// How mandatory packages are turned into requirements
#[derive(Deserialize, ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MandatoryPolicy {
    /// Exactly the version found in the repository
    Exact,
    /// The version found in the repository, or anything newer
    Newest,
}

#[derive(Debug, Default)]
pub struct Resolution {
    /// Selected packages, in the order they were picked
    pub packages: Vec<Arc<PkgMeta>>,
    /// Requirement groups no catalog could satisfy
    pub unresolved: Vec<RequirementGroup>,
}

/// Catalogs ordered by priority. Lower priority keys are consulted first.
#[derive(Default, Debug)]
pub struct DependencyForest {
    catalogs: BTreeMap<i64, PackageCatalog>,
}

impl DependencyForest {
    pub fn new() -> Self {
        DependencyForest::default()
    }

    /// Get the catalog at this priority, creating it if needed.
    /// Repositories sharing a priority share one catalog.
    pub fn add_tree(&mut self, priority: i64) -> &mut PackageCatalog {
        self.catalogs.entry(priority).or_default()
    }

    pub fn catalogs(&self) -> impl Iterator<Item = (&i64, &PackageCatalog)> + '_ {
        self.catalogs.iter()
    }

    /// Find the best package for a relation.
    ///
    /// The first catalog that has any match decides, and within it the
    /// highest version wins. Later catalogs are never consulted, even if
    /// they hold a higher version.
    pub fn find(&self, relation: &PkgRelation) -> Option<&Arc<PkgMeta>> {
        self.catalogs
            .values()
            .find_map(|catalog| catalog.find(&relation.name, &relation.range))
    }

    /// One requirement per mandatory package of every catalog
    pub fn mandatory_requirements(&self, policy: MandatoryPolicy) -> Vec<RequirementGroup> {
        let mut res = Vec::new();
        for catalog in self.catalogs.values() {
            for pkg in catalog.mandatory_packages() {
                let range = match policy {
                    MandatoryPolicy::Exact => VersionRange::Eq(pkg.version.clone()),
                    MandatoryPolicy::Newest => VersionRange::Ge(pkg.version.clone()),
                };
                res.push(RequirementGroup::single(PkgRelation::new(&pkg.name, range)));
            }
        }
        res
    }

    /// Compute the transitive closure of `requirements`.
    ///
    /// Each constraint is resolved on its own and the results are unioned;
    /// two constraints on the same name may select two versions of it.
    /// Unresolvable groups are reported but don't stop the resolution.
    pub fn resolve<'a>(&'a self, requirements: &'a [RequirementGroup]) -> Resolution {
        let mut res = Resolution::default();
        let mut resolved: HashSet<PkgId> = HashSet::new();
        let mut unresolved: HashSet<&RequirementGroup> = HashSet::new();
        let mut stack: Vec<&'a [RequirementGroup]> = vec![requirements];

        while let Some(groups) = stack.pop() {
            for group in groups {
                if unresolved.contains(group) {
                    continue;
                }
                let candidate = group
                    .iter()
                    .find_map(|rel| self.find(rel).map(|pkg| (rel, pkg)));
                match candidate {
                    Some((rel, pkg)) => {
                        if resolved.insert(pkg.id()) {
                            debug!("Picked {} for {}", pkg, rel);
                            res.packages.push(pkg.clone());
                            stack.push(&pkg.requires);
                        }
                    }
                    None => {
                        warn!("Unresolved relation: {}", group);
                        unresolved.insert(group);
                        res.unresolved.push(group.clone());
                    }
                }
            }
        }

        res
    }
}
