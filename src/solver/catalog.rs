use super::index::VersionIndex;
use crate::types::{PkgMeta, PkgRelation, PkgVersion, RequirementGroup, VersionRange};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// The package that declared a provide or obsolete
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct OwnerKey {
    pub name: String,
    pub version: PkgVersion,
}

/// virtual name -> (owner -> declared relation)
type RelationIndex = BTreeMap<String, BTreeMap<OwnerKey, PkgRelation>>;

/// All indexes over the packages of one repository
#[derive(Default, Debug)]
pub struct PackageCatalog {
    packages: VersionIndex,
    provides: RelationIndex,
    obsoletes: RelationIndex,
    mandatory: Vec<Arc<PkgMeta>>,
}

impl PackageCatalog {
    pub fn new() -> Self {
        PackageCatalog::default()
    }

    pub fn add(&mut self, pkg: PkgMeta) {
        let pkg = Arc::new(pkg);
        if pkg.mandatory {
            self.mandatory.push(pkg.clone());
        }

        let key = OwnerKey {
            name: pkg.name.clone(),
            version: pkg.version.clone(),
        };
        for obsolete in &pkg.obsoletes {
            self.obsoletes
                .entry(obsolete.name.clone())
                .or_default()
                .insert(key.clone(), obsolete.clone());
        }
        for provide in &pkg.provides {
            self.provides
                .entry(provide.name.clone())
                .or_default()
                .insert(key.clone(), provide.clone());
        }

        self.packages.add(pkg);
    }

    /// Find all packages satisfying `name` and `range`, in ascending version order.
    ///
    /// A name that is a real package never falls back to provides or obsoletes,
    /// even if none of its versions is acceptable.
    pub fn find_all(&self, name: &str, range: &VersionRange) -> Vec<&Arc<PkgMeta>> {
        if self.packages.contains(name) {
            return self.packages.find_all(name, range);
        }

        if let Some(relations) = self.obsoletes.get(name) {
            return self.resolve_relation(relations, range);
        }

        if let Some(relations) = self.provides.get(name) {
            return self.resolve_relation(relations, range);
        }

        Vec::new()
    }

    /// The highest version satisfying `name` and `range`
    pub fn find(&self, name: &str, range: &VersionRange) -> Option<&Arc<PkgMeta>> {
        self.find_all(name, range).pop()
    }

    /// Requirement groups of this catalog's packages that can't be satisfied
    /// by this catalog alone
    pub fn get_unresolved(&self) -> Vec<RequirementGroup> {
        let mut seen = HashSet::new();
        let mut unresolved = Vec::new();
        for pkg in self.packages.iter() {
            for group in &pkg.requires {
                if seen.contains(group) {
                    continue;
                }
                let satisfied = group
                    .iter()
                    .any(|rel| self.find(&rel.name, &rel.range).is_some());
                if !satisfied {
                    seen.insert(group.clone());
                    unresolved.push(group.clone());
                }
            }
        }
        unresolved
    }

    pub fn mandatory_packages(&self) -> &[Arc<PkgMeta>] {
        &self.mandatory
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<PkgMeta>> + '_ {
        self.packages.iter()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    fn resolve_relation(
        &self,
        relations: &BTreeMap<OwnerKey, PkgRelation>,
        range: &VersionRange,
    ) -> Vec<&Arc<PkgMeta>> {
        let mut res: Vec<&Arc<PkgMeta>> = relations
            .iter()
            .filter(|(_, declared)| declared.range.intersects(range))
            .filter_map(|(owner, _)| self.packages.get(&owner.name, &owner.version))
            .collect();
        res.sort_by(|a, b| a.version.cmp(&b.version));
        res
    }
}
