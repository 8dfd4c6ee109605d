use crate::types::{PkgMeta, PkgVersion, RangeOp, VersionRange};

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

type Versions = BTreeMap<PkgVersion, Arc<PkgMeta>>;

/// Packages grouped by name, each group ordered by version
#[derive(Default, Debug)]
pub struct VersionIndex {
    packages: BTreeMap<String, Versions>,
}

impl VersionIndex {
    /// Insert a package, replacing any package of the same name and version
    pub fn add(&mut self, pkg: Arc<PkgMeta>) {
        let versions = self.packages.entry(pkg.name.clone()).or_default();
        // Drop the old key too, so the stored key always belongs to the stored package
        versions.remove(&pkg.version);
        versions.insert(pkg.version.clone(), pkg);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn get(&self, name: &str, version: &PkgVersion) -> Option<&Arc<PkgMeta>> {
        self.packages.get(name).and_then(|v| v.get(version))
    }

    /// All packages named `name` accepted by `range`, in ascending version order
    pub fn find_all(&self, name: &str, range: &VersionRange) -> Vec<&Arc<PkgMeta>> {
        let versions = match self.packages.get(name) {
            Some(v) => v,
            None => return Vec::new(),
        };

        match range {
            VersionRange::Any => versions.values().collect(),
            VersionRange::Eq(edge) => versions.get(edge).into_iter().collect(),
            VersionRange::Lt(edge) => up_to(versions, edge, RangeOp::Lt),
            VersionRange::Le(edge) => up_to(versions, edge, RangeOp::Le),
            VersionRange::Gt(edge) => starting_from(versions, edge, RangeOp::Gt),
            VersionRange::Ge(edge) => starting_from(versions, edge, RangeOp::Ge),
        }
    }

    /// Iterate over every package, by name then by version
    pub fn iter(&self) -> impl Iterator<Item = &Arc<PkgMeta>> + '_ {
        self.packages.values().flat_map(|v| v.values())
    }

    /// Number of stored packages, counting every version
    pub fn len(&self) -> usize {
        self.packages.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Everything below `edge`, plus the ceiling of `edge` if it passes `op`.
/// The ceiling may compare equal to an edge without release.
fn up_to<'a>(versions: &'a Versions, edge: &PkgVersion, op: RangeOp) -> Vec<&'a Arc<PkgMeta>> {
    let mut res: Vec<&Arc<PkgMeta>> = versions
        .range((Bound::Unbounded, Bound::Excluded(edge)))
        .map(|(_, pkg)| pkg)
        .collect();
    if let Some((ver, pkg)) = versions.range((Bound::Included(edge), Bound::Unbounded)).next() {
        if op.test(ver, edge) {
            res.push(pkg);
        }
    }
    res
}

/// The ceiling of `edge` if it passes `op`, then everything above it
fn starting_from<'a>(
    versions: &'a Versions,
    edge: &PkgVersion,
    op: RangeOp,
) -> Vec<&'a Arc<PkgMeta>> {
    let mut items = versions.range((Bound::Included(edge), Bound::Unbounded));
    let mut res = Vec::new();
    match items.next() {
        Some((ver, pkg)) => {
            if op.test(ver, edge) {
                res.push(pkg);
            }
        }
        None => return res,
    }
    res.extend(items.map(|(_, pkg)| pkg));
    res
}

#[cfg(test)]
mod test {
    use super::*;
    use std::convert::TryFrom;

    fn pkg(name: &str, version: &str) -> Arc<PkgMeta> {
        Arc::new(PkgMeta::new(name, PkgVersion::try_from(version).unwrap()))
    }

    fn versions(res: Vec<&Arc<PkgMeta>>) -> Vec<String> {
        res.into_iter().map(|p| p.version.to_string()).collect()
    }

    fn query(index: &VersionIndex, name: &str, range: &str) -> Vec<String> {
        versions(index.find_all(name, &VersionRange::parse(range).unwrap()))
    }

    #[test]
    fn range_queries() {
        let mut index = VersionIndex::default();
        index.add(pkg("p", "2"));
        index.add(pkg("p", "1"));

        assert_eq!(query(&index, "p", "<= 2"), vec!["1", "2"]);
        assert_eq!(query(&index, "p", "< 2"), vec!["1"]);
        assert!(query(&index, "p", "< 1").is_empty());
        assert_eq!(query(&index, "p", ">= 2"), vec!["2"]);
        assert_eq!(query(&index, "p", "> 1"), vec!["2"]);
        assert!(query(&index, "p", "> 2").is_empty());
        assert_eq!(query(&index, "p", ">= 0.5"), vec!["1", "2"]);
        assert_eq!(query(&index, "p", "= 1"), vec!["1"]);
        assert!(query(&index, "p", "= 3").is_empty());
        assert_eq!(query(&index, "p", "any"), vec!["1", "2"]);
        assert!(query(&index, "unknown", "any").is_empty());
    }

    #[test]
    fn edge_without_release() {
        let mut index = VersionIndex::default();
        index.add(pkg("p", "1.1-3"));
        index.add(pkg("p", "1.2-45"));
        index.add(pkg("p", "1.3-1"));

        // `1.2` equals `1.2-45`
        assert_eq!(query(&index, "p", "<= 1.2"), vec!["1.1-3", "1.2-45"]);
        assert_eq!(query(&index, "p", "< 1.2"), vec!["1.1-3"]);
        assert_eq!(query(&index, "p", ">= 1.2"), vec!["1.2-45", "1.3-1"]);
        assert_eq!(query(&index, "p", "> 1.2"), vec!["1.3-1"]);
        assert_eq!(query(&index, "p", "= 1.2"), vec!["1.2-45"]);
        assert_eq!(query(&index, "p", ">= 1.2-46"), vec!["1.3-1"]);
    }

    #[test]
    fn last_write_wins() {
        let mut index = VersionIndex::default();
        let mut first = PkgMeta::new("p", PkgVersion::try_from("1.0-1").unwrap());
        first.filename = "first.deb".to_string();
        let mut second = PkgMeta::new("p", PkgVersion::try_from("1.0-1").unwrap());
        second.filename = "second.deb".to_string();
        index.add(Arc::new(first));
        index.add(Arc::new(second));

        assert_eq!(index.len(), 1);
        let found = index.find_all("p", &VersionRange::Any);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].filename, "second.deb");
    }

    #[test]
    fn iterate() {
        let mut index = VersionIndex::default();
        index.add(pkg("b", "1"));
        index.add(pkg("a", "2"));
        index.add(pkg("a", "1"));
        let all: Vec<String> = index.iter().map(|p| p.to_string()).collect();
        assert_eq!(all, vec!["a-1", "a-2", "b-1"]);
        assert!(index.contains("a"));
        assert!(!index.contains("c"));
        assert_eq!(index.len(), 3);
    }
}
