use super::VersionRange;

use std::fmt;

/// A named constraint, such as `libc6 (>= 2.31)`
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PkgRelation {
    pub name: String,
    pub range: VersionRange,
}

impl PkgRelation {
    pub fn new(name: &str, range: VersionRange) -> Self {
        PkgRelation {
            name: name.to_owned(),
            range,
        }
    }

    pub fn any(name: &str) -> Self {
        PkgRelation::new(name, VersionRange::Any)
    }
}

impl fmt::Display for PkgRelation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.range)
    }
}

/// A requirement line: satisfied if any of the alternatives can be
/// resolved. Earlier alternatives are preferred.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RequirementGroup(Vec<PkgRelation>);

impl RequirementGroup {
    pub fn new(alternatives: Vec<PkgRelation>) -> Self {
        RequirementGroup(alternatives)
    }

    pub fn single(relation: PkgRelation) -> Self {
        RequirementGroup(vec![relation])
    }

    pub fn alternatives(&self) -> &[PkgRelation] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PkgRelation> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<PkgRelation> for RequirementGroup {
    fn from(relation: PkgRelation) -> Self {
        RequirementGroup::single(relation)
    }
}

impl<'a> IntoIterator for &'a RequirementGroup {
    type Item = &'a PkgRelation;
    type IntoIter = std::slice::Iter<'a, PkgRelation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for RequirementGroup {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let alternatives: Vec<String> = self.0.iter().map(|r| r.to_string()).collect();
        f.write_str(&alternatives.join(" | "))
    }
}
