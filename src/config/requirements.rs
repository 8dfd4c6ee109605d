/// Requirement files: which packages to resolve, and which repositories to take whole
use crate::solver::MandatoryPolicy;
use crate::types::{PkgMeta, PkgRelation, RequirementGroup, VersionRange};

use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct Requirements {
    #[serde(default)]
    pub packages: Vec<PackageRequest>,
    #[serde(default)]
    pub repositories: Vec<RepositoryTraversal>,
    #[serde(default)]
    pub mandatory: Option<MandatoryPolicy>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct PackageRequest {
    pub name: String,
    /// Items like `>= 1.0`. Absent means any version
    #[serde(default)]
    pub versions: Option<Vec<String>>,
}

/// Take every package of a repository, except the excluded ones
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
pub struct RepositoryTraversal {
    pub name: String,
    /// A package is excluded if all attributes of any rule match.
    /// Values wrapped in `/.../` are regular expressions
    #[serde(default)]
    pub excludes: Vec<HashMap<String, String>>,
}

impl Requirements {
    /// Read a requirements file. `.json` files are JSON, everything else is YAML
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read requirements file {}", path.display()))?;
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        let res: Requirements = if is_json {
            serde_json::from_str(&data)
                .with_context(|| format!("Failed to parse requirements file {}", path.display()))?
        } else {
            serde_yaml::from_str(&data)
                .with_context(|| format!("Failed to parse requirements file {}", path.display()))?
        };
        res.check_sanity()
            .with_context(|| format!("Invalid requirements file {}", path.display()))?;
        Ok(res)
    }

    pub fn check_sanity(&self) -> Result<()> {
        lazy_static! {
            static ref VERSION_ITEM: Regex = Regex::new(r"^(<|<=|>|>=|=)\s\S+$").unwrap();
        }

        for pkg in &self.packages {
            for item in pkg.versions.iter().flatten() {
                if !VERSION_ITEM.is_match(item) {
                    bail!("Invalid version requirement {:?} for {}", item, pkg.name);
                }
            }
        }
        Ok(())
    }

    /// One single-alternative group per version item
    pub fn package_relations(&self) -> Result<Vec<RequirementGroup>> {
        let mut res = Vec::new();
        for pkg in &self.packages {
            match &pkg.versions {
                None => res.push(RequirementGroup::single(PkgRelation::any(&pkg.name))),
                Some(versions) => {
                    for item in versions {
                        let range = VersionRange::parse(item)
                            .with_context(|| format!("Bad version requirement for {}", pkg.name))?;
                        res.push(RequirementGroup::single(PkgRelation::new(&pkg.name, range)));
                    }
                }
            }
        }
        Ok(res)
    }

    pub fn traversal(&self) -> Result<Traversal> {
        let mut filters = HashMap::new();
        for repo in &self.repositories {
            let rules = repo
                .excludes
                .iter()
                .map(compile_rule)
                .collect::<Result<Vec<_>>>()
                .with_context(|| format!("Bad excludes for repository {}", repo.name))?;
            filters.insert(repo.name.clone(), rules);
        }
        Ok(Traversal { filters })
    }
}

#[derive(Debug, Clone, Copy)]
enum Attr {
    Name,
    Section,
    Filename,
}

#[derive(Debug)]
enum Matcher {
    Exact(String),
    Pattern(Regex),
}

#[derive(Debug)]
struct AttrMatch {
    attr: Attr,
    matcher: Matcher,
}

impl AttrMatch {
    fn matches(&self, pkg: &PkgMeta) -> bool {
        let value = match self.attr {
            Attr::Name => Some(pkg.name.as_str()),
            Attr::Section => pkg.section.as_deref(),
            Attr::Filename => Some(pkg.filename.as_str()),
        };
        match (value, &self.matcher) {
            (None, _) => false,
            (Some(v), Matcher::Exact(expected)) => v == expected,
            (Some(v), Matcher::Pattern(re)) => re.is_match(v),
        }
    }
}

/// All attributes of a rule must match
type ExcludeRule = Vec<AttrMatch>;

fn compile_rule(attrs: &HashMap<String, String>) -> Result<ExcludeRule> {
    let mut rule = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        let attr = match name.as_str() {
            "name" => Attr::Name,
            "section" => Attr::Section,
            "filename" => Attr::Filename,
            _ => bail!("Unknown package attribute {}", name),
        };
        let matcher = if value.len() >= 2 && value.starts_with('/') && value.ends_with('/') {
            // Anchored at the start only
            let pattern = format!("^(?:{})", &value[1..value.len() - 1]);
            Matcher::Pattern(Regex::new(&pattern).with_context(|| format!("Bad pattern {}", value))?)
        } else {
            Matcher::Exact(value.clone())
        };
        rule.push(AttrMatch { attr, matcher });
    }
    Ok(rule)
}

/// Turns packages of whole repositories into exact requirements
#[derive(Debug, Default)]
pub struct Traversal {
    filters: HashMap<String, Vec<ExcludeRule>>,
}

impl Traversal {
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// `name (= version)` if the package's repository is traversed and no rule excludes it
    pub fn visit(&self, pkg: &PkgMeta) -> Option<RequirementGroup> {
        let rules = self.filters.get(pkg.repository_name()?)?;
        let excluded = rules
            .iter()
            .any(|rule| rule.iter().all(|attr| attr.matches(pkg)));
        if excluded {
            return None;
        }
        Some(RequirementGroup::single(PkgRelation::new(
            &pkg.name,
            VersionRange::Eq(pkg.version.clone()),
        )))
    }
}
