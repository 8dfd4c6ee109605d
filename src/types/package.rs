use super::{Checksum, PkgRelation, PkgVersion, RequirementGroup};

use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, sync::Arc};

/// Metadata flavors we know how to read
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RepoFormat {
    /// dpkg style `Packages` index
    Deb,
    /// pacman style sync database
    Pacman,
}

impl fmt::Display for RepoFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RepoFormat::Deb => f.write_str("deb"),
            RepoFormat::Pacman => f.write_str("pacman"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repository {
    pub name: String,
    pub format: RepoFormat,
    /// Package index on the local disk
    pub db: PathBuf,
    /// Local copy of the repository, if any
    pub mirror: Option<PathBuf>,
    /// Lower is tried first
    pub priority: i64,
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.format)
    }
}

/// The identity of a package in a resolution result
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgId {
    pub name: String,
    pub version: String,
}

#[derive(Clone, Debug)]
pub struct PkgMeta {
    pub name: String,
    pub version: PkgVersion,
    /// Always required by the repository format, regardless of requirements
    pub mandatory: bool,
    pub requires: Vec<RequirementGroup>,
    pub provides: Vec<PkgRelation>,
    pub obsoletes: Vec<PkgRelation>,
    pub repository: Option<Arc<Repository>>,
    /// Path relative to the repository root
    pub filename: String,
    pub section: Option<String>,
    pub size: Option<u64>,
    pub checksum: Option<Checksum>,
}

impl PkgMeta {
    pub fn new(name: &str, version: PkgVersion) -> Self {
        PkgMeta {
            name: name.to_owned(),
            version,
            mandatory: false,
            requires: Vec::new(),
            provides: Vec::new(),
            obsoletes: Vec::new(),
            repository: None,
            filename: String::new(),
            section: None,
            size: None,
            checksum: None,
        }
    }

    pub fn id(&self) -> PkgId {
        PkgId {
            name: self.name.clone(),
            version: self.version.to_string(),
        }
    }

    pub fn repository_name(&self) -> Option<&str> {
        self.repository.as_ref().map(|r| r.name.as_str())
    }
}

impl fmt::Display for PkgMeta {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}
