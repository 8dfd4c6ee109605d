mod requirements;
pub use requirements::Requirements;

use crate::solver::MandatoryPolicy;
use crate::types::RepoFormat;

use anyhow::{bail, Context, Result};
use clap::Parser;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::{
    fs,
    ops::RangeInclusive,
    path::{Path, PathBuf},
};

const DEB_PRIORITIES: RangeInclusive<i64> = 0..=1000;
const PACMAN_PRIORITIES: RangeInclusive<i64> = 1..=99;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Repositories in the order they are declared
    #[serde(deserialize_with = "in_declaration_order")]
    pub repo: Vec<(String, RepoConfig)>,
}

fn in_declaration_order<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<(String, RepoConfig)>, D::Error>
where
    D: Deserializer<'de>,
{
    // toml's preserve_order keeps this map in file order
    let table = toml::value::Table::deserialize(deserializer)?;
    table
        .into_iter()
        .map(|(name, value)| {
            let repo = value
                .try_into::<RepoConfig>()
                .map_err(|e| serde::de::Error::custom(format!("repository {}: {}", name, e)))?;
            Ok((name, repo))
        })
        .collect()
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&data)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.check_sanity()?;
        Ok(config)
    }

    pub fn check_sanity(&self) -> Result<()> {
        lazy_static! {
            static ref REPO_NAME: Regex = Regex::new("^[a-zA-Z0-9._-]+$").unwrap();
        }

        for (name, repo) in &self.repo {
            if !REPO_NAME.is_match(name) {
                bail!("Invalid character in repository name {}", name);
            }
            if let Some(priority) = repo.priority {
                let allowed = match repo.format {
                    RepoFormat::Deb => DEB_PRIORITIES,
                    RepoFormat::Pacman => PACMAN_PRIORITIES,
                };
                if !allowed.contains(&priority) {
                    bail!(
                        "Priority {} of repository {} is out of range {}..={}",
                        priority,
                        name,
                        allowed.start(),
                        allowed.end()
                    );
                }
            }
        }
        Ok(())
    }

    /// Configured repositories, in declaration order
    pub fn repositories(&self) -> impl Iterator<Item = (&str, &RepoConfig)> {
        self.repo.iter().map(|(name, repo)| (name.as_str(), repo))
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RepoConfig {
    pub format: RepoFormat,
    /// Local package index: a `Packages` file for deb, a `.db` file for pacman
    pub db: PathBuf,
    /// Directory holding a copy of the repository's package files
    #[serde(default)]
    pub mirror: Option<PathBuf>,
    #[serde(default)]
    pub priority: Option<i64>,
    /// pacman only: package groups that are always required
    #[serde(default)]
    pub mandatory_groups: Option<Vec<String>>,
    /// Package files outside the index, relative to `mirror` when it is set
    #[serde(default)]
    pub local: Vec<PathBuf>,
}

#[derive(Parser)]
#[clap(about, version, author)]
pub struct Opts {
    #[clap(
        long,
        default_value = "forester.toml",
        help = "Path to the repository configuration"
    )]
    pub config: PathBuf,
    #[clap(short, long, help = "Print additional debug information")]
    pub verbose: bool,
    #[clap(subcommand)]
    pub subcmd: SubCmd,
}

#[derive(Parser)]
pub enum SubCmd {
    /// Resolve requirements and list the selected packages
    Packages(PackagesCmd),
    /// List requirements that a repository can't satisfy by itself
    Unresolved,
    /// Check mirrored package files against the repository indexes
    Verify,
}

#[derive(Parser)]
pub struct PackagesCmd {
    /// Requirements file, YAML or JSON (by .json extension)
    #[clap(long)]
    pub requirements: Option<PathBuf>,
    /// How mandatory packages are required. Overrides the requirements file
    #[clap(long, value_enum)]
    pub mandatory: Option<MandatoryPolicy>,
}
