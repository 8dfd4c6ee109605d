/// The pacman sync database reader
use super::{relative_filename, RepoDriver};
use crate::{
    debug,
    types::{Checksum, PkgMeta, PkgRelation, PkgVersion, Repository, RequirementGroup},
    utils::pacparse,
};

use anyhow::{bail, format_err, Context, Result};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::{collections::HashMap, convert::TryFrom, fs::File, io::Read, path::Path, sync::Arc};
use tar::Archive;
use xz2::read::XzDecoder;

const DEFAULT_PRIORITY: i64 = 50;

pub struct PacmanDriver {
    /// Members of these groups are mandatory
    mandatory_groups: Vec<String>,
}

impl PacmanDriver {
    pub fn new(mandatory_groups: Vec<String>) -> Self {
        PacmanDriver { mandatory_groups }
    }
}

impl Default for PacmanDriver {
    fn default() -> Self {
        PacmanDriver::new(vec!["base".to_owned()])
    }
}

impl RepoDriver for PacmanDriver {
    fn priority_key(&self, declared: Option<i64>) -> i64 {
        declared.unwrap_or(DEFAULT_PRIORITY)
    }

    fn load_packages(
        &self,
        repo: &Arc<Repository>,
        consumer: &mut dyn FnMut(PkgMeta),
    ) -> Result<()> {
        let f = File::open(&repo.db)
            .with_context(|| format!("Failed to open {}", repo.db.display()))?;
        let descs = read_descs(f).with_context(|| format!("Failed to read {}", repo.db.display()))?;

        let pkgs = descs
            .into_par_iter()
            .map(|desc| {
                let fields = pacparse::parse_str(&desc)?;
                self.fields_to_pkgmeta(fields, repo)
            })
            .collect::<Result<Vec<PkgMeta>>>()
            .with_context(|| format!("Bad package metadata in repository {}", repo.name))?;
        debug!("Read {} packages from {}", pkgs.len(), repo);

        for pkg in pkgs {
            consumer(pkg);
        }
        Ok(())
    }

    fn load_package_from_file(&self, repo: &Arc<Repository>, path: &Path) -> Result<PkgMeta> {
        let pkginfo = read_pkginfo(path)
            .with_context(|| format!("Failed to read .PKGINFO of {}", path.display()))?;
        let mut fields = pacparse::parse_pkginfo(&pkginfo)?;
        fields.insert("FILENAME".to_owned(), vec![relative_filename(repo, path)]);

        let mut pkg = self.fields_to_pkgmeta(fields, repo)?;
        pkg.size = Some(std::fs::metadata(path)?.len());
        pkg.checksum = Some(Checksum::sha256_of_file(path)?);
        Ok(pkg)
    }
}

/// Content of the `.PKGINFO` entry of a package tarball
fn read_pkginfo(path: &Path) -> Result<String> {
    let f = File::open(path)
        .with_context(|| format!("Failed to open package file at {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let reader: Box<dyn Read> = if filename.ends_with(".xz") {
        Box::new(XzDecoder::new(f))
    } else if filename.ends_with(".gz") {
        Box::new(GzDecoder::new(f))
    } else if filename.ends_with(".tar") {
        Box::new(f)
    } else {
        bail!("Unsupported package compression for {}", filename);
    };

    let mut tar = Archive::new(reader);
    for file in tar.entries()? {
        let mut file = file?;
        if file.header().path()?.to_str() == Some(".PKGINFO") {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            return Ok(content);
        }
    }
    bail!("{} has no .PKGINFO", filename)
}

/// Content of every `*/desc` entry, in archive order
fn read_descs(f: impl Read) -> Result<Vec<String>> {
    let gzipdecoder = GzDecoder::new(f);
    let mut tar = Archive::new(gzipdecoder);
    let mut res = Vec::new();

    for file in tar.entries()? {
        let mut file = file?;
        if file.header().path()?.ends_with("desc") {
            let mut content = String::new();
            file.read_to_string(&mut content)?;
            res.push(content);
        }
    }
    Ok(res)
}

impl PacmanDriver {
    fn fields_to_pkgmeta(
        &self,
        mut f: HashMap<String, Vec<String>>,
        repo: &Arc<Repository>,
    ) -> Result<PkgMeta> {
        // Get name first, for error reporting
        let name = get_first_or_complain("NAME", &mut f)
            .map_err(|e| format_err!("bad metadata: NAME missing ({e})"))?;
        let version = get_first_or_complain("VERSION", &mut f)
            .map_err(|e| format_err!("bad metadata for {name}: {e}"))?;
        let version = PkgVersion::try_from(version.as_str())
            .with_context(|| format!("bad version for {name}"))?;

        let mut pkg = PkgMeta::new(&name, version);
        pkg.requires = get_pkg_list("DEPENDS", &mut f)
            .with_context(|| format!("bad DEPENDS for {name}"))?
            .into_iter()
            .map(RequirementGroup::single)
            .collect();
        pkg.provides =
            get_pkg_list("PROVIDES", &mut f).with_context(|| format!("bad PROVIDES for {name}"))?;
        pkg.obsoletes =
            get_pkg_list("REPLACES", &mut f).with_context(|| format!("bad REPLACES for {name}"))?;
        pkg.mandatory = f
            .get("GROUPS")
            .map(|groups| groups.iter().any(|g| self.mandatory_groups.contains(g)))
            .unwrap_or(false);

        pkg.filename = get_first_or_complain("FILENAME", &mut f)
            .map_err(|e| format_err!("bad metadata for {name}: {e}"))?;
        if f.contains_key("CSIZE") {
            let size = get_first_or_complain("CSIZE", &mut f)?;
            pkg.size = Some(
                size.parse()
                    .with_context(|| format!("bad CSIZE for {name}"))?,
            );
        }
        if f.contains_key("SHA256SUM") {
            let hex = get_first_or_complain("SHA256SUM", &mut f)?;
            pkg.checksum = Some(Checksum::from_sha256_str(&hex)?);
        }
        pkg.repository = Some(repo.clone());

        Ok(pkg)
    }
}

fn get_first_or_complain(name: &str, f: &mut HashMap<String, Vec<String>>) -> Result<String> {
    if let Some(mut values) = f.remove(name) {
        if values.len() == 1 {
            Ok(values.remove(0))
        } else {
            bail!("expect 1 value for {name}, found {}", values.len())
        }
    } else {
        bail!("field {name} not found")
    }
}

fn get_pkg_list(name: &str, f: &mut HashMap<String, Vec<String>>) -> Result<Vec<PkgRelation>> {
    let mut out = Vec::new();
    if let Some(values) = f.remove(name) {
        for (i, line) in values.iter().enumerate() {
            let relation = pacparse::parse_relation(line)
                .with_context(|| format!("malformed package requirement at line {i}"))?;
            out.push(relation);
        }
    }
    // It's fine to have nothing
    Ok(out)
}
