/// Reader for deb `Packages` indexes
use super::{relative_filename, RepoDriver};
use crate::{
    debug,
    types::{Checksum, PkgMeta, PkgVersion, Repository},
    utils::debcontrol::{parse_relations, parse_requirements},
};

use anyhow::{bail, format_err, Context, Result};
use debcontrol::{BufParse, Streaming};
use flate2::read::GzDecoder;
use rayon::prelude::*;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tar::Archive;
use xz2::read::XzDecoder;

const DEFAULT_PRIORITY: i64 = 500;

const INTERESTED_FIELDS: &[&str] = &[
    "Package",
    "Version",
    "Pre-Depends",
    "Depends",
    "Recommends",
    "Provides",
    "Essential",
    "Priority",
    "Section",
    "Filename",
    "Size",
    "SHA256",
    "SHA512",
];

/// Fields whose relations become requirements
const REQUIRING_FIELDS: &[&str] = &["Pre-Depends", "Depends", "Recommends"];

pub struct DebDriver;

impl RepoDriver for DebDriver {
    /// Higher declared priority is preferred, so it maps to a lower key
    fn priority_key(&self, declared: Option<i64>) -> i64 {
        -declared.unwrap_or(DEFAULT_PRIORITY)
    }

    fn load_packages(
        &self,
        repo: &Arc<Repository>,
        consumer: &mut dyn FnMut(PkgMeta),
    ) -> Result<()> {
        let f = File::open(&repo.db)
            .with_context(|| format!("Failed to open {}", repo.db.display()))?;
        let reader: Box<dyn Read> = if repo.db.extension().map(|e| e == "gz").unwrap_or(false) {
            Box::new(GzDecoder::new(f))
        } else {
            Box::new(f)
        };
        let paragraphs = read_paragraphs(reader)
            .with_context(|| format!("Failed to read {}", repo.db.display()))?;

        // Parse fields in parallel
        let pkgs = paragraphs
            .into_par_iter()
            .map(|fields| fields_to_pkgmeta(fields, repo))
            .collect::<Result<Vec<PkgMeta>>>()
            .with_context(|| format!("Bad package metadata in repository {}", repo.name))?;
        debug!("Read {} packages from {}", pkgs.len(), repo);

        for pkg in pkgs {
            consumer(pkg);
        }
        Ok(())
    }

    fn load_package_from_file(&self, repo: &Arc<Repository>, path: &Path) -> Result<PkgMeta> {
        let mut fields = read_control_from_deb(path)
            .with_context(|| format!("Failed to read control file of {}", path.display()))?;
        fields.insert("Filename".to_owned(), relative_filename(repo, path));
        // The file itself is authoritative for these
        fields.remove("SHA256");
        fields.remove("SHA512");
        fields.remove("Size");

        let mut pkg = fields_to_pkgmeta(fields, repo)?;
        pkg.size = Some(std::fs::metadata(path)?.len());
        pkg.checksum = Some(Checksum::sha256_of_file(path)?);
        Ok(pkg)
    }
}

/// Fields of the `control` file inside a `.deb` archive
fn read_control_from_deb(path: &Path) -> Result<HashMap<String, String>> {
    let mut archive = ar::Archive::new(
        File::open(path).with_context(|| format!("Failed to open deb file at {}", path.display()))?,
    );
    while let Some(entry) = archive.next_entry() {
        let entry = entry?;
        let filename = std::str::from_utf8(entry.header().identifier())?.to_owned();
        let control: Box<dyn Read + '_> = match filename.as_str() {
            "control.tar.xz" => Box::new(XzDecoder::new(entry)),
            "control.tar.gz" => Box::new(GzDecoder::new(entry)),
            _ => continue,
        };
        let mut tar = Archive::new(control);
        for file in tar.entries()? {
            let mut file = file?;
            let is_control = {
                let path = file.header().path()?;
                path.to_str() == Some("./control") || path.to_str() == Some("control")
            };
            if is_control {
                let mut content = String::new();
                file.read_to_string(&mut content)?;
                return parse_control(&content);
            }
        }
        bail!("{} has no control file", filename);
    }
    bail!("Malformed deb file: no control archive")
}

fn parse_control(i: &str) -> Result<HashMap<String, String>> {
    let paragraphs = match debcontrol::parse_str(i) {
        Ok(p) => p,
        Err(e) => bail!("Failed to parse control for deb: {}", e),
    };
    let mut fields = HashMap::new();
    for p in paragraphs {
        for field in p.fields {
            if INTERESTED_FIELDS.contains(&field.name) {
                fields.insert(field.name.to_string(), field.value);
            }
        }
    }
    Ok(fields)
}

fn read_paragraphs(reader: impl Read) -> Result<Vec<HashMap<String, String>>> {
    let mut buf_parse = BufParse::new(reader, 16384);
    let mut res = Vec::new();

    while let Some(result) = buf_parse
        .try_next()
        .map_err(|e| format_err!("malformed control paragraph: {:?}", e))?
    {
        match result {
            Streaming::Item(paragraph) => {
                let mut fields = HashMap::new();
                for field in paragraph.fields {
                    if INTERESTED_FIELDS.contains(&field.name) {
                        fields.insert(field.name.to_string(), field.value);
                    }
                }
                res.push(fields);
            }
            Streaming::Incomplete => buf_parse.buffer()?,
        }
    }

    Ok(res)
}

fn fields_to_pkgmeta(mut f: HashMap<String, String>, repo: &Arc<Repository>) -> Result<PkgMeta> {
    // Get name first, for error reporting
    let name = f
        .remove("Package")
        .ok_or_else(|| format_err!("Package without name"))?;
    let version = f
        .get("Version")
        .ok_or_else(|| format_err!("Package {} without Version", name))?;
    let version = PkgVersion::try_from(version.as_str())
        .with_context(|| format!("Bad version for package {}", name))?;

    let mut pkg = PkgMeta::new(&name, version);
    for field in REQUIRING_FIELDS {
        if let Some(value) = f.get(*field) {
            let groups = parse_requirements(value)
                .with_context(|| format!("Bad {} for package {}", field, name))?;
            pkg.requires.extend(groups);
        }
    }
    if let Some(value) = f.get("Provides") {
        pkg.provides =
            parse_relations(value).with_context(|| format!("Bad Provides for package {}", name))?;
    }

    let essential = f.get("Essential").map(|v| v == "yes").unwrap_or(false);
    let important = matches!(
        f.get("Priority").map(|s| s.as_str()),
        Some("required") | Some("important")
    );
    pkg.mandatory = essential || important;

    pkg.filename = f
        .remove("Filename")
        .ok_or_else(|| format_err!("Package {} without Filename", name))?;
    pkg.section = f.remove("Section");
    pkg.size = match f.get("Size") {
        Some(size) => Some(
            size.parse()
                .with_context(|| format!("Bad Size for package {}", name))?,
        ),
        None => None,
    };
    pkg.checksum = if let Some(hex) = f.get("SHA256") {
        Some(Checksum::from_sha256_str(hex)?)
    } else if let Some(hex) = f.get("SHA512") {
        Some(Checksum::from_sha512_str(hex)?)
    } else {
        None
    };
    pkg.repository = Some(repo.clone());

    Ok(pkg)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::source::test::{temp_path, write_deb};
    use crate::types::RepoFormat;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;
    use std::path::Path;

    const PACKAGES: &str = "Package: base-files
Essential: yes
Priority: required
Section: admin
Version: 11.1+deb11u5
Filename: pool/main/b/base-files/base-files_11.1+deb11u5_amd64.deb
Size: 70396
SHA256: 5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03

Package: exim4
Priority: optional
Section: mail
Version: 4.94.2-7
Pre-Depends: debconf (>= 0.5) | debconf-2.0
Depends: exim4-base (>= 4.94.2-7), exim4-daemon-light | exim4-daemon-heavy
Recommends: mailx
Provides: mail-transport-agent
Filename: pool/main/e/exim4/exim4_4.94.2-7_all.deb
Size: 8176

Package: tzdata
Priority: important
Version: 2021a-1+deb11u8
Depends: debconf (>= 0.5) | debconf-2.0
Filename: pool/main/t/tzdata/tzdata_2021a-1+deb11u8_all.deb
";

    fn repo(db: &Path) -> Arc<Repository> {
        Arc::new(Repository {
            name: "main".to_owned(),
            format: RepoFormat::Deb,
            db: db.to_owned(),
            mirror: None,
            priority: -500,
        })
    }

    fn load(db: &Path) -> Result<Vec<PkgMeta>> {
        let mut pkgs = Vec::new();
        DebDriver.load_packages(&repo(db), &mut |pkg| pkgs.push(pkg))?;
        Ok(pkgs)
    }

    fn check(pkgs: &[PkgMeta]) {
        let names: Vec<String> = pkgs.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            vec!["base-files-11.1+deb11u5", "exim4-4.94.2-7", "tzdata-2021a-1+deb11u8"]
        );

        let base = &pkgs[0];
        assert!(base.mandatory);
        assert_eq!(base.section.as_deref(), Some("admin"));
        assert_eq!(base.size, Some(70396));
        assert!(base.checksum.is_some());
        assert_eq!(base.repository_name(), Some("main"));

        let exim = &pkgs[1];
        assert!(!exim.mandatory);
        let requires: Vec<String> = exim.requires.iter().map(|g| g.to_string()).collect();
        assert_eq!(
            requires,
            vec![
                "debconf (>= 0.5) | debconf-2.0 (any)",
                "exim4-base (>= 4.94.2-7)",
                "exim4-daemon-light (any) | exim4-daemon-heavy (any)",
                "mailx (any)",
            ]
        );
        assert_eq!(exim.provides[0].to_string(), "mail-transport-agent (any)");
        assert!(exim.checksum.is_none());

        let tzdata = &pkgs[2];
        assert!(tzdata.mandatory);
        assert_eq!(tzdata.section, None);
        assert_eq!(tzdata.size, None);
    }

    #[test]
    fn plain_index() {
        let path = temp_path("Packages");
        std::fs::write(&path, PACKAGES).unwrap();
        let pkgs = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        check(&pkgs);
    }

    #[test]
    fn gzip_index() {
        let path = temp_path("Packages.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(PACKAGES.as_bytes()).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        let pkgs = load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        check(&pkgs);
    }

    #[test]
    fn malformed() {
        let path = temp_path("Packages");
        std::fs::write(&path, "Package: a\nVersion: 1.0\nDepends: b (>= \nFilename: a.deb\n")
            .unwrap();
        let err = load(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(format!("{:#}", err).contains("Bad Depends for package a"));

        assert!(load(&temp_path("missing")).is_err());
    }

    const CONTROL: &str = "Package: hello
Version: 2.10-2
Architecture: amd64
Maintainer: Santiago Vila <sanvila@debian.org>
Installed-Size: 280
Depends: libc6 (>= 2.14)
Section: devel
Priority: optional
Description: example package based on GNU hello
";

    #[test]
    fn local_deb() {
        let path = temp_path("hello_2.10-2_amd64.deb");
        write_deb(&path, CONTROL);
        let pkg = DebDriver.load_package_from_file(&repo(Path::new("Packages")), &path);
        let size = std::fs::metadata(&path).unwrap().len();
        let checksum = Checksum::sha256_of_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let pkg = pkg.unwrap();
        assert_eq!(pkg.to_string(), "hello-2.10-2");
        assert_eq!(pkg.section.as_deref(), Some("devel"));
        assert!(!pkg.mandatory);
        assert_eq!(pkg.requires[0].to_string(), "libc6 (>= 2.14)");
        assert!(pkg.filename.ends_with("hello_2.10-2_amd64.deb"));
        // Computed from the file, not taken from the control file
        assert_eq!(pkg.size, Some(size));
        assert_eq!(pkg.checksum, Some(checksum));
        assert_eq!(pkg.repository_name(), Some("main"));
    }

    #[test]
    fn not_a_deb() {
        let path = temp_path("broken.deb");
        std::fs::write(&path, "!<arch>\n").unwrap();
        assert!(DebDriver
            .load_package_from_file(&repo(Path::new("Packages")), &path)
            .is_err());
        std::fs::write(&path, "definitely not an archive").unwrap();
        assert!(DebDriver
            .load_package_from_file(&repo(Path::new("Packages")), &path)
            .is_err());
        std::fs::remove_file(&path).unwrap();
    }
}
