//! Readers for repository metadata formats
mod debrepo;
mod pacdb;

pub use debrepo::DebDriver;
pub use pacdb::PacmanDriver;

use crate::config::RepoConfig;
use crate::debug;
use crate::types::{PkgMeta, RepoFormat, Repository};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

pub trait RepoDriver {
    /// Forest key of a repository, from its configured priority
    fn priority_key(&self, declared: Option<i64>) -> i64;
    /// Feed every package of the repository to `consumer`, in index order
    fn load_packages(&self, repo: &Arc<Repository>, consumer: &mut dyn FnMut(PkgMeta))
        -> Result<()>;
    /// Read the metadata of a single package file, with size and SHA256 taken from the file
    fn load_package_from_file(&self, repo: &Arc<Repository>, path: &Path) -> Result<PkgMeta>;
}

pub fn driver_for(config: &RepoConfig) -> Box<dyn RepoDriver> {
    match config.format {
        RepoFormat::Deb => Box::new(DebDriver),
        RepoFormat::Pacman => match &config.mandatory_groups {
            Some(groups) => Box::new(PacmanDriver::new(groups.clone())),
            None => Box::new(PacmanDriver::default()),
        },
    }
}

/// Describe a configured repository and pick its driver
pub fn open(name: &str, config: &RepoConfig) -> (Arc<Repository>, Box<dyn RepoDriver>) {
    let driver = driver_for(config);
    let repo = Repository {
        name: name.to_owned(),
        format: config.format,
        db: config.db.clone(),
        mirror: config.mirror.clone(),
        priority: driver.priority_key(config.priority),
    };
    (Arc::new(repo), driver)
}

/// Feed the repository index, then its local package files, to `consumer`
pub fn load(
    repo: &Arc<Repository>,
    driver: &dyn RepoDriver,
    config: &RepoConfig,
    consumer: &mut dyn FnMut(PkgMeta),
) -> Result<()> {
    driver.load_packages(repo, consumer)?;
    for file in &config.local {
        let path = match &repo.mirror {
            Some(mirror) => mirror.join(file),
            None => file.clone(),
        };
        let pkg = driver
            .load_package_from_file(repo, &path)
            .with_context(|| format!("Bad package file {}", path.display()))?;
        debug!("Read {} from {}", pkg, path.display());
        consumer(pkg);
    }
    Ok(())
}

/// Filename of a package file as recorded in metadata: relative to the mirror if it is inside one
fn relative_filename(repo: &Repository, path: &Path) -> String {
    repo.mirror
        .as_ref()
        .and_then(|mirror| path.strip_prefix(mirror).ok())
        .unwrap_or(path)
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A fresh path under the system temp dir
    pub fn temp_path(name: &str) -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("forester-{}-{}-{}", std::process::id(), n, name))
    }

    /// Append one file to a tar archive
    pub fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, content: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, content.as_bytes())
            .unwrap();
    }

    /// A minimal `.deb` holding `control` in an xz compressed control archive
    pub fn write_deb(path: &Path, control: &str) {
        let mut control_tar = tar::Builder::new(xz2::write::XzEncoder::new(Vec::new(), 6));
        append_file(&mut control_tar, "./control", control);
        let control_tar = control_tar.into_inner().unwrap().finish().unwrap();

        let mut data_tar = tar::Builder::new(xz2::write::XzEncoder::new(Vec::new(), 6));
        append_file(&mut data_tar, "./usr/share/doc/README", "hello\n");
        let data_tar = data_tar.into_inner().unwrap().finish().unwrap();

        let mut deb = ar::Builder::new(std::fs::File::create(path).unwrap());
        for (name, content) in [
            ("debian-binary", &b"2.0\n"[..]),
            ("control.tar.xz", &control_tar[..]),
            ("data.tar.xz", &data_tar[..]),
        ] {
            let header = ar::Header::new(name.as_bytes().to_vec(), content.len() as u64);
            deb.append(&header, content).unwrap();
        }
    }

    fn config(format: RepoFormat, priority: Option<i64>) -> RepoConfig {
        RepoConfig {
            format,
            db: PathBuf::from("db"),
            mirror: None,
            priority,
            mandatory_groups: None,
            local: Vec::new(),
        }
    }

    #[test]
    fn priority_keys() {
        let (repo, _) = open("main", &config(RepoFormat::Deb, None));
        assert_eq!(repo.priority, -500);
        let (repo, _) = open("main", &config(RepoFormat::Deb, Some(990)));
        assert_eq!(repo.priority, -990);
        let (repo, _) = open("core", &config(RepoFormat::Pacman, None));
        assert_eq!(repo.priority, 50);
        let (repo, _) = open("core", &config(RepoFormat::Pacman, Some(10)));
        assert_eq!(repo.priority, 10);
        assert_eq!(repo.name, "core");
    }

    #[test]
    fn local_files() {
        let mirror = temp_path("local-mirror");
        std::fs::create_dir_all(mirror.join("pool")).unwrap();
        let db = mirror.join("Packages");
        std::fs::write(
            &db,
            "Package: hello\nVersion: 2.10-1\nFilename: pool/hello_2.10-1_amd64.deb\n",
        )
        .unwrap();
        write_deb(
            &mirror.join("pool/hello_2.10-2_amd64.deb"),
            "Package: hello\nVersion: 2.10-2\nDepends: libc6\n",
        );

        let mut config = config(RepoFormat::Deb, None);
        config.db = db;
        config.mirror = Some(mirror.clone());
        config.local = vec![PathBuf::from("pool/hello_2.10-2_amd64.deb")];
        let (repo, driver) = open("main", &config);
        let mut pkgs = Vec::new();
        let res = load(&repo, driver.as_ref(), &config, &mut |pkg| pkgs.push(pkg));

        config.local.push(PathBuf::from("pool/gone.deb"));
        let err = load(&repo, driver.as_ref(), &config, &mut |_| ()).unwrap_err();
        std::fs::remove_dir_all(&mirror).unwrap();

        res.unwrap();
        assert_eq!(pkgs.len(), 2);
        // Local files come after the index
        assert_eq!(pkgs[1].to_string(), "hello-2.10-2");
        assert_eq!(pkgs[1].filename, "pool/hello_2.10-2_amd64.deb");
        assert!(pkgs[1].checksum.is_some());
        assert!(err.to_string().contains("pool/gone.deb"));
    }
}
