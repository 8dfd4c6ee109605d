use super::{load_catalog, table};
use crate::{config::Config, info, success, warn};

use anyhow::Result;

/// Requirements that no configured repository can satisfy, all repositories taken together
pub fn unresolved(config: &Config) -> Result<()> {
    let catalog = load_catalog(config)?;
    if catalog.is_empty() {
        warn!("No packages loaded, nothing to check.");
        return Ok(());
    }
    info!("Checking {} packages...", catalog.len());
    let unresolved = catalog.get_unresolved();
    if unresolved.is_empty() {
        success!("All requirements can be satisfied.");
        return Ok(());
    }

    warn!("{} requirements can't be satisfied.", unresolved.len());
    table::show_unresolved(&mut std::io::stdout(), &unresolved)
}

#[cfg(test)]
mod test {
    use super::unresolved;
    use crate::actions::{
        load_catalog,
        test::{cleanup, fixture},
    };
    use crate::source::test::temp_path;

    #[test]
    fn merged_repositories() {
        let (config, paths) = fixture();
        let catalog = load_catalog(&config).unwrap();
        cleanup(&paths);

        let unresolved: Vec<String> = catalog
            .get_unresolved()
            .iter()
            .map(|g| g.to_string())
            .collect();
        // `b` is satisfied by either repository, `c` by neither
        assert_eq!(unresolved, vec!["c (any)", "missing (any) | c (any)"]);
    }

    #[test]
    fn empty_repositories() {
        let (mut config, paths) = fixture();
        for path in &paths {
            std::fs::write(path, "").unwrap();
        }
        let catalog = load_catalog(&config).unwrap();
        assert!(catalog.is_empty());
        assert!(unresolved(&config).is_ok());

        config.repo[0].1.db = temp_path("gone");
        assert!(unresolved(&config).is_err());
        cleanup(&paths);
    }
}
