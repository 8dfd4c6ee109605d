/// Show packages and requirements in tables
use crate::types::{PkgMeta, RequirementGroup};

use anyhow::Result;
use console::style;
use std::io::Write;
use std::sync::Arc;
use tabled::{Alignment, Column, Full, Modify, Style, Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[header("Name")]
    name: String,
    #[header("Repository")]
    repository: String,
    #[header("Version")]
    version: String,
    #[header("Filename")]
    filename: String,
    #[header("Size")]
    size: String,
}

#[derive(Tabled)]
struct UnresolvedRow {
    #[header("Name")]
    name: String,
    #[header("Version")]
    version: String,
    // Other packages that would satisfy the same requirement
    #[header("Alternatives")]
    alternatives: String,
}

fn package_rows(pkgs: &[Arc<PkgMeta>]) -> Vec<PackageRow> {
    pkgs.iter()
        .map(|pkg| PackageRow {
            name: pkg.name.clone(),
            repository: pkg.repository_name().unwrap_or_default().to_owned(),
            version: pkg.version.to_string(),
            filename: pkg.filename.clone(),
            size: pkg.size.map(|s| s.to_string()).unwrap_or_default(),
        })
        .collect()
}

fn unresolved_rows(groups: &[RequirementGroup]) -> Vec<UnresolvedRow> {
    groups
        .iter()
        .filter_map(|group| {
            let (first, rest) = group.alternatives().split_first()?;
            let rest: Vec<String> = rest.iter().map(|r| r.to_string()).collect();
            Some(UnresolvedRow {
                name: first.name.clone(),
                version: if first.range.is_any() {
                    String::new()
                } else {
                    first.range.to_string()
                },
                alternatives: rest.join(" | "),
            })
        })
        .collect()
}

pub fn show_packages(out: &mut dyn Write, pkgs: &[Arc<PkgMeta>]) -> Result<()> {
    let rows = package_rows(pkgs);
    let table = Table::new(&rows)
        .with(Modify::new(Full).with(Alignment::left()))
        // Size column should align right
        .with(Modify::new(Column(4..5)).with(Alignment::right()))
        .with(Modify::new(Full).with(|s: &str| format!(" {} ", s)))
        .with(Style::PSQL);
    writeln!(out, "{}", table)?;
    writeln!(out, "{} {}", style("Total packages:").bold(), rows.len())?;
    Ok(())
}

pub fn show_unresolved(out: &mut dyn Write, groups: &[RequirementGroup]) -> Result<()> {
    let rows = unresolved_rows(groups);
    let table = Table::new(&rows)
        .with(Modify::new(Full).with(Alignment::left()))
        .with(Modify::new(Full).with(|s: &str| format!(" {} ", s)))
        .with(Style::PSQL);
    writeln!(out, "{}", table)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{PkgRelation, PkgVersion, VersionRange};
    use std::convert::TryFrom;

    #[test]
    fn rows() {
        let mut pkg = PkgMeta::new("bash", PkgVersion::try_from("5.1-2").unwrap());
        pkg.filename = "pool/b/bash.deb".to_owned();
        pkg.size = Some(1024);
        let rows = package_rows(&[Arc::new(pkg)]);
        assert_eq!(rows[0].version, "5.1-2");
        assert_eq!(rows[0].repository, "");
        assert_eq!(rows[0].size, "1024");

        let groups = vec![
            RequirementGroup::new(vec![
                PkgRelation::new("awk", VersionRange::parse(">= 1").unwrap()),
                PkgRelation::any("mawk"),
                PkgRelation::any("gawk"),
            ]),
            RequirementGroup::default(),
        ];
        let rows = unresolved_rows(&groups);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "awk");
        assert_eq!(rows[0].version, ">= 1");
        assert_eq!(rows[0].alternatives, "mawk (any) | gawk (any)");
    }

    #[test]
    fn render() {
        let pkg = PkgMeta::new("bash", PkgVersion::try_from("5.1-2").unwrap());
        let mut out = Vec::new();
        show_packages(&mut out, &[Arc::new(pkg)]).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Name"));
        assert!(out.contains("bash"));
        assert!(out.contains("5.1-2"));
    }
}
