/// Parse pacman style package database files
use crate::types::{PkgRelation, PkgVersion, RangeOp, VersionRange};

use anyhow::{bail, format_err, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alphanumeric1, anychar, char, line_ending, multispace0, not_line_ending, space0},
    combinator::{eof, opt, recognize},
    multi::many1,
    sequence::{pair, preceded, tuple},
    IResult,
};
use std::collections::HashMap;
use std::convert::TryFrom;

/// Parse the key part of a paragraph, like `%NAME%`
fn parse_key(i: &str) -> IResult<&str, &str> {
    let (i, _) = char('%')(i)?;
    let (i, key) = alphanumeric1(i)?;
    let (i, _) = char('%')(i)?;
    // There should be a newline after the key line
    let (i, _) = line_ending(i)?;

    Ok((i, key))
}

/// Parse the value part of a paragraph, which ends with an empty line or EOF
fn parse_value(mut i: &str) -> IResult<&str, Vec<&str>> {
    let mut lines = Vec::new();
    loop {
        let (x, content) = not_line_ending(i)?;
        let (x, _) = opt(line_ending)(x)?;
        i = x;
        if content.is_empty() {
            break;
        }
        lines.push(content);
        if i.is_empty() {
            break;
        }
    }
    Ok((i, lines))
}

/// Parse a key-value pair in pacman's package description syntax
fn parse_pair(i: &str) -> IResult<&str, (&str, Vec<&str>)> {
    let (i, key) = preceded(multispace0, parse_key)(i)?;
    let (i, lines) = parse_value(i)?;

    Ok((i, (key, lines)))
}

/// Parse a `.PKGINFO` line like `depend = glibc>=2.33`
fn parse_pkginfo_line(i: &str) -> IResult<&str, (&str, &str)> {
    let (i, key) = take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(i)?;
    let (i, _) = tuple((space0, char('='), space0))(i)?;
    let (i, value) = not_line_ending(i)?;
    let (i, _) = eof(i)?;

    Ok((i, (key, value.trim_end())))
}

/// `.PKGINFO` keys and the desc fields they correspond to
const PKGINFO_FIELDS: &[(&str, &str)] = &[
    ("pkgname", "NAME"),
    ("pkgver", "VERSION"),
    ("depend", "DEPENDS"),
    ("provides", "PROVIDES"),
    ("replaces", "REPLACES"),
    ("group", "GROUPS"),
];

/// Parse the `.PKGINFO` of a package file into desc style fields
pub fn parse_pkginfo(i: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut res: HashMap<String, Vec<String>> = HashMap::new();
    for (no, line) in i.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (_, (key, value)) = parse_pkginfo_line(line)
            .map_err(|e| format_err!("bad .PKGINFO at line {}: {e}", no + 1))?;
        if let Some((_, field)) = PKGINFO_FIELDS.iter().find(|(k, _)| *k == key) {
            res.entry(field.to_string())
                .or_default()
                .push(value.to_owned());
        }
    }
    Ok(res)
}

pub fn parse_str(mut i: &str) -> Result<HashMap<String, Vec<String>>> {
    let mut res = HashMap::new();
    let mut counter = 0;
    loop {
        i = i.trim_start();
        if i.is_empty() {
            break;
        }
        match parse_pair(i) {
            Ok((x, (key, lines))) => {
                res.insert(
                    key.to_owned(),
                    lines.into_iter().map(|l| l.to_owned()).collect(),
                );
                counter += 1;
                i = x;
            }
            Err(e) => {
                bail!("bad pacman database on paragraph {counter}: {e}");
            }
        }
    }
    Ok(res)
}

fn is_package_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '@' || c == '.' || c == '+' || c == '-' || c == '_'
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '+' || c == '~' || c == '_' || c == '-' || c == ':'
}

fn parse_version_op(i: &str) -> IResult<&str, &str> {
    alt((tag("<="), tag(">="), tag("<"), tag(">"), tag("=")))(i)
}

/// `: optional description`, as found in OPTDEPENDS
fn parse_requirement_description(i: &str) -> IResult<&str, &str> {
    let (i, _) = char(':')(i)?;
    let (i, _) = space0(i)?;
    recognize(many1(anychar))(i)
}

/// Parse lines like `glibc>=2.33`, `libfoo.so=1-64` or `sh`
pub fn parse_package_requirement_line(i: &str) -> IResult<&str, (&str, Option<(&str, &str)>)> {
    // First parse the package name
    let (i, name) = take_while1(is_package_name_char)(i)?;
    // Then the version requirement
    let (i, version) = opt(pair(parse_version_op, take_while1(is_version_char)))(i)?;
    let (i, _) = opt(parse_requirement_description)(i)?;
    let (i, _) = eof(i)?;

    Ok((i, (name, version)))
}

pub fn parse_relation(line: &str) -> Result<PkgRelation> {
    let (_, (name, version)) = parse_package_requirement_line(line.trim())
        .map_err(|e| format_err!("malformed package requirement {line:?}: {e}"))?;
    let range = match version {
        Some((op, edge)) => {
            let op: RangeOp = op.parse()?;
            VersionRange::new(op, PkgVersion::try_from(edge)?)
        }
        None => VersionRange::Any,
    };
    Ok(PkgRelation::new(name, range))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn try_parse() {
        assert_eq!(("", "BRUH"), parse_key("%BRUH%\n").unwrap());
        assert_eq!(
            ("something else", ("NAME", vec!["A multiple", "line", "paragraph."])),
            parse_pair(
                "%NAME%
A multiple
line
paragraph.

something else"
            )
            .unwrap()
        );
        assert_eq!(
            ("", ("NAME", vec!["A multiple", "line", "paragraph."])),
            parse_pair(
                "%NAME%
A multiple
line
paragraph.
"
            )
            .unwrap()
        );
    }

    #[test]
    fn whole_desc() {
        let desc = "%FILENAME%
bash-5.1.016-1-x86_64.pkg.tar.zst

%NAME%
bash

%VERSION%
5.1.016-1

%DEPENDS%
readline>=7.0
glibc
ncurses

%PROVIDES%
sh
";
        let fields = parse_str(desc).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["NAME"], vec!["bash"]);
        assert_eq!(fields["DEPENDS"], vec!["readline>=7.0", "glibc", "ncurses"]);
        assert_eq!(fields["PROVIDES"], vec!["sh"]);
        assert!(parse_str("NAME\nbash\n").is_err());
        assert!(parse_str("").unwrap().is_empty());
    }

    #[test]
    fn requirement_lines() {
        assert_eq!(
            parse_package_requirement_line("glibc>=2.33"),
            Ok(("", ("glibc", Some((">=", "2.33")))))
        );
        assert_eq!(
            parse_package_requirement_line("libfoo.so=1-64"),
            Ok(("", ("libfoo.so", Some(("=", "1-64")))))
        );
        assert_eq!(parse_package_requirement_line("sh"), Ok(("", ("sh", None))));
        assert_eq!(
            parse_package_requirement_line("python: for scripts"),
            Ok(("", ("python", None)))
        );
        assert!(parse_package_requirement_line("glibc>=").is_err());
        assert!(parse_package_requirement_line("glibc 2.33").is_err());

        assert_eq!(parse_relation("glibc<2.34").unwrap().to_string(), "glibc (< 2.34)");
        assert_eq!(parse_relation("sh").unwrap().to_string(), "sh (any)");
        assert!(parse_relation("!!").is_err());
    }

    #[test]
    fn pkginfo() {
        let pkginfo = "# Generated by makepkg 6.0.1
# using fakeroot version 1.28
pkgname = bash
pkgbase = bash
pkgver = 5.1.016-1
pkgdesc = The GNU Bourne Again shell
size = 9065553
group = base
depend = readline>=7.0
depend = glibc
depend = ncurses
provides = sh
backup = etc/bash.bashrc
";
        let fields = parse_pkginfo(pkginfo).unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields["NAME"], vec!["bash"]);
        assert_eq!(fields["VERSION"], vec!["5.1.016-1"]);
        assert_eq!(fields["GROUPS"], vec!["base"]);
        assert_eq!(fields["DEPENDS"], vec!["readline>=7.0", "glibc", "ncurses"]);
        assert_eq!(fields["PROVIDES"], vec!["sh"]);
        assert!(parse_pkginfo("pkgdesc =\n").unwrap().is_empty());
        assert_eq!(parse_pkginfo("pkgname=zsh").unwrap()["NAME"], vec!["zsh"]);
        assert!(parse_pkginfo("pkgname bash\n").is_err());
    }
}
