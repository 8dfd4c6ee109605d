use crate::types::EngineError;

use nom::{
    bytes::complete::take_while1,
    character::complete::{char, digit1},
    combinator::{eof, opt},
    sequence::terminated,
    IResult,
};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A package version in the shape of `[epoch:]version[-release]`.
///
/// Equality follows the ordering, not the structure: a version without a
/// release equals every release of the same upstream version, so `1.2`
/// equals both `1.2-1` and `1.2-45`.
#[derive(Clone, Debug)]
pub struct PkgVersion {
    pub epoch: u64,
    pub version: Vec<String>,
    pub release: Option<Vec<String>>,
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '+' || c == '~' || c == '_' || c == '-'
}

fn parse_version(i: &str) -> IResult<&str, (Option<&str>, &str)> {
    let (i, epoch) = opt(terminated(digit1, char(':')))(i)?;
    let (i, rest) = take_while1(is_version_char)(i)?;
    let (i, _) = eof(i)?;
    Ok((i, (epoch, rest)))
}

fn split_segments(s: &str) -> Vec<String> {
    s.split('.').map(|x| x.to_owned()).collect()
}

impl TryFrom<&str> for PkgVersion {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let (_, (epoch, rest)) =
            parse_version(s).map_err(|e| EngineError::malformed_version(s, e.to_string()))?;
        let epoch = match epoch {
            Some(e) => e
                .parse()
                .map_err(|_| EngineError::malformed_version(s, "epoch out of range"))?,
            None => 0,
        };
        // Upstream versions may contain '-', the release is what follows the last one
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => {
                if r.is_empty() {
                    return Err(EngineError::malformed_version(s, "empty release"));
                }
                (v, Some(r))
            }
            None => (rest, None),
        };
        if version.is_empty() {
            return Err(EngineError::malformed_version(s, "empty version"));
        }

        Ok(PkgVersion {
            epoch,
            version: split_segments(version),
            release: release.map(split_segments),
        })
    }
}

impl FromStr for PkgVersion {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PkgVersion::try_from(s)
    }
}

impl PkgVersion {
    /// Compare the textual form, unlike `==` which follows the ordering
    pub fn same_text(&self, other: &PkgVersion) -> bool {
        self.epoch == other.epoch && self.version == other.version && self.release == other.release
    }

    /// Feed the textual form into a hasher, consistent with `same_text`
    pub fn hash_text<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.version.hash(state);
        self.release.hash(state);
    }
}

impl fmt::Display for PkgVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version.join("."))?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release.join("."))?;
        }
        Ok(())
    }
}

/// Rank of a character inside a non-digit run.
/// '~' sorts before the end of the run, letters before everything else.
fn order(c: Option<char>) -> i32 {
    match c {
        Some('~') => -1,
        None => 0,
        Some(c) if c.is_ascii_alphabetic() => c as i32,
        Some(c) => c as i32 + 256,
    }
}

fn split_run(s: &str, digits: bool) -> (&str, &str) {
    let end = s
        .find(|c: char| c.is_ascii_digit() != digits)
        .unwrap_or(s.len());
    s.split_at(end)
}

fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_token(mut a: &str, mut b: &str) -> Ordering {
    while !a.is_empty() || !b.is_empty() {
        let (a_alpha, a_rest) = split_run(a, false);
        let (b_alpha, b_rest) = split_run(b, false);
        let mut a_chars = a_alpha.chars();
        let mut b_chars = b_alpha.chars();
        loop {
            let (x, y) = (a_chars.next(), b_chars.next());
            if x.is_none() && y.is_none() {
                break;
            }
            match order(x).cmp(&order(y)) {
                Ordering::Equal => (),
                res => return res,
            }
        }

        let (a_num, a_rest) = split_run(a_rest, true);
        let (b_num, b_rest) = split_run(b_rest, true);
        match cmp_numeric(a_num, b_num) {
            Ordering::Equal => (),
            res => return res,
        }
        a = a_rest;
        b = b_rest;
    }
    Ordering::Equal
}

fn cmp_segments(a: &[String], b: &[String]) -> Ordering {
    let mut a = a.iter();
    let mut b = b.iter();
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            // The longer one wins, unless what's left is a pre-release marker
            (Some(x), None) => {
                return if x.starts_with('~') {
                    Ordering::Less
                } else {
                    Ordering::Greater
                }
            }
            (None, Some(y)) => {
                return if y.starts_with('~') {
                    Ordering::Greater
                } else {
                    Ordering::Less
                }
            }
            (Some(x), Some(y)) => match cmp_token(x, y) {
                Ordering::Equal => (),
                res => return res,
            },
        }
    }
}

impl Ord for PkgVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => (),
            res => return res,
        }

        match cmp_segments(&self.version, &other.version) {
            Ordering::Equal => (),
            res => return res,
        }

        // A requirement usually names no release, it then matches any of them
        match (&self.release, &other.release) {
            (Some(this), Some(that)) => cmp_segments(this, that),
            _ => Ordering::Equal,
        }
    }
}

impl PartialOrd for PkgVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PkgVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PkgVersion {}
