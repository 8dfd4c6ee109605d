/// Parsers for relation fields of deb control paragraphs, like
/// `libc6 (>= 2.31), awk | mawk:any, debhelper [!hurd-i386] <!nocheck>`
use crate::types::{PkgRelation, PkgVersion, RangeOp, RequirementGroup, VersionRange};

use anyhow::{format_err, Context, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while, take_while1},
    character::complete::{alphanumeric1, char, multispace0, space0},
    combinator::{eof, opt, recognize},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated},
    IResult,
};
use std::convert::TryFrom;

/// (name, Option<(op, version)>)
type RawRelation<'a> = (&'a str, Option<(&'a str, &'a str)>);

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' || c == '_'
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.' || c == '~' || c == ':' || c == '_'
}

// parser combinators
fn parse_package_name(s: &str) -> IResult<&str, &str> {
    recognize(pair(alphanumeric1, take_while(is_name_char)))(s)
}

/// `:any`, `:native`, `:amd64`
fn parse_arch_qualifier(s: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'))(s)
}

fn parse_version_op(s: &str) -> IResult<&str, &str> {
    alt((
        tag("<<"),
        tag("<="),
        tag(">>"),
        tag(">="),
        tag("="),
        tag("<"),
        tag(">"),
    ))(s)
}

fn parse_version_expr(s: &str) -> IResult<&str, (&str, &str)> {
    delimited(
        pair(char('('), space0),
        separated_pair(parse_version_op, space0, take_while1(is_version_char)),
        pair(space0, char(')')),
    )(s)
}

/// `[amd64 !i386]`, only meaningful for source packages
fn parse_arch_restriction(s: &str) -> IResult<&str, &str> {
    delimited(char('['), take_till(|c| c == ']'), char(']'))(s)
}

/// `<!nocheck>`, only meaningful for source packages
fn parse_build_profile(s: &str) -> IResult<&str, &str> {
    delimited(char('<'), take_till(|c| c == '>'), char('>'))(s)
}

fn parse_relational(s: &str) -> IResult<&str, RawRelation> {
    let (s, name) = parse_package_name(s)?;
    let (s, _) = opt(parse_arch_qualifier)(s)?;
    let (s, version) = opt(preceded(space0, parse_version_expr))(s)?;
    let (s, _) = many0(preceded(space0, parse_arch_restriction))(s)?;
    let (s, _) = many0(preceded(space0, parse_build_profile))(s)?;
    Ok((s, (name, version)))
}

fn parse_alternatives(s: &str) -> IResult<&str, Vec<RawRelation>> {
    separated_list1(delimited(multispace0, char('|'), multispace0), parse_relational)(s)
}

fn parse_relation_list(s: &str) -> IResult<&str, Vec<Vec<RawRelation>>> {
    terminated(
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            parse_alternatives,
        ),
        pair(multispace0, eof),
    )(s)
}

fn to_relation((name, version): RawRelation) -> Result<PkgRelation> {
    let range = match version {
        Some((op, edge)) => {
            let op = match op {
                "<<" => RangeOp::Lt,
                ">>" => RangeOp::Gt,
                op => op.parse()?,
            };
            VersionRange::new(op, PkgVersion::try_from(edge)?)
        }
        None => VersionRange::Any,
    };
    Ok(PkgRelation::new(name, range))
}

/// Parse a `Depends`-like field. Each comma separated item is one group.
pub fn parse_requirements(s: &str) -> Result<Vec<RequirementGroup>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }

    let (_, groups) =
        parse_relation_list(s).map_err(|e| format_err!("malformed relation list {s:?}: {e}"))?;
    let mut res = Vec::with_capacity(groups.len());
    for alternatives in groups {
        let relations = alternatives
            .into_iter()
            .map(to_relation)
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("bad relation in {s:?}"))?;
        res.push(RequirementGroup::new(relations));
    }
    Ok(res)
}

/// Parse a `Provides` field. Alternatives make no sense there, so they are flattened.
pub fn parse_relations(s: &str) -> Result<Vec<PkgRelation>> {
    Ok(parse_requirements(s)?
        .iter()
        .flat_map(|group| group.iter().cloned())
        .collect())
}
