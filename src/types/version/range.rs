use super::PkgVersion;
use crate::types::EngineError;

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Comparison operators allowed in a requirement line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RangeOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl RangeOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeOp::Lt => "<",
            RangeOp::Le => "<=",
            RangeOp::Gt => ">",
            RangeOp::Ge => ">=",
            RangeOp::Eq => "=",
        }
    }

    /// Check `ver <op> edge`
    pub fn test(&self, ver: &PkgVersion, edge: &PkgVersion) -> bool {
        let res = ver.cmp(edge);
        match self {
            RangeOp::Lt => res == Ordering::Less,
            RangeOp::Le => res != Ordering::Greater,
            RangeOp::Gt => res == Ordering::Greater,
            RangeOp::Ge => res != Ordering::Less,
            RangeOp::Eq => res == Ordering::Equal,
        }
    }
}

impl FromStr for RangeOp {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(RangeOp::Lt),
            "<=" => Ok(RangeOp::Le),
            ">" => Ok(RangeOp::Gt),
            ">=" => Ok(RangeOp::Ge),
            "=" => Ok(RangeOp::Eq),
            _ => Err(EngineError::UnsupportedOperator(s.to_owned())),
        }
    }
}

impl fmt::Display for RangeOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of acceptable versions: either everything, or one side of (or a
/// single point on) the version line.
#[derive(Clone, Debug)]
pub enum VersionRange {
    Any,
    Lt(PkgVersion),
    Le(PkgVersion),
    Gt(PkgVersion),
    Ge(PkgVersion),
    Eq(PkgVersion),
}

impl Default for VersionRange {
    fn default() -> Self {
        VersionRange::Any
    }
}

impl VersionRange {
    pub fn new(op: RangeOp, edge: PkgVersion) -> Self {
        match op {
            RangeOp::Lt => VersionRange::Lt(edge),
            RangeOp::Le => VersionRange::Le(edge),
            RangeOp::Gt => VersionRange::Gt(edge),
            RangeOp::Ge => VersionRange::Ge(edge),
            RangeOp::Eq => VersionRange::Eq(edge),
        }
    }

    /// Parse a `<op> <version>` item as found in requirement lines
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let s = s.trim();
        if s == "any" {
            return Ok(VersionRange::Any);
        }
        let mut parts = s.split_whitespace();
        let (op, edge) = match (parts.next(), parts.next(), parts.next()) {
            (Some(op), Some(edge), None) => (op, edge),
            _ => return Err(EngineError::MalformedRange(s.to_owned())),
        };
        Ok(VersionRange::new(op.parse()?, PkgVersion::try_from(edge)?))
    }

    pub fn op(&self) -> Option<RangeOp> {
        self.bound().map(|(op, _)| op)
    }

    pub fn edge(&self) -> Option<&PkgVersion> {
        self.bound().map(|(_, edge)| edge)
    }

    fn bound(&self) -> Option<(RangeOp, &PkgVersion)> {
        match self {
            VersionRange::Any => None,
            VersionRange::Lt(v) => Some((RangeOp::Lt, v)),
            VersionRange::Le(v) => Some((RangeOp::Le, v)),
            VersionRange::Gt(v) => Some((RangeOp::Gt, v)),
            VersionRange::Ge(v) => Some((RangeOp::Ge, v)),
            VersionRange::Eq(v) => Some((RangeOp::Eq, v)),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VersionRange::Any)
    }

    /// Check if a version is accepted by this range
    pub fn contains(&self, ver: &PkgVersion) -> bool {
        match self.bound() {
            None => true,
            Some((op, edge)) => op.test(ver, edge),
        }
    }

    /// Check if some version could be accepted by both ranges
    pub fn intersects(&self, other: &VersionRange) -> bool {
        use VersionRange::*;
        match (self, other) {
            (Any, _) | (_, Any) => true,
            (Eq(x), r) | (r, Eq(x)) => r.contains(x),
            // Both extend to the same infinity
            (Lt(_) | Le(_), Lt(_) | Le(_)) | (Gt(_) | Ge(_), Gt(_) | Ge(_)) => true,
            (upper @ (Lt(_) | Le(_)), lower @ (Gt(_) | Ge(_)))
            | (lower @ (Gt(_) | Ge(_)), upper @ (Lt(_) | Le(_))) => {
                let inclusive = matches!(upper, Le(_)) && matches!(lower, Ge(_));
                // Both are bounded here, the edges always exist
                match (upper.edge(), lower.edge()) {
                    (Some(x), Some(y)) => match y.cmp(x) {
                        Ordering::Less => true,
                        Ordering::Equal => inclusive,
                        Ordering::Greater => false,
                    },
                    _ => true,
                }
            }
        }
    }
}

impl TryFrom<&str> for VersionRange {
    type Error = EngineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        VersionRange::parse(s)
    }
}

/// Ranges compare by operator and the textual edge
impl PartialEq for VersionRange {
    fn eq(&self, other: &Self) -> bool {
        match (self.bound(), other.bound()) {
            (None, None) => true,
            (Some((a_op, a)), Some((b_op, b))) => a_op == b_op && a.same_text(b),
            _ => false,
        }
    }
}

impl Eq for VersionRange {}

impl Hash for VersionRange {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self.bound() {
            None => state.write_u8(0),
            Some((op, edge)) => {
                state.write_u8(1);
                op.hash(state);
                edge.hash_text(state);
            }
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.bound() {
            None => f.write_str("any"),
            Some((op, edge)) => write!(f, "{} {}", op, edge),
        }
    }
}
