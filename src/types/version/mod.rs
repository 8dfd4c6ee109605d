mod range;
#[allow(clippy::module_inception)]
mod version;

pub use range::{RangeOp, VersionRange};
pub use version::PkgVersion;
