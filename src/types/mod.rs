mod checksum;
mod error;
mod package;
mod relation;
mod version;

pub use checksum::Checksum;
pub use error::EngineError;
pub use package::{PkgId, PkgMeta, RepoFormat, Repository};
pub use relation::{PkgRelation, RequirementGroup};
pub use version::{PkgVersion, RangeOp, VersionRange};
