//! The dependency resolution engine.
//!
//! Packages are fed into a [`PackageCatalog`] per repository, catalogs are
//! arranged by priority in a [`DependencyForest`], and the forest computes
//! the closure of a set of requirements.
mod catalog;
mod forest;
mod index;

pub use catalog::PackageCatalog;
pub use forest::{DependencyForest, MandatoryPolicy};
