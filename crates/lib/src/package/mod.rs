//! Packages taking part in a build.
//!
//! [`PackageGraphResolver`] turns the root `package.json` and the packages
//! installed under `node_modules` into a [`ResolvedPackages`] set keyed by
//! [`PackageId`].

mod graph;
mod range;
mod resolve;
mod types;

pub use graph::*;
pub use range::*;
pub use resolve::*;
pub use types::*;
