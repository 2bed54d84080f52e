//! Loader stages and the registry that resolves them by identifier.
//!
//! Loaders are looked up once, when the rule configuration is compiled into a
//! [`crate::rules::RuleMatcher`]; an unknown identifier is a configuration
//! error rather than a failure at first use.

pub mod builtin;
mod encoding;
mod registry;
mod types;

pub use encoding::*;
pub use registry::*;
pub use types::*;
