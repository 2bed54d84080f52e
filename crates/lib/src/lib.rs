//! bundler-lib: Core types and logic for the package bundler
//!
//! This crate turns a project and its installed dependency packages into a
//! deployable output tree:
//! - `project`: the immutable project configuration (`bundler.json`)
//! - `package`: resolve the set of packages participating in a build
//! - `manifest`: persisted incremental-build state (clean/dirty partition)
//! - `rules`: map file paths to ordered loader chains
//! - `loader`: the loader interface, content encodings and the loader registry
//! - `transform`: run a file through its loader chain and write the results
//! - `schedule`: bounded-concurrency processing of many files
//! - `report`: per-file loader diagnostics and the build report
//! - `bundle`: the end-to-end pipeline tying everything together

pub mod bundle;
pub mod consts;
pub mod loader;
pub mod manifest;
pub mod package;
pub mod project;
pub mod report;
pub mod rules;
pub mod schedule;
pub mod transform;
pub mod util;
