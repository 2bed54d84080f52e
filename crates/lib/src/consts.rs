//! Well-known file names and default settings.

/// Project configuration file, looked up in the project root.
pub const CONFIG_FILENAME: &str = "bundler.json";

/// Package metadata file name.
pub const PACKAGE_JSON: &str = "package.json";

/// Directory holding installed dependency packages.
pub const NODE_MODULES: &str = "node_modules";

/// Build manifest file name, stored inside the output directory by default.
pub const MANIFEST_FILENAME: &str = ".bundler-manifest.json";

/// Default output directory, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "build";

/// Default source locations of the root package.
pub const DEFAULT_SOURCES: &[&str] = &["src", "assets"];

/// Default ceiling on files processed concurrently.
pub const DEFAULT_MAX_PARALLEL_FILES: usize = 128;

/// Maximum nesting of virtual files emitted by loaders.
pub const MAX_VIRTUAL_FILE_DEPTH: usize = 16;
