//! Unified configuration trees from directories of JSON files.
//!
//! A configuration is a directory layout of JSON files:
//!
//! ```text
//! config/
//!     servers/
//!         web1.json
//!         db1.json
//!     clusters/
//!         cluster1.json
//! ```
//!
//! Each file holds ordinary JSON, with one special case: a string value of
//! the exact form `<<dotted.path>>` is a reference to another place in the
//! tree. After loading, the resolver repeatedly scans the tree and links
//! every resolvable reference, so `cluster1.json` can point at
//! `<<servers.web1>>` and reach the live `web1` node. Resolution iterates to
//! a fixpoint: references to references and circular references all converge,
//! and anything that never resolves simply stays a literal string.
//!
//! ```no_run
//! use conftree::{load, Value};
//!
//! let config = load("config/", "config")?;
//! let web_server = config.lookup("clusters.cluster1.web_server")?;
//! if let Value::Node(idx) = web_server {
//!     println!("linked to {}", config.canonical_path(idx));
//! }
//! # Ok::<(), conftree::ConfigError>(())
//! ```
//!
//! Writing a mutated tree back to its JSON sources is not supported.

pub mod arena;
pub mod errors;
pub mod loader;
pub mod resolver;
pub mod util;
pub mod value;

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

pub use arena::{ConfigNode, ConfigTree, WalkIter};
pub use errors::{ConfigError, ConfigResult};
pub use generational_arena::Index;
pub use loader::{join, load_dict, Loader};
pub use resolver::{resolve_reference, resolve_references, Delimiters};
pub use value::Value;

/// Load a `.json` file or a directory with default `<<`/`>>` delimiters.
///
/// For a file the returned root's children are the file's top-level fields;
/// for a directory they are the directory's entries. References are resolved
/// before the tree is returned.
pub fn load(path: impl AsRef<Path>, name: &str) -> ConfigResult<ConfigTree> {
    Loader::new().load_path(path, name)
}

/// Load a mapping of logical name to file-or-directory path with default
/// `<<`/`>>` delimiters, one named child per entry.
pub fn load_sources(sources: &IndexMap<String, PathBuf>, name: &str) -> ConfigResult<ConfigTree> {
    Loader::new().load_sources(sources, name)
}
