//! Building trees from JSON files, directories and path mappings.
//!
//! The loader produces unlinked trees; each construction entry point runs
//! reference resolution before handing the tree back.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use generational_arena::Index;
use indexmap::IndexMap;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::arena::ConfigTree;
use crate::errors::{ConfigError, ConfigResult};
use crate::resolver::{resolve_references, Delimiters};
use crate::value::Value;

/// Loads configuration trees and resolves their references.
///
/// Carries the reference delimiters, so the syntax is a property of the load
/// rather than process-wide state.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    delimiters: Delimiters,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self { delimiters }
    }

    /// Load a mapping of logical name to file-or-directory path.
    ///
    /// The returned root carries one child per mapping entry, in mapping
    /// order, references resolved.
    #[instrument(level = "debug", skip(self, sources))]
    pub fn load_sources(
        &self,
        sources: &IndexMap<String, PathBuf>,
        name: &str,
    ) -> ConfigResult<ConfigTree> {
        let mut tree = ConfigTree::new(name);
        let root = tree.root();
        for (child_name, path) in sources {
            let path = expand_path(path);
            if is_json_file(&path) {
                self.load_file(&mut tree, root, child_name, &path)?;
            } else {
                self.load_directory(&mut tree, root, child_name, &path)?;
            }
        }
        resolve_references(&mut tree, &self.delimiters);
        Ok(tree)
    }

    /// Load a single `.json` file or a directory, dispatching on the path.
    ///
    /// For a file the root's children are the file's top-level fields; for a
    /// directory they are the directory's entries.
    #[instrument(level = "debug", skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn load_path(&self, path: impl AsRef<Path>, name: &str) -> ConfigResult<ConfigTree> {
        let path = expand_path(path.as_ref());
        let mut tree = ConfigTree::new(name);
        let root = tree.root();

        if is_json_file(&path) {
            let map = read_json_object(&path)?;
            load_dict(&mut tree, root, map);
        } else if path.is_dir() {
            self.load_dir_into(&mut tree, root, &path)?;
        } else {
            return Err(ConfigError::NotADirectory(path));
        }

        resolve_references(&mut tree, &self.delimiters);
        Ok(tree)
    }

    /// Parse one JSON file into a child node named `name` under `parent`.
    ///
    /// Malformed content is fatal; nothing is partially loaded.
    pub fn load_file(
        &self,
        tree: &mut ConfigTree,
        parent: Index,
        name: &str,
        path: &Path,
    ) -> ConfigResult<Index> {
        let map = read_json_object(path)?;
        let node = tree.insert_node(name, parent);
        load_dict(tree, node, map);
        Ok(node)
    }

    /// Load a directory as a child node named `name` under `parent`: one
    /// child per `.json` file (named by stem) or subdirectory, in name order.
    pub fn load_directory(
        &self,
        tree: &mut ConfigTree,
        parent: Index,
        name: &str,
        path: &Path,
    ) -> ConfigResult<Index> {
        if !path.is_dir() {
            return Err(ConfigError::NotADirectory(path.to_path_buf()));
        }
        let node = tree.insert_node(name, parent);
        self.load_dir_into(tree, node, path)?;
        Ok(node)
    }

    fn load_dir_into(&self, tree: &mut ConfigTree, node: Index, path: &Path) -> ConfigResult<()> {
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(e) => e,
                Err(err) if is_permission_denied(&err) => {
                    debug!(dir = %path.display(), "skipping unreadable entry");
                    continue;
                }
                Err(err) => {
                    let at = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| path.to_path_buf());
                    return Err(ConfigError::Io {
                        path: at,
                        source: err.into(),
                    });
                }
            };

            let entry_path = entry.path();
            if entry.file_type().is_dir() {
                match fs::read_dir(entry_path) {
                    Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
                        debug!(dir = %entry_path.display(), "skipping unreadable directory");
                    }
                    _ => {
                        if let Some(dir_name) = file_name_str(entry_path) {
                            self.load_directory(tree, node, &dir_name, entry_path)?;
                        }
                    }
                }
            } else if is_json_file(entry_path) {
                let Some(stem) = file_stem_str(entry_path) else {
                    continue;
                };
                match self.load_file(tree, node, &stem, entry_path) {
                    Err(ConfigError::Io { path, source })
                        if source.kind() == io::ErrorKind::PermissionDenied =>
                    {
                        debug!(file = %path.display(), "skipping unreadable file");
                    }
                    other => {
                        other?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Load a parsed JSON object into `node`: nested objects become child nodes,
/// everything else is stored as a leaf under its key, in document order.
pub fn load_dict(
    tree: &mut ConfigTree,
    node: Index,
    map: serde_json::Map<String, serde_json::Value>,
) {
    for (key, value) in map {
        match value {
            serde_json::Value::Object(nested) => {
                let child = tree.insert_node(key.as_str(), node);
                load_dict(tree, child, nested);
            }
            other => tree.set(node, key, Value::from_json(other)),
        }
    }
}

/// Combine finished trees under a fresh parent named `name`.
///
/// References resolved inside each tree stay live; no re-resolution happens.
pub fn join(trees: Vec<ConfigTree>, name: &str) -> ConfigTree {
    let mut parent = ConfigTree::new(name);
    let root = parent.root();
    for tree in trees {
        parent.graft(tree, root);
    }
    parent
}

fn read_json_object(path: &Path) -> ConfigResult<serde_json::Map<String, serde_json::Value>> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let parsed: serde_json::Value =
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match parsed {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ConfigError::NotAnObject(path.to_path_buf())),
    }
}

/// Expand `~` and environment variables in a user-supplied path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(raw.as_ref()) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

fn is_json_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

fn is_permission_denied(err: &walkdir::Error) -> bool {
    err.io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
}

fn file_name_str(path: &Path) -> Option<String> {
    path.file_name().and_then(|n| n.to_str()).map(str::to_string)
}

fn file_stem_str(path: &Path) -> Option<String> {
    path.file_stem().and_then(|n| n.to_str()).map(str::to_string)
}
