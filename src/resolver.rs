//! Reference resolution: the fixpoint pass that turns `<<dotted.path>>`
//! strings into live links inside a loaded tree.

use generational_arena::Index;
use tracing::{debug, instrument, trace};

use crate::arena::ConfigTree;
use crate::value::Value;

/// Delimiter pair bounding a reference string.
///
/// Threaded explicitly through [`crate::loader::Loader`] and the resolver
/// instead of living in process-wide state. Changing delimiters never affects
/// already-resolved links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    open: String,
    close: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new("<<", ">>")
    }
}

impl Delimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        let open = open.into();
        let close = close.into();
        debug_assert!(!open.is_empty() && !close.is_empty());
        Self { open, close }
    }

    /// The dotted path inside a reference string, or `None` unless the whole
    /// string is a single delimited reference.
    pub fn strip<'a>(&self, s: &'a str) -> Option<&'a str> {
        let inner = s
            .strip_prefix(self.open.as_str())?
            .strip_suffix(self.close.as_str())?;
        if inner.is_empty() {
            None
        } else {
            Some(inner)
        }
    }

    /// Marker left in `children` once a reference has been linked: the
    /// original literal re-wrapped in swapped delimiters, so later passes no
    /// longer match it.
    pub fn tombstone(&self, literal: &str) -> String {
        format!("{}{}{}", self.close, literal, self.open)
    }
}

/// Look up a reference string against the tree root.
///
/// Returns `None` for anything that is not resolvable this pass: a string
/// that is not reference syntax, a path with a missing segment, or a target
/// that is itself a still-unresolved reference string. The last case makes
/// chained references converge on the final target over later passes instead
/// of linking to an intermediate literal.
pub fn resolve_reference(tree: &ConfigTree, delims: &Delimiters, raw: &str) -> Option<Value> {
    let path = delims.strip(raw)?;
    let mut segments: Vec<&str> = path.split('.').collect();

    // Paths may optionally start with the root's own name
    if let Some(root) = tree.node(tree.root()) {
        if segments.first() == Some(&root.name.as_str()) {
            segments.remove(0);
        }
    }

    let target = tree.descend(tree.root(), &segments).ok()?;
    match &target {
        Value::String(s) if delims.strip(s).is_some() => None,
        _ => Some(target),
    }
}

/// Run reference resolution to fixpoint and return the number of passes.
///
/// Each pass scans every node reachable through owning children and rewrites
/// matching string fields into links and matching list elements into their
/// targets. A pass that changes nothing ends the loop; the pass count is
/// bounded by the longest reference chain, and cycles converge because both
/// ends are tombstoned once linked. Unresolvable references are left as
/// literals, never errors.
#[instrument(level = "debug", skip(tree, delims))]
pub fn resolve_references(tree: &mut ConfigTree, delims: &Delimiters) -> usize {
    let mut passes = 0;
    let mut changed = true;

    while changed {
        changed = false;
        passes += 1;
        let mut linked = 0usize;

        let order: Vec<Index> = tree.walk().map(|(idx, _)| idx).collect();
        for node_idx in order {
            let Some(node) = tree.node(node_idx) else {
                continue;
            };
            let fields: Vec<(String, Value)> = node
                .children
                .iter()
                .filter(|(_, v)| matches!(v, Value::String(_) | Value::List(_)))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            for (name, value) in fields {
                match value {
                    Value::List(items) => {
                        let mut out = Vec::with_capacity(items.len());
                        let mut rewrote = false;
                        for item in items {
                            match item {
                                Value::String(ref s) => {
                                    match resolve_reference(tree, delims, s) {
                                        Some(target) => {
                                            trace!(
                                                field = %name,
                                                reference = %s,
                                                "linked list element"
                                            );
                                            out.push(target);
                                            rewrote = true;
                                            linked += 1;
                                        }
                                        None => out.push(item),
                                    }
                                }
                                other => out.push(other),
                            }
                        }
                        if rewrote {
                            if let Some(n) = tree.node_mut(node_idx) {
                                n.children.insert(name, Value::List(out));
                            }
                            changed = true;
                        }
                    }
                    Value::String(s) => {
                        if let Some(target) = resolve_reference(tree, delims, &s) {
                            trace!(
                                field = %name,
                                reference = %s,
                                at = %tree.canonical_path(node_idx),
                                "linked reference"
                            );
                            if let Some(n) = tree.node_mut(node_idx) {
                                n.reference_children.insert(name.clone(), target);
                                n.children
                                    .insert(name, Value::String(delims.tombstone(&s)));
                            }
                            linked += 1;
                            changed = true;
                        }
                    }
                    _ => {}
                }
            }
        }
        debug!(pass = passes, linked, "resolution pass complete");
    }

    passes
}
