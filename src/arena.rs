//! Arena-based configuration tree.
//!
//! All nodes of one hierarchy live in a single arena; edges are arena
//! indices. Owning edges (`children`) always form a tree, while reference
//! edges (`reference_children`, resolved list elements) may form cycles.

use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use indexmap::IndexMap;
use itertools::Itertools;
use termtree::Tree;
use tracing::{instrument, warn};

use crate::errors::{ConfigError, ConfigResult};
use crate::value::Value;

/// One named point in the configuration hierarchy: a directory, a file, or a
/// nested object within a file.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    /// Identifier, unique among siblings
    pub name: String,
    /// Owned entries in insertion order. Child nodes appear as [`Value::Node`].
    pub children: IndexMap<String, Value>,
    /// Resolved reference links, keyed by field name. Kept apart from
    /// `children` so tree walks cannot re-enter cycles and the original
    /// literal survives as a tombstone.
    pub reference_children: IndexMap<String, Value>,
    /// Arena index of the owning node, `None` only for the root
    pub parent: Option<Index>,
}

impl ConfigNode {
    fn new(name: String, parent: Option<Index>) -> Self {
        Self {
            name,
            children: IndexMap::new(),
            reference_children: IndexMap::new(),
            parent,
        }
    }
}

impl fmt::Display for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Arena-backed tree of [`ConfigNode`]s.
#[derive(Debug)]
pub struct ConfigTree {
    arena: Arena<ConfigNode>,
    root: Index,
}

impl ConfigTree {
    /// Create a tree holding only a root node named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(ConfigNode::new(name.into(), None));
        Self { arena, root }
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn node(&self, idx: Index) -> Option<&ConfigNode> {
        self.arena.get(idx)
    }

    pub fn node_mut(&mut self, idx: Index) -> Option<&mut ConfigNode> {
        self.arena.get_mut(idx)
    }

    /// Create a node named `name` and wire it under `parent`.
    ///
    /// An existing child with the same name is overwritten, last write wins;
    /// the entry keeps its original position in the child order.
    #[instrument(level = "trace", skip(self, parent))]
    pub fn insert_node(&mut self, name: impl Into<String> + fmt::Debug, parent: Index) -> Index {
        let name = name.into();
        let idx = self
            .arena
            .insert(ConfigNode::new(name.clone(), Some(parent)));
        self.attach(parent, name, idx);
        idx
    }

    fn attach(&mut self, parent: Index, name: String, child: Index) {
        let clobbers = self
            .arena
            .get(parent)
            .is_some_and(|n| n.children.contains_key(&name));
        if clobbers {
            warn!(
                name = %name,
                at = %self.canonical_path(parent),
                "duplicate child name, last write wins"
            );
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.insert(name, Value::Node(child));
        }
    }

    /// Record `target` as a resolved link of `node`, keyed by the target's
    /// own name. The target's parent is untouched.
    pub fn append_reference(&mut self, node: Index, target: Index) {
        let Some(name) = self.arena.get(target).map(|n| n.name.clone()) else {
            return;
        };
        if let Some(n) = self.arena.get_mut(node) {
            n.reference_children.insert(name, Value::Node(target));
        }
    }

    /// Fetch a member by name. Resolved links shadow plain children, so a
    /// tombstoned literal never hides the node it was resolved to.
    pub fn get(&self, node: Index, name: &str) -> ConfigResult<&Value> {
        self.arena
            .get(node)
            .and_then(|n| n.reference_children.get(name).or_else(|| n.children.get(name)))
            .ok_or_else(|| self.missing(node, name))
    }

    /// Store a member. Nodes land in `reference_children`, everything else in
    /// `children`; any prior entry under the name is dropped from both maps.
    pub fn set(&mut self, node: Index, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(n) = self.arena.get_mut(node) {
            n.reference_children.shift_remove(&name);
            n.children.shift_remove(&name);
            match value {
                Value::Node(_) => n.reference_children.insert(name, value),
                other => n.children.insert(name, other),
            };
        }
    }

    /// Remove a member, the resolved link first, then the plain child.
    pub fn remove(&mut self, node: Index, name: &str) -> ConfigResult<Value> {
        self.arena
            .get_mut(node)
            .and_then(|n| {
                n.reference_children
                    .shift_remove(name)
                    .or_else(|| n.children.shift_remove(name))
            })
            .ok_or_else(|| self.missing(node, name))
    }

    /// Combined member names: links first, then children not shadowed by a
    /// link of the same name.
    pub fn keys(&self, node: Index) -> impl Iterator<Item = &str> + '_ {
        self.arena.get(node).into_iter().flat_map(|n| {
            let links = n.reference_children.keys().map(String::as_str);
            let plain = n
                .children
                .keys()
                .filter(move |k| !n.reference_children.contains_key(k.as_str()))
                .map(String::as_str);
            links.chain(plain)
        })
    }

    /// Number of distinct member names. A tombstoned literal and its link
    /// count once.
    pub fn len(&self, node: Index) -> usize {
        self.keys(node).count()
    }

    /// Dot-joined name path from the root to `idx`.
    pub fn canonical_path(&self, idx: Index) -> String {
        let mut names = Vec::new();
        let mut cur = Some(idx);
        while let Some(i) = cur {
            match self.arena.get(i) {
                Some(node) => {
                    names.push(node.name.as_str());
                    cur = node.parent;
                }
                None => break,
            }
        }
        names.iter().rev().join(".")
    }

    /// Depth-first pre-order walk over owning children only.
    ///
    /// Reference links are never followed, so the walk terminates even when
    /// references form cycles. Each call starts a fresh traversal.
    pub fn walk(&self) -> WalkIter<'_> {
        WalkIter {
            tree: self,
            stack: vec![self.root],
        }
    }

    /// Walk a dotted path from the root, links shadowing literals at each
    /// step. Nodes come back as [`Value::Node`].
    pub fn lookup(&self, dotted: &str) -> ConfigResult<Value> {
        let segments: Vec<&str> = dotted.split('.').collect();
        self.descend(self.root, &segments)
    }

    /// Walk `segments` down from `from`. Every intermediate step must land on
    /// a node; the final step may land on any value, returned by clone.
    pub(crate) fn descend(&self, from: Index, segments: &[&str]) -> ConfigResult<Value> {
        let mut cur = from;
        for (i, segment) in segments.iter().enumerate() {
            let value = self.get(cur, segment)?;
            if i + 1 == segments.len() {
                return Ok(value.clone());
            }
            match value {
                Value::Node(next) => cur = *next,
                _ => {
                    return Err(ConfigError::MissingMember {
                        name: segments[i + 1].to_string(),
                        path: format!("{}.{}", self.canonical_path(cur), segment),
                    })
                }
            }
        }
        Ok(Value::Node(from))
    }

    /// Move every node of `other` into this arena beneath `parent`, remapping
    /// owning edges, reference links and resolved list elements. Returns the
    /// new index of `other`'s root.
    #[instrument(level = "debug", skip_all)]
    pub fn graft(&mut self, other: ConfigTree, parent: Index) -> Index {
        let order: Vec<Index> = other.walk().map(|(idx, _)| idx).collect();
        let mut remap: HashMap<Index, Index> = HashMap::with_capacity(order.len());
        let mut new_root = parent;

        // Allocate top-down so parents are mapped before their children.
        for &old in &order {
            if let Some(node) = other.arena.get(old) {
                let new_parent = node
                    .parent
                    .and_then(|p| remap.get(&p).copied())
                    .unwrap_or(parent);
                let idx = self
                    .arena
                    .insert(ConfigNode::new(node.name.clone(), Some(new_parent)));
                remap.insert(old, idx);
                if old == other.root {
                    new_root = idx;
                }
            }
        }

        // Carry the edges over through the remap table.
        for &old in &order {
            if let (Some(node), Some(&idx)) = (other.arena.get(old), remap.get(&old)) {
                let children: IndexMap<String, Value> = node
                    .children
                    .iter()
                    .map(|(k, v)| (k.clone(), remap_value(v, &remap)))
                    .collect();
                let references: IndexMap<String, Value> = node
                    .reference_children
                    .iter()
                    .map(|(k, v)| (k.clone(), remap_value(v, &remap)))
                    .collect();
                if let Some(n) = self.arena.get_mut(idx) {
                    n.children = children;
                    n.reference_children = references;
                }
            }
        }

        let name = self
            .arena
            .get(new_root)
            .map(|n| n.name.clone())
            .unwrap_or_default();
        self.attach(parent, name, new_root);
        new_root
    }

    /// Render the owning structure for diagnostics: one line per node, leaf
    /// fields by name, resolved links with their target's canonical path.
    pub fn render(&self) -> Tree<String> {
        self.render_node(self.root)
    }

    fn render_node(&self, idx: Index) -> Tree<String> {
        let Some(node) = self.arena.get(idx) else {
            return Tree::new(String::new());
        };
        let mut leaves = Vec::new();
        for (name, value) in &node.children {
            match value {
                Value::Node(child) => leaves.push(self.render_node(*child)),
                _ => leaves.push(Tree::new(name.clone())),
            }
        }
        for (name, value) in &node.reference_children {
            let target = match value {
                Value::Node(t) => self.canonical_path(*t),
                other => format!("{:?}", other),
            };
            leaves.push(Tree::new(format!("{} -> {}", name, target)));
        }
        Tree::new(node.name.clone()).with_leaves(leaves)
    }

    fn missing(&self, node: Index, name: &str) -> ConfigError {
        ConfigError::MissingMember {
            name: name.to_string(),
            path: self.canonical_path(node),
        }
    }
}

impl fmt::Display for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

fn remap_value(value: &Value, remap: &HashMap<Index, Index>) -> Value {
    match value {
        Value::Node(idx) => Value::Node(remap.get(idx).copied().unwrap_or(*idx)),
        Value::List(items) => Value::List(items.iter().map(|v| remap_value(v, remap)).collect()),
        other => other.clone(),
    }
}

/// Pre-order iterator over owning nodes, insertion order at each level.
pub struct WalkIter<'a> {
    tree: &'a ConfigTree,
    stack: Vec<Index>,
}

impl<'a> Iterator for WalkIter<'a> {
    type Item = (Index, &'a ConfigNode);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = self.tree.arena.get(idx)?;
        // Push children in reverse order for left-to-right traversal
        for value in node.children.values().rev() {
            if let Value::Node(child) = value {
                self.stack.push(*child);
            }
        }
        Some((idx, node))
    }
}
