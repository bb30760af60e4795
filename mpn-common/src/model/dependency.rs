// mpn-common/src/model/dependency.rs
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A file reachable from a build entry, keyed by its resolved path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub resolved_path: PathBuf,
    pub package_name: String,
    /// Specifier of the first discovery.
    pub specifier: String,
    /// Discovered directly from the entry file.
    pub is_root_level: bool,
    /// Referenced by bare package name at least once.
    pub is_main_entry: bool,
    pub children: BTreeSet<PathBuf>,
}

/// Flattened, de-duplicated view of everything reachable from one entry.
///
/// Every resolved path appears at most once in `nodes`; edges are stored as
/// keys into the same map, so cycles never own each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    pub entry: PathBuf,
    /// Keys discovered directly from the entry, in key order.
    pub roots: BTreeSet<PathBuf>,
    pub nodes: BTreeMap<PathBuf, DependencyNode>,
}

impl DependencyGraph {
    pub fn new(entry: impl Into<PathBuf>) -> Self {
        Self {
            entry: entry.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&DependencyNode> {
        self.nodes.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    pub fn paths(&self) -> BTreeSet<PathBuf> {
        self.nodes.keys().cloned().collect()
    }

    pub fn into_map(self) -> BTreeMap<PathBuf, DependencyNode> {
        self.nodes
    }
}

/// A component bundle directory reachable from a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentNode {
    pub directory: PathBuf,
    pub package_name: String,
    pub specifier: String,
    pub manifest_path: PathBuf,
    pub is_root_level: bool,
    pub children: BTreeSet<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGraph {
    pub manifest: PathBuf,
    pub roots: BTreeSet<PathBuf>,
    pub nodes: BTreeMap<PathBuf, ComponentNode>,
}

impl ComponentGraph {
    pub fn new(manifest: impl Into<PathBuf>) -> Self {
        Self {
            manifest: manifest.into(),
            ..Default::default()
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentNode> {
        self.nodes.values()
    }
}
