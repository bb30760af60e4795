// mpn-core/src/catalog.rs
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::config::{PACKAGE_MANIFEST_FILENAME, PACKAGE_TREE_DIRNAME};
use mpn_common::manifest::PackageManifest;
use mpn_common::model::Package;
use tracing::{debug, warn};

use crate::resolve::ModuleResolver;

/// Every installed package below one package tree, scanned once per build.
#[derive(Debug, Clone, Default)]
pub struct PackageCatalog {
    tree_root: PathBuf,
    by_root: BTreeMap<PathBuf, Arc<Package>>,
    /// Shallowest package for each name.
    by_name: HashMap<String, Arc<Package>>,
}

impl PackageCatalog {
    pub fn empty(tree_root: impl Into<PathBuf>) -> Self {
        Self {
            tree_root: tree_root.into(),
            ..Default::default()
        }
    }

    /// Walks the package tree breadth first, nested trees included.
    ///
    /// Never fails: unreadable directories and manifests only affect the
    /// package they belong to.
    pub fn build(tree_root: &Path, resolver: &dyn ModuleResolver) -> Self {
        let mut catalog = Self::empty(tree_root);
        if !tree_root.is_dir() {
            debug!(
                "[CATALOG] Package tree {} does not exist, catalog is empty",
                tree_root.display()
            );
            return catalog;
        }

        let mut queue: VecDeque<PathBuf> = VecDeque::from([tree_root.to_path_buf()]);
        while let Some(tree_dir) = queue.pop_front() {
            for (name, package_dir) in list_package_dirs(&tree_dir) {
                let package = read_package(&name, &package_dir, resolver);
                catalog.insert(package);

                let nested = package_dir.join(PACKAGE_TREE_DIRNAME);
                if nested.is_dir() {
                    queue.push_back(nested);
                }
            }
        }

        debug!(
            "[CATALOG] Scanned {} packages ({} distinct names) under {}",
            catalog.by_root.len(),
            catalog.by_name.len(),
            tree_root.display()
        );
        catalog
    }

    pub fn insert(&mut self, package: Package) {
        let package = Arc::new(package);
        self.by_name
            .entry(package.name.clone())
            .or_insert_with(|| Arc::clone(&package));
        self.by_root.insert(package.root.clone(), package);
    }

    pub fn tree_root(&self) -> &Path {
        &self.tree_root
    }

    pub fn len(&self) -> usize {
        self.by_root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_root.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Package>> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The package named `name` that a loader in `from_dir` would see: the
    /// closest `node_modules/<name>` among the ancestors, else the shallowest.
    pub fn nearest(&self, name: &str, from_dir: &Path) -> Option<&Arc<Package>> {
        from_dir
            .ancestors()
            .filter(|dir| !dir.ends_with(PACKAGE_TREE_DIRNAME))
            .find_map(|dir| {
                self.by_root
                    .get(&dir.join(PACKAGE_TREE_DIRNAME).join(name))
            })
            .or_else(|| self.get(name))
    }

    /// The innermost package whose root contains `path`.
    pub fn owner_of(&self, path: &Path) -> Option<&Arc<Package>> {
        path.ancestors().find_map(|dir| self.by_root.get(dir))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Package>> {
        self.by_root.values()
    }
}

/// `(name, dir)` of every package directly inside one `node_modules`.
fn list_package_dirs(tree_dir: &Path) -> Vec<(String, PathBuf)> {
    let mut found = Vec::new();
    let entries = match fs::read_dir(tree_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(
                "[CATALOG] Failed to read package tree {}: {}. Skipping.",
                tree_dir.display(),
                e
            );
            return found;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    "[CATALOG] Error reading an entry in {}: {}. Skipping entry.",
                    tree_dir.display(),
                    e
                );
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).map(String::from) else {
            debug!("[CATALOG] Skipping non UTF-8 entry {}", path.display());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        if name.starts_with('@') {
            match fs::read_dir(&path) {
                Ok(scoped) => {
                    for scoped_entry in scoped.flatten() {
                        let scoped_path = scoped_entry.path();
                        let scoped_name = scoped_path.file_name().and_then(|n| n.to_str());
                        if let Some(scoped_name) = scoped_name {
                            if scoped_path.is_dir() && !scoped_name.starts_with('.') {
                                found.push((format!("{name}/{scoped_name}"), scoped_path.clone()));
                            }
                        }
                    }
                }
                Err(e) => warn!(
                    "[CATALOG] Failed to read scope directory {}: {}. Skipping.",
                    path.display(),
                    e
                ),
            }
            continue;
        }
        found.push((name, path));
    }

    found.sort();
    found
}

fn read_package(name: &str, package_dir: &Path, resolver: &dyn ModuleResolver) -> Package {
    let manifest_path = package_dir.join(PACKAGE_MANIFEST_FILENAME);
    let (manifest, manifest_ok) = match PackageManifest::try_load(&manifest_path) {
        Some(manifest) => (manifest, true),
        None => {
            debug!(
                "[CATALOG:{}] Missing or malformed manifest at {}, treating as ordinary package",
                name,
                manifest_path.display()
            );
            (PackageManifest::default(), false)
        }
    };

    let alternate_output = manifest
        .alternate_output_dirname()
        .filter(|_| manifest_ok)
        .map(|dirname| package_dir.join(dirname))
        .filter(|dir| dir.is_dir());
    if let Some(alt) = &alternate_output {
        debug!(
            "[CATALOG:{}] Alternate output found at {}",
            name,
            alt.display()
        );
    } else if matches!(&manifest.miniprogram, Some(serde_json::Value::String(_))) {
        debug!(
            "[CATALOG:{}] Declared alternate output directory is missing, treating as ordinary package",
            name
        );
    }

    let content_root = alternate_output.as_deref().unwrap_or(package_dir);
    let main_entry = resolver
        .resolve(content_root, &content_root.to_string_lossy())
        .and_then(|main| main.strip_prefix(content_root).ok().map(Path::to_path_buf));
    if main_entry.is_none() {
        debug!("[CATALOG:{}] Main entry does not resolve", name);
    }

    Package {
        name: name.to_string(),
        root: package_dir.to_path_buf(),
        version: manifest.version,
        alternate_output,
        main_entry,
    }
}
