// mpn-core/src/resolve/host.rs
//! Filesystem module resolution: given a base directory and a specifier,
//! find the file a node-style loader would pick.
use std::path::{Path, PathBuf};

use mpn_common::config::{PACKAGE_MANIFEST_FILENAME, PACKAGE_TREE_DIRNAME};
use mpn_common::manifest::PackageManifest;
use mpn_common::model::path::normalize;
use mpn_common::model::PackageSpecifier;
use tracing::trace;

pub trait ModuleResolver: Send + Sync {
    /// Absolute path of the file `specifier` refers to from `base_dir`.
    fn resolve(&self, base_dir: &Path, specifier: &str) -> Option<PathBuf>;
}

const DEFAULT_EXTENSIONS: &[&str] = &[".js", ".json", ".wxs"];

#[derive(Debug, Clone)]
pub struct NodeResolver {
    extensions: Vec<String>,
}

impl Default for NodeResolver {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl NodeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    fn load_as_file(&self, target: &Path) -> Option<PathBuf> {
        if target.is_file() {
            return Some(target.to_path_buf());
        }
        let raw = target.as_os_str().to_string_lossy();
        self.extensions
            .iter()
            .map(|ext| PathBuf::from(format!("{raw}{ext}")))
            .find(|candidate| candidate.is_file())
    }

    fn load_index(&self, dir: &Path) -> Option<PathBuf> {
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("index{ext}")))
            .find(|candidate| candidate.is_file())
    }

    fn load_as_directory(&self, dir: &Path) -> Option<PathBuf> {
        if !dir.is_dir() {
            return None;
        }
        let manifest_path = dir.join(PACKAGE_MANIFEST_FILENAME);
        if manifest_path.is_file() {
            let manifest = PackageManifest::load(&manifest_path);
            if let Some(main) = manifest.main.as_deref().filter(|m| !m.trim().is_empty()) {
                let main_target = normalize(&dir.join(main));
                if let Some(found) = self
                    .load_as_file(&main_target)
                    .or_else(|| self.load_index(&main_target))
                {
                    return Some(found);
                }
                trace!(
                    "'main' of {} does not resolve, falling back to index",
                    manifest_path.display()
                );
            }
        }
        self.load_index(dir)
    }

    fn load_path(&self, target: &Path) -> Option<PathBuf> {
        let target = normalize(target);
        self.load_as_file(&target)
            .or_else(|| self.load_as_directory(&target))
    }
}

impl ModuleResolver for NodeResolver {
    fn resolve(&self, base_dir: &Path, specifier: &str) -> Option<PathBuf> {
        match PackageSpecifier::parse(specifier) {
            PackageSpecifier::Empty => None,
            PackageSpecifier::Absolute(path) => self.load_path(Path::new(&path)),
            PackageSpecifier::Relative(path) => self.load_path(&base_dir.join(path)),
            PackageSpecifier::Scoped { .. } | PackageSpecifier::Plain { .. } => {
                let specifier = specifier.replace('\\', "/");
                base_dir
                    .ancestors()
                    .filter(|dir| !dir.ends_with(PACKAGE_TREE_DIRNAME))
                    .map(|dir| dir.join(PACKAGE_TREE_DIRNAME).join(&specifier))
                    .find_map(|candidate| self.load_path(&candidate))
            }
        }
    }
}
