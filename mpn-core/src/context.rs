// mpn-core/src/context.rs
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use mpn_common::config::Config;
use mpn_common::model::{ComponentRef, Reference};
use tracing::debug;

use crate::catalog::PackageCatalog;
use crate::relocate::RelocationPlanner;
use crate::resolve::{ModuleResolver, NodeResolver, ReferenceResolver};
use crate::scan::{ScanningExtractor, SpecifierExtractor};

/// Per-path memo of computed edges. The map lock only guards slot lookup;
/// the computation itself runs outside of it, once per key.
pub(crate) struct EdgeCache<T> {
    slots: Mutex<HashMap<PathBuf, Arc<OnceLock<T>>>>,
}

impl<T: Clone> EdgeCache<T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get_or_compute(&self, key: &Path, compute: impl FnOnce() -> T) -> T {
        let slot = {
            let mut slots = self.slots.lock().unwrap();
            Arc::clone(slots.entry(key.to_path_buf()).or_default())
        };
        slot.get_or_init(compute).clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Everything one build invocation shares between its workers.
///
/// Created fresh per build, so nothing leaks between invocations.
pub struct BuildContext {
    config: Config,
    catalog: PackageCatalog,
    host: Arc<dyn ModuleResolver>,
    extractor: Arc<dyn SpecifierExtractor>,
    pub(crate) references: EdgeCache<Arc<[Reference]>>,
    pub(crate) components: EdgeCache<Arc<[ComponentRef]>>,
    extracted_files: Mutex<HashSet<PathBuf>>,
    extracted_components: Mutex<HashSet<PathBuf>>,
}

impl BuildContext {
    /// Scans the configured package tree with the built-in collaborators.
    pub fn new(config: Config) -> Self {
        Self::with_collaborators(
            config,
            Arc::new(NodeResolver::new()),
            Arc::new(ScanningExtractor::new()),
        )
    }

    pub fn with_collaborators(
        config: Config,
        host: Arc<dyn ModuleResolver>,
        extractor: Arc<dyn SpecifierExtractor>,
    ) -> Self {
        let catalog = PackageCatalog::build(config.package_tree_dir(), host.as_ref());
        debug!(
            "Build context ready: {} packages, output directory '{}'",
            catalog.len(),
            config.npm_dirname()
        );
        Self {
            config,
            catalog,
            host,
            extractor,
            references: EdgeCache::new(),
            components: EdgeCache::new(),
            extracted_files: Mutex::new(HashSet::new()),
            extracted_components: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &PackageCatalog {
        &self.catalog
    }

    pub fn host(&self) -> &dyn ModuleResolver {
        self.host.as_ref()
    }

    pub fn extractor(&self) -> &dyn SpecifierExtractor {
        self.extractor.as_ref()
    }

    pub fn resolver(&self) -> ReferenceResolver<'_> {
        ReferenceResolver::new(&self.catalog, self.host.as_ref())
    }

    pub fn planner(&self) -> RelocationPlanner<'_> {
        RelocationPlanner::new(&self.catalog, self.config.npm_dirname())
    }

    /// Marks a dependency file as scheduled for copy. `true` only for the
    /// first caller.
    pub fn claim_file(&self, path: &Path) -> bool {
        self.extracted_files.lock().unwrap().insert(path.to_path_buf())
    }

    /// Same as [`BuildContext::claim_file`], keyed by bundle directory.
    pub fn claim_component(&self, directory: &Path) -> bool {
        self.extracted_components
            .lock()
            .unwrap()
            .insert(directory.to_path_buf())
    }

    pub fn extracted_file_count(&self) -> usize {
        self.extracted_files.lock().unwrap().len()
    }

    pub fn memoized_file_count(&self) -> usize {
        self.references.len()
    }
}
