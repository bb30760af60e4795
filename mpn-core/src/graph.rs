// mpn-core/src/graph.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::model::{DependencyGraph, DependencyNode, FileKind, Reference};
use tracing::{debug, trace};

use crate::context::BuildContext;

/// Walks import-like references from one entry file into a flat,
/// de-duplicated [`DependencyGraph`].
///
/// Edges of every file read from disk are memoized in the build context, so
/// a file shared between entries is scanned and resolved once per build.
pub struct DependencyGraphBuilder<'a> {
    ctx: &'a BuildContext,
}

impl<'a> DependencyGraphBuilder<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    /// `content` overrides what is on disk for the entry itself, which is
    /// never part of the returned map.
    pub fn build(&self, entry: &Path, content: Option<&str>) -> DependencyGraph {
        let mut graph = DependencyGraph::new(entry);
        let references: Arc<[Reference]> = match content {
            Some(content) => self.resolve_all(entry, content).into(),
            None => self.edges(entry),
        };

        for reference in references.iter() {
            if let Some(key) = self.visit(&mut graph, reference, true) {
                graph.roots.insert(key);
            }
        }
        debug!(
            "Dependency graph of {}: {} files ({} direct)",
            entry.display(),
            graph.len(),
            graph.roots.len()
        );
        graph
    }

    /// Inserts the node before descending, so a second visit of the same
    /// path (a cycle or a diamond) only links it.
    fn visit(
        &self,
        graph: &mut DependencyGraph,
        reference: &Reference,
        is_root_level: bool,
    ) -> Option<PathBuf> {
        let resolved = reference.resolved_path.as_ref()?;
        let package_name = reference.package_name.as_ref()?;
        if resolved == &graph.entry {
            return None;
        }

        if let Some(node) = graph.nodes.get_mut(resolved) {
            node.is_main_entry |= reference.is_main_entry;
            node.is_root_level |= is_root_level;
            return Some(resolved.clone());
        }

        graph.nodes.insert(
            resolved.clone(),
            DependencyNode {
                resolved_path: resolved.clone(),
                package_name: package_name.clone(),
                specifier: reference.specifier.clone(),
                is_root_level,
                is_main_entry: reference.is_main_entry,
                children: Default::default(),
            },
        );

        let edges = self.edges(resolved);
        let children: Vec<PathBuf> = edges
            .iter()
            .filter_map(|child| self.visit(graph, child, false))
            .collect();
        if let Some(node) = graph.nodes.get_mut(resolved) {
            node.children.extend(children);
        }
        Some(resolved.clone())
    }

    /// Resolved references of a file on disk. Unreadable files have none.
    fn edges(&self, path: &Path) -> Arc<[Reference]> {
        self.ctx.references.get_or_compute(path, || {
            if FileKind::from_path(path) == FileKind::Other {
                return Arc::from(Vec::new());
            }
            match fs::read(path) {
                Ok(bytes) => self
                    .resolve_all(path, &String::from_utf8_lossy(&bytes))
                    .into(),
                Err(e) => {
                    debug!(
                        "Could not read {} for dependency discovery: {}",
                        path.display(),
                        e
                    );
                    Arc::from(Vec::new())
                }
            }
        })
    }

    fn resolve_all(&self, path: &Path, content: &str) -> Vec<Reference> {
        let resolver = self.ctx.resolver();
        self.ctx
            .extractor()
            .extract(path, content)
            .iter()
            .map(|specifier| resolver.resolve(specifier, path))
            .filter(|reference| {
                if !reference.is_resolved() {
                    trace!(
                        "Skipping '{}' in {}: not a managed dependency",
                        reference.specifier,
                        path.display()
                    );
                }
                reference.is_resolved()
            })
            .collect()
    }
}
