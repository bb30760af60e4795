// mpn-core/src/components.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::manifest::{component_declarations, load_json, parse_json};
use mpn_common::model::{ComponentGraph, ComponentNode, ComponentRef};
use serde_json::Value;
use tracing::debug;

use crate::context::BuildContext;

/// Walks component declarations from a manifest into a flat graph keyed by
/// bundle directory.
pub struct ComponentWalker<'a> {
    ctx: &'a BuildContext,
}

impl<'a> ComponentWalker<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        Self { ctx }
    }

    pub fn walk(&self, manifest_path: &Path, content: Option<&str>) -> ComponentGraph {
        let mut graph = ComponentGraph::new(manifest_path);
        let declared: Arc<[ComponentRef]> = match content {
            Some(content) => match parse_json(content) {
                Some(manifest) => self.resolve_all(manifest_path, &manifest).into(),
                None => {
                    debug!(
                        "{} is not a JSON object, no components to walk",
                        manifest_path.display()
                    );
                    Arc::from(Vec::new())
                }
            },
            None => self.edges(manifest_path),
        };

        for component in declared.iter() {
            let key = self.visit(&mut graph, component, true);
            graph.roots.insert(key);
        }
        if !graph.is_empty() {
            debug!(
                "Component graph of {}: {} bundles",
                manifest_path.display(),
                graph.len()
            );
        }
        graph
    }

    fn visit(
        &self,
        graph: &mut ComponentGraph,
        component: &ComponentRef,
        is_root_level: bool,
    ) -> PathBuf {
        let key = component.directory.clone();
        if let Some(node) = graph.nodes.get_mut(&key) {
            node.is_root_level |= is_root_level;
            return key;
        }

        graph.nodes.insert(
            key.clone(),
            ComponentNode {
                directory: key.clone(),
                package_name: component.package_name.clone(),
                specifier: component.specifier.clone(),
                manifest_path: component.manifest_path.clone(),
                is_root_level,
                children: Default::default(),
            },
        );

        // A missing component manifest simply makes this bundle a leaf.
        let nested = self.edges(&component.manifest_path);
        let children: Vec<PathBuf> = nested
            .iter()
            .map(|child| self.visit(graph, child, false))
            .collect();
        if let Some(node) = graph.nodes.get_mut(&key) {
            node.children.extend(children);
        }
        key
    }

    fn edges(&self, manifest_path: &Path) -> Arc<[ComponentRef]> {
        self.ctx.components.get_or_compute(manifest_path, || {
            self.resolve_all(manifest_path, &load_json(manifest_path))
                .into()
        })
    }

    fn resolve_all(&self, manifest_path: &Path, manifest: &Value) -> Vec<ComponentRef> {
        let resolver = self.ctx.resolver();
        component_declarations(manifest)
            .into_iter()
            .filter_map(|(alias, specifier)| {
                let resolved = resolver.resolve_component(&specifier, manifest_path);
                if resolved.is_none() {
                    debug!(
                        "Component '{}' ('{}') in {} is not a managed package",
                        alias,
                        specifier,
                        manifest_path.display()
                    );
                }
                resolved
            })
            .collect()
    }
}
