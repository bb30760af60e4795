// mpn/src/cli/graph.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Args;
use colored::Colorize;
use mpn_common::config::Config;
use mpn_common::error::{MpnError, Result};
use mpn_common::model::{ComponentGraph, DependencyGraph, FileKind};
use mpn_core::{BuildContext, ComponentWalker, DependencyGraphBuilder};

#[derive(Args, Debug)]
pub struct Graph {
    /// Script, stylesheet or page manifest to inspect
    pub file: PathBuf,
}

impl Graph {
    pub async fn run(&self, config: Config) -> Result<()> {
        let file = if self.file.is_absolute() {
            self.file.clone()
        } else {
            config.project_root().join(&self.file)
        };
        if !file.is_file() {
            return Err(MpnError::NotFound(format!("{} is not a file", file.display())));
        }

        let root = config.project_root().to_path_buf();
        let ctx = BuildContext::new(config);
        println!("{}", display_path(&file, &root).bold());

        let lines = match FileKind::from_path(&file) {
            FileKind::Script | FileKind::Stylesheet => {
                let graph = DependencyGraphBuilder::new(&ctx).build(&file, None);
                render_dependency_tree(&graph, &root)
            }
            FileKind::Manifest => {
                let graph = ComponentWalker::new(&ctx).walk(&file, None);
                render_component_tree(&graph, &root)
            }
            FileKind::Other => Vec::new(),
        };

        if lines.is_empty() {
            println!("{}", "  (no package references)".dimmed());
        }
        for line in lines {
            println!("{line}");
        }
        Ok(())
    }
}

fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// One line per edge, children indented below their parent. Nodes reached
/// again are printed once more without their subtree.
pub fn render_dependency_tree(graph: &DependencyGraph, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut expanded = HashSet::new();
    for key in &graph.roots {
        push_dependency(graph, key, root, 1, &mut expanded, &mut lines);
    }
    lines
}

fn push_dependency(
    graph: &DependencyGraph,
    key: &Path,
    root: &Path,
    depth: usize,
    expanded: &mut HashSet<PathBuf>,
    lines: &mut Vec<String>,
) {
    let Some(node) = graph.get(key) else {
        return;
    };
    let first = expanded.insert(key.to_path_buf());
    lines.push(format!(
        "{}{} -> {} [{}]{}{}",
        "  ".repeat(depth),
        node.specifier,
        display_path(&node.resolved_path, root),
        node.package_name,
        if node.is_main_entry { " (main)" } else { "" },
        if first || node.children.is_empty() { "" } else { " ..." },
    ));
    if !first {
        return;
    }
    for child in &node.children {
        push_dependency(graph, child, root, depth + 1, expanded, lines);
    }
}

pub fn render_component_tree(graph: &ComponentGraph, root: &Path) -> Vec<String> {
    let mut lines = Vec::new();
    let mut expanded = HashSet::new();
    for key in &graph.roots {
        push_component(graph, key, root, 1, &mut expanded, &mut lines);
    }
    lines
}

fn push_component(
    graph: &ComponentGraph,
    key: &Path,
    root: &Path,
    depth: usize,
    expanded: &mut HashSet<PathBuf>,
    lines: &mut Vec<String>,
) {
    let Some(node) = graph.nodes.get(key) else {
        return;
    };
    let first = expanded.insert(key.to_path_buf());
    lines.push(format!(
        "{}{} -> {}/ [{}]{}",
        "  ".repeat(depth),
        node.specifier,
        display_path(&node.directory, root),
        node.package_name,
        if first || node.children.is_empty() { "" } else { " ..." },
    ));
    if !first {
        return;
    }
    for child in &node.children {
        push_component(graph, child, root, depth + 1, expanded, lines);
    }
}
