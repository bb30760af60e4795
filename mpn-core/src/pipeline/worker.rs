// mpn-core/src/pipeline/worker.rs
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use mpn_common::error::{MpnError, Result as MpnResult};
use mpn_common::model::{FileKind, PackageSpecifier, RelocationPlan};
use mpn_common::pipeline::{FileOrigin, OutputFile, PipelineEvent, SourceFile};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::components::ComponentWalker;
use crate::context::BuildContext;
use crate::graph::DependencyGraphBuilder;

/// Dependencies an input is the first to claim, in discovery order.
#[instrument(skip_all, fields(input = %input.path.display()))]
pub(super) fn discover_input(
    ctx: &BuildContext,
    input: &SourceFile,
    event_tx: Option<&broadcast::Sender<PipelineEvent>>,
) -> MpnResult<Vec<OutputFile>> {
    let Some(bytes) = input.contents.as_deref() else {
        return Ok(Vec::new());
    };
    let content = String::from_utf8_lossy(bytes);
    let mut discovery = Discovery::new(ctx, event_tx);
    discovery.walk(&input.path, Some(&content))?;
    discovery.drain()?;
    Ok(discovery.outputs)
}

/// Copies every file under one `full_extract` entry.
#[instrument(skip(ctx, event_tx))]
pub(super) fn extract_full(
    ctx: &BuildContext,
    entry: &str,
    event_tx: Option<&broadcast::Sender<PipelineEvent>>,
) -> MpnResult<Vec<OutputFile>> {
    let parsed = PackageSpecifier::parse(entry);
    let Some(name) = parsed.package_name() else {
        warn!("[mpn] Full extraction entry '{}' does not name a package", entry);
        return Ok(Vec::new());
    };
    let Some(package) = ctx.catalog().get(name) else {
        warn!("[mpn] Full extraction entry '{}' is not installed", entry);
        return Ok(Vec::new());
    };
    let dir = match parsed.subpath() {
        Some(sub) => package.content_root().join(sub),
        None => package.content_root().to_path_buf(),
    };
    if !dir.is_dir() {
        warn!(
            "[mpn] Full extraction entry '{}' has no directory at {}",
            entry,
            dir.display()
        );
        return Ok(Vec::new());
    }

    let mut discovery = Discovery::new(ctx, event_tx);
    for file in files_under(&dir) {
        discovery.inject(&file, &package.name, false, FileOrigin::FullExtract)?;
    }
    let file_count = discovery.outputs.len();
    discovery.drain()?;

    info!("[mpn] Extracted `{}` ({} files)", entry, file_count);
    discovery.emit(PipelineEvent::FullExtractFinished {
        entry: entry.to_string(),
        file_count,
    });
    Ok(discovery.outputs)
}

struct Discovery<'a> {
    ctx: &'a BuildContext,
    event_tx: Option<&'a broadcast::Sender<PipelineEvent>>,
    /// Injected files whose own references still need walking.
    pending: VecDeque<PathBuf>,
    outputs: Vec<OutputFile>,
}

impl<'a> Discovery<'a> {
    fn new(ctx: &'a BuildContext, event_tx: Option<&'a broadcast::Sender<PipelineEvent>>) -> Self {
        Self {
            ctx,
            event_tx,
            pending: VecDeque::new(),
            outputs: Vec::new(),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn walk(&mut self, path: &Path, content: Option<&str>) -> MpnResult<()> {
        match FileKind::from_path(path) {
            FileKind::Script | FileKind::Stylesheet => self.extract_dependencies(path, content),
            FileKind::Manifest => self.extract_components(path, content),
            FileKind::Other => Ok(()),
        }
    }

    fn drain(&mut self) -> MpnResult<()> {
        while let Some(path) = self.pending.pop_front() {
            self.walk(&path, None)?;
        }
        Ok(())
    }

    fn extract_dependencies(&mut self, path: &Path, content: Option<&str>) -> MpnResult<()> {
        let graph = DependencyGraphBuilder::new(self.ctx).build(path, content);
        let planner = self.ctx.planner();
        for node in graph.iter() {
            if !self.ctx.claim_file(&node.resolved_path) {
                continue;
            }
            let is_main_entry = node.is_main_entry
                || planner.is_main_file(&node.resolved_path, &node.package_name);
            let Some(plan) = planner.plan(&node.resolved_path, &node.package_name, is_main_entry)
            else {
                debug!(
                    "No destination for {}, leaving it out",
                    node.resolved_path.display()
                );
                continue;
            };
            if node.is_root_level {
                info!("[mpn] Extracted `{}`", node.specifier);
                self.emit(PipelineEvent::DependencyExtracted {
                    specifier: node.specifier.clone(),
                    package_name: node.package_name.clone(),
                });
            }
            self.push(plan, FileOrigin::Dependency)?;
        }
        Ok(())
    }

    fn extract_components(&mut self, path: &Path, content: Option<&str>) -> MpnResult<()> {
        let graph = ComponentWalker::new(self.ctx).walk(path, content);
        for node in graph.iter() {
            if !self.ctx.claim_component(&node.directory) {
                continue;
            }
            if node.is_root_level {
                info!("[mpn] Extracted `{}`", node.specifier);
                self.emit(PipelineEvent::ComponentExtracted {
                    specifier: node.specifier.clone(),
                    package_name: node.package_name.clone(),
                });
            }
            for file in files_under(&node.directory) {
                self.inject(&file, &node.package_name, true, FileOrigin::Component)?;
            }
        }
        Ok(())
    }

    /// Copies a file found by directory listing and queues it for its own walk.
    /// With `detect_main`, the package's main file still gets its canonical name.
    fn inject(
        &mut self,
        file: &Path,
        package_name: &str,
        detect_main: bool,
        origin: fn(RelocationPlan) -> FileOrigin,
    ) -> MpnResult<()> {
        if !self.ctx.claim_file(file) {
            return Ok(());
        }
        let planner = self.ctx.planner();
        let is_main_entry = detect_main && planner.is_main_file(file, package_name);
        let Some(plan) = planner.plan(file, package_name, is_main_entry) else {
            debug!("No destination for {}, leaving it out", file.display());
            return Ok(());
        };
        self.push(plan, origin)?;
        if FileKind::from_path(file).is_rewritable() {
            self.pending.push_back(file.to_path_buf());
        }
        Ok(())
    }

    fn push(&mut self, plan: RelocationPlan, origin: fn(RelocationPlan) -> FileOrigin) -> MpnResult<()> {
        let contents = fs::read(&plan.source_path).map_err(|e| MpnError::copy(&plan.source_path, e))?;
        self.outputs.push(OutputFile {
            source_path: plan.source_path.clone(),
            relative: plan.relative_destination().to_path_buf(),
            contents: Some(contents),
            origin: origin(plan),
        });
        Ok(())
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!("Error listing {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}
