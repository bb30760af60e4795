// mpn-core/src/pipeline/engine.rs
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use mpn_common::error::{MpnError, Result as MpnResult};
use mpn_common::pipeline::{BuildSummary, FileOrigin, OutputFile, PipelineEvent, SourceFile};
use threadpool::ThreadPool;
use tokio::sync::broadcast;
use tracing::{debug, error, instrument};

use super::worker;
use crate::context::BuildContext;
use crate::rewrite::{ContentRewriter, PackageTable};

/// Everything one build produced, in emission order.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    pub files: Vec<OutputFile>,
    pub summary: BuildSummary,
}

fn emit(event_tx: Option<&broadcast::Sender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(tx) = event_tx {
        let _ = tx.send(event);
    }
}

/// Runs one build over `inputs`: full extraction, discovery on the worker
/// pool, then the rewrite pass once every destination is known.
///
/// Blocking; callers on an async runtime should use `spawn_blocking`.
#[instrument(skip_all, name = "build_engine", fields(inputs = inputs.len()))]
pub fn run_build(
    ctx: Arc<BuildContext>,
    inputs: Vec<SourceFile>,
    event_tx: Option<broadcast::Sender<PipelineEvent>>,
) -> MpnResult<BuildOutput> {
    let started = Instant::now();
    let event_tx = event_tx.as_ref();
    emit(
        event_tx,
        PipelineEvent::BuildStarted {
            input_count: inputs.len(),
        },
    );
    emit(
        event_tx,
        PipelineEvent::CatalogReady {
            package_count: ctx.catalog().len(),
        },
    );

    let mut full_extracted = Vec::new();
    for entry in &ctx.config().full_extract {
        full_extracted.extend(worker::extract_full(&ctx, entry, event_tx)?);
    }

    let discovered = discover_all(&ctx, &inputs, event_tx)?;

    let mut files = Vec::with_capacity(inputs.len() + full_extracted.len());
    for (input, dependencies) in inputs.into_iter().zip(discovered) {
        files.push(OutputFile {
            relative: input.relative(),
            source_path: input.path,
            contents: input.contents,
            origin: FileOrigin::Input,
        });
        files.extend(dependencies);
    }
    files.extend(full_extracted);

    let rewritten_count = rewrite_all(&ctx, &mut files);
    emit(event_tx, PipelineEvent::RewriteFinished { rewritten_count });

    let summary = summarize(&files, rewritten_count);
    debug!(
        "Build finished: {} inputs, {} dependency files, {} rewritten",
        summary.input_count, summary.dependency_count, summary.rewritten_count
    );
    emit(
        event_tx,
        PipelineEvent::BuildFinished {
            duration_secs: started.elapsed().as_secs_f64(),
            summary: summary.clone(),
        },
    );
    Ok(BuildOutput { files, summary })
}

/// Per-input discovery on a bounded pool. Results are slotted back by input
/// index; the earliest input's failure is the one reported.
fn discover_all(
    ctx: &Arc<BuildContext>,
    inputs: &[SourceFile],
    event_tx: Option<&broadcast::Sender<PipelineEvent>>,
) -> MpnResult<Vec<Vec<OutputFile>>> {
    let mut discovered: Vec<Vec<OutputFile>> = vec![Vec::new(); inputs.len()];
    let num_workers = ctx.config().jobs.max(1);
    let pool = ThreadPool::new(num_workers);
    debug!("Discovery pool started with {} workers.", num_workers);

    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    let mut submitted = 0usize;
    for (index, input) in inputs.iter().enumerate() {
        if input.is_null() {
            continue;
        }
        let ctx = Arc::clone(ctx);
        let input = input.clone();
        let result_tx = result_tx.clone();
        let event_tx = event_tx.cloned();
        submitted += 1;
        pool.execute(move || {
            let result = worker::discover_input(&ctx, &input, event_tx.as_ref());
            if let Err(e) = &result {
                if let Some(tx) = &event_tx {
                    let _ = tx.send(PipelineEvent::file_failed(input.path.clone(), e));
                }
            }
            let _ = result_tx.send((index, result));
        });
    }
    drop(result_tx);

    let mut first_error: Option<(usize, MpnError)> = None;
    for (index, result) in result_rx.iter() {
        match result {
            Ok(files) => discovered[index] = files,
            Err(e) => {
                error!("Discovery failed for {}: {}", inputs[index].path.display(), e);
                if first_error.as_ref().is_none_or(|(first, _)| index < *first) {
                    first_error = Some((index, e));
                }
            }
        }
    }
    pool.join();

    if pool.panic_count() > 0 {
        return Err(MpnError::Worker(format!(
            "{} discovery worker(s) panicked",
            pool.panic_count()
        )));
    }
    if let Some((_, e)) = first_error {
        return Err(e);
    }
    debug!("Discovery finished for {} inputs.", submitted);
    Ok(discovered)
}

fn rewrite_all(ctx: &BuildContext, files: &mut [OutputFile]) -> usize {
    let planner = ctx.planner();
    let table = PackageTable::from_outputs(ctx.catalog(), &planner, files);
    if table.is_empty() {
        return 0;
    }
    let rewriter = ContentRewriter::new(&table).with_resolver(ctx.resolver());

    let mut rewritten = 0;
    for file in files.iter_mut() {
        let kind = file.kind();
        if !kind.is_rewritable() {
            continue;
        }
        let Some(bytes) = file.contents.as_deref() else {
            continue;
        };
        let Ok(text) = std::str::from_utf8(bytes) else {
            debug!("{} is not UTF-8, left as is", file.relative.display());
            continue;
        };
        let updated = rewriter.rewrite(text, kind, &file.source_path, file.relative_dir());
        if updated != text {
            let updated = updated.into_owned();
            file.contents = Some(updated.into_bytes());
            rewritten += 1;
        }
    }
    rewritten
}

fn summarize(files: &[OutputFile], rewritten_count: usize) -> BuildSummary {
    let extracted_packages: BTreeSet<String> = files
        .iter()
        .filter_map(|f| f.origin.plan().map(|plan| plan.package_name.clone()))
        .collect();
    BuildSummary {
        input_count: files.iter().filter(|f| !f.is_dependency()).count(),
        dependency_count: files.iter().filter(|f| f.is_dependency()).count(),
        rewritten_count,
        extracted_packages: extracted_packages.into_iter().collect(),
    }
}
