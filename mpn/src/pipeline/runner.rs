// mpn/src/pipeline/runner.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::config::Config;
use mpn_common::error::{MpnError, Result as MpnResult};
use mpn_common::pipeline::{BuildSummary, PipelineEvent, SourceFile};
use mpn_core::{run_build, write_outputs, BuildContext};
use tokio::sync::broadcast;
use tokio::task::JoinError;
use tracing::{debug, error, instrument, warn};

const EVENT_CHANNEL_SIZE: usize = 256;

pub(crate) fn get_panic_message(e: Box<dyn std::any::Any + Send>) -> String {
    match e.downcast_ref::<&'static str>() {
        Some(s) => (*s).to_string(),
        None => match e.downcast_ref::<String>() {
            Some(s) => s.clone(),
            None => "Unknown panic payload".to_string(),
        },
    }
}

fn join_error(stage: &str, e: JoinError) -> MpnError {
    if e.is_panic() {
        MpnError::Worker(format!(
            "{stage} panicked: {}",
            get_panic_message(e.into_panic())
        ))
    } else {
        MpnError::Worker(format!("{stage} was cancelled"))
    }
}

/// Scans the package tree, runs the engine off the async runtime, then writes
/// the result below `dest`. Status is printed from the event stream.
#[instrument(skip_all, fields(inputs = inputs.len(), dest = %dest.display()))]
pub async fn run_build_pipeline(
    config: Config,
    inputs: Vec<SourceFile>,
    dest: &Path,
) -> MpnResult<BuildSummary> {
    let (event_tx, _) = broadcast::channel::<PipelineEvent>(EVENT_CHANNEL_SIZE);
    let status_handle = tokio::spawn(crate::cli::status::handle_events(event_tx.subscribe()));

    let result = build_and_write(config, inputs, dest.to_path_buf(), event_tx.clone()).await;
    if let Err(e) = &result {
        error!("RUNNER: Build failed: {}", e);
        if event_tx
            .send(PipelineEvent::LogError {
                message: format!("Build failed: {e}"),
            })
            .is_err()
        {
            debug!("RUNNER: No status listener for the failure event");
        }
    }

    drop(event_tx);
    if let Err(e) = status_handle.await {
        warn!("RUNNER: Status handler task failed or panicked: {}", e);
    }
    result
}

async fn build_and_write(
    config: Config,
    inputs: Vec<SourceFile>,
    dest: PathBuf,
    event_tx: broadcast::Sender<PipelineEvent>,
) -> MpnResult<BuildSummary> {
    let engine_tx = event_tx.clone();
    let output = tokio::task::spawn_blocking(move || {
        let ctx = Arc::new(BuildContext::new(config));
        run_build(ctx, inputs, Some(engine_tx))
    })
    .await
    .map_err(|e| join_error("Build engine", e))??;

    let summary = output.summary;
    let files = output.files;
    let written = tokio::task::spawn_blocking(move || {
        write_outputs(&dest, &files)?;
        Ok::<_, MpnError>(files)
    })
    .await
    .map_err(|e| join_error("Output writer", e))??;

    for file in written.iter().filter(|f| f.contents.is_some()) {
        let _ = event_tx.send(PipelineEvent::FileWritten {
            relative: file.relative.clone(),
        });
    }
    Ok(summary)
}
