// mpn/src/cli/status.rs
use std::time::Instant;

use colored::*;
use mpn_common::pipeline::{BuildSummary, PipelineEvent};
use tokio::sync::broadcast;

struct StatusDisplay {
    start_time: Instant,
    input_count: usize,
    extracted: Vec<String>,
    written: usize,
    logs_buffer: Vec<String>,
    summary: Option<(f64, BuildSummary)>,
}

impl StatusDisplay {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            input_count: 0,
            extracted: Vec::new(),
            written: 0,
            logs_buffer: Vec::new(),
            summary: None,
        }
    }

    /// Folds one event into the display; returns a line to print right away.
    fn apply(&mut self, event: PipelineEvent) -> Option<String> {
        match event {
            PipelineEvent::BuildStarted { input_count } => {
                self.input_count = input_count;
                Some(format!(
                    "{} {} input files",
                    "Building".cyan().bold(),
                    input_count
                ))
            }
            PipelineEvent::CatalogReady { package_count } => Some(format!(
                "{} {} packages",
                "Package tree:".cyan(),
                package_count
            )),
            PipelineEvent::DependencyExtracted {
                specifier,
                package_name,
            }
            | PipelineEvent::ComponentExtracted {
                specifier,
                package_name,
            } => {
                let line = format!(
                    "{} {} ({})",
                    " ✓".green(),
                    specifier.cyan(),
                    package_name.dimmed()
                );
                self.extracted.push(specifier);
                Some(line)
            }
            PipelineEvent::FullExtractFinished { entry, file_count } => Some(format!(
                "{} {} ({} files)",
                " ✓".green().bold(),
                entry.cyan(),
                file_count
            )),
            PipelineEvent::FileFailed { path, error } => {
                self.logs_buffer.push(format!(
                    "{} {}: {}",
                    "✗".red().bold(),
                    path.display().to_string().cyan(),
                    error.red()
                ));
                None
            }
            PipelineEvent::RewriteFinished { .. } => None,
            PipelineEvent::FileWritten { .. } => {
                self.written += 1;
                None
            }
            PipelineEvent::BuildFinished {
                duration_secs,
                summary,
            } => {
                self.summary = Some((duration_secs, summary));
                None
            }
            PipelineEvent::LogWarn { message } => {
                self.logs_buffer.push(message.yellow().to_string());
                None
            }
            PipelineEvent::LogError { message } => {
                self.logs_buffer.push(message.red().to_string());
                None
            }
        }
    }

    fn finish(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some((duration_secs, summary)) = &self.summary {
            lines.push(String::new());
            lines.push(format!(
                "{} in {:.2}s ({} packages, {} dependency files, {} rewritten)",
                "Build finished".bold(),
                duration_secs,
                summary.extracted_packages.len(),
                summary.dependency_count,
                summary.rewritten_count
            ));
        }
        if !self.logs_buffer.is_empty() {
            lines.push(String::new());
            lines.extend(self.logs_buffer.iter().cloned());
        }
        if self.written > 0 {
            lines.push(format!(
                "\n{}: {}  {}: {}  {}: {}  {}: {:.2}s",
                "Inputs".bold(),
                self.input_count,
                "Extracted".cyan().bold(),
                self.extracted.len(),
                "Written".green().bold(),
                self.written,
                "Elapsed".bold(),
                self.start_time.elapsed().as_secs_f64()
            ));
        }
        lines
    }
}

/// Prints build progress until every sender is gone.
pub async fn handle_events(mut event_rx: broadcast::Receiver<PipelineEvent>) {
    let mut display = StatusDisplay::new();

    loop {
        match event_rx.recv().await {
            Ok(event) => {
                if let Some(line) = display.apply(event) {
                    println!("{line}");
                }
            }
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                display
                    .logs_buffer
                    .push(format!("({skipped} status events dropped)").dimmed().to_string());
            }
        }
    }

    for line in display.finish() {
        println!("{line}");
    }
}
