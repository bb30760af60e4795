// mpn/src/cli/build.rs
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use mpn_common::config::Config;
use mpn_common::error::{MpnError, Result};
use mpn_common::pipeline::SourceFile;
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::pipeline::runner;

#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Source directory walked into the input stream
    #[arg(default_value = "src")]
    src: PathBuf,

    /// Output directory
    #[arg(long, short)]
    dest: PathBuf,

    /// Name of the npm output directory inside the destination
    #[arg(long, value_name = "NAME")]
    npm_dirname: Option<String>,

    /// Copy a whole package (or `package/subpath`); repeatable
    #[arg(long, value_name = "PACKAGE")]
    full_extract: Vec<String>,

    #[arg(long, value_name = "DIR", help = "Project whose node_modules is used")]
    project_root: Option<PathBuf>,

    #[arg(long, short, value_name = "N")]
    jobs: Option<usize>,
}

impl BuildArgs {
    #[instrument(skip(self, config), fields(src = %self.src.display(), dest = %self.dest.display()))]
    pub async fn run(&self, config: Config) -> Result<()> {
        let config = self.apply(config)?;
        let src = anchor(config.project_root(), &self.src);
        let dest = anchor(config.project_root(), &self.dest);
        if !src.is_dir() {
            return Err(MpnError::NotFound(format!(
                "Source directory {} does not exist",
                src.display()
            )));
        }

        let inputs = collect_inputs(&src, &dest)?;
        debug!("Collected {} input files from {}", inputs.len(), src.display());

        runner::run_build_pipeline(config, inputs, &dest).await?;
        Ok(())
    }

    /// Command-line flags win over the environment.
    fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(root) = &self.project_root {
            config = config.with_project_root(root);
        }
        if let Some(dirname) = &self.npm_dirname {
            config = config.with_npm_dirname(dirname)?;
        }
        if !self.full_extract.is_empty() {
            config = config.with_full_extract(self.full_extract.iter().cloned());
        }
        if let Some(jobs) = self.jobs {
            config = config.with_jobs(jobs);
        }
        Ok(config)
    }
}

fn anchor(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Every file under `src` in path order, skipping anything inside `dest`.
fn collect_inputs(src: &Path, dest: &Path) -> Result<Vec<SourceFile>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error walking {}: {}", src.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.path().starts_with(dest) {
            continue;
        }
        paths.push(entry.into_path());
    }

    paths
        .into_iter()
        .map(|path| {
            let contents = fs::read(&path).map_err(|e| MpnError::copy(&path, e))?;
            Ok(SourceFile::new(path, src, contents))
        })
        .collect()
}
