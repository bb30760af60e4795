// mpn-core/src/test_support.rs
use std::fs;
use std::path::{Path, PathBuf};

use mpn_common::config::Config;
use tempfile::TempDir;

/// A throwaway project directory with a `node_modules` tree.
pub(crate) struct Fixture {
    _tmp: TempDir,
    root: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        Self { _tmp: tmp, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn dir(&self, rel: &str) -> PathBuf {
        let path = self.path(rel);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Writes `node_modules/<name>/package.json`.
    pub fn package(&self, name: &str, manifest: &str) -> PathBuf {
        self.file(&format!("node_modules/{name}/package.json"), manifest);
        self.path(&format!("node_modules/{name}"))
    }

    pub fn config(&self) -> Config {
        Config::for_project(&self.root).with_jobs(2)
    }
}
