// mpn-common/src/model/package.rs
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_ENTRY_EXTENSION;

/// An installed package, as recorded by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    pub root: PathBuf,
    pub version: Option<String>,
    /// Absolute path of the alternate build output, only when it exists on disk.
    pub alternate_output: Option<PathBuf>,
    /// Main entry relative to [`Package::content_root`], when it resolves.
    pub main_entry: Option<PathBuf>,
}

impl Package {
    pub fn has_alternate_output(&self) -> bool {
        self.alternate_output.is_some()
    }

    /// Directory references into this package resolve against.
    pub fn content_root(&self) -> &Path {
        self.alternate_output.as_deref().unwrap_or(&self.root)
    }

    pub fn main_entry_path(&self) -> Option<PathBuf> {
        self.main_entry
            .as_ref()
            .map(|rel| self.content_root().join(rel))
    }

    /// Extension of the main entry including the dot, defaulting to `.js`.
    pub fn main_entry_extension(&self) -> String {
        self.main_entry
            .as_deref()
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .map(|e| format!(".{e}"))
            .unwrap_or_else(|| DEFAULT_ENTRY_EXTENSION.to_string())
    }

    /// Maps a path inside the alternate output back onto the package root so
    /// the output tree never exposes the alternate directory name.
    pub fn strip_alternate_output(&self, path: &Path) -> PathBuf {
        match &self.alternate_output {
            Some(alt) => match path.strip_prefix(alt) {
                Ok(rest) => self.root.join(rest),
                Err(_) => path.to_path_buf(),
            },
            None => path.to_path_buf(),
        }
    }
}
