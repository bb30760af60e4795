// mpn-common/src/model/reference.rs
use std::path::PathBuf;

/// One specifier occurrence, resolved (or not) against the package catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub specifier: String,
    pub containing_file: PathBuf,
    /// Absolute path of the target, `None` when it is not a managed dependency.
    pub resolved_path: Option<PathBuf>,
    pub package_name: Option<String>,
    pub is_main_entry: bool,
}

impl Reference {
    pub fn unresolved(specifier: impl Into<String>, containing_file: impl Into<PathBuf>) -> Self {
        Self {
            specifier: specifier.into(),
            containing_file: containing_file.into(),
            resolved_path: None,
            package_name: None,
            is_main_entry: false,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_path.is_some() && self.package_name.is_some()
    }
}

/// A component bundle declared in a manifest's component block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    pub specifier: String,
    pub package_name: String,
    /// Directory holding the bundle's files (dedup key).
    pub directory: PathBuf,
    /// Manifest of the component itself (`<resolved>.json`), may not exist.
    pub manifest_path: PathBuf,
}
