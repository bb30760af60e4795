// mpn-common/src/model/relocation.rs
use std::path::{Path, PathBuf};

/// Where a dependency file is read from and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationPlan {
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
    /// Prefix to keep as the file's base when computing output locations.
    pub destination_base: PathBuf,
    pub package_name: String,
    pub is_main_entry: bool,
}

impl RelocationPlan {
    /// Destination relative to [`RelocationPlan::destination_base`].
    pub fn relative_destination(&self) -> &Path {
        self.destination_path
            .strip_prefix(&self.destination_base)
            .unwrap_or(&self.destination_path)
    }
}
