// mpn-common/src/pipeline.rs
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::MpnError;
use crate::model::{FileKind, RelocationPlan};

/// A file entering the build, as handed over by the file-streaming side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub base: PathBuf,
    /// `None` for directories and other content-less entries.
    pub contents: Option<Vec<u8>>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, base: impl Into<PathBuf>, contents: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: Some(contents),
        }
    }

    pub fn null(path: impl Into<PathBuf>, base: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            base: base.into(),
            contents: None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.contents.as_ref().is_none_or(|c| c.is_empty())
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_path(&self.path)
    }

    /// Path relative to `base`; falls back to the file name.
    pub fn relative(&self) -> PathBuf {
        match self.path.strip_prefix(&self.base) {
            Ok(rel) => rel.to_path_buf(),
            Err(_) => self
                .path
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_default(),
        }
    }
}

/// How a file ended up in the output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOrigin {
    Input,
    Dependency(RelocationPlan),
    Component(RelocationPlan),
    FullExtract(RelocationPlan),
}

impl FileOrigin {
    pub fn plan(&self) -> Option<&RelocationPlan> {
        match self {
            Self::Input => None,
            Self::Dependency(plan) | Self::Component(plan) | Self::FullExtract(plan) => {
                Some(plan)
            }
        }
    }
}

/// A file leaving the build, located relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub source_path: PathBuf,
    pub relative: PathBuf,
    pub contents: Option<Vec<u8>>,
    pub origin: FileOrigin,
}

impl OutputFile {
    pub fn kind(&self) -> FileKind {
        FileKind::from_path(&self.relative)
    }

    pub fn is_dependency(&self) -> bool {
        !matches!(self.origin, FileOrigin::Input)
    }

    pub fn relative_dir(&self) -> &Path {
        self.relative.parent().unwrap_or_else(|| Path::new(""))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub input_count: usize,
    pub dependency_count: usize,
    pub rewritten_count: usize,
    pub extracted_packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PipelineEvent {
    BuildStarted {
        input_count: usize,
    },
    CatalogReady {
        package_count: usize,
    },
    DependencyExtracted {
        specifier: String,
        package_name: String,
    },
    ComponentExtracted {
        specifier: String,
        package_name: String,
    },
    FullExtractFinished {
        entry: String,
        file_count: usize,
    },
    FileFailed {
        path: PathBuf,
        error: String,
    },
    RewriteFinished {
        rewritten_count: usize,
    },
    FileWritten {
        relative: PathBuf,
    },
    BuildFinished {
        duration_secs: f64,
        summary: BuildSummary,
    },
    LogWarn {
        message: String,
    },
    LogError {
        message: String,
    },
}

impl PipelineEvent {
    pub fn file_failed(path: PathBuf, error: &MpnError) -> Self {
        PipelineEvent::FileFailed {
            path,
            error: error.to_string(),
        }
    }
}
