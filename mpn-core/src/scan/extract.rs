// mpn-core/src/scan/extract.rs
use std::collections::HashSet;
use std::path::Path;

use mpn_common::model::FileKind;

use super::{scan_script, scan_stylesheet};

/// Produces the raw specifiers a file depends on, in source order.
pub trait SpecifierExtractor: Send + Sync {
    fn extract(&self, path: &Path, content: &str) -> Vec<String>;
}

const NODE_BUILTINS: &[&str] = &[
    "assert",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "dns",
    "domain",
    "events",
    "fs",
    "http",
    "https",
    "module",
    "net",
    "os",
    "path",
    "process",
    "punycode",
    "querystring",
    "readline",
    "repl",
    "stream",
    "string_decoder",
    "sys",
    "timers",
    "tls",
    "tty",
    "url",
    "util",
    "v8",
    "vm",
    "worker_threads",
    "zlib",
];

pub fn is_builtin_module(specifier: &str) -> bool {
    if specifier.starts_with("node:") {
        return true;
    }
    let head = specifier.split('/').next().unwrap_or(specifier);
    NODE_BUILTINS.contains(&head)
}

/// Regex scanning by file kind. Component manifests are walked separately
/// and yield nothing here.
#[derive(Debug, Clone, Default)]
pub struct ScanningExtractor;

impl ScanningExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl SpecifierExtractor for ScanningExtractor {
    fn extract(&self, path: &Path, content: &str) -> Vec<String> {
        let matches = match FileKind::from_path(path) {
            FileKind::Script => scan_script(content),
            FileKind::Stylesheet => scan_stylesheet(content),
            FileKind::Manifest | FileKind::Other => return Vec::new(),
        };

        let mut seen = HashSet::new();
        matches
            .into_iter()
            .map(|m| m.specifier)
            .filter(|s| !s.trim().is_empty() && !is_builtin_module(s))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }
}
