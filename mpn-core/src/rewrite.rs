// mpn-core/src/rewrite.rs
//! Patches specifiers inside emitted files so they point at relocated
//! packages. Runs only once every destination of the build is known.
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mpn_common::model::path::{normalize, relative_path, to_relative_specifier, to_slash};
use mpn_common::config::CANONICAL_ENTRY_STEM;
use mpn_common::model::{FileKind, Package, PackageSpecifier};
use mpn_common::pipeline::OutputFile;
use tracing::trace;

use crate::catalog::PackageCatalog;
use crate::relocate::RelocationPlanner;
use crate::resolve::ReferenceResolver;
use crate::scan::scan;

/// Where one relocated package ended up, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageEntry {
    pub name: String,
    pub output_root: PathBuf,
    /// Target of bare-name references.
    pub main_entry: Option<PathBuf>,
    /// Alternate output directory relative to the package root (`dist`).
    pub alternate_dirname: Option<String>,
    main_pinned: bool,
}

impl PackageEntry {
    pub fn new(name: impl Into<String>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            output_root: output_root.into(),
            main_entry: None,
            alternate_dirname: None,
            main_pinned: false,
        }
    }

    pub fn with_main_entry(mut self, main_entry: impl Into<PathBuf>) -> Self {
        self.main_entry = Some(main_entry.into());
        self
    }

    fn from_package(package: &Package, planner: &RelocationPlanner<'_>) -> Option<Self> {
        let output_root = planner.package_output_root(package)?;
        let alternate_dirname = package
            .alternate_output
            .as_deref()
            .and_then(|alt| alt.strip_prefix(&package.root).ok())
            .map(to_slash)
            .filter(|s| !s.is_empty());
        Some(Self {
            name: package.name.clone(),
            output_root,
            main_entry: planner.main_entry_output(package),
            alternate_dirname,
            main_pinned: false,
        })
    }
}

/// Relocation results of every package touched by the current build.
#[derive(Debug, Clone, Default)]
pub struct PackageTable {
    entries: HashMap<String, PackageEntry>,
    /// Source path of every relocated file to its output-relative path.
    emitted: HashMap<PathBuf, PathBuf>,
}

impl PackageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: PackageEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn record_output(&mut self, source: impl Into<PathBuf>, relative: impl Into<PathBuf>) {
        self.emitted.insert(source.into(), relative.into());
    }

    pub fn get(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.get(name)
    }

    /// Where the file read from `source` was written, if it was.
    pub fn output_of(&self, source: &Path) -> Option<&Path> {
        self.emitted.get(source).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Collects the packages of all relocated files. A main entry that was
    /// actually emitted pins the bare-name target to its real destination.
    pub fn from_outputs(
        catalog: &PackageCatalog,
        planner: &RelocationPlanner<'_>,
        files: &[OutputFile],
    ) -> Self {
        let mut table = Self::new();
        for file in files {
            let Some(plan) = file.origin.plan() else {
                continue;
            };
            table.record_output(&plan.source_path, &file.relative);

            let package = catalog
                .owner_of(&plan.source_path)
                .filter(|p| p.name == plan.package_name)
                .or_else(|| catalog.get(&plan.package_name));
            let Some(package) = package else {
                continue;
            };

            if !table.entries.contains_key(&package.name) {
                match PackageEntry::from_package(package, planner) {
                    Some(entry) => table.insert(entry),
                    None => continue,
                }
            }
            let Some(entry) = table.entries.get_mut(&package.name) else {
                continue;
            };
            let is_main_file =
                package.main_entry_path().as_deref() == Some(plan.source_path.as_path());
            if plan.is_main_entry || (is_main_file && !entry.main_pinned) {
                entry.main_entry = Some(file.relative.clone());
                entry.main_pinned |= plan.is_main_entry;
            }
        }
        table
    }
}

pub struct ContentRewriter<'a> {
    table: &'a PackageTable,
    resolver: Option<ReferenceResolver<'a>>,
}

impl<'a> ContentRewriter<'a> {
    pub fn new(table: &'a PackageTable) -> Self {
        Self {
            table,
            resolver: None,
        }
    }

    /// Resolves specifiers from each file's original location so they can be
    /// pointed at the copy that was actually written.
    pub fn with_resolver(mut self, resolver: ReferenceResolver<'a>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Rewrites every specifier of `content` that reaches a relocated file.
    ///
    /// `source` is where the file was read from, `file_dir` its
    /// output-relative directory.
    pub fn rewrite<'c>(
        &self,
        content: &'c str,
        kind: FileKind,
        source: &Path,
        file_dir: &Path,
    ) -> Cow<'c, str> {
        let matches = scan(kind, content);
        let mut replacements = Vec::new();
        for m in &matches {
            if let Some(new) = self.rewrite_specifier(&m.specifier, kind, source, file_dir) {
                if new != m.specifier {
                    trace!("Rewriting '{}' -> '{}'", m.specifier, new);
                    replacements.push((m.span.clone(), new));
                }
            }
        }
        if replacements.is_empty() {
            return Cow::Borrowed(content);
        }

        let mut out = content.to_string();
        for (span, new) in replacements.into_iter().rev() {
            out.replace_range(span, &new);
        }
        Cow::Owned(out)
    }

    pub fn rewrite_specifier(
        &self,
        specifier: &str,
        kind: FileKind,
        source: &Path,
        file_dir: &Path,
    ) -> Option<String> {
        if let Some(output) = self.locate(specifier, kind, source) {
            if points_at(file_dir, specifier, output) {
                return None;
            }
            return Some(specifier_for(file_dir, output, specifier, kind));
        }

        match PackageSpecifier::parse(specifier) {
            PackageSpecifier::Scoped { name, subpath } | PackageSpecifier::Plain { name, subpath } => {
                let entry = self.table.get(&name)?;
                match subpath {
                    None => {
                        let target = entry.main_entry.as_ref().unwrap_or(&entry.output_root);
                        Some(to_relative_specifier(&relative_path(file_dir, target)))
                    }
                    Some(sub) => {
                        let sub = strip_alternate_dirname(&sub, entry.alternate_dirname.as_deref());
                        let root = to_relative_specifier(&relative_path(file_dir, &entry.output_root));
                        Some(format!("{}/{}", root.trim_end_matches('/'), sub))
                    }
                }
            }
            PackageSpecifier::Relative(_) | PackageSpecifier::Absolute(_) | PackageSpecifier::Empty => {
                None
            }
        }
    }

    /// Output path of the emitted file `specifier` reaches from `source`.
    fn locate(&self, specifier: &str, kind: FileKind, source: &Path) -> Option<&Path> {
        let resolver = self.resolver.as_ref()?;
        let target = match kind {
            FileKind::Manifest => resolver.resolve_component(specifier, source)?.manifest_path,
            _ => resolver.resolve(specifier, source).resolved_path?,
        };
        self.table.output_of(&target)
    }
}

/// True when a relative `specifier` already reaches `output` from `file_dir`.
fn points_at(file_dir: &Path, specifier: &str, output: &Path) -> bool {
    if !specifier.starts_with('.') {
        return false;
    }
    let target = normalize(&file_dir.join(specifier));
    target == output
        || target == output.with_extension("")
        || (output.file_stem().is_some_and(|stem| stem == CANONICAL_ENTRY_STEM)
            && output.parent() == Some(target.as_path()))
}

/// Relative specifier for `output`, dropping the extension when the
/// original left it out. Component paths never carry one.
fn specifier_for(file_dir: &Path, output: &Path, original: &str, kind: FileKind) -> String {
    let last = original.rsplit('/').next().unwrap_or(original);
    let file_name = output.file_name().and_then(|n| n.to_str());
    let stem = output.file_stem().and_then(|s| s.to_str());
    let target = if kind == FileKind::Manifest || (file_name != Some(last) && stem == Some(last)) {
        output.with_extension("")
    } else {
        output.to_path_buf()
    };
    to_relative_specifier(&relative_path(file_dir, &target))
}

fn strip_alternate_dirname<'s>(subpath: &'s str, alternate: Option<&str>) -> &'s str {
    alternate
        .and_then(|alt| subpath.strip_prefix(alt))
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|rest| !rest.is_empty())
        .unwrap_or(subpath)
}
