// mpn-core/src/resolve/reference.rs
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::model::path::normalize;
use mpn_common::model::specifier::package_name_of_path;
use mpn_common::model::{ComponentRef, Package, PackageSpecifier, Reference};
use tracing::trace;

use super::ModuleResolver;
use crate::catalog::PackageCatalog;

/// Maps raw specifiers to concrete files of managed packages.
#[derive(Clone, Copy)]
pub struct ReferenceResolver<'a> {
    catalog: &'a PackageCatalog,
    host: &'a dyn ModuleResolver,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(catalog: &'a PackageCatalog, host: &'a dyn ModuleResolver) -> Self {
        Self { catalog, host }
    }

    /// Resolves one import-like specifier found in `containing_file`.
    ///
    /// Anything that does not land on a file of a managed package comes back
    /// unresolved; that is not an error.
    pub fn resolve(&self, specifier: &str, containing_file: &Path) -> Reference {
        let parsed = PackageSpecifier::parse(specifier);
        let containing_dir = containing_file.parent().unwrap_or_else(|| Path::new("/"));

        let resolved = match &parsed {
            PackageSpecifier::Scoped { name, subpath } | PackageSpecifier::Plain { name, subpath } => {
                let Some(package) = self.catalog.nearest(name, containing_dir) else {
                    trace!("'{}' does not name a managed package", specifier);
                    return Reference::unresolved(specifier, containing_file);
                };
                self.resolve_into_package(package, subpath.as_deref(), containing_dir)
            }
            PackageSpecifier::Relative(rel) => {
                if self.catalog.owner_of(containing_file).is_none() {
                    trace!(
                        "Relative '{}' in {} is outside the package tree",
                        specifier,
                        containing_file.display()
                    );
                    return Reference::unresolved(specifier, containing_file);
                }
                self.host.resolve(containing_dir, rel)
            }
            PackageSpecifier::Absolute(_) | PackageSpecifier::Empty => None,
        };

        let Some(resolved) = resolved else {
            trace!(
                "'{}' from {} does not resolve",
                specifier,
                containing_file.display()
            );
            return Reference::unresolved(specifier, containing_file);
        };

        let owner = self
            .catalog
            .owner_of(&resolved)
            .map(|p| p.name.clone())
            .or_else(|| package_name_of_path(&resolved));
        let Some(owner) = owner else {
            trace!(
                "'{}' resolved to {} outside the package tree",
                specifier,
                resolved.display()
            );
            return Reference::unresolved(specifier, containing_file);
        };

        Reference {
            specifier: specifier.to_string(),
            containing_file: containing_file.to_path_buf(),
            is_main_entry: parsed.package_name() == Some(specifier),
            resolved_path: Some(resolved),
            package_name: Some(owner),
        }
    }

    /// Resolves `subpath` against the package's content root, falling back to
    /// the plain root for paths that only exist outside the alternate output.
    fn resolve_into_package(
        &self,
        package: &Package,
        subpath: Option<&str>,
        containing_dir: &Path,
    ) -> Option<PathBuf> {
        let join = |base: &Path| match subpath {
            Some(sub) => base.join(sub),
            None => base.to_path_buf(),
        };

        let target = join(package.content_root());
        self.host
            .resolve(containing_dir, &target.to_string_lossy())
            .or_else(|| {
                package
                    .has_alternate_output()
                    .then(|| join(&package.root))
                    .and_then(|plain| self.host.resolve(containing_dir, &plain.to_string_lossy()))
            })
    }

    /// Resolves a component declaration found in `manifest_path`.
    pub fn resolve_component(&self, specifier: &str, manifest_path: &Path) -> Option<ComponentRef> {
        let parsed = PackageSpecifier::parse(specifier);
        let manifest_dir = manifest_path.parent()?;

        let (package, resolved): (&Arc<Package>, PathBuf) = match &parsed {
            PackageSpecifier::Scoped { name, subpath } | PackageSpecifier::Plain { name, subpath } => {
                let package = self.catalog.nearest(name, manifest_dir)?;
                let resolved = match subpath {
                    Some(sub) => package.content_root().join(sub),
                    None => package
                        .main_entry_path()
                        .map(|main| main.with_extension(""))
                        .unwrap_or_else(|| package.content_root().join("index")),
                };
                (package, resolved)
            }
            PackageSpecifier::Relative(rel) => {
                let package = self.catalog.owner_of(manifest_path)?;
                (package, manifest_dir.join(rel))
            }
            PackageSpecifier::Absolute(_) | PackageSpecifier::Empty => return None,
        };

        let resolved = normalize(&resolved);
        let directory = resolved.parent()?.to_path_buf();
        if !directory.is_dir() {
            trace!(
                "Component '{}' points at missing directory {}",
                specifier,
                directory.display()
            );
            return None;
        }
        let package_name = self
            .catalog
            .owner_of(&resolved)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| package.name.clone());

        Some(ComponentRef {
            specifier: specifier.to_string(),
            package_name,
            manifest_path: PathBuf::from(format!("{}.json", resolved.to_string_lossy())),
            directory,
        })
    }
}
