// mpn-core/src/relocate.rs
//! Destination paths for dependency files.
//!
//! Every destination is `<tree dir>/<npm dirname>/<path below tree dir>`,
//! with `<tree dir>` (the innermost `node_modules`) kept as the base so the
//! path relative to the output directory is `<npm dirname>/<pkg>/...`.
use std::path::{Path, PathBuf};

use mpn_common::config::{CANONICAL_ENTRY_STEM, DEFAULT_ENTRY_EXTENSION, DEFAULT_NPM_DIRNAME};
use mpn_common::model::path::normalize;
use mpn_common::model::specifier::{package_tree_dir_of_path, path_within_package_tree};
use mpn_common::model::{Package, RelocationPlan};
use tracing::trace;

use crate::catalog::PackageCatalog;

#[derive(Clone, Copy)]
pub struct RelocationPlanner<'a> {
    catalog: &'a PackageCatalog,
    npm_dirname: &'a str,
}

impl<'a> RelocationPlanner<'a> {
    pub fn new(catalog: &'a PackageCatalog, npm_dirname: &'a str) -> Self {
        Self {
            catalog,
            npm_dirname,
        }
    }

    pub fn npm_dirname(&self) -> &str {
        self.npm_dirname
    }

    /// Main entries are renamed only under the platform's own directory name.
    pub fn renames_main_entries(&self) -> bool {
        self.npm_dirname == DEFAULT_NPM_DIRNAME
    }

    fn package_for(&self, resolved: &Path, package_name: &str) -> Option<&'a Package> {
        self.catalog
            .owner_of(resolved)
            .filter(|p| p.name == package_name)
            .or_else(|| self.catalog.get(package_name))
            .map(|p| p.as_ref())
    }

    /// `None` when `resolved` does not live below a package tree.
    pub fn plan(
        &self,
        resolved: &Path,
        package_name: &str,
        is_main_entry: bool,
    ) -> Option<RelocationPlan> {
        let resolved = normalize(resolved);
        let on_disk_layout = match self.package_for(&resolved, package_name) {
            Some(package) => package.strip_alternate_output(&resolved),
            None => resolved.clone(),
        };

        let tree_dir = package_tree_dir_of_path(&on_disk_layout)?;
        let mut within = path_within_package_tree(&on_disk_layout)?;

        if is_main_entry && self.renames_main_entries() {
            let ext = resolved
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| format!(".{e}"))
                .unwrap_or_else(|| DEFAULT_ENTRY_EXTENSION.to_string());
            within = PathBuf::from(package_name).join(format!("{CANONICAL_ENTRY_STEM}{ext}"));
        }

        let destination_path = tree_dir.join(self.npm_dirname).join(&within);
        trace!(
            "Planned {} -> {}",
            resolved.display(),
            destination_path.display()
        );
        Some(RelocationPlan {
            source_path: resolved,
            destination_path,
            destination_base: tree_dir,
            package_name: package_name.to_string(),
            is_main_entry,
        })
    }

    /// Output-relative directory the package's root lands in.
    pub fn package_output_root(&self, package: &Package) -> Option<PathBuf> {
        let within = path_within_package_tree(&package.root)?;
        Some(Path::new(self.npm_dirname).join(within))
    }

    /// Output-relative path of the package's main entry.
    pub fn main_entry_output(&self, package: &Package) -> Option<PathBuf> {
        let main = package.main_entry_path()?;
        self.plan(&main, &package.name, true)
            .map(|plan| plan.relative_destination().to_path_buf())
    }

    /// Whether `resolved` is the file `main` of `package_name` names,
    /// however the reference that reached it was spelled.
    pub fn is_main_file(&self, resolved: &Path, package_name: &str) -> bool {
        self.package_for(&normalize(resolved), package_name)
            .and_then(Package::main_entry_path)
            .is_some_and(|main| normalize(&main) == normalize(resolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::NodeResolver;
    use crate::test_support::Fixture;

    fn setup() -> (Fixture, PackageCatalog) {
        let fx = Fixture::new();
        fx.package("left-pad", r#"{ "main": "index.js" }"#);
        fx.file("node_modules/left-pad/index.js", "");
        fx.package("lodash", r#"{ "main": "lib/lodash.wxs" }"#);
        fx.file("node_modules/lodash/lib/lodash.wxs", "");
        fx.file("node_modules/lodash/get.js", "");
        fx.package("some-widget", r#"{ "miniprogram": "dist" }"#);
        fx.file("node_modules/some-widget/dist/button.js", "");
        fx.file("node_modules/some-widget/dist/index.js", "");
        fx.file("node_modules/host/package.json", "{}");
        fx.file("node_modules/host/node_modules/inner/package.json", "{}");
        fx.file("node_modules/host/node_modules/inner/x.js", "");
        let catalog = PackageCatalog::build(&fx.path("node_modules"), &NodeResolver::new());
        (fx, catalog)
    }

    #[test]
    fn ordinary_files_keep_their_layout() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        let plan = planner
            .plan(&fx.path("node_modules/lodash/get.js"), "lodash", false)
            .unwrap();
        assert_eq!(plan.destination_base, fx.path("node_modules"));
        assert_eq!(
            plan.relative_destination(),
            Path::new("miniprogram_npm/lodash/get.js")
        );
    }

    #[test]
    fn main_entry_is_renamed_under_default_convention() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        let plan = planner
            .plan(&fx.path("node_modules/lodash/lib/lodash.wxs"), "lodash", true)
            .unwrap();
        assert_eq!(
            plan.relative_destination(),
            Path::new("miniprogram_npm/lodash/index.wxs")
        );

        let pad = planner
            .plan(&fx.path("node_modules/left-pad/index.js"), "left-pad", true)
            .unwrap();
        assert_eq!(
            pad.relative_destination(),
            Path::new("miniprogram_npm/left-pad/index.js")
        );
    }

    #[test]
    fn main_file_is_recognised_by_path() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        assert!(planner.is_main_file(&fx.path("node_modules/lodash/lib/lodash.wxs"), "lodash"));
        assert!(planner.is_main_file(&fx.path("node_modules/lodash/lib/../lib/lodash.wxs"), "lodash"));
        assert!(!planner.is_main_file(&fx.path("node_modules/lodash/get.js"), "lodash"));
        assert!(!planner.is_main_file(&fx.path("node_modules/some-widget/dist/button.js"), "some-widget"));
    }

    #[test]
    fn custom_dirname_keeps_main_filename() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, "npm");
        let plan = planner
            .plan(&fx.path("node_modules/lodash/lib/lodash.wxs"), "lodash", true)
            .unwrap();
        assert_eq!(
            plan.relative_destination(),
            Path::new("npm/lodash/lib/lodash.wxs")
        );
        let lodash = catalog.get("lodash").unwrap();
        assert_eq!(
            planner.main_entry_output(lodash).as_deref(),
            Some(Path::new("npm/lodash/lib/lodash.wxs"))
        );
    }

    #[test]
    fn alternate_output_prefix_is_stripped() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        let plan = planner
            .plan(
                &fx.path("node_modules/some-widget/dist/button.js"),
                "some-widget",
                false,
            )
            .unwrap();
        assert_eq!(plan.source_path, fx.path("node_modules/some-widget/dist/button.js"));
        assert_eq!(
            plan.relative_destination(),
            Path::new("miniprogram_npm/some-widget/button.js")
        );
    }

    #[test]
    fn nested_trees_are_flattened() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        let plan = planner
            .plan(&fx.path("node_modules/host/node_modules/inner/x.js"), "inner", false)
            .unwrap();
        assert_eq!(
            plan.destination_base,
            fx.path("node_modules/host/node_modules")
        );
        assert_eq!(
            plan.relative_destination(),
            Path::new("miniprogram_npm/inner/x.js")
        );
        let inner = catalog.get("inner").unwrap();
        assert_eq!(
            planner.package_output_root(inner).as_deref(),
            Some(Path::new("miniprogram_npm/inner"))
        );
    }

    #[test]
    fn paths_outside_the_tree_have_no_plan() {
        let (fx, catalog) = setup();
        let planner = RelocationPlanner::new(&catalog, DEFAULT_NPM_DIRNAME);
        assert!(planner.plan(&fx.path("src/a.js"), "a", false).is_none());
    }
}
