// mpn-core/tests/pipeline.rs
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mpn_common::config::Config;
use mpn_common::error::MpnError;
use mpn_common::model::FileKind;
use mpn_common::pipeline::{FileOrigin, OutputFile, PipelineEvent, SourceFile};
use mpn_core::scan::scan;
use mpn_core::{
    run_build, write_outputs, BuildContext, BuildOutput, ModuleResolver, NodeResolver,
    ScanningExtractor,
};
use tempfile::TempDir;
use tokio::sync::broadcast;

struct Project {
    _tmp: TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("node_modules")).unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        Self { _tmp: tmp, root }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    fn file(&self, rel: &str, content: &str) -> &Self {
        let path = self.path(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn config(&self) -> Config {
        Config::for_project(&self.root).with_jobs(2)
    }

    fn inputs(&self) -> Vec<SourceFile> {
        let src = self.path("src");
        let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(&src)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        paths.sort();
        paths
            .into_iter()
            .map(|p| {
                let contents = fs::read(&p).unwrap();
                SourceFile::new(p, &src, contents)
            })
            .collect()
    }

    fn build(&self, config: Config) -> BuildOutput {
        let ctx = Arc::new(BuildContext::new(config));
        run_build(ctx, self.inputs(), None).unwrap()
    }
}

fn relatives(output: &BuildOutput) -> BTreeSet<PathBuf> {
    output.files.iter().map(|f| f.relative.clone()).collect()
}

fn find<'a>(output: &'a BuildOutput, relative: &str) -> &'a OutputFile {
    output
        .files
        .iter()
        .find(|f| f.relative == Path::new(relative))
        .unwrap_or_else(|| panic!("{relative} missing from {:?}", relatives(output)))
}

fn text(file: &OutputFile) -> String {
    String::from_utf8(file.contents.clone().unwrap()).unwrap()
}

/// Writes `output` out and checks that every relative specifier left in a
/// rewritable file reaches a file that was actually written.
fn write_and_check_references(output: &BuildOutput) -> TempDir {
    let dest = TempDir::new().unwrap();
    write_outputs(dest.path(), &output.files).unwrap();
    let host = NodeResolver::new();
    for file in &output.files {
        let kind = file.kind();
        let Some(bytes) = file.contents.as_deref().filter(|_| kind.is_rewritable()) else {
            continue;
        };
        let dir = dest.path().join(file.relative_dir());
        for m in scan(kind, std::str::from_utf8(bytes).unwrap()) {
            if !m.specifier.starts_with('.') {
                continue;
            }
            let found = match kind {
                FileKind::Manifest => Some(dir.join(format!("{}.json", m.specifier))).filter(|p| p.is_file()),
                _ => host.resolve(&dir, &m.specifier),
            };
            assert!(
                found.is_some(),
                "'{}' in {} reaches nothing in {:?}",
                m.specifier,
                file.relative.display(),
                relatives(output)
            );
        }
    }
    dest
}

#[test]
fn bare_import_is_relocated_and_rewritten() {
    let project = Project::new();
    project
        .file("node_modules/left-pad/package.json", r#"{ "name": "left-pad", "main": "index.js" }"#)
        .file("node_modules/left-pad/index.js", "module.exports = function pad() {};")
        .file("src/a.js", "import x from 'left-pad';\n");

    let output = project.build(project.config());
    let dep = find(&output, "miniprogram_npm/left-pad/index.js");
    assert!(matches!(&dep.origin, FileOrigin::Dependency(plan) if plan.is_main_entry));
    assert_eq!(
        text(find(&output, "a.js")),
        "import x from './miniprogram_npm/left-pad/index.js';\n"
    );

    // the rewritten specifier lands on the canonical entry from the new location
    let dest = TempDir::new().unwrap();
    write_outputs(dest.path(), &output.files).unwrap();
    let resolved = NodeResolver::new().resolve(dest.path(), "./miniprogram_npm/left-pad/index.js");
    assert_eq!(
        resolved,
        Some(dest.path().join("miniprogram_npm/left-pad/index.js"))
    );
}

#[test]
fn component_from_alternate_output_drops_the_dist_prefix() {
    let project = Project::new();
    project
        .file("node_modules/some-widget/package.json", r#"{ "name": "some-widget", "miniprogram": "dist" }"#)
        .file("node_modules/some-widget/dist/button.js", "Component({});")
        .file("node_modules/some-widget/dist/button.json", r#"{ "component": true }"#)
        .file("node_modules/some-widget/dist/button.wxml", "<view/>")
        .file("node_modules/some-widget/dist/button.wxss", ".btn {}")
        .file("node_modules/some-widget/src/button.js", "// unbuilt source")
        .file(
            "src/pages/page.json",
            r#"{ "usingComponents": { "comp": "some-widget/button" } }"#,
        );

    let output = project.build(project.config());
    for ext in ["js", "json", "wxml", "wxss"] {
        let file = find(&output, &format!("miniprogram_npm/some-widget/button.{ext}"));
        assert!(matches!(file.origin, FileOrigin::Component(_)));
        assert!(file.source_path.starts_with(project.path("node_modules/some-widget/dist")));
    }
    assert!(relatives(&output)
        .iter()
        .all(|rel| !rel.to_string_lossy().contains("dist") && !rel.to_string_lossy().contains("src/")));
    assert_eq!(
        text(find(&output, "pages/page.json")),
        r#"{ "usingComponents": { "comp": "../miniprogram_npm/some-widget/button" } }"#
    );
}

#[test]
fn shared_dependency_is_copied_and_logged_once() {
    let project = Project::new();
    project
        .file("node_modules/lodash/package.json", r#"{ "name": "lodash", "main": "lodash.js" }"#)
        .file("node_modules/lodash/lodash.js", "")
        .file("node_modules/lodash/get.js", "module.exports = require('./_baseGet');")
        .file("node_modules/lodash/_baseGet.js", "module.exports = {};")
        .file("src/a.js", "const get = require('lodash/get');")
        .file("src/pages/b.js", "const get = require('lodash/get');");

    let (event_tx, mut event_rx) = broadcast::channel(256);
    let ctx = Arc::new(BuildContext::new(project.config().with_jobs(4)));
    let output = run_build(ctx, project.inputs(), Some(event_tx)).unwrap();

    let copies = output
        .files
        .iter()
        .filter(|f| f.relative == Path::new("miniprogram_npm/lodash/get.js"))
        .count();
    assert_eq!(copies, 1);
    assert!(relatives(&output).contains(Path::new("miniprogram_npm/lodash/_baseGet.js")));

    let mut extraction_logs = 0;
    while let Ok(event) = event_rx.try_recv() {
        if let PipelineEvent::DependencyExtracted { specifier, .. } = event {
            assert_eq!(specifier, "lodash/get");
            extraction_logs += 1;
        }
    }
    assert_eq!(extraction_logs, 1);

    assert_eq!(
        text(find(&output, "a.js")),
        "const get = require('./miniprogram_npm/lodash/get');"
    );
    assert_eq!(
        text(find(&output, "pages/b.js")),
        "const get = require('../miniprogram_npm/lodash/get');"
    );
    assert_eq!(output.summary.extracted_packages, vec!["lodash".to_string()]);
}

#[test]
fn custom_output_dirname_keeps_main_filename() {
    let project = Project::new();
    project
        .file("node_modules/mainy/package.json", r#"{ "name": "mainy", "main": "lib/main.js" }"#)
        .file("node_modules/mainy/lib/main.js", "module.exports = require('./util');")
        .file("node_modules/mainy/lib/util.js", "module.exports = 1;")
        .file("src/a.js", "require('mainy');");

    let config = project.config().with_npm_dirname("npm").unwrap();
    let output = project.build(config);
    assert!(relatives(&output).contains(Path::new("npm/mainy/lib/main.js")));
    assert!(!relatives(&output).contains(Path::new("npm/mainy/index.js")));
    assert_eq!(text(find(&output, "a.js")), "require('./npm/mainy/lib/main.js');");
    assert_eq!(
        text(find(&output, "npm/mainy/lib/main.js")),
        "module.exports = require('./util');"
    );
}

#[test]
fn default_output_renames_main_and_rebases_its_references() {
    let project = Project::new();
    project
        .file("node_modules/mainy/package.json", r#"{ "name": "mainy", "main": "lib/main.js" }"#)
        .file("node_modules/mainy/lib/main.js", "module.exports = require('./util');")
        .file("node_modules/mainy/lib/util.js", "module.exports = 1;")
        .file("src/a.js", "require('mainy');");

    let output = project.build(project.config());
    assert_eq!(
        text(find(&output, "miniprogram_npm/mainy/index.js")),
        "module.exports = require('./lib/util');"
    );
    write_and_check_references(&output);
    assert!(relatives(&output).contains(Path::new("miniprogram_npm/mainy/lib/util.js")));
    assert_eq!(
        text(find(&output, "a.js")),
        "require('./miniprogram_npm/mainy/index.js');"
    );
}

fn main_file_project(first: &str, second: &str) -> Project {
    let project = Project::new();
    project
        .file("node_modules/lodash/package.json", r#"{ "name": "lodash", "main": "lodash.js" }"#)
        .file("node_modules/lodash/lodash.js", "module.exports = require('./get');")
        .file("node_modules/lodash/get.js", "module.exports = {};")
        .file("src/a.js", first)
        .file("src/b.js", second);
    project
}

#[test]
fn main_file_reached_by_name_and_by_subpath_lands_once() {
    let by_name = "require('lodash');";
    let by_subpath = "require('lodash/lodash.js');";

    let mut layouts = Vec::new();
    for (first, second) in [(by_name, by_subpath), (by_subpath, by_name)] {
        let project = main_file_project(first, second);
        let output = project.build(project.config().with_jobs(1));
        let rels = relatives(&output);
        assert!(rels.contains(Path::new("miniprogram_npm/lodash/index.js")));
        assert!(!rels.contains(Path::new("miniprogram_npm/lodash/lodash.js")));

        let dest = write_and_check_references(&output);
        for input in ["a.js", "b.js"] {
            let content = text(find(&output, input));
            let specifier = scan(FileKind::Script, &content)[0].specifier.clone();
            assert_eq!(
                NodeResolver::new().resolve(dest.path(), &specifier),
                Some(dest.path().join("miniprogram_npm/lodash/index.js")),
                "{input}: {content}"
            );
        }
        assert_eq!(
            text(find(&output, "miniprogram_npm/lodash/index.js")),
            "module.exports = require('./get');"
        );
        layouts.push(rels);
    }
    assert_eq!(layouts[0], layouts[1]);
}

#[test]
fn siblings_follow_a_relocated_main_file() {
    let project = Project::new();
    project
        .file("node_modules/kit/package.json", r#"{ "name": "kit", "main": "lib/index.js" }"#)
        .file("node_modules/kit/lib/index.js", "module.exports = require('./other');")
        .file("node_modules/kit/lib/other.js", "module.exports = require('./index');")
        .file("src/a.js", "require('kit');");

    let output = project.build(project.config());
    assert_eq!(
        text(find(&output, "miniprogram_npm/kit/index.js")),
        "module.exports = require('./lib/other');"
    );
    assert_eq!(
        text(find(&output, "miniprogram_npm/kit/lib/other.js")),
        "module.exports = require('../index');"
    );
    assert!(!relatives(&output).contains(Path::new("miniprogram_npm/kit/lib/index.js")));
    write_and_check_references(&output);
}

#[test]
fn main_file_reached_only_through_a_sibling_is_still_renamed() {
    let project = Project::new();
    project
        .file("node_modules/kit/package.json", r#"{ "name": "kit", "main": "lib/index.js" }"#)
        .file("node_modules/kit/lib/index.js", "module.exports = 1;")
        .file("node_modules/kit/lib/other.js", "module.exports = require('./index');")
        .file("src/a.js", "require('kit/lib/other');")
        .file("src/b.js", "require('kit');");

    let output = project.build(project.config().with_jobs(1));
    let rels = relatives(&output);
    assert!(rels.contains(Path::new("miniprogram_npm/kit/index.js")));
    assert!(!rels.contains(Path::new("miniprogram_npm/kit/lib/index.js")));
    assert_eq!(text(find(&output, "b.js")), "require('./miniprogram_npm/kit/index.js');");
    write_and_check_references(&output);
}

#[test]
fn rebuilding_is_idempotent() {
    let project = Project::new();
    project
        .file("node_modules/a/package.json", r#"{ "name": "a" }"#)
        .file("node_modules/a/index.js", "require('b'); require('./x');")
        .file("node_modules/a/x.js", "require('./index');")
        .file("node_modules/b/package.json", r#"{ "name": "b" }"#)
        .file("node_modules/b/index.js", "require('a');")
        .file("src/app.js", "require('a');")
        .file("src/logo.png", "not really a png");

    let first = project.build(project.config());
    let second = project.build(project.config());
    assert_eq!(relatives(&first), relatives(&second));
    assert_eq!(relatives(&first).len(), first.files.len());
    assert!(relatives(&first).contains(Path::new("logo.png")));
}

#[test]
fn missing_alternate_output_falls_back_to_package_root() {
    let project = Project::new();
    project
        .file("node_modules/plain/package.json", r#"{ "name": "plain", "miniprogram": "dist" }"#)
        .file("node_modules/plain/index.js", "module.exports = 1;")
        .file("src/a.js", "require('plain');");

    let ctx = BuildContext::new(project.config());
    assert!(!ctx.catalog().get("plain").unwrap().has_alternate_output());

    let output = project.build(project.config());
    assert!(relatives(&output).contains(Path::new("miniprogram_npm/plain/index.js")));
}

#[test]
fn full_extraction_copies_whole_packages() {
    let project = Project::new();
    project
        .file("node_modules/weui/package.json", r#"{ "name": "weui" }"#)
        .file("node_modules/weui/miniprogram_dist/index.js", "")
        .file("node_modules/weui/miniprogram_dist/icons/icon.wxss", ".i {}")
        .file("node_modules/weui/miniprogram_dist/unused.js", "")
        .file("src/app.js", "");

    let config = project.config().with_full_extract(["weui", "not-installed"]);
    let output = project.build(config);
    let rels = relatives(&output);
    for rel in [
        "miniprogram_npm/weui/index.js",
        "miniprogram_npm/weui/icons/icon.wxss",
        "miniprogram_npm/weui/unused.js",
    ] {
        assert!(rels.contains(Path::new(rel)), "{rel} missing");
    }
    assert!(output
        .files
        .iter()
        .filter_map(|f| f.origin.plan())
        .all(|plan| !plan.is_main_entry));
}

#[test]
fn null_inputs_pass_through_untouched() {
    let project = Project::new();
    let src = project.path("src");
    let inputs = vec![
        SourceFile::null(src.join("pages"), &src),
        SourceFile::new(src.join("empty.js"), &src, Vec::new()),
    ];
    let ctx = Arc::new(BuildContext::new(project.config()));
    let output = run_build(ctx, inputs, None).unwrap();
    assert_eq!(output.files.len(), 2);
    assert_eq!(output.files[0].contents, None);
    assert_eq!(output.files[1].contents, Some(Vec::new()));
}

/// Resolves `ghost` to a file that is not there.
struct LyingResolver {
    inner: NodeResolver,
    ghost: PathBuf,
}

impl ModuleResolver for LyingResolver {
    fn resolve(&self, base_dir: &Path, specifier: &str) -> Option<PathBuf> {
        if specifier.ends_with("ghost") {
            return Some(self.ghost.clone());
        }
        self.inner.resolve(base_dir, specifier)
    }
}

#[test]
fn copy_failure_aborts_the_build_with_its_path() {
    let project = Project::new();
    project
        .file("node_modules/ghost/package.json", r#"{ "name": "ghost" }"#)
        .file("src/a.js", "require('ghost');");

    let ghost = project.path("node_modules/ghost/vanished.js");
    let ctx = BuildContext::with_collaborators(
        project.config(),
        Arc::new(LyingResolver {
            inner: NodeResolver::new(),
            ghost: ghost.clone(),
        }),
        Arc::new(ScanningExtractor::new()),
    );
    let err = run_build(Arc::new(ctx), project.inputs(), None).unwrap_err();
    match err {
        MpnError::Copy { path, .. } => assert_eq!(path, ghost),
        other => panic!("unexpected error: {other}"),
    }
}
