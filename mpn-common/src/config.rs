// mpn-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::{MpnError, Result};

/// Output directory name of the platform's own npm build.
pub const DEFAULT_NPM_DIRNAME: &str = "miniprogram_npm";
/// Directory a package may ship with a pre-built mini-program variant.
pub const DEFAULT_ALTERNATE_OUTPUT_DIRNAME: &str = "miniprogram_dist";
pub const PACKAGE_TREE_DIRNAME: &str = "node_modules";
pub const PACKAGE_MANIFEST_FILENAME: &str = "package.json";
/// Stem every main entry is renamed to under the default output convention.
pub const CANONICAL_ENTRY_STEM: &str = "index";
pub const DEFAULT_ENTRY_EXTENSION: &str = ".js";

const MAX_DEFAULT_JOBS: usize = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub project_root: PathBuf,
    pub package_tree_dir: PathBuf,
    pub npm_dirname: String,
    pub full_extract: Vec<String>,
    pub jobs: usize,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading mpn configuration");

        let project_root = match env::var("MPN_PROJECT_ROOT").ok().filter(|s| !s.is_empty()) {
            Some(root) => PathBuf::from(root),
            None => env::current_dir().map_err(|e| {
                MpnError::Config(format!("Could not determine current directory: {e}"))
            })?,
        };

        let mut config = Self::for_project(project_root);

        if let Some(dirname) = env::var("MPN_NPM_DIRNAME").ok().filter(|s| !s.is_empty()) {
            config = config.with_npm_dirname(dirname)?;
        }
        if let Ok(list) = env::var("MPN_FULL_EXTRACT") {
            config.full_extract = parse_list(&list);
        }
        if let Some(jobs) = env::var("MPN_JOBS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            config = config.with_jobs(jobs);
        }

        debug!(
            "Configuration loaded: project_root={}, npm_dirname={}, jobs={}",
            config.project_root.display(),
            config.npm_dirname,
            config.jobs
        );
        Ok(config)
    }

    /// Defaults for a project rooted at `project_root`, without reading the environment.
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        let project_root = project_root.into();
        let package_tree_dir = project_root.join(PACKAGE_TREE_DIRNAME);
        Self {
            project_root,
            package_tree_dir,
            npm_dirname: DEFAULT_NPM_DIRNAME.to_string(),
            full_extract: Vec::new(),
            jobs: default_jobs(),
        }
    }

    pub fn with_npm_dirname(mut self, dirname: impl Into<String>) -> Result<Self> {
        let dirname = dirname.into();
        let trimmed = dirname.trim_matches('/');
        if trimmed.is_empty() || trimmed.contains('/') || trimmed.contains('\\') {
            return Err(MpnError::Config(format!(
                "Output directory name must be a single path segment, got '{dirname}'"
            )));
        }
        self.npm_dirname = trimmed.to_string();
        Ok(self)
    }

    pub fn with_full_extract<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.full_extract = entries
            .into_iter()
            .map(Into::into)
            .filter(|s| !s.trim().is_empty())
            .collect();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Moves the project, taking the package tree along with it.
    pub fn with_project_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.project_root = root.into();
        self.package_tree_dir = self.project_root.join(PACKAGE_TREE_DIRNAME);
        self
    }

    pub fn with_package_tree_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.package_tree_dir = dir.into();
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn package_tree_dir(&self) -> &Path {
        &self.package_tree_dir
    }

    pub fn npm_dirname(&self) -> &str {
        &self.npm_dirname
    }

    /// True when main entries get renamed to the canonical entry filename.
    pub fn is_default_output(&self) -> bool {
        self.npm_dirname == DEFAULT_NPM_DIRNAME
    }
}

fn default_jobs() -> usize {
    std::cmp::max(1, num_cpus::get_physical().saturating_sub(1)).min(MAX_DEFAULT_JOBS)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub fn load_config() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_platform_convention() {
        let config = Config::for_project("/work/app");
        assert_eq!(config.npm_dirname(), DEFAULT_NPM_DIRNAME);
        assert!(config.is_default_output());
        assert_eq!(
            config.package_tree_dir(),
            Path::new("/work/app/node_modules")
        );
        assert!(config.jobs >= 1);
    }

    #[test]
    fn custom_dirname_switches_policy() {
        let config = Config::for_project("/work/app")
            .with_npm_dirname("dist")
            .unwrap();
        assert_eq!(config.npm_dirname(), "dist");
        assert!(!config.is_default_output());
    }

    #[test]
    fn rejects_nested_dirname() {
        assert!(Config::for_project("/x").with_npm_dirname("a/b").is_err());
        assert!(Config::for_project("/x").with_npm_dirname("").is_err());
    }

    #[test]
    fn moving_the_project_moves_the_package_tree() {
        let config = Config::for_project("/a").with_project_root("/b");
        assert_eq!(config.project_root(), Path::new("/b"));
        assert_eq!(config.package_tree_dir(), Path::new("/b/node_modules"));
    }

    #[test]
    fn full_extract_list_parsing() {
        assert_eq!(
            parse_list(" weui-miniprogram, mitt/dist ,,"),
            vec!["weui-miniprogram".to_string(), "mitt/dist".to_string()]
        );
        let config = Config::for_project("/x").with_full_extract(["a", " ", "b/c"]);
        assert_eq!(config.full_extract, vec!["a", "b/c"]);
    }
}
