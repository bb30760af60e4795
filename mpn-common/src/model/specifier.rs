// mpn-common/src/model/specifier.rs
use std::path::{Component, Path, PathBuf};

use crate::config::PACKAGE_TREE_DIRNAME;

/// Classification of a raw specifier string as written in source or manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpecifier {
    /// `@scope/name` with an optional subpath (`@scope/name/sub/file`).
    Scoped {
        name: String,
        subpath: Option<String>,
    },
    /// `name` with an optional subpath (`name/sub/file`).
    Plain {
        name: String,
        subpath: Option<String>,
    },
    /// `./x`, `../x`, `.` or `..`
    Relative(String),
    /// `/x`
    Absolute(String),
    Empty,
}

impl PackageSpecifier {
    pub fn parse(raw: &str) -> Self {
        let spec = raw.trim().replace('\\', "/");
        if spec.is_empty() {
            return Self::Empty;
        }
        if spec.starts_with('/') {
            return Self::Absolute(spec);
        }
        if spec == "." || spec == ".." || spec.starts_with("./") || spec.starts_with("../") {
            return Self::Relative(spec);
        }

        let mut parts = spec.splitn(3, '/');
        let first = parts.next().unwrap_or_default();
        if first.starts_with('@') {
            let Some(second) = parts.next().filter(|s| !s.is_empty()) else {
                return Self::Empty;
            };
            if first.len() == 1 {
                return Self::Empty;
            }
            return Self::Scoped {
                name: format!("{first}/{second}"),
                subpath: non_empty(parts.next()),
            };
        }

        let rest = spec[first.len()..].trim_start_matches('/');
        Self::Plain {
            name: first.to_string(),
            subpath: non_empty(Some(rest)),
        }
    }

    pub fn package_name(&self) -> Option<&str> {
        match self {
            Self::Scoped { name, .. } | Self::Plain { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn subpath(&self) -> Option<&str> {
        match self {
            Self::Scoped { subpath, .. } | Self::Plain { subpath, .. } => subpath.as_deref(),
            _ => None,
        }
    }

    /// True when the specifier names a package without a subpath.
    pub fn is_bare_package(&self) -> bool {
        self.package_name().is_some() && self.subpath().is_none()
    }
}

fn non_empty(part: Option<&str>) -> Option<String> {
    part.map(|s| s.trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn last_tree_index(components: &[Component<'_>]) -> Option<usize> {
    components
        .iter()
        .rposition(|c| matches!(c, Component::Normal(n) if *n == PACKAGE_TREE_DIRNAME))
}

/// The innermost package tree directory (`.../node_modules`) containing `path`.
pub fn package_tree_dir_of_path(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let idx = last_tree_index(&components)?;
    Some(components[..=idx].iter().collect())
}

/// Path of `path` below its innermost package tree directory.
pub fn path_within_package_tree(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let idx = last_tree_index(&components)?;
    let rest: PathBuf = components[idx + 1..].iter().collect();
    if rest.as_os_str().is_empty() {
        None
    } else {
        Some(rest)
    }
}

/// Name of the package owning `path`, derived from the segments after the
/// innermost package tree directory.
pub fn package_name_of_path(path: &Path) -> Option<String> {
    let within = path_within_package_tree(path)?;
    let mut parts = within
        .components()
        .filter_map(|c| match c {
            Component::Normal(n) => n.to_str(),
            _ => None,
        });
    let first = parts.next()?;
    if first.starts_with('@') {
        let second = parts.next()?;
        Some(format!("{first}/{second}"))
    } else {
        Some(first.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_scoped_names() {
        assert_eq!(
            PackageSpecifier::parse("left-pad"),
            PackageSpecifier::Plain {
                name: "left-pad".into(),
                subpath: None
            }
        );
        assert_eq!(
            PackageSpecifier::parse("lodash/get"),
            PackageSpecifier::Plain {
                name: "lodash".into(),
                subpath: Some("get".into())
            }
        );
        assert_eq!(
            PackageSpecifier::parse("@vant/weapp/dist/button/index"),
            PackageSpecifier::Scoped {
                name: "@vant/weapp".into(),
                subpath: Some("dist/button/index".into())
            }
        );
        assert_eq!(
            PackageSpecifier::parse("@vant/weapp").package_name(),
            Some("@vant/weapp")
        );
    }

    #[test]
    fn parses_paths_and_degenerate_input() {
        assert_eq!(
            PackageSpecifier::parse("./local/script.js"),
            PackageSpecifier::Relative("./local/script.js".into())
        );
        assert_eq!(
            PackageSpecifier::parse(".."),
            PackageSpecifier::Relative("..".into())
        );
        assert_eq!(
            PackageSpecifier::parse("/components/foo"),
            PackageSpecifier::Absolute("/components/foo".into())
        );
        assert_eq!(PackageSpecifier::parse("  "), PackageSpecifier::Empty);
        assert_eq!(PackageSpecifier::parse("@scope"), PackageSpecifier::Empty);
        assert_eq!(PackageSpecifier::parse("@/x"), PackageSpecifier::Empty);
    }

    #[test]
    fn normalizes_backslashes_and_trailing_slashes() {
        let spec = PackageSpecifier::parse("lodash\\fp\\");
        assert_eq!(spec.package_name(), Some("lodash"));
        assert_eq!(spec.subpath(), Some("fp"));
        assert!(PackageSpecifier::parse("lodash/").is_bare_package());
    }

    #[test]
    fn package_name_from_paths() {
        assert_eq!(
            package_name_of_path(Path::new("/app/node_modules/lodash/get.js")).as_deref(),
            Some("lodash")
        );
        assert_eq!(
            package_name_of_path(Path::new(
                "/app/node_modules/a/node_modules/@scope/b/lib/x.js"
            ))
            .as_deref(),
            Some("@scope/b")
        );
        assert_eq!(package_name_of_path(Path::new("/app/src/a.js")), None);
        assert_eq!(package_name_of_path(Path::new("/app/node_modules")), None);
    }

    #[test]
    fn innermost_tree_dir() {
        let path = Path::new("/app/node_modules/a/node_modules/b/index.js");
        assert_eq!(
            package_tree_dir_of_path(path).unwrap(),
            Path::new("/app/node_modules/a/node_modules")
        );
        assert_eq!(
            path_within_package_tree(path).unwrap(),
            Path::new("b/index.js")
        );
    }
}
