// mpn-common/src/model/path.rs
//! Lexical path arithmetic. Nothing here touches the filesystem.
use std::path::{Component, Path, PathBuf};

/// Resolves `.` and `..` components without following symlinks.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        PathBuf::from(".")
    } else {
        out.iter().collect()
    }
}

/// Relative path leading from directory `from` to `to`.
///
/// Both paths must be expressed against the same root (both absolute, or
/// both relative to one output directory).
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize(from);
    let to = normalize(to);
    let from: Vec<Component<'_>> = from
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    let to: Vec<Component<'_>> = to
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..from.len() {
        out.push("..");
    }
    for component in &to[common..] {
        out.push(component);
    }
    if out.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        out
    }
}

/// Renders a path with `/` separators, the form specifiers are written in.
pub fn to_slash(path: &Path) -> String {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::RootDir => Some(String::new()),
            Component::Prefix(p) => Some(p.as_os_str().to_string_lossy().into_owned()),
            Component::CurDir => Some(".".to_string()),
            Component::ParentDir => Some("..".to_string()),
            Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
        })
        .collect();
    let joined = parts.join("/");
    if joined.is_empty() && path.has_root() {
        "/".to_string()
    } else {
        joined
    }
}

/// Turns a relative path into a specifier that the host resolver reads as
/// relative: `x/y` becomes `./x/y`, `../x` stays as is.
pub fn to_relative_specifier(path: &Path) -> String {
    let slash = to_slash(path);
    if slash == "." {
        "./".to_string()
    } else if slash.starts_with('.') {
        slash
    } else {
        format!("./{slash}")
    }
}
