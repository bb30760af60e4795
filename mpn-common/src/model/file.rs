// mpn-common/src/model/file.rs
use std::path::Path;

/// Kinds of files whose specifiers are discovered and rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Script,
    Stylesheet,
    Manifest,
    Other,
}

impl FileKind {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("js" | "jsx" | "mjs" | "cjs" | "ts" | "wxs") => Self::Script,
            Some("css" | "wxss" | "less" | "sass" | "scss") => Self::Stylesheet,
            Some("json") => Self::Manifest,
            _ => Self::Other,
        }
    }

    pub fn is_rewritable(&self) -> bool {
        !matches!(self, Self::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_by_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/b.TS")), FileKind::Script);
        assert_eq!(FileKind::from_path(Path::new("x.wxs")), FileKind::Script);
        assert_eq!(FileKind::from_path(Path::new("x.wxss")), FileKind::Stylesheet);
        assert_eq!(FileKind::from_path(Path::new("page.json")), FileKind::Manifest);
        assert_eq!(FileKind::from_path(Path::new("logo.png")), FileKind::Other);
        assert_eq!(FileKind::from_path(Path::new("Makefile")), FileKind::Other);
        assert!(!FileKind::Other.is_rewritable());
    }
}
