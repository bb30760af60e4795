// mpn-core/src/scan/mod.rs
//! Finds specifiers in file contents, one scanner per file kind.
//!
//! Scanners only locate text; deciding what a specifier means (and what it
//! should become) is left to the resolver and the rewriter.
use std::ops::Range;

use mpn_common::manifest::COMPONENTS_KEY;
use mpn_common::model::FileKind;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub mod extract;

pub use extract::{ScanningExtractor, SpecifierExtractor};

/// One specifier occurrence. `span` covers the specifier text only, quotes
/// and `url(` excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecifierMatch {
    pub span: Range<usize>,
    pub specifier: String,
}

static SCRIPT_STATIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?m)(?:^|[^\w$.])(?:import|export)\s*(?:type\s+)?(?:[\w$*{},\s]+?\s*from\s*)?(?:'([^'\n]*)'|"([^"\n]*)")"#,
    )
    .expect("valid static import pattern")
});

static SCRIPT_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)(?:^|[^\w$.])(?:require|import)\s*\(\s*(?:'([^'\n]*)'|"([^"\n]*)")\s*\)"#)
        .expect("valid require pattern")
});

static STYLE_IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)@import\s*(?:url\(\s*(?:'([^'\n]*)'|"([^"\n]*)"|([^'"\s)]+))|'([^'\n]*)'|"([^"\n]*)")"#,
    )
    .expect("valid stylesheet import pattern")
});

static COMPONENTS_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r#""{}"\s*:\s*\{{"#, regex::escape(COMPONENTS_KEY)))
        .expect("valid component block pattern")
});

static MANIFEST_PAIR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.)*"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("valid manifest pair pattern")
});

fn first_group(caps: &Captures<'_>) -> Option<SpecifierMatch> {
    caps.iter().skip(1).flatten().next().map(|m| SpecifierMatch {
        span: m.range(),
        specifier: m.as_str().to_string(),
    })
}

fn collect(patterns: &[&Regex], content: &str) -> Vec<SpecifierMatch> {
    let mut matches: Vec<SpecifierMatch> = patterns
        .iter()
        .flat_map(|re| re.captures_iter(content).filter_map(|c| first_group(&c)))
        .collect();
    matches.sort_by_key(|m| m.span.start);
    matches.dedup_by(|later, earlier| later.span.start < earlier.span.end);
    matches
}

/// `import`/`export … from`/`require(…)`/`import(…)` specifiers.
pub fn scan_script(content: &str) -> Vec<SpecifierMatch> {
    collect(&[&SCRIPT_STATIC_RE, &SCRIPT_CALL_RE], content)
}

/// `@import` specifiers, quoted or wrapped in `url(…)`.
pub fn scan_stylesheet(content: &str) -> Vec<SpecifierMatch> {
    collect(&[&STYLE_IMPORT_RE], content)
}

/// String values of every component declaration block.
pub fn scan_manifest(content: &str) -> Vec<SpecifierMatch> {
    let mut matches = Vec::new();
    for block_start in COMPONENTS_BLOCK_RE.find_iter(content) {
        let open = block_start.end() - 1;
        let Some(close) = matching_brace(content, open) else {
            continue;
        };
        let block = &content[open + 1..close];
        for caps in MANIFEST_PAIR_RE.captures_iter(block) {
            let Some(value) = caps.get(1) else { continue };
            let raw = value.as_str();
            let specifier = if raw.contains('\\') {
                match serde_json::from_str::<String>(&format!("\"{raw}\"")) {
                    Ok(decoded) => decoded,
                    Err(_) => continue,
                }
            } else {
                raw.to_string()
            };
            let offset = open + 1;
            matches.push(SpecifierMatch {
                span: offset + value.start()..offset + value.end(),
                specifier,
            });
        }
    }
    matches
}

/// Index of the `}` closing the `{` at `open`, honoring JSON strings.
fn matching_brace(content: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, byte) in content.bytes().enumerate().skip(open) {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

pub fn scan(kind: FileKind, content: &str) -> Vec<SpecifierMatch> {
    match kind {
        FileKind::Script => scan_script(content),
        FileKind::Stylesheet => scan_stylesheet(content),
        FileKind::Manifest => scan_manifest(content),
        FileKind::Other => Vec::new(),
    }
}
