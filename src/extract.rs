//! Per-file dependency extraction.
//!
//! Each language family gets a small set of pattern rules that rewrite
//! import-like statements into symbol keys and look them up in the snapshot's
//! symbol map. Resolution is best-effort: an unresolved reference produces no
//! edge. Pattern matching is deliberately below comment/string awareness —
//! that trade-off buys uniform handling across ten file types.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::graph::EdgeType;
use crate::graph::OutboundDep;
use crate::symbols::SymbolMap;

lazy_static! {
    static ref JVM_IMPORT_RE: Regex = Regex::new(r"(?m)^\s*import\s+([\w\.]+)").unwrap();
    static ref PY_IMPORT_RE: Regex =
        Regex::new(r"(?m)^(?:from\s+([\w\.]+)\s+import|import\s+([\w\.]+))").unwrap();
    static ref LAYOUT_RE: Regex = Regex::new(r"@layout/(\w+)").unwrap();
    static ref XML_TAG_RE: Regex = Regex::new(r"<\s*([\w\.]+)").unwrap();
    static ref GRADLE_INCLUDE_RE: Regex =
        Regex::new(r#"include\s*\(?["']:(.+?)["']\)?"#).unwrap();
    static ref C_INCLUDE_RE: Regex = Regex::new(r#"#include\s*["<](.+?)[">]"#).unwrap();
    static ref JS_IMPORT_RE: Regex =
        Regex::new(r#"(?:from|require\s*\()\s*["']([\./@][^"']+)["']"#).unwrap();
}

/// Extract the outbound dependencies of one file.
///
/// `rel_path` is the file's repo-relative posix path, `ext` its extension,
/// and `repo_root` the checked-out tree (needed for gradle module
/// existence probes). Targets are always values from the symbol map or
/// paths verified on disk, never raw symbols.
pub fn extract_dependencies(
    rel_path: &str,
    ext: &str,
    content: &str,
    symbols: &SymbolMap,
    repo_root: &Path,
) -> Vec<OutboundDep> {
    match ext {
        "kt" | "java" => jvm_deps(content, symbols),
        "py" => python_deps(content, symbols),
        "xml" => xml_deps(content, symbols),
        "gradle" | "kts" => gradle_deps(content, repo_root),
        "c" | "cpp" | "h" | "hpp" | "cc" => c_deps(content, symbols),
        "js" | "jsx" | "ts" | "tsx" | "vue" => js_deps(rel_path, content, symbols),
        _ => Vec::new(),
    }
}

fn jvm_deps(content: &str, symbols: &SymbolMap) -> Vec<OutboundDep> {
    JVM_IMPORT_RE
        .captures_iter(content)
        .filter_map(|cap| symbols.get(&cap[1]))
        .map(|target| OutboundDep { target: target.clone(), kind: EdgeType::FileDependency })
        .collect()
}

fn python_deps(content: &str, symbols: &SymbolMap) -> Vec<OutboundDep> {
    let mut deps = Vec::new();

    for cap in PY_IMPORT_RE.captures_iter(content) {
        let module = cap.get(1).or_else(|| cap.get(2)).map(|m| m.as_str()).unwrap_or("");

        if let Some(target) = symbols.get(module) {
            deps.push(OutboundDep { target: target.clone(), kind: EdgeType::FileDependency });
        }
    }

    deps
}

fn xml_deps(content: &str, symbols: &SymbolMap) -> Vec<OutboundDep> {
    let mut deps = Vec::new();

    for cap in LAYOUT_RE.captures_iter(content) {
        if let Some(target) = symbols.get(&format!("@layout/{}", &cap[1])) {
            deps.push(OutboundDep { target: target.clone(), kind: EdgeType::LayoutInclude });
        }
    }

    // Custom view tags carry a package-qualified name; plain tags never
    // contain a dot and are skipped without a lookup.
    for cap in XML_TAG_RE.captures_iter(content) {
        let tag = &cap[1];

        if tag.contains('.') {
            if let Some(target) = symbols.get(tag) {
                deps.push(OutboundDep { target: target.clone(), kind: EdgeType::ClassReference });
            }
        }
    }

    deps
}

fn gradle_deps(content: &str, repo_root: &Path) -> Vec<OutboundDep> {
    let mut deps = Vec::new();

    for cap in GRADLE_INCLUDE_RE.captures_iter(content) {
        let module_dir = cap[1].replace(':', "/");
        let candidates =
            [format!("{}/build.gradle", module_dir), format!("{}/build.gradle.kts", module_dir)];

        for candidate in candidates {
            if repo_root.join(&candidate).exists() {
                deps.push(OutboundDep { target: candidate, kind: EdgeType::ModuleInclude });
                break;
            }
        }
    }

    deps
}

fn c_deps(content: &str, symbols: &SymbolMap) -> Vec<OutboundDep> {
    let mut deps = Vec::new();

    for cap in C_INCLUDE_RE.captures_iter(content) {
        let basename = cap[1].rsplit('/').next().unwrap_or(&cap[1]);

        if let Some(target) = symbols.get(basename) {
            deps.push(OutboundDep { target: target.clone(), kind: EdgeType::Include });
        }
    }

    deps
}

fn js_deps(rel_path: &str, content: &str, symbols: &SymbolMap) -> Vec<OutboundDep> {
    let current_dir = rel_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
    let mut deps = Vec::new();

    for cap in JS_IMPORT_RE.captures_iter(content) {
        let specifier = &cap[1];

        let hint = match specifier.strip_prefix("@/") {
            Some(stripped) => stripped.to_string(),
            // A repo-root file has an empty current_dir; the joined hint then
            // keeps its leading slash through normalization and can only
            // miss, matching the alias-less resolution rules.
            None => normalize_posix(&format!("{}/{}", current_dir, specifier)),
        };

        if hint.is_empty() {
            continue;
        }

        if let Some(target) = resolve_js_target(&hint, symbols) {
            deps.push(OutboundDep { target: target.clone(), kind: EdgeType::Import });
        }
    }

    deps
}

/// Resolve a path hint against the symbol map: exact key first, then the
/// monorepo prefixes, then the first (lexicographically smallest) key that
/// ends with `/<hint>`.
fn resolve_js_target<'a>(hint: &str, symbols: &'a SymbolMap) -> Option<&'a String> {
    if let Some(target) = symbols.get(hint) {
        return Some(target);
    }

    for prefix in ["src/", "app/", "apps/web/src/"] {
        if let Some(target) = symbols.get(&format!("{}{}", prefix, hint)) {
            return Some(target);
        }
    }

    let suffix = format!("/{}", hint);
    symbols
        .iter()
        .find(|(key, _)| key.contains('/') && key.ends_with(&suffix))
        .map(|(_, target)| target)
}

/// Posix-style path normalization: drops `.` and empty segments, collapses
/// `..` where possible, and preserves a leading slash.
fn normalize_posix(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            _ => parts.push(segment),
        }
    }

    let joined = parts.join("/");

    if absolute {
        format!("/{}", joined)
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    }
}
