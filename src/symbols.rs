//! Per-snapshot symbol table.
//!
//! Maps language-specific symbol keys (fully qualified class names, module
//! paths, resource ids, header basenames, relative paths) to
//! repository-relative posix paths. The table is rebuilt from scratch for
//! every snapshot because each checkout mutates the tree.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use walkdir::DirEntry;
use walkdir::WalkDir;

/// Symbol key → repo-relative posix path.
///
/// Ordered so that the suffix-match fallback of the JS resolver scans keys
/// in a reproducible (lexicographic) order. Key collisions are
/// last-writer-wins within one snapshot.
pub type SymbolMap = BTreeMap<String, String>;

lazy_static! {
    static ref PACKAGE_RE: Regex = Regex::new(r"(?m)^\s*package\s+([\w\.]+)").unwrap();
}

/// Walk every regular file beneath `root`, pruning any subtree named
/// `.git`. Traversal is sorted by file name so runs over identical trees
/// visit files in the same order.
pub fn walk_repo(root: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name().to_str() != Some(".git"))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
}

/// Render a repository-relative path with `/` separators.
pub fn to_posix(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Index every source file beneath `root` into a symbol map.
///
/// Unreadable files are skipped silently; they contribute no entries.
pub fn build_symbol_map(root: &Path) -> SymbolMap {
    let mut symbols = SymbolMap::new();

    for entry in walk_repo(root) {
        let path = entry.path();
        let rel = match path.strip_prefix(root) {
            Ok(rel) => to_posix(rel),
            Err(_) => continue,
        };

        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        let content = match std::fs::read(path) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(_) => continue,
        };

        match ext {
            "kt" | "java" => {
                if let Some(cap) = PACKAGE_RE.captures(&content) {
                    symbols.insert(format!("{}.{}", &cap[1], stem), rel.clone());
                }
            }
            "py" => {
                let dotted = rel.replace('/', ".");
                let module = if stem == "__init__" {
                    dotted.strip_suffix(".__init__.py").unwrap_or(&dotted)
                } else {
                    dotted.strip_suffix(".py").unwrap_or(&dotted)
                };
                symbols.insert(module.to_string(), rel.clone());
            }
            "xml" => {
                if rel.split('/').any(|part| part == "layout") {
                    symbols.insert(format!("@layout/{}", stem), rel.clone());
                }
            }
            "h" | "hpp" | "c" | "cpp" | "cc" => {
                symbols.insert(filename.to_string(), rel.clone());
            }
            "js" | "jsx" | "ts" | "tsx" | "vue" => {
                symbols.insert(rel.clone(), rel.clone());
                let no_ext = &rel[..rel.len() - ext.len() - 1];
                symbols.insert(no_ext.to_string(), rel.clone());
                if stem == "index" {
                    let dir = rel.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
                    symbols.insert(dir.to_string(), rel.clone());
                }
            }
            "json" => {
                symbols.insert(rel.clone(), rel.clone());
            }
            _ => {}
        }
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn kotlin_and_java_files_index_fully_qualified_names() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/src/com/acme/Foo.kt", "package com.acme\n\nclass Foo\n");
        write(dir.path(), "app/src/com/acme/Bar.java", "  package com.acme;\npublic class Bar {}\n");
        write(dir.path(), "app/src/NoPackage.kt", "class NoPackage\n");

        let symbols = build_symbol_map(dir.path());
        assert_eq!(symbols.get("com.acme.Foo").map(String::as_str), Some("app/src/com/acme/Foo.kt"));
        assert_eq!(symbols.get("com.acme.Bar").map(String::as_str), Some("app/src/com/acme/Bar.java"));
        assert!(!symbols.values().any(|v| v.ends_with("NoPackage.kt")));
    }

    #[test]
    fn python_files_index_module_paths() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "pkg/__init__.py", "");
        write(dir.path(), "pkg/mod.py", "x = 1\n");
        write(dir.path(), "b.py", "x = 1\n");

        let symbols = build_symbol_map(dir.path());
        assert_eq!(symbols.get("pkg").map(String::as_str), Some("pkg/__init__.py"));
        assert_eq!(symbols.get("pkg.mod").map(String::as_str), Some("pkg/mod.py"));
        assert_eq!(symbols.get("b").map(String::as_str), Some("b.py"));
    }

    #[test]
    fn layout_xml_indexes_resource_ids() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "app/res/layout/activity_main.xml", "<LinearLayout/>\n");
        write(dir.path(), "app/res/values/strings.xml", "<resources/>\n");

        let symbols = build_symbol_map(dir.path());
        assert_eq!(
            symbols.get("@layout/activity_main").map(String::as_str),
            Some("app/res/layout/activity_main.xml")
        );
        assert!(!symbols.keys().any(|k| k.contains("strings")));
    }

    #[test]
    fn headers_index_by_basename_with_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a/foo.h", "");
        write(dir.path(), "b/foo.h", "");

        let symbols = build_symbol_map(dir.path());
        // Sorted traversal makes the later directory the last writer.
        assert_eq!(symbols.get("foo.h").map(String::as_str), Some("b/foo.h"));
    }

    #[test]
    fn js_files_index_path_pathless_and_index_folder() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/utils/x.ts", "export const x = 1;\n");
        write(dir.path(), "src/components/index.ts", "export {};\n");

        let symbols = build_symbol_map(dir.path());
        assert_eq!(symbols.get("src/utils/x.ts").map(String::as_str), Some("src/utils/x.ts"));
        assert_eq!(symbols.get("src/utils/x").map(String::as_str), Some("src/utils/x.ts"));
        assert_eq!(
            symbols.get("src/components").map(String::as_str),
            Some("src/components/index.ts")
        );
    }

    #[test]
    fn git_dir_contents_are_never_indexed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), ".git/objects/info.json", "{}");
        write(dir.path(), "real.json", "{}");

        let symbols = build_symbol_map(dir.path());
        assert_eq!(symbols.len(), 1);
        assert!(symbols.contains_key("real.json"));
    }
}
