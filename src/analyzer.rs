//! The repository analyzer.
//!
//! Orchestrates one full analysis: clone, snapshot selection, the
//! per-snapshot index/extract loop, graph assembly, and recent-history
//! collection. The scratch clone lives in a [Workspace] and is removed on
//! every exit path.

use std::path::Path;

use crate::error::WorkerError;
use crate::extract::extract_dependencies;
use crate::git;
use crate::graph::FileMap;
use crate::graph::FileRecord;
use crate::graph::Graph;
use crate::graph::GraphArtifact;
use crate::graph::Metadata;
use crate::graph::Snapshot;
use crate::graph::ARTIFACT_VERSION;
use crate::languages;
use crate::languages::Lang;
use crate::selection::select_impactful;
use crate::symbols::build_symbol_map;
use crate::symbols::to_posix;
use crate::symbols::walk_repo;
use crate::workspace::Workspace;

const HISTORY_LIMIT: usize = 20;

/// Analyze a repository and return the composite graph artifact.
///
/// `metadata.analyzedAt` is left unset; the caller stamps it before upload.
pub fn analyze_repository(
    repo_url: &str,
    refname: Option<&str>,
) -> Result<GraphArtifact, WorkerError> {
    let workspace = Workspace::create()?;

    log::info!("Cloning {}...", repo_url);

    if let Err(err) = git::clone_repository(repo_url, refname, workspace.path()) {
        log::error!("Clone failed: {:#}", err);
        return Err(WorkerError::CloneFailure(err.to_string()));
    }

    let commits = git::enumerate_commits(workspace.path())?;
    let selected = select_impactful(&commits);

    if !selected.is_empty() {
        log::info!("Analyzing {} snapshot(s)...", selected.len());
    }

    let mut snapshots = Vec::with_capacity(selected.len());

    for commit in &selected {
        git::checkout_commit(workspace.path(), &commit.hash);
        let files = analyze_tree(workspace.path());
        snapshots.push(Snapshot {
            hash: commit.hash.clone(),
            date: commit.date.clone(),
            impact: commit.impact,
            files,
        });
    }

    // The last selected commit is HEAD; its snapshot feeds the final graph.
    // With no history at all, the working tree is analyzed directly.
    let latest = match snapshots.last() {
        Some(snapshot) => snapshot.files.clone(),
        None => analyze_tree(workspace.path()),
    };

    let graph = Graph::build(&latest);
    let history = git::recent_history(workspace.path(), HISTORY_LIMIT);

    log::info!(
        "Analysis complete: {} node(s), {} edge(s), {} snapshot(s)",
        graph.stats.node_count,
        graph.stats.edge_count,
        snapshots.len()
    );

    Ok(GraphArtifact {
        metadata: Metadata {
            repo_url: repo_url.to_string(),
            refname: refname.unwrap_or("main").to_string(),
            analyzed_at: None,
            version: ARTIFACT_VERSION.to_string(),
        },
        nodes: graph.nodes,
        edges: graph.edges,
        history,
        stats: graph.stats,
        snapshots,
    })
}

/// Index and analyze the tree as it currently sits on disk.
///
/// Builds a fresh symbol map, then produces one [FileRecord] per file with
/// a classified extension. Unreadable files keep a record with zero lines
/// and no dependencies.
pub fn analyze_tree(root: &Path) -> FileMap {
    let symbols = build_symbol_map(root);
    let mut files = FileMap::new();

    for entry in walk_repo(root) {
        let path = entry.path();

        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        let Some(language) = Lang::of(path) else {
            continue;
        };

        let rel_path = to_posix(rel);
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let content = std::fs::read(path)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();

        let depends_on = extract_dependencies(&rel_path, ext, &content, &symbols, root);
        let line_count = languages::count_lines(path);

        files.insert(rel_path, FileRecord { language, line_count, depends_on });
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeType;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn analyze_tree_links_python_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "import b\n");
        write(dir.path(), "b.py", "x = 1\n");

        let files = analyze_tree(dir.path());

        assert_eq!(files.len(), 2);
        let a = &files["a.py"];
        assert_eq!(a.language, Lang::Python);
        assert_eq!(a.line_count, 1);
        assert_eq!(a.depends_on.len(), 1);
        assert_eq!(a.depends_on[0].target, "b.py");
        assert_eq!(a.depends_on[0].kind, EdgeType::FileDependency);
    }

    #[test]
    fn analyze_tree_skips_unclassified_files() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "main.rs", "fn main() {}\n");
        write(dir.path(), "notes.txt", "hello\n");
        write(dir.path(), "app.py", "x = 1\n");

        let files = analyze_tree(dir.path());
        assert_eq!(files.len(), 1);
        assert!(files.contains_key("app.py"));
    }

    #[test]
    fn analyze_tree_resolves_c_includes_across_directories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/foo.c", "#include \"foo.h\"\nint main() { return 0; }\n");
        write(dir.path(), "include/foo.h", "#pragma once\n");

        let files = analyze_tree(dir.path());
        let deps = &files["src/foo.c"].depends_on;

        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target, "include/foo.h");
        assert_eq!(deps[0].kind, EdgeType::Include);
    }

    #[test]
    fn analyze_tree_resolves_monorepo_alias_imports() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "apps/web/src/index.ts", "import x from \"@/utils/x\";\n");
        write(dir.path(), "apps/web/src/utils/x.ts", "export const x = 1;\n");

        let files = analyze_tree(dir.path());
        let deps = &files["apps/web/src/index.ts"].depends_on;

        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target, "apps/web/src/utils/x.ts");
        assert_eq!(deps[0].kind, EdgeType::Import);
    }

    #[test]
    fn analyze_tree_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.py", "import b\n");
        write(dir.path(), "b.py", "import c\nx = 2\n");
        write(dir.path(), "c.py", "x = 3\n");

        let first = Graph::build(&analyze_tree(dir.path()));
        let second = Graph::build(&analyze_tree(dir.path()));

        assert_eq!(
            serde_json::to_string(&first.nodes).unwrap(),
            serde_json::to_string(&second.nodes).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first.edges).unwrap(),
            serde_json::to_string(&second.edges).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first.stats).unwrap(),
            serde_json::to_string(&second.stats).unwrap()
        );
    }
}
