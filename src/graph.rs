//! Graph artifact model and assembly.
//!
//! Everything in this module is serialized verbatim into the uploaded
//! artifact, so field names and enum spellings are part of the wire format.

use std::collections::BTreeMap;
use std::collections::HashSet;

use serde::Serialize;

use crate::languages::Lang;

/// Fixed artifact format version.
pub const ARTIFACT_VERSION: &str = "2.1.0";

/// The closed set of edge types. Downstream consumers depend on the exact
/// spelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    FileDependency,
    LayoutInclude,
    ClassReference,
    ModuleInclude,
    Include,
    Import,
}

/// A directed dependency from the owning file to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundDep {
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

/// Per-file analysis result within one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct FileRecord {
    pub language: Lang,
    pub line_count: usize,
    pub depends_on: Vec<OutboundDep>,
}

/// Repo-relative posix path → analysis record, ordered for reproducible
/// output.
pub type FileMap = BTreeMap<String, FileRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub lines: usize,
    pub language: Lang,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub kind: EdgeType,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub node_count: usize,
    pub edge_count: usize,
    pub file_count: usize,
    pub directory_count: usize,
    pub total_lines: usize,
    pub languages: BTreeMap<String, u64>,
}

/// One analyzed historical commit.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub hash: String,
    pub date: String,
    pub impact: u64,
    pub files: FileMap,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryFile {
    pub path: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub timestamp: u64,
    pub files: Vec<HistoryFile>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub repo_url: String,
    #[serde(rename = "ref")]
    pub refname: String,
    /// Stamped by the job processor just before upload; the analyzer always
    /// leaves this unset.
    pub analyzed_at: Option<String>,
    pub version: String,
}

/// The complete analysis artifact, uploaded as one JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct GraphArtifact {
    pub metadata: Metadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub history: Vec<HistoryEntry>,
    pub stats: Stats,
    pub snapshots: Vec<Snapshot>,
}

/// Nodes, edges, and aggregate stats assembled from one snapshot's file
/// records.
#[derive(Debug, Clone)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub stats: Stats,
}

impl Graph {
    /// Convert file records into deduplicated node and edge lists.
    ///
    /// Candidate edges whose target is not itself a file record are
    /// dropped, and `(source, target, type)` triples are emitted once in
    /// first-seen order.
    pub fn build(files: &FileMap) -> Self {
        let mut nodes = Vec::with_capacity(files.len());
        let mut languages: BTreeMap<String, u64> = BTreeMap::new();

        for (path, record) in files {
            *languages.entry(record.language.to_string()).or_insert(0) += 1;
            nodes.push(Node {
                id: path.clone(),
                name: basename(path).to_string(),
                path: path.clone(),
                kind: NodeKind::File,
                lines: record.line_count,
                language: record.language,
            });
        }

        let mut edges = Vec::new();
        let mut seen: HashSet<(&str, &str, EdgeType)> = HashSet::new();

        for (source, record) in files {
            for dep in &record.depends_on {
                if !files.contains_key(&dep.target) {
                    continue;
                }

                if seen.insert((source.as_str(), dep.target.as_str(), dep.kind)) {
                    edges.push(Edge {
                        source: source.clone(),
                        target: dep.target.clone(),
                        kind: dep.kind,
                    });
                }
            }
        }

        let total_lines = files.values().map(|r| r.line_count).sum();
        let stats = Stats {
            node_count: nodes.len(),
            edge_count: edges.len(),
            file_count: nodes.len(),
            directory_count: 0,
            total_lines,
            languages,
        };

        Self { nodes, edges, stats }
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
