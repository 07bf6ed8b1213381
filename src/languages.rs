//! Language classification and line counting.

use std::path::Path;

use serde::Serialize;

/// Each language that produces file records in the graph.
///
/// The serialized spelling is part of the artifact format; downstream graph
/// consumers depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[derive(strum::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Kotlin,
    Java,
    Python,
    Xml,
    Gradle,
    JavaScript,
    TypeScript,
    Vue,
    C,
    Cpp,
    Json,
}

impl Lang {
    /// Classify a file by its extension.
    ///
    /// `.kts` is gradle tooling only when the filename actually contains
    /// "gradle" (`build.gradle.kts`, `settings.gradle.kts`); any other
    /// `.kts` is a plain Kotlin script. Files with unlisted extensions
    /// return `None` and never become file records.
    pub fn of(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        let lang = match ext {
            "kt" => Lang::Kotlin,
            "java" => Lang::Java,
            "py" => Lang::Python,
            "xml" => Lang::Xml,
            "gradle" => Lang::Gradle,
            "kts" => {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
                if name.contains("gradle") {
                    Lang::Gradle
                } else {
                    Lang::Kotlin
                }
            }
            "js" | "jsx" => Lang::JavaScript,
            "ts" | "tsx" => Lang::TypeScript,
            "vue" => Lang::Vue,
            "c" | "h" => Lang::C,
            "cpp" | "hpp" | "cc" => Lang::Cpp,
            "json" => Lang::Json,
            _ => return None,
        };
        Some(lang)
    }
}

/// Count the lines of a file, reading it as UTF-8 with replacement.
///
/// An empty file has zero lines; a file that cannot be read at all also
/// counts as zero.
pub fn count_lines(path: &Path) -> usize {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).lines().count(),
        Err(_) => 0,
    }
}
