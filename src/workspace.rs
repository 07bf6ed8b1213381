//! Per-job scratch directory.

use std::path::Path;

use tempfile::Builder;
use tempfile::TempDir;

/// A scratch directory owned exclusively by one job.
///
/// The directory is removed recursively when the workspace is dropped, so it
/// cannot outlive the job on any exit path. Removal failures are swallowed
/// by the drop impl of the inner [TempDir].
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn create() -> Result<Self, std::io::Error> {
        let dir = Builder::new().prefix("codeviz_").tempdir()?;
        log::debug!("Created workspace at {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
