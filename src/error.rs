//! Job-level error taxonomy.
//!
//! The display form of every variant is `<ErrorKind>: <detail>`, which is
//! exactly the string written to the job store's `error_message` column when
//! a job fails.

use thiserror::Error;

/// Errors that terminate a single job.
///
/// Degradations that merely skip a snapshot, a file, or the history list are
/// handled locally and never reach this type.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Clone or initial checkout of the target repository failed.
    #[error("CloneFailure: {0}")]
    CloneFailure(String),

    /// The object store rejected the artifact upload.
    #[error("UploadFailure: {0}")]
    UploadFailure(String),

    /// The relational job store could not be read or written.
    #[error("JobStoreFailure: {0}")]
    JobStore(#[from] postgres::Error),

    /// The scratch directory for the job could not be created.
    #[error("WorkspaceFailure: {0}")]
    Workspace(#[from] std::io::Error),

    /// Anything else that escaped the analysis pipeline.
    #[error("AnalysisFailure: {0}")]
    Analysis(#[from] anyhow::Error),
}
