//! Relational job store.
//!
//! Jobs are joined with their project so the worker learns the repository
//! URL and ref in one read. Updates have partial semantics: columns left
//! unset keep their previous values.

use postgres::Client;
use postgres::NoTls;
use serde_json::Value;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    Ready,
    Error,
}

/// One job row joined with its owning project.
#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub project_id: String,
    pub repo_url: String,
    pub refname: Option<String>,
}

/// A partial job update; `None` fields keep their stored values.
#[derive(Debug)]
pub struct JobUpdate<'a> {
    pub status: JobStatus,
    pub progress: Option<f64>,
    pub message: Option<&'a str>,
    pub result_url: Option<&'a str>,
    pub stats_json: Option<Value>,
    pub error_message: Option<&'a str>,
}

impl<'a> JobUpdate<'a> {
    pub fn running(progress: f64, message: &'a str) -> Self {
        Self {
            status: JobStatus::Running,
            progress: Some(progress),
            message: Some(message),
            result_url: None,
            stats_json: None,
            error_message: None,
        }
    }

    pub fn done(message: &'a str, result_url: &'a str, stats_json: Option<Value>) -> Self {
        Self {
            status: JobStatus::Done,
            progress: Some(1.0),
            message: Some(message),
            result_url: Some(result_url),
            stats_json,
            error_message: None,
        }
    }

    pub fn failed(error_message: &'a str) -> Self {
        Self {
            status: JobStatus::Failed,
            progress: None,
            message: None,
            result_url: None,
            stats_json: None,
            error_message: Some(error_message),
        }
    }
}

pub struct JobStore {
    client: Client,
}

impl JobStore {
    pub fn connect(database_url: &str) -> Result<Self, postgres::Error> {
        Ok(Self { client: Client::connect(database_url, NoTls)? })
    }

    pub fn get_job(&mut self, job_id: &str) -> Result<Option<JobRow>, postgres::Error> {
        let row = self.client.query_opt(
            "SELECT aj.id, aj.project_id, p.repo_url, p.ref \
             FROM analysis_jobs aj \
             JOIN projects p ON p.id = aj.project_id \
             WHERE aj.id = $1",
            &[&job_id],
        )?;

        Ok(row.map(|row| JobRow {
            id: row.get("id"),
            project_id: row.get("project_id"),
            repo_url: row.get("repo_url"),
            refname: row.get("ref"),
        }))
    }

    pub fn update_job(&mut self, job_id: &str, update: &JobUpdate) -> Result<(), postgres::Error> {
        self.client.execute(
            "UPDATE analysis_jobs SET \
                status = $1, \
                progress = COALESCE($2, progress), \
                message = COALESCE($3, message), \
                result_url = COALESCE($4, result_url), \
                stats_json = COALESCE($5, stats_json), \
                error_message = COALESCE($6, error_message), \
                updated_at = NOW() \
             WHERE id = $7",
            &[
                &update.status.to_string(),
                &update.progress,
                &update.message,
                &update.result_url,
                &update.stats_json,
                &update.error_message,
                &job_id,
            ],
        )?;

        Ok(())
    }

    pub fn update_project_status(
        &mut self,
        project_id: &str,
        status: ProjectStatus,
    ) -> Result<(), postgres::Error> {
        self.client.execute(
            "UPDATE projects SET status = $1, updated_at = NOW() WHERE id = $2",
            &[&status.to_string(), &project_id],
        )?;

        Ok(())
    }
}
