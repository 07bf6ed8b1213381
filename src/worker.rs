//! Queue consumption and the job lifecycle.
//!
//! One job at a time: the loop blocks on the queue, runs the analysis to
//! completion, and only then looks for the next message. Termination
//! signals set a flag that is honored between jobs; in-flight analysis is
//! never interrupted.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use redis::Commands;
use serde::Deserialize;

use crate::analyzer::analyze_repository;
use crate::config::Config;
use crate::error::WorkerError;
use crate::object_store::ObjectStore;
use crate::store::JobRow;
use crate::store::JobStore;
use crate::store::JobUpdate;
use crate::store::ProjectStatus;

const QUEUE_POP_TIMEOUT_SECS: f64 = 5.0;
const RECONNECT_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct JobMessage {
    #[serde(rename = "jobId")]
    job_id: Option<String>,
}

/// Consume jobs from the queue until a termination signal arrives.
pub fn run(config: &Config) -> Result<()> {
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            log::info!("Received termination signal, shutting down gracefully...");
            shutdown.store(true, Ordering::SeqCst);
        })?;
    }

    log::info!("Worker starting; queue: {}", config.queue_name);

    let client = redis::Client::open(config.redis_url.as_str())?;
    let object_store = ObjectStore::new(config)?;
    let mut connection = None;

    log::info!("Waiting for jobs...");

    while !shutdown.load(Ordering::SeqCst) {
        if connection.is_none() {
            match client.get_connection() {
                Ok(conn) => connection = Some(conn),
                Err(err) => {
                    log::error!("Queue connection failed: {}", err);
                    std::thread::sleep(RECONNECT_BACKOFF);
                    continue;
                }
            }
        }

        let Some(conn) = connection.as_mut() else {
            continue;
        };

        let reply: Result<Option<(String, String)>, redis::RedisError> =
            conn.brpop(&config.queue_name, QUEUE_POP_TIMEOUT_SECS);

        let payload = match reply {
            Ok(Some((_, payload))) => payload,
            Ok(None) => continue,
            Err(err) => {
                log::error!("Queue error: {}", err);
                connection = None;
                continue;
            }
        };

        let job_id = match serde_json::from_str::<JobMessage>(&payload) {
            Ok(JobMessage { job_id: Some(job_id) }) => job_id,
            Ok(JobMessage { job_id: None }) => {
                log::warn!("Invalid job payload, missing jobId");
                continue;
            }
            Err(err) => {
                log::warn!("Invalid job payload: {}", err);
                continue;
            }
        };

        log::info!("Received job: {}", job_id);

        if let Err(err) = process_job(config, &object_store, &job_id) {
            log::error!("Error processing job {}: {}", job_id, err);
        }
    }

    log::info!("Shutdown complete");
    Ok(())
}

/// Run one job end to end, recording terminal state in the job store.
///
/// A missing job row is logged and skipped. Any failure inside the job
/// marks it `failed` with the error's `<ErrorKind>: <detail>` string, then
/// makes a best-effort attempt to move the project to `error`.
fn process_job(config: &Config, object_store: &ObjectStore, job_id: &str) -> Result<(), WorkerError> {
    log::info!("Starting job: {}", job_id);

    let mut store = JobStore::connect(&config.database_url)?;

    let Some(job) = store.get_job(job_id)? else {
        log::warn!("Job not found: {}", job_id);
        return Ok(());
    };

    if let Err(err) = run_job(&mut store, object_store, &job) {
        log::error!("Job failed: {} ({})", job_id, err);
        store.update_job(job_id, &JobUpdate::failed(&err.to_string()))?;

        if let Ok(Some(row)) = store.get_job(job_id) {
            let _ = store.update_project_status(&row.project_id, ProjectStatus::Error);
        }

        return Ok(());
    }

    log::info!("Job completed: {}", job_id);
    Ok(())
}

fn run_job(
    store: &mut JobStore,
    object_store: &ObjectStore,
    job: &JobRow,
) -> Result<(), WorkerError> {
    store.update_job(&job.id, &JobUpdate::running(0.0, "Starting analysis..."))?;
    store.update_job(&job.id, &JobUpdate::running(0.1, "Cloning repository..."))?;
    store.update_job(&job.id, &JobUpdate::running(0.3, "Analyzing code structure..."))?;

    let mut artifact = analyze_repository(&job.repo_url, job.refname.as_deref())?;
    artifact.metadata.analyzed_at = Some(Utc::now().to_rfc3339());

    let stats_json = serde_json::to_value(&artifact.stats).ok();

    store.update_job(&job.id, &JobUpdate::running(0.8, "Uploading results..."))?;

    let result_url = object_store.upload_graph(&job.id, &artifact)?;

    store.update_job(&job.id, &JobUpdate::done("Analysis complete", &result_url, stats_json))?;
    store.update_project_status(&job.project_id, ProjectStatus::Ready)?;

    log::info!("Result key: {}", result_url);
    Ok(())
}
