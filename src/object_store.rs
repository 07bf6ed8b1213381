//! Object storage for finished artifacts.

use anyhow::Context;
use anyhow::Result;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::region::Region;

use crate::config::Config;
use crate::error::WorkerError;
use crate::graph::GraphArtifact;

pub struct ObjectStore {
    bucket: Box<Bucket>,
}

impl ObjectStore {
    pub fn new(config: &Config) -> Result<Self> {
        let region: Region = config
            .aws_region
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid AWS region: {}", err))?;

        let credentials = Credentials::new(
            Some(&config.aws_access_key_id),
            Some(&config.aws_secret_access_key),
            None,
            None,
            None,
        )
        .context("failed to build object store credentials")?;

        let bucket = Bucket::new(&config.s3_bucket, region, credentials)
            .context("failed to open object store bucket")?;

        Ok(Self { bucket })
    }

    /// Upload the artifact as pretty-printed JSON and return the object key.
    ///
    /// Objects are private; callers construct any URL from the key.
    pub fn upload_graph(
        &self,
        job_id: &str,
        artifact: &GraphArtifact,
    ) -> Result<String, WorkerError> {
        let key = format!("codeviz/graphs/{}/graph.json", job_id);
        let body = serde_json::to_string_pretty(artifact)
            .map_err(|err| WorkerError::UploadFailure(err.to_string()))?;

        let response = self
            .bucket
            .put_object_with_content_type(&key, body.as_bytes(), "application/json")
            .map_err(|err| WorkerError::UploadFailure(err.to_string()))?;

        if response.status_code() != 200 {
            return Err(WorkerError::UploadFailure(format!(
                "unexpected status {}",
                response.status_code()
            )));
        }

        Ok(key)
    }
}
