use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use super::JobTransport;
use super::error::TransportError;
use super::types::{ArtifactListing, CreateJobRequest, JobCreated, JobPayload, JobStatusReport};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

pub struct HttpJobClient {
    client: Client,
    base_url: String,
}

impl HttpJobClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeouts(base_url, Duration::from_secs(10), Duration::from_secs(30))
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling, tests).
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl JobTransport for HttpJobClient {
    async fn submit(&self, project_id: &str, payload: &JobPayload) -> Result<String, TransportError> {
        let req = CreateJobRequest {
            project_id,
            job_type: payload.kind(),
            payload,
        };
        let response = self.client.post(self.url("/jobs")).json(&req).send().await?;
        let created: JobCreated = Self::decode(response).await?;

        if created.job_id.trim().is_empty() {
            return Err(TransportError::MissingField("job_id"));
        }
        Ok(created.job_id)
    }

    async fn fetch_status(&self, job_id: &str) -> Result<JobStatusReport, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{job_id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn list_artifacts(&self, project_id: &str) -> Result<ArtifactListing, TransportError> {
        let response = self
            .client
            .get(self.url(&format!("/projects/{project_id}/artifacts")))
            .send()
            .await?;
        Self::decode(response).await
    }
}
