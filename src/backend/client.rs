use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::error::BackendError;
use super::types::{GenerationRequest, HealthSnapshot, InfoResponse, JobHandle, JobStatusUpdate};
use crate::config::Catalog;

/// The three calls the coordinator makes against a backend.
///
/// Implementations never retry; a failed call is reported once and the
/// caller decides what to do next.
pub trait JobBackend: Send + Sync {
    fn submit(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<JobHandle, BackendError>> + Send;

    fn fetch_status(
        &self,
        model: &str,
        job_id: &str,
    ) -> impl Future<Output = Result<JobStatusUpdate, BackendError>> + Send;

    fn fetch_health(
        &self,
        model: &str,
    ) -> impl Future<Output = Result<HealthSnapshot, BackendError>> + Send;
}

/// HTTP client for the generation backends listed in a [`Catalog`].
pub struct RemoteJobClient {
    client: Client,
    catalog: Catalog,
}

impl RemoteJobClient {
    pub fn new(
        catalog: Catalog,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, catalog })
    }

    /// Artifact URL for a job. Not fetched by the coordinator.
    pub fn download_url(&self, model: &str, job_id: &str) -> Result<String, BackendError> {
        self.catalog
            .download_url(model, job_id)
            .ok_or_else(|| BackendError::UnknownModel(model.to_string()))
    }

    fn url(&self, model: &str, segments: &[&str]) -> Result<String, BackendError> {
        self.catalog
            .endpoint(model, segments)
            .ok_or_else(|| BackendError::UnknownModel(model.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        decode(response).await
    }
}

/// Turn a response into `T`, or into an error carrying no partial data.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();

    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| BackendError::Malformed(e.to_string()))
}

impl JobBackend for RemoteJobClient {
    async fn submit(
        &self,
        model: &str,
        request: &GenerationRequest,
    ) -> Result<JobHandle, BackendError> {
        let url = self.url(model, &["generate"])?;
        debug!(%url, "POST");
        let response = self.client.post(&url).json(request).send().await?;
        decode(response).await
    }

    async fn fetch_status(
        &self,
        model: &str,
        job_id: &str,
    ) -> Result<JobStatusUpdate, BackendError> {
        let url = self.url(model, &["jobs", job_id])?;
        self.get_json(&url).await
    }

    async fn fetch_health(&self, model: &str) -> Result<HealthSnapshot, BackendError> {
        let url = self.url(model, &["info"])?;
        let info: InfoResponse = self.get_json(&url).await?;
        Ok(info.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendEntry;
    use crate::jobs::JobStatus;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> RemoteJobClient {
        let catalog: Catalog = [(
            "waver",
            BackendEntry {
                name: "Waver 1.0".into(),
                base_url: server.uri(),
            },
        )]
        .into_iter()
        .collect();
        RemoteJobClient::new(catalog, Duration::from_secs(1), timeout).unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            prompt: "a cat".into(),
            duration: 5,
            fps: 24,
            resolution: "1024x576".into(),
            guidance_scale: 7.5,
            seed: None,
        }
    }

    #[tokio::test]
    async fn submit_posts_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_json(json!({
                "prompt": "a cat",
                "duration": 5,
                "fps": 24,
                "resolution": "1024x576",
                "guidance_scale": 7.5
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"job_id": "abc123", "status": "queued"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let handle = client.submit("waver", &request()).await.unwrap();
        assert_eq!(handle.job_id, "abc123");
        assert_eq!(handle.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn fetch_status_encodes_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/a%2Fb%3Fc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let update = client.fetch_status("waver", "a/b?c").await.unwrap();
        assert_eq!(update.status, JobStatus::Queued);
    }

    #[tokio::test]
    async fn fetch_status_parses_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "processing", "progress": 40})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let update = client.fetch_status("waver", "abc123").await.unwrap();
        assert_eq!(update.status, JobStatus::Processing);
        assert_eq!(update.progress, Some(40));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Job não encontrado"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch_status("waver", "missing").await.unwrap_err();
        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 404);
                assert!(message.contains("Job não encontrado"));
            }
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch_status("waver", "abc123").await.unwrap_err();
        assert!(matches!(err, BackendError::Malformed(_)));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jobs/abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "processing"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(100));
        let err = client.fetch_status("waver", "abc123").await.unwrap_err();
        assert!(matches!(err, BackendError::Timeout), "got {err:?}");
    }

    #[tokio::test]
    async fn unknown_model_never_hits_the_network() {
        let server = MockServer::start().await;
        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch_health("sora").await.unwrap_err();
        assert!(matches!(err, BackendError::UnknownModel(m) if m == "sora"));
    }

    #[tokio::test]
    async fn fetch_health_reads_info() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": {"loaded": true},
                "system": {"gpu_memory": {"available": true, "allocated_gb": 12.5, "total_gb": 128.0}},
                "queue_size": 0,
                "total_jobs": 3
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let snapshot = client.fetch_health("waver").await.unwrap();
        assert!(snapshot.model_loaded);
        assert_eq!(snapshot.memory_used_gb, Some(12.5));
        assert_eq!(snapshot.total_jobs, Some(3));
    }

    #[test]
    fn download_url_is_built_not_fetched() {
        let catalog: Catalog = [(
            "waver",
            BackendEntry {
                name: "Waver 1.0".into(),
                base_url: "http://localhost:8004/".into(),
            },
        )]
        .into_iter()
        .collect();
        let client =
            RemoteJobClient::new(catalog, Duration::from_secs(1), Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.download_url("waver", "abc123").unwrap(),
            "http://localhost:8004/jobs/abc123/download"
        );
        assert!(client.download_url("sora", "abc123").is_err());
    }
}
