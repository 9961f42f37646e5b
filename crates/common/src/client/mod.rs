//! Case backend transport
//!
//! One method per backend endpoint. Calls are fire-once: no retries, no
//! caching, no state kept between calls. Validation failures are raised
//! before anything is sent.

mod mock;

pub use mock::{BackendCall, MockCaseBackend};

use async_trait::async_trait;
use reqwest::{multipart, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tracing::instrument;

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::metrics::RequestMetrics;
use crate::models::{
    AskRequest, AskResponse, Case, CaseId, Graph, SimulationResponse, SuspectImageRequest,
    SuspectImageResponse, UploadFile, UploadReceipt,
};

/// Backend operations, used for logging, metrics and error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCases,
    UploadCase,
    RequestSimulation,
    FetchGraph,
    AskDetective,
    GenerateSuspectImage,
    FetchCaseFile,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListCases => "list_cases",
            Operation::UploadCase => "upload_case",
            Operation::RequestSimulation => "request_simulation",
            Operation::FetchGraph => "fetch_graph",
            Operation::AskDetective => "ask_detective",
            Operation::GenerateSuspectImage => "generate_suspect_image",
            Operation::FetchCaseFile => "fetch_case_file",
        }
    }

    /// Banner text shown when this operation fails after leaving the client
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::ListCases => "Failed to fetch cases. Is the backend server running?",
            Operation::UploadCase => "File upload failed.",
            Operation::RequestSimulation => "Failed to fetch simulation.",
            Operation::FetchGraph => "Failed to load graph data.",
            Operation::AskDetective => "Failed to get a response from the detective agent.",
            Operation::GenerateSuspectImage => "Failed to generate suspect image.",
            Operation::FetchCaseFile => "Failed to load the stored case file.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for the case-analysis backend
#[async_trait]
pub trait CaseBackend: Send + Sync {
    /// All known cases, in backend order
    async fn list_cases(&self) -> Result<Vec<Case>>;

    /// Submit a new case file
    async fn upload_case(&self, file: UploadFile) -> Result<UploadReceipt>;

    /// Narrative simulation for a complete text case
    async fn request_simulation(&self, case_id: CaseId) -> Result<String>;

    /// Knowledge graph for a case
    async fn fetch_graph(&self, case_id: CaseId) -> Result<Graph>;

    /// Ask the detective agent about a case; returns the answer
    async fn ask_detective(&self, case_id: CaseId, question: &str) -> Result<String>;

    /// Generate a suspect composite; returns the image URL
    async fn generate_suspect_image(&self, case_id: CaseId, description: &str) -> Result<String>;

    /// Raw bytes of a stored original
    async fn fetch_case_file(&self, file_path: &str) -> Result<Vec<u8>>;

    /// Absolute URL of a stored original, for display
    fn file_url(&self, file_path: &str) -> Option<String>;
}

/// reqwest-backed client for the backend HTTP contract
#[derive(Debug, Clone)]
pub struct HttpCaseClient {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCaseClient {
    /// Create a client for the given origin
    pub fn new(base_url: Url, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.backend_url()?, config.request_timeout(), config.connect_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a path against the backend origin. Absolute URLs and paths
    /// that would leave the origin are rejected.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let invalid = |reason: String| AppError::Validation {
            message: format!("Invalid backend path '{}': {}", path, reason),
            field: None,
        };

        if Url::parse(path).is_ok() {
            return Err(invalid("absolute URLs are not accepted".to_string()));
        }
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| invalid(e.to_string()))?;
        if url.origin() != self.base_url.origin() {
            return Err(invalid("outside the backend origin".to_string()));
        }
        Ok(url)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        body
    };
    Err(AppError::Backend {
        status: status.as_u16(),
        message,
    })
}

async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = check_status(request.send().await?).await?;
    Ok(response.json::<T>().await?)
}

async fn send_bytes(request: RequestBuilder) -> Result<Vec<u8>> {
    let response = check_status(request.send().await?).await?;
    Ok(response.bytes().await?.to_vec())
}

/// Log and record metrics for one backend call
async fn observe<T>(operation: Operation, call: impl Future<Output = Result<T>>) -> Result<T> {
    let metrics = RequestMetrics::start(operation.as_str());
    let result = call.await;

    match &result {
        Ok(_) => tracing::debug!(operation = %operation, "Backend call succeeded"),
        Err(e) => tracing::warn!(operation = %operation, error = %e, "Backend call failed"),
    }
    metrics.finish(result.is_ok());
    result
}

#[async_trait]
impl CaseBackend for HttpCaseClient {
    #[instrument(skip(self))]
    async fn list_cases(&self) -> Result<Vec<Case>> {
        let url = self.endpoint("cases/")?;
        observe(Operation::ListCases, send_json(self.client.get(url))).await
    }

    #[instrument(skip(self, file), fields(filename = %file.filename, size = file.bytes.len()))]
    async fn upload_case(&self, file: UploadFile) -> Result<UploadReceipt> {
        file.validate()?;
        let url = self.endpoint("upload-case/")?;

        let mut part = multipart::Part::bytes(file.bytes).file_name(file.filename);
        if let Some(mime) = file.mime.as_deref() {
            part = part
                .mime_str(mime)
                .map_err(|_| AppError::validation("file", format!("Unsupported file type '{}'", mime)))?;
        }
        let form = multipart::Form::new().part("file", part);

        let body = observe(
            Operation::UploadCase,
            send_bytes(self.client.post(url).multipart(form)),
        )
        .await?;

        // The receipt is informational; an empty or odd body is not a failure
        Ok(serde_json::from_slice::<UploadReceipt>(&body).unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn request_simulation(&self, case_id: CaseId) -> Result<String> {
        let url = self.endpoint(&format!("cases/{}/simulate", case_id))?;
        let response: SimulationResponse =
            observe(Operation::RequestSimulation, send_json(self.client.post(url))).await?;
        Ok(response.simulation)
    }

    #[instrument(skip(self))]
    async fn fetch_graph(&self, case_id: CaseId) -> Result<Graph> {
        let url = self.endpoint(&format!("cases/{}/graph", case_id))?;
        observe(Operation::FetchGraph, send_json(self.client.get(url))).await
    }

    #[instrument(skip(self, question))]
    async fn ask_detective(&self, case_id: CaseId, question: &str) -> Result<String> {
        let body = AskRequest::new(question)?;
        let url = self.endpoint(&format!("cases/{}/ask", case_id))?;
        let response: AskResponse = observe(
            Operation::AskDetective,
            send_json(self.client.post(url).json(&body)),
        )
        .await?;
        Ok(response.answer)
    }

    #[instrument(skip(self, description))]
    async fn generate_suspect_image(&self, case_id: CaseId, description: &str) -> Result<String> {
        let body = SuspectImageRequest::new(description)?;
        let url = self.endpoint(&format!("cases/{}/generate-suspect-image", case_id))?;
        let response: SuspectImageResponse = observe(
            Operation::GenerateSuspectImage,
            send_json(self.client.post(url).json(&body)),
        )
        .await?;
        Ok(response.suspect_image_url)
    }

    #[instrument(skip(self))]
    async fn fetch_case_file(&self, file_path: &str) -> Result<Vec<u8>> {
        if file_path.trim().is_empty() {
            return Err(AppError::validation("file_path", "Case has no stored file."));
        }
        let url = self.endpoint(file_path)?;

        observe(Operation::FetchCaseFile, send_bytes(self.client.get(url))).await
    }

    fn file_url(&self, file_path: &str) -> Option<String> {
        if file_path.trim().is_empty() {
            return None;
        }
        self.endpoint(file_path).ok().map(String::from)
    }
}
