//! REST client for the imgbench backend.
//!
//! Wraps the backend HTTP API (runs, datasets, algorithms, presets)
//! using [`reqwest`]. Non-2xx responses become [`ApiError::Status`]
//! carrying the status code and the parsed `detail` payload.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::backend::Backend;
use crate::wire::{
    AlgorithmCreate, AlgorithmOut, AlgorithmPatch, CancelOut, ClearOut, DatasetCreate,
    DatasetImportZip, DatasetOut, DatasetPatch, PresetCreate, PresetOut, PresetPatch, RunCreate,
    RunOut,
};

/// Default backend address for local development.
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000";

/// HTTP client for one backend.
pub struct BackendApi {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status code.
    #[error("[{status}] {method} {path}{}", detail_suffix(.detail.as_ref(), .body))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request method, e.g. `POST`.
        method: String,
        /// Request path relative to the base URL.
        path: String,
        /// The `detail` field of a JSON error body, or the whole JSON
        /// body when it has none.
        detail: Option<serde_json::Value>,
        /// Raw response body for debugging.
        body: String,
    },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Malformed response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status code for [`ApiError::Status`], `None` otherwise.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed error detail for [`ApiError::Status`], `None` otherwise.
    pub fn detail(&self) -> Option<&serde_json::Value> {
        match self {
            ApiError::Status { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }
}

fn detail_suffix(detail: Option<&serde_json::Value>, body: &str) -> String {
    match detail {
        Some(detail) => format!(" - {detail}"),
        None if !body.is_empty() => format!(" - {body}"),
        None => String::new(),
    }
}

impl BackendApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL, e.g. `http://127.0.0.1:8000`.
    pub fn new(base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`]
    /// (useful for a shared connection pool or custom timeouts).
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Base HTTP URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a request and decode a JSON body into `T`.
    async fn fetch<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = builder.send().await?;
        let response = Self::ensure_success(response, &method, path).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|source| ApiError::Decode {
            path: path.to_string(),
            source,
        })
    }

    /// Send a request and discard the body.
    async fn execute(
        &self,
        builder: reqwest::RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<(), ApiError> {
        let response = builder.send().await?;
        Self::ensure_success(response, &method, path).await?;
        Ok(())
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or an [`ApiError::Status`] with the
    /// parsed detail on failure.
    async fn ensure_success(
        response: reqwest::Response,
        method: &Method,
        path: &str,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .map(|json| match json.get("detail") {
                Some(detail) => detail.clone(),
                None => json,
            });

        tracing::debug!(
            status = status.as_u16(),
            method = %method,
            path,
            "Backend returned an error status",
        );

        Err(ApiError::Status {
            status: status.as_u16(),
            method: method.to_string(),
            path: path.to_string(),
            detail,
            body,
        })
    }
}

#[async_trait]
impl Backend for BackendApi {
    async fn create_run(&self, req: &RunCreate) -> Result<RunOut, ApiError> {
        let path = "/runs";
        let builder = self.request(Method::POST, path).json(req);
        self.fetch(builder, Method::POST, path).await
    }

    async fn get_run(&self, run_id: &str) -> Result<RunOut, ApiError> {
        let path = format!("/runs/{run_id}");
        let builder = self.request(Method::GET, &path);
        self.fetch(builder, Method::GET, &path).await
    }

    async fn list_runs(&self, limit: usize) -> Result<Vec<RunOut>, ApiError> {
        let path = "/runs";
        let builder = self.request(Method::GET, path).query(&[("limit", limit)]);
        self.fetch(builder, Method::GET, path).await
    }

    async fn cancel_run(&self, run_id: &str) -> Result<CancelOut, ApiError> {
        let path = format!("/runs/{run_id}/cancel");
        let builder = self.request(Method::POST, &path);
        self.fetch(builder, Method::POST, &path).await
    }

    async fn clear_runs(&self, status: Option<&str>) -> Result<ClearOut, ApiError> {
        let path = "/runs/clear";
        let mut builder = self.request(Method::POST, path);
        if let Some(status) = status {
            builder = builder.query(&[("status", status)]);
        }
        self.fetch(builder, Method::POST, path).await
    }

    async fn list_datasets(&self, limit: usize) -> Result<Vec<DatasetOut>, ApiError> {
        let path = "/datasets";
        let builder = self.request(Method::GET, path).query(&[("limit", limit)]);
        self.fetch(builder, Method::GET, path).await
    }

    async fn create_dataset(&self, req: &DatasetCreate) -> Result<DatasetOut, ApiError> {
        let path = "/datasets";
        let builder = self.request(Method::POST, path).json(req);
        self.fetch(builder, Method::POST, path).await
    }

    async fn patch_dataset(
        &self,
        dataset_id: &str,
        patch: &DatasetPatch,
    ) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}");
        let builder = self.request(Method::PATCH, &path).json(patch);
        self.fetch(builder, Method::PATCH, &path).await
    }

    async fn delete_dataset(&self, dataset_id: &str) -> Result<(), ApiError> {
        let path = format!("/datasets/{dataset_id}");
        let builder = self.request(Method::DELETE, &path);
        self.execute(builder, Method::DELETE, &path).await
    }

    async fn scan_dataset(&self, dataset_id: &str) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}/scan");
        let builder = self.request(Method::POST, &path);
        self.fetch(builder, Method::POST, &path).await
    }

    async fn import_dataset_zip(
        &self,
        dataset_id: &str,
        req: &DatasetImportZip,
    ) -> Result<DatasetOut, ApiError> {
        let path = format!("/datasets/{dataset_id}/import_zip");
        let builder = self.request(Method::POST, &path).json(req);
        self.fetch(builder, Method::POST, &path).await
    }

    async fn list_algorithms(&self, limit: usize) -> Result<Vec<AlgorithmOut>, ApiError> {
        let path = "/algorithms";
        let builder = self.request(Method::GET, path).query(&[("limit", limit)]);
        self.fetch(builder, Method::GET, path).await
    }

    async fn create_algorithm(&self, req: &AlgorithmCreate) -> Result<AlgorithmOut, ApiError> {
        let path = "/algorithms";
        let builder = self.request(Method::POST, path).json(req);
        self.fetch(builder, Method::POST, path).await
    }

    async fn patch_algorithm(
        &self,
        algorithm_id: &str,
        patch: &AlgorithmPatch,
    ) -> Result<AlgorithmOut, ApiError> {
        let path = format!("/algorithms/{algorithm_id}");
        let builder = self.request(Method::PATCH, &path).json(patch);
        self.fetch(builder, Method::PATCH, &path).await
    }

    async fn delete_algorithm(&self, algorithm_id: &str) -> Result<(), ApiError> {
        let path = format!("/algorithms/{algorithm_id}");
        let builder = self.request(Method::DELETE, &path);
        self.execute(builder, Method::DELETE, &path).await
    }

    async fn list_presets(&self, limit: usize) -> Result<Vec<PresetOut>, ApiError> {
        let path = "/presets";
        let builder = self.request(Method::GET, path).query(&[("limit", limit)]);
        self.fetch(builder, Method::GET, path).await
    }

    async fn get_preset(&self, preset_id: &str) -> Result<PresetOut, ApiError> {
        let path = format!("/presets/{preset_id}");
        let builder = self.request(Method::GET, &path);
        self.fetch(builder, Method::GET, &path).await
    }

    async fn create_preset(&self, req: &PresetCreate) -> Result<PresetOut, ApiError> {
        let path = "/presets";
        let builder = self.request(Method::POST, path).json(req);
        self.fetch(builder, Method::POST, path).await
    }

    async fn patch_preset(
        &self,
        preset_id: &str,
        patch: &PresetPatch,
    ) -> Result<PresetOut, ApiError> {
        let path = format!("/presets/{preset_id}");
        let builder = self.request(Method::PATCH, &path).json(patch);
        self.fetch(builder, Method::PATCH, &path).await
    }

    async fn delete_preset(&self, preset_id: &str) -> Result<(), ApiError> {
        let path = format!("/presets/{preset_id}");
        let builder = self.request(Method::DELETE, &path);
        self.execute(builder, Method::DELETE, &path).await
    }
}
