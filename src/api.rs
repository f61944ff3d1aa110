use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Pipeline '{0}' not found")]
    UnknownPipeline(String),

    #[error("{op} error: {body}")]
    Rejected {
        op: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{op} error: {source}")]
    Transport {
        op: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

/// Commands the keyboard listener can issue against the control server
#[async_trait]
pub trait ControlApi: Send + Sync {
    async fn start(&self, pipeline: &str) -> Result<(), ApiError>;
    async fn stop(&self) -> Result<(), ApiError>;
}

#[derive(Serialize)]
struct StartRequest<'a> {
    pipeline: &'a str,
}

/// HTTP client for the control server's `/api` endpoints
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Pipelines the server knows about, or an empty list if it can't say
    pub async fn list_pipelines(&self) -> Vec<String> {
        match self.fetch_pipelines().await {
            Ok(names) => names,
            Err(e) => {
                tracing::debug!("Could not fetch pipelines: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_pipelines(&self) -> Result<Vec<String>> {
        let response = self
            .http
            .get(self.url("/api/pipelines"))
            .send()
            .await
            .context("GET /api/pipelines failed")?;

        if response.status() != StatusCode::OK {
            return Err(anyhow::anyhow!(
                "GET /api/pipelines returned {}",
                response.status()
            ));
        }

        response
            .json::<Vec<String>>()
            .await
            .context("Failed to decode pipeline list")
    }
}

#[async_trait]
impl ControlApi for ApiClient {
    async fn start(&self, pipeline: &str) -> Result<(), ApiError> {
        tracing::debug!("POST /api/start pipeline={}", pipeline);
        let response = self
            .http
            .post(self.url("/api/start"))
            .json(&StartRequest { pipeline })
            .send()
            .await
            .map_err(|source| ApiError::Transport { op: "Start", source })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => Err(ApiError::UnknownPipeline(pipeline.to_string())),
            status => Err(rejected("Start", status, response).await),
        }
    }

    async fn stop(&self) -> Result<(), ApiError> {
        tracing::debug!("POST /api/stop");
        let response = self
            .http
            .post(self.url("/api/stop"))
            .send()
            .await
            .map_err(|source| ApiError::Transport { op: "Stop", source })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(rejected("Stop", status, response).await),
        }
    }
}

async fn rejected(op: &'static str, status: StatusCode, response: reqwest::Response) -> ApiError {
    let body = response.text().await.unwrap_or_default();
    ApiError::Rejected { op, status, body }
}
