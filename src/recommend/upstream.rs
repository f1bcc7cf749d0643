use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

/// Why an upstream call failed. The three variants need different operator
/// remediation, so each carries its own hint for the error response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("no response from the recommendation service")]
    NoResponse(#[source] reqwest::Error),
    #[error("recommendation service returned {0}")]
    Status(StatusCode),
    #[error("recommendation service returned an unreadable body")]
    BadBody(#[source] reqwest::Error),
    #[error("could not build the recommendation request")]
    Setup(#[source] reqwest::Error),
}

impl UpstreamError {
    pub fn hint(&self) -> &'static str {
        match self {
            UpstreamError::NoResponse(_) => {
                "check that the recommendation service is running and reachable"
            }
            UpstreamError::Status(_) => {
                "the recommendation service is up but rejected the request; check its logs"
            }
            UpstreamError::BadBody(_) => {
                "the recommendation service answered but the body was not valid JSON; check its logs and version"
            }
            UpstreamError::Setup(_) => "check the UPSTREAM_URL configuration",
        }
    }
}

/// Source of truth for recommendations. The response body is opaque to the
/// gateway and passed through to clients verbatim.
#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, movie: &str) -> Result<serde_json::Value, UpstreamError>;
}

pub struct HttpRecommender {
    http: reqwest::Client,
    base_url: String,
}

impl HttpRecommender {
    pub fn new(base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Recommender for HttpRecommender {
    async fn recommend(&self, movie: &str) -> Result<serde_json::Value, UpstreamError> {
        let url = format!("{}/recommend", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(&[("movie", movie)])
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    UpstreamError::Setup(e)
                } else {
                    // Connect errors and the 10s timeout both land here:
                    // nothing came back from the service.
                    UpstreamError::NoResponse(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        // The service answered; a garbled body is its fault, not the
        // network's, and the hint must say so.
        response.json().await.map_err(UpstreamError::BadBody)
    }
}
