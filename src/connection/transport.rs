//! HTTP transport for compiled queries.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::{
    config::{BasicAuthConfig, DriverConfig, HttpMethod},
    query::CompiledQuery,
};

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Directory returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Sends one compiled query and returns the decoded response body.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn send(&self, query: &CompiledQuery) -> Result<Value, TransportError>;
}

/// Transport that talks to a directory's REST endpoint.
///
/// GET requests carry the query fields as URL parameters; POST requests send
/// them as a JSON body. An empty response body decodes to `null`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: Client,
    url: String,
    method: HttpMethod,
    auth: Option<BasicAuthConfig>,
}

impl HttpTransport {
    pub fn new(config: &DriverConfig) -> Result<Self, TransportError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            method: config.method,
            auth: config.auth.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, query: &CompiledQuery) -> Result<Value, TransportError> {
        let request = match self.method {
            HttpMethod::Get => self.http_client.get(&self.url).query(query),
            HttpMethod::Post => self.http_client.post(&self.url).json(query),
        };
        let request = match &self.auth {
            Some(auth) => request.basic_auth(&auth.username, Some(&auth.password)),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        tracing::debug!(
            method = ?self.method,
            url = %self.url,
            status = status.as_u16(),
            "Directory request completed"
        );

        let body = response.text().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}
