//! Implements `Remote` and `Extractor` over HTTP with `reqwest`.

use crate::api::{AnalyzeRequest, Extractor, Remote};
use crate::Result;
use anyhow::{bail, Context};
use reqwest::header::CACHE_CONTROL;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::trace;
use url::Url;

const TIMEOUT: Duration = Duration::from_secs(30);
const AI_TIMEOUT: Duration = Duration::from_secs(90);

/// Talks to the spreadsheet-backed remote store. Reads bypass caches so that a resync always sees
/// the latest rows.
pub(super) struct HttpRemote {
    client: Client,
    endpoint: Url,
}

impl HttpRemote {
    pub(super) fn new(endpoint: &Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Remote for HttpRemote {
    async fn get(&self, action: Option<&str>) -> Result<String> {
        let mut url = self.endpoint.clone();
        if let Some(action) = action {
            url.query_pairs_mut().append_pair("action", action);
        }
        trace!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .header(CACHE_CONTROL, "no-store")
            .send()
            .await
            .with_context(|| format!("Failed to send GET request to {url}"))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read the response body")?;
        if !status.is_success() {
            bail!("GET {url} failed with status {status}");
        }
        Ok(body)
    }

    async fn post(&self, body: &Value) -> Result<()> {
        trace!("POST {body}");
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(body)
            .send()
            .await
            .context("Failed to send POST request to the remote store")?;
        let status = response.status();
        if !status.is_success() {
            bail!("POST failed with status {status}");
        }
        Ok(())
    }
}

/// Talks to the AI extraction service.
pub(super) struct HttpExtractor {
    client: Client,
    endpoint: Url,
}

impl HttpExtractor {
    pub(super) fn new(endpoint: &Url) -> Result<Self> {
        let client = Client::builder()
            .timeout(AI_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Extractor for HttpExtractor {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await
            .context("Failed to send the request to the AI service")?;
        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read the AI service response")?;
        if !status.is_success() {
            bail!("{}", failure_message(status, &body));
        }
        Ok(body)
    }
}

/// The service's own `message` for a failed request, or a generic one naming the status.
fn failure_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Request failed ({})", status.as_u16()))
}
