//! HTML-to-PDF conversion over HTTP.

use std::time::Duration;

use domain::services::{PdfRenderError, PdfRenderer};
use reqwest::Client;
use serde_json::json;

use crate::config::PdfConfig;

/// Posts HTML to an external conversion service and returns the PDF body.
///
/// The request is bounded by `pdf.timeout_ms`; a timeout is reported like
/// any other request failure and the pipeline falls back to HTML.
pub struct HttpPdfRenderer {
    client: Client,
    api_url: String,
    api_key: String,
    timeout_ms: u64,
}

impl HttpPdfRenderer {
    pub fn new(api_url: &str, api_key: &str, timeout_ms: u64) -> Result<Self, PdfRenderError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PdfRenderError::Request(e.to_string()))?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            timeout_ms,
        })
    }

    /// Returns `None` when no service is configured.
    pub fn from_config(config: &PdfConfig) -> Result<Option<Self>, PdfRenderError> {
        if !config.is_configured() {
            return Ok(None);
        }
        Self::new(&config.api_url, &config.api_key, config.timeout_ms).map(Some)
    }
}

#[async_trait::async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>, PdfRenderError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/pdf")
            .json(&json!({ "html": html }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PdfRenderError::Request(format!("timed out after {}ms", self.timeout_ms))
                } else {
                    PdfRenderError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PdfRenderError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PdfRenderError::Request(e.to_string()))?;
        if bytes.is_empty() {
            return Err(PdfRenderError::EmptyDocument);
        }

        tracing::debug!(bytes = bytes.len(), "Rendered PDF");
        Ok(bytes.to_vec())
    }
}
