//! PDF rendering abstraction
//!
//! Reports are produced as HTML and handed to an external renderer service
//! that accepts an HTML body and responds with PDF bytes. The trait keeps
//! handlers independent of the concrete renderer.

use crate::config::PdfConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Trait for HTML-to-PDF rendering
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render an HTML document into PDF bytes
    async fn render(&self, html: &str) -> Result<Vec<u8>>;
}

/// Renderer backed by an HTTP conversion service
pub struct HttpPdfRenderer {
    client: reqwest::Client,
    url: String,
}

impl HttpPdfRenderer {
    pub fn new(config: &PdfConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: config.renderer_url.clone(),
        })
    }

    async fn make_request(&self, html: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(html.to_owned())
            .send()
            .await
            .map_err(|e| AppError::PdfRender {
                message: format!("Request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PdfRender {
                message: format!("Renderer error {}: {}", status, body),
            });
        }

        let bytes = response.bytes().await.map_err(|e| AppError::PdfRender {
            message: format!("Failed to read response: {}", e),
        })?;

        if !bytes.starts_with(b"%PDF") {
            return Err(AppError::PdfRender {
                message: "Renderer returned a non-PDF response".to_string(),
            });
        }

        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt as u32)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(html).await {
                Ok(pdf) => return Ok(pdf),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %e,
                        "PDF render request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::PdfRender {
            message: "Unknown error after retries".to_string(),
        }))
    }
}

/// Mock renderer for testing; echoes a minimal PDF header plus the input
pub struct MockPdfRenderer;

#[async_trait]
impl PdfRenderer for MockPdfRenderer {
    async fn render(&self, html: &str) -> Result<Vec<u8>> {
        let mut bytes = b"%PDF-1.4\n".to_vec();
        bytes.extend_from_slice(html.as_bytes());
        Ok(bytes)
    }
}

/// Create a renderer from configuration
pub fn create_renderer(config: &PdfConfig) -> Result<Arc<dyn PdfRenderer>> {
    if config.renderer_url == "mock" {
        return Ok(Arc::new(MockPdfRenderer));
    }
    Ok(Arc::new(HttpPdfRenderer::new(config)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_renderer_emits_pdf_magic() {
        let renderer = MockPdfRenderer;
        let pdf = renderer.render("<html></html>").await.unwrap();
        assert!(pdf.starts_with(b"%PDF"));
    }

    #[test]
    fn test_mock_url_selects_mock_renderer() {
        let config = PdfConfig {
            renderer_url: "mock".into(),
            timeout_secs: 30,
        };
        assert!(create_renderer(&config).is_ok());
    }
}
