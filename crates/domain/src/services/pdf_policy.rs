//! Best-effort PDF conversion.
//!
//! A failed or unavailable conversion never fails the export: the HTML source
//! document is persisted instead.

use super::collaborators::PdfRenderer;
use crate::models::{Artifact, ArtifactKind};

/// Result of a conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    /// The renderer produced a PDF.
    Converted,
    /// No renderer is configured.
    NoRenderer,
    /// The renderer failed; the HTML document is kept.
    Fallback(String),
}

impl ConversionOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionOutcome::Converted)
    }

    /// Human-readable summary for the job log.
    pub fn describe(&self) -> String {
        match self {
            ConversionOutcome::Converted => "Converted HTML to PDF".to_string(),
            ConversionOutcome::NoRenderer => {
                "No PDF renderer configured; storing HTML document".to_string()
            }
            ConversionOutcome::Fallback(reason) => {
                format!("PDF conversion failed ({}); storing HTML document", reason)
            }
        }
    }
}

/// Capability-or-fallback policy for HTML to PDF conversion.
pub struct PdfConversionPolicy;

impl PdfConversionPolicy {
    /// Converts `html` with `renderer` when one is available.
    pub async fn convert(
        renderer: Option<&dyn PdfRenderer>,
        html: Artifact,
    ) -> (Artifact, ConversionOutcome) {
        let Some(renderer) = renderer else {
            return (html, ConversionOutcome::NoRenderer);
        };

        let rendered = {
            let source = String::from_utf8_lossy(&html.bytes);
            renderer.render(&source).await
        };
        match rendered {
            Ok(pdf) if !pdf.is_empty() => (
                Artifact::new(ArtifactKind::Pdf, pdf),
                ConversionOutcome::Converted,
            ),
            Ok(_) => (
                html,
                ConversionOutcome::Fallback("renderer returned an empty document".to_string()),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "PDF conversion failed, keeping HTML");
                (html, ConversionOutcome::Fallback(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::MockPdfRenderer;

    fn html() -> Artifact {
        Artifact::new(ArtifactKind::Html, "<html><body>Log</body></html>")
    }

    #[tokio::test]
    async fn test_no_renderer_keeps_html() {
        let (artifact, outcome) = PdfConversionPolicy::convert(None, html()).await;
        assert_eq!(outcome, ConversionOutcome::NoRenderer);
        assert_eq!(artifact.kind, ArtifactKind::Html);
        assert_eq!(artifact.kind.content_type(), "text/html; charset=utf-8");
    }

    #[tokio::test]
    async fn test_successful_conversion() {
        let renderer = MockPdfRenderer::new();
        let (artifact, outcome) = PdfConversionPolicy::convert(Some(&renderer), html()).await;
        assert!(outcome.is_converted());
        assert_eq!(artifact.kind, ArtifactKind::Pdf);
        assert!(artifact.bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_renderer_failure_falls_back() {
        let renderer = MockPdfRenderer::failing();
        let (artifact, outcome) = PdfConversionPolicy::convert(Some(&renderer), html()).await;
        assert!(matches!(outcome, ConversionOutcome::Fallback(ref reason) if reason.contains("502")));
        assert_eq!(artifact.kind, ArtifactKind::Html);
        assert_eq!(artifact.bytes, html().bytes);
    }

    #[test]
    fn test_describe() {
        assert!(ConversionOutcome::NoRenderer.describe().contains("No PDF renderer"));
        assert!(ConversionOutcome::Fallback("timeout".into())
            .describe()
            .contains("timeout"));
    }
}
