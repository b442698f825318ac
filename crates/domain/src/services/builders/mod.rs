//! Artifact builders.
//!
//! Pure transforms from an [`ExportDataset`] to serialized bytes. None of
//! them perform I/O or validate dataset closure.

mod csv;
mod html;
mod json;

pub use csv::{build_csv, escape_csv};
pub use html::{build_html, escape_html};
pub use json::build_json;

use crate::errors::ExportError;
use crate::models::{Artifact, Branding, ExportDataset, ExportFormat};

/// Builds the artifact for the requested format.
///
/// PDF exports produce the HTML source document; conversion happens later.
pub fn build_artifact(
    format: ExportFormat,
    dataset: &ExportDataset,
    branding: Option<&Branding>,
) -> Result<Artifact, ExportError> {
    match format {
        ExportFormat::Csv => Ok(build_csv(dataset)),
        ExportFormat::Json => build_json(dataset),
        ExportFormat::Pdf => Ok(build_html(dataset, branding)),
    }
}
