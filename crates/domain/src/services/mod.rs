//! Export pipeline services.
//!
//! Services operate on domain models through the collaborator traits in
//! [`collaborators`]; the persistence and api crates supply the real
//! implementations.

pub mod aggregator;
pub mod builders;
pub mod collaborators;
pub mod export;
pub mod job_tracker;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod pdf_policy;
pub mod status;

pub use aggregator::DataAggregator;
pub use builders::{build_artifact, build_csv, build_html, build_json};
pub use collaborators::{
    ArtifactStorage, DecisionSource, ExportJobStore, PdfRenderError, PdfRenderer, ProjectAccess,
    StorageError,
};
pub use export::ExportService;
pub use job_tracker::ExportJobTracker;
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{MockArtifactStorage, MockExportRepository, MockPdfRenderer};
pub use pdf_policy::{ConversionOutcome, PdfConversionPolicy};
pub use status::ExportStatusReporter;
