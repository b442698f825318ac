//! Domain models for the decision log export pipeline.

pub mod branding;
pub mod dataset;
pub mod decision;
pub mod export_job;

pub use branding::{Branding, BrandingProfile};
pub use dataset::{DecisionBundle, ExportApproval, ExportComment, ExportDataset, ExportMetadata};
pub use decision::{
    ApprovalRecord, Attachment, CommentRecord, Decision, DecisionOption, Project, UserProfile,
};
pub use export_job::{
    Artifact, ArtifactKind, CreateExportRequest, CreateExportResponse, ExportFormat, ExportJob,
    ExportJobLog, ExportJobStatus, ExportScope, ExportStage, ExportStatusQuery,
    ExportStatusResponse, JobLogLevel, JobTransition, NewExportJob, StoredArtifact,
};
