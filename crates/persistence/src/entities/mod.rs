//! Database entity definitions.

pub mod decision;
pub mod export_job;
pub mod project;

pub use decision::{
    DecisionApprovalEntity, DecisionAttachmentEntity, DecisionCommentEntity, DecisionEntity,
    DecisionOptionEntity, ProfileEntity,
};
pub use export_job::{ExportJobEntity, ExportJobLogEntity, EXPORT_JOB_COLUMNS};
pub use project::{BrandingProfileEntity, ProjectEntity};
