//! Repository implementations for database operations.

pub mod decision;
pub mod export_job;
pub mod project;

pub use decision::DecisionRepository;
pub use export_job::ExportJobRepository;
pub use project::ProjectRepository;
