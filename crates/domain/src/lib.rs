//! Domain layer for the decision log export service.
//!
//! This crate contains:
//! - Domain models (decisions, export jobs, the export dataset)
//! - Artifact builders and the export pipeline services
//! - Collaborator traits with in-memory implementations
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
