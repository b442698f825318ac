//! Persistence layer for the decision log export service.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings) validated into domain records
//! - Repository implementations of the domain collaborator traits
//! - SQL migrations

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
