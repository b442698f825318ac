//! Shared utilities and common types for the decision export backend.
//!
//! This crate provides common functionality used across all other crates:
//! - JWT access token validation (RS256)
//! - SHA-256 checksums and HMAC signing for artifact URLs

pub mod crypto;
pub mod jwt;
