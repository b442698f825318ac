//! HTTP route handlers.

pub mod artifacts;
pub mod exports;
pub mod health;
