//! Background job scheduler and job implementations.

mod pool_metrics;
mod scheduler;
mod stale_exports;

pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobScheduler};
pub use stale_exports::{StaleExportReaperJob, STALE_JOB_MESSAGE};
