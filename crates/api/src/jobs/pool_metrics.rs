//! Periodic connection pool gauges.

use std::time::Duration;

use sqlx::PgPool;

use super::scheduler::Job;

const POOL_METRICS_INTERVAL: Duration = Duration::from_secs(10);

pub struct PoolMetricsJob {
    pool: PgPool,
}

impl PoolMetricsJob {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Job for PoolMetricsJob {
    fn name(&self) -> &'static str {
        "pool_metrics"
    }

    fn interval(&self) -> Duration {
        POOL_METRICS_INTERVAL
    }

    async fn execute(&self) -> Result<(), String> {
        let snapshot = persistence::metrics::record_pool_metrics(&self.pool);
        tracing::debug!(
            active = snapshot.active(),
            idle = snapshot.idle,
            total = snapshot.total,
            "Recorded pool metrics"
        );
        Ok(())
    }
}
