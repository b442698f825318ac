//! Database metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Records how long a named repository query took.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Snapshot of connection pool occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub total: u32,
    pub idle: u32,
}

impl PoolSnapshot {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            total: pool.size(),
            idle: pool.num_idle() as u32,
        }
    }

    pub fn active(&self) -> u32 {
        self.total.saturating_sub(self.idle)
    }
}

/// Publishes pool gauges. Called periodically by the pool metrics job.
pub fn record_pool_metrics(pool: &PgPool) -> PoolSnapshot {
    let snapshot = PoolSnapshot::of(pool);
    gauge!("database_connections_active").set(snapshot.active() as f64);
    gauge!("database_connections_idle").set(snapshot.idle as f64);
    gauge!("database_connections_total").set(snapshot.total as f64);
    snapshot
}

/// Times a repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("find_export_job");
/// let result = sqlx::query_as::<_, ExportJobEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_snapshot_active() {
        let snapshot = PoolSnapshot { total: 8, idle: 3 };
        assert_eq!(snapshot.active(), 5);

        let idle_exceeds = PoolSnapshot { total: 1, idle: 2 };
        assert_eq!(idle_exceeds.active(), 0);
    }

    #[test]
    fn test_query_timer_records_name() {
        let timer = QueryTimer::new("list_export_job_logs");
        assert_eq!(timer.query_name, "list_export_job_logs");
        timer.record();
    }
}
