// SPDX-License-Identifier: MIT
// Per-user print metrics.
//
// A single process-wide recorder injected into the request handlers rather
// than reached through ambient globals. Counter updates are atomic in the
// underlying registry, so concurrent in-flight requests never lose
// increments. Recording never fails a request: when export is disabled the
// recorder is a complete no-op.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};

pub const PAGES_PRINTED_TOTAL: &str = "pages_printed_total";
pub const LAST_PRINT_TIMESTAMP: &str = "pages_last_print_timestamp_seconds";
pub const PRINT_JOBS_TOTAL: &str = "print_jobs_total";
pub const PRINT_JOB_PAGES: &str = "print_job_pages";

/// Fixed histogram buckets for pages-per-job.
const PAGE_BUCKETS: &[f64] = &[1.0, 5.0, 10.0, 20.0, 50.0, 100.0];

/// One completed submission, ready to be turned into observations.
#[derive(Debug, Clone)]
pub struct PrintEvent {
    /// Identity from the upstream header; may be empty.
    pub username: String,
    /// Pages billed for this job (page count × copies, 0 when unknown).
    pub pages: u64,
    pub success: bool,
}

/// Handle for recording print observations.
#[derive(Debug, Clone)]
pub struct MetricsRecorder {
    enabled: bool,
}

impl MetricsRecorder {
    /// A recorder that drops every observation. Used when export is off.
    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    /// Install the process-wide Prometheus recorder and return the render
    /// handle for `GET /metrics`. Call once at startup.
    pub fn install() -> Result<(Self, PrometheusHandle), BuildError> {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(PRINT_JOB_PAGES.to_string()), PAGE_BUCKETS)?
            .install_recorder()?;

        describe_counter!(PAGES_PRINTED_TOTAL, "Total number of pages printed by user");
        describe_gauge!(LAST_PRINT_TIMESTAMP, "Unix timestamp of last print by user");
        describe_counter!(
            PRINT_JOBS_TOTAL,
            "Total number of print jobs per user and status"
        );
        describe_histogram!(PRINT_JOB_PAGES, "Distribution of pages per print job");

        Ok((Self { enabled: true }, handle))
    }

    /// Record one completed job. Never raises; the HTTP response has already
    /// been decided by the time this runs.
    pub fn record(&self, event: &PrintEvent) {
        if !self.enabled {
            return;
        }

        let username = event.username.clone();
        let status = if event.success { "success" } else { "fail" };

        counter!(PAGES_PRINTED_TOTAL, "username" => username.clone()).increment(event.pages);
        gauge!(LAST_PRINT_TIMESTAMP, "username" => username.clone())
            .set(chrono::Utc::now().timestamp() as f64);
        counter!(PRINT_JOBS_TOTAL, "username" => username.clone(), "status" => status)
            .increment(1);
        histogram!(PRINT_JOB_PAGES, "username" => username).record(event.pages as f64);
    }
}
