// SPDX-License-Identifier: MIT
// Shared request state.
//
// All fields are cheaply cloneable so the state can move into handler
// futures and spawned pipeline tasks without lifetime issues.

use std::sync::Arc;

use druckport_core::ServerConfig;
use metrics_exporter_prometheus::{BuildError, PrometheusHandle};

use crate::metrics::MetricsRecorder;

/// State injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub metrics: MetricsRecorder,
    /// Render handle for `GET /metrics`; absent when export is disabled.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from config, installing the process-wide Prometheus
    /// recorder when export is enabled. Call once at startup.
    pub fn new(config: ServerConfig) -> Result<Self, BuildError> {
        let (metrics, prometheus) = if config.export_metrics {
            let (recorder, handle) = MetricsRecorder::install()?;
            (recorder, Some(handle))
        } else {
            (MetricsRecorder::disabled(), None)
        };

        Ok(Self {
            config: Arc::new(config),
            metrics,
            prometheus,
        })
    }
}
