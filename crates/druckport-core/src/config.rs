// SPDX-License-Identifier: MIT
// Gateway configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Upload size ceiling: 10 MiB.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Captured spooler output ceiling: 10 MiB.
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Page-count ceiling for PDF uploads.
pub const MAX_PAGES: u32 = 30;

/// Wall-clock timeout for the spooler submission process.
pub const SPOOL_TIMEOUT_SECS: u64 = 30;

/// Wall-clock timeout for the page-inspection process.
pub const INSPECT_TIMEOUT_SECS: u64 = 10;

/// Runtime settings for the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    /// Spooler submission binary (normally `lp`).
    pub lp_command: PathBuf,
    /// Printer enumeration binary (normally `lpstat`).
    pub lpstat_command: PathBuf,
    /// PDF page-count binary (normally `pdfinfo`).
    pub pdfinfo_command: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Maximum captured spooler output in bytes.
    pub max_output_bytes: usize,
    /// Maximum PDF page count accepted for printing.
    pub max_pages: u32,
    /// Seconds before a spooler invocation is killed.
    pub spool_timeout_secs: u64,
    /// Seconds before a page-inspection invocation is killed.
    pub inspect_timeout_secs: u64,
    /// Whether the Prometheus endpoint and recorder are active.
    pub export_metrics: bool,
    /// Bearer token required by `GET /metrics` when export is enabled.
    pub metrics_token: Option<String>,
    /// Upstream-injected header carrying the requesting username.
    pub identity_header: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8631".parse().expect("static addr"),
            lp_command: PathBuf::from("lp"),
            lpstat_command: PathBuf::from("lpstat"),
            pdfinfo_command: PathBuf::from("pdfinfo"),
            max_upload_bytes: MAX_UPLOAD_BYTES,
            max_output_bytes: MAX_OUTPUT_BYTES,
            max_pages: MAX_PAGES,
            spool_timeout_secs: SPOOL_TIMEOUT_SECS,
            inspect_timeout_secs: INSPECT_TIMEOUT_SECS,
            export_metrics: false,
            metrics_token: None,
            identity_header: "remote-user".to_string(),
        }
    }
}
