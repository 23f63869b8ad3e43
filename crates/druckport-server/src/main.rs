// SPDX-License-Identifier: MIT
// Druckport — hardened HTTP print gateway in front of the CUPS spooler.
//
// Entry point. Initialises logging, builds the configuration from CLI flags
// and environment, installs the metrics recorder when enabled, and serves.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use druckport_core::ServerConfig;
use druckport_server::{routes, AppState};

#[derive(Debug, Parser)]
#[command(
    name = "druckport-server",
    about = "HTTP print gateway in front of the CUPS spooler"
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DRUCKPORT_BIND", default_value = "0.0.0.0:8631")]
    bind: SocketAddr,

    /// Spooler submission binary.
    #[arg(long, env = "DRUCKPORT_LP", default_value = "lp")]
    lp_command: PathBuf,

    /// Printer enumeration binary.
    #[arg(long, env = "DRUCKPORT_LPSTAT", default_value = "lpstat")]
    lpstat_command: PathBuf,

    /// PDF page-count binary.
    #[arg(long, env = "DRUCKPORT_PDFINFO", default_value = "pdfinfo")]
    pdfinfo_command: PathBuf,

    /// Enable the Prometheus recorder and GET /metrics.
    #[arg(long, env = "EXPORT_METRICS", default_value_t = false)]
    export_metrics: bool,

    /// Bearer token required by GET /metrics.
    #[arg(long, env = "METRICS_TOKEN")]
    metrics_token: Option<String>,

    /// Upstream-injected header carrying the requesting username.
    #[arg(long, env = "DRUCKPORT_IDENTITY_HEADER", default_value = "remote-user")]
    identity_header: String,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            lp_command: self.lp_command,
            lpstat_command: self.lpstat_command,
            pdfinfo_command: self.pdfinfo_command,
            export_metrics: self.export_metrics,
            metrics_token: self.metrics_token,
            // Header lookup is by lowercase name.
            identity_header: self.identity_header.to_ascii_lowercase(),
            ..ServerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config();
    tracing::info!(
        bind = %config.bind_addr,
        metrics = config.export_metrics,
        "druckport starting"
    );

    let bind_addr = config.bind_addr;
    let state = AppState::new(config).context("metrics recorder install failed")?;
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("cannot bind {bind_addr}"))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
