// SPDX-License-Identifier: MIT
// Printer enumeration via `lpstat`.
//
// Two invocations: `lpstat -p` for the destinations and `lpstat -d` for the
// system default. The default lookup is best-effort — if it fails, the list
// is returned without one. Nothing returned here is trusted by validation;
// the printer name on a print request is re-checked against the allow-list
// regardless of what this listing said.

use std::path::Path;
use std::time::Duration;

use druckport_core::config::MAX_OUTPUT_BYTES;
use druckport_core::error::{DruckportError, Result};
use druckport_core::types::PrinterListing;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::exec::run_bounded;

static PRINTER_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^printer\s+(\S+)").expect("static regex"));

static DEFAULT_DEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)system default destination:\s*(\S+)").expect("static regex"));

/// Enumerate spooler destinations, default first.
pub async fn list_printers(lpstat: &Path, timeout: Duration) -> Result<PrinterListing> {
    let output = run_bounded(lpstat, &["-p"], None, timeout, MAX_OUTPUT_BYTES).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DruckportError::Process(format!(
            "lpstat -p exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut printers: Vec<String> = stdout
        .lines()
        .filter_map(|l| PRINTER_LINE.captures(l))
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect();

    let default = default_destination(lpstat, timeout).await;
    if let Some(ref default) = default {
        // Surface the default at the front of the list.
        printers.sort_by_key(|p| p != default);
    }

    debug!(count = printers.len(), default = ?default, "printers enumerated");
    Ok(PrinterListing { printers, default })
}

/// Query the system default destination. Best-effort: any failure yields
/// `None` rather than an error.
async fn default_destination(lpstat: &Path, timeout: Duration) -> Option<String> {
    let output = match run_bounded(lpstat, &["-d"], None, timeout, MAX_OUTPUT_BYTES).await {
        Ok(o) => o,
        Err(e) => {
            warn!(error = %e, "default destination lookup failed");
            return None;
        }
    };
    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    DEFAULT_DEST
        .captures(&stdout)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
