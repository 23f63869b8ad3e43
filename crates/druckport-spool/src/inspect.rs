// SPDX-License-Identifier: MIT
// PDF page-count inspection via an external process.
//
// The inspection binary (normally `pdfinfo`) is invoked with the stored file
// as its single argument and a bounded timeout. Inspection failure is never
// fatal — the pipeline degrades to an unknown page count and printing
// proceeds. Only a *known* count above the ceiling rejects a job.

use std::path::Path;
use std::time::Duration;

use druckport_core::config::MAX_OUTPUT_BYTES;
use druckport_core::error::{DruckportError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::exec::run_bounded;

/// Matches the `Pages: <N>` line of pdfinfo output.
static PAGES_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)").expect("static regex"));

/// Best-effort page count for a stored PDF.
///
/// Returns `None` on any failure (spawn, timeout, non-zero exit, unparseable
/// output), logging the cause.
pub async fn page_count(pdfinfo: &Path, file: &Path, timeout: Duration) -> Option<u32> {
    match run_inspection(pdfinfo, file, timeout).await {
        Ok(pages) => {
            debug!(pages, file = %file.display(), "page count determined");
            Some(pages)
        }
        Err(e) => {
            warn!(error = %e, file = %file.display(), "page inspection failed, count unknown");
            None
        }
    }
}

async fn run_inspection(pdfinfo: &Path, file: &Path, timeout: Duration) -> Result<u32> {
    let output = run_bounded(pdfinfo, &[], Some(file), timeout, MAX_OUTPUT_BYTES)
        .await
        .map_err(|e| DruckportError::Inspection(e.to_string()))?;

    if !output.status.success() {
        return Err(DruckportError::Inspection(format!(
            "inspector exited with {}",
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    PAGES_PATTERN
        .captures(&stdout)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(|| DruckportError::Inspection("no Pages line in inspector output".into()))
}
