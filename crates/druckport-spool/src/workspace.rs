// SPDX-License-Identifier: MIT
// Request-local temp workspace.
//
// One randomly-named directory per request, holding exactly one file with a
// generated name. The client-supplied filename never touches the filesystem;
// only its extension is consulted, through the `DocExtension` allow-list.
// Dropping the workspace removes the directory, so every exit path out of
// the request handler releases it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use druckport_core::error::{DruckportError, Result};
use druckport_core::types::DocExtension;
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// An exclusively-owned scratch directory plus the stored upload inside it.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    file_path: PathBuf,
}

impl Workspace {
    /// Create a workspace under the system scratch area and persist the
    /// payload into it.
    ///
    /// The actual byte length is re-checked against the ceiling here — the
    /// declared size the transport saw may be absent or spoofed. An oversize
    /// payload is rejected before any directory or file exists.
    pub fn create(ext: DocExtension, data: &[u8], max_bytes: usize) -> Result<Self> {
        if data.len() > max_bytes {
            return Err(DruckportError::LimitExceeded(format!(
                "buffered payload of {} bytes exceeds the {} byte ceiling",
                data.len(),
                max_bytes
            )));
        }

        let dir = TempDir::with_prefix("druckport-")
            .map_err(|e| DruckportError::Workspace(format!("cannot create scratch dir: {e}")))?;

        let file_name = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            ext.as_str()
        );
        let file_path = dir.path().join(file_name);

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&file_path)
            .map_err(|e| DruckportError::Workspace(format!("cannot create scratch file: {e}")))?;
        file.write_all(data)
            .map_err(|e| DruckportError::Workspace(format!("cannot write payload: {e}")))?;

        debug!(path = %file_path.display(), bytes = data.len(), "payload stored");

        Ok(Self { dir, file_path })
    }

    /// Absolute path of the stored file, for process arguments.
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Remove the workspace now rather than waiting for drop.
    ///
    /// Removal failures are logged, never raised — cleanup is best-effort on
    /// every path.
    pub fn release(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "workspace cleanup failed");
        }
    }
}
