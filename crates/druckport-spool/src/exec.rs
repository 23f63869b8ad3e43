// SPDX-License-Identifier: MIT
// Bounded external-process execution.
//
// Every binary this crate touches is launched as a discrete argument vector
// through `tokio::process::Command` — no shell ever parses user input. Each
// invocation carries a hard wall-clock timeout (the child is killed when it
// elapses), and its stdout/stderr are read through a cap so a runaway child
// can never make the gateway buffer unbounded output.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use druckport_core::error::{DruckportError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Patterns tried in order against spooler stdout to find the job id.
static JOB_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)request id is (\S+)",
        r"(?i)request id (\S+)",
        r"(\d+) (?:job|request)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static regex"))
    .collect()
});

/// What the spooler told us about a successful submission.
#[derive(Debug, Clone)]
pub struct SpoolerReply {
    /// Job identifier, if the spooler reported one. Absence is not an error.
    pub job_id: Option<String>,
    /// Captured stdout, at most the output cap.
    pub stdout: String,
}

/// Run a binary with the given arguments, returning its exit status and
/// capped output.
///
/// At most `max_output` bytes of each stream are held in memory; the rest is
/// drained and discarded. Fails with [`DruckportError::Timeout`] when the
/// deadline passes (the child is killed via kill-on-drop) and
/// [`DruckportError::Process`] on spawn failure.
pub(crate) async fn run_bounded(
    bin: &Path,
    args: &[&str],
    file: Option<&Path>,
    timeout: Duration,
    max_output: usize,
) -> Result<std::process::Output> {
    let mut cmd = Command::new(bin);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(file) = file {
        cmd.arg(file);
    }

    let mut child = cmd
        .spawn()
        .map_err(|e| DruckportError::Process(format!("cannot spawn {}: {e}", bin.display())))?;

    // Both pipes were requested above.
    let stdout_pipe = child.stdout.take().expect("stdout is piped");
    let stderr_pipe = child.stderr.take().expect("stderr is piped");

    let collect = async {
        let (status, stdout, stderr) = tokio::join!(
            child.wait(),
            read_capped(stdout_pipe, max_output),
            read_capped(stderr_pipe, max_output),
        );
        Ok::<_, std::io::Error>(std::process::Output {
            status: status?,
            stdout: stdout?,
            stderr: stderr?,
        })
    };

    match tokio::time::timeout(timeout, collect).await {
        Err(_) => {
            warn!(bin = %bin.display(), timeout_secs = timeout.as_secs(), "process timed out");
            Err(DruckportError::Timeout(timeout.as_secs()))
        }
        Ok(Err(e)) => Err(DruckportError::Process(format!(
            "waiting on {}: {e}",
            bin.display()
        ))),
        Ok(Ok(output)) => Ok(output),
    }
}

/// Read a child pipe to EOF while keeping at most `cap` bytes. Bytes past
/// the cap are still drained so the child never blocks on a full pipe.
async fn read_capped<R>(mut pipe: R, cap: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        let n = pipe.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        if buf.len() < cap {
            let keep = n.min(cap - buf.len());
            buf.extend_from_slice(&chunk[..keep]);
        }
    }
}

/// Submit the stored file to the spooler.
///
/// `args` is the validated option vector from the command builder; the file
/// path is appended as the final discrete argument. Non-zero exit surfaces
/// captured stderr.
pub async fn submit(
    lp: &Path,
    args: &[String],
    file: &Path,
    timeout: Duration,
    max_output: usize,
) -> Result<SpoolerReply> {
    debug!(bin = %lp.display(), ?args, file = %file.display(), "submitting to spooler");

    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    let output = run_bounded(lp, &arg_refs, Some(file), timeout, max_output).await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DruckportError::Process(format!(
            "spooler exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let job_id = parse_job_id(&stdout);
    info!(job_id = ?job_id, "spooler accepted job");

    Ok(SpoolerReply { job_id, stdout })
}

/// Extract a job identifier from spooler stdout, trying each known pattern
/// in order. No match is not an error — some spoolers stay silent.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    JOB_ID_PATTERNS
        .iter()
        .find_map(|p| p.captures(stdout))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
