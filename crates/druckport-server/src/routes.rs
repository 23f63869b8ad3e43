// SPDX-License-Identifier: MIT
// HTTP routes for the print gateway.
//
// `POST /print` drives the intake pipeline: multipart collection →
// validation → workspace → (PDF inspection) → spooler submission → metrics.
// The pipeline runs in a spawned task so a client disconnect cannot cancel
// the spooler invocation or skip workspace release.

use std::time::Duration;

use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use druckport_core::error::DruckportError;
use druckport_core::types::{DocExtension, JobOutcome, UploadedFile};
use druckport_spool::validate::RawPrintForm;
use druckport_spool::workspace::Workspace;
use druckport_spool::{command, exec, inspect, listing, validate};

use crate::metrics::PrintEvent;
use crate::state::AppState;

/// Slack on top of the upload ceiling for multipart framing and the small
/// option fields, so the transport-level body limit still yields 413 for
/// oversized files rather than tripping on boundary overhead.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/print", post(print_job))
        .route("/printers", get(printers))
        .route("/metrics", get(metrics_export))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, Serialize)]
struct PrintResponse {
    #[serde(rename = "jobId", skip_serializing_if = "Option::is_none")]
    job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

/// `POST /print` — multipart upload plus print options.
async fn print_job(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let username = headers
        .get(state.config.identity_header.as_str())
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let form = match collect_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    // Detach: the submission must run to completion (or timeout) and the
    // workspace must be released even if the client goes away mid-request.
    let outcome = match tokio::spawn(run_pipeline(state, form, username)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "print pipeline task failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "print pipeline failed".into(),
                }),
            )
                .into_response();
        }
    };

    match outcome {
        Ok(outcome) => {
            info!(job_id = ?outcome.job_id, user = %outcome.username, "print accepted");
            let raw = Some(outcome.raw_output).filter(|s| !s.is_empty());
            (
                StatusCode::OK,
                Json(PrintResponse {
                    job_id: outcome.job_id,
                    raw,
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "print rejected");
            error_response(&e)
        }
    }
}

/// Gather the known multipart fields into a raw form for validation.
async fn collect_form(mut multipart: Multipart) -> Result<RawPrintForm, Response> {
    let mut form = RawPrintForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                form.file = Some(UploadedFile {
                    name: file_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "printer" => form.printer = Some(field.text().await.map_err(multipart_error)?),
            "duplex" => form.duplex = Some(field.text().await.map_err(multipart_error)?),
            "color" => form.color = Some(field.text().await.map_err(multipart_error)?),
            "copies" => form.copies = Some(field.text().await.map_err(multipart_error)?),
            "format" => form.format = Some(field.text().await.map_err(multipart_error)?),
            "fitToPage" => {
                form.fit_to_page = Some(field.text().await.map_err(multipart_error)?)
            }
            // Unknown fields are drained and ignored.
            _ => {
                let _ = field.bytes().await.map_err(multipart_error)?;
            }
        }
    }

    Ok(form)
}

/// Validated intake through spooler submission, with unconditional workspace
/// release on every terminal transition.
async fn run_pipeline(
    state: AppState,
    form: RawPrintForm,
    username: String,
) -> druckport_core::error::Result<JobOutcome> {
    let config = &state.config;

    let request = validate::validate(form, config.max_upload_bytes)?;
    let ext = DocExtension::from_file_name(&request.file.name);
    let workspace = Workspace::create(ext, &request.file.data, config.max_upload_bytes)?;

    let pages = if ext.is_pdf() {
        inspect::page_count(
            &config.pdfinfo_command,
            workspace.file_path(),
            Duration::from_secs(config.inspect_timeout_secs),
        )
        .await
    } else {
        None
    };

    if let Some(pages) = pages {
        if pages > config.max_pages {
            workspace.release();
            state.metrics.record(&PrintEvent {
                username,
                pages: 0,
                success: false,
            });
            return Err(DruckportError::LimitExceeded(format!(
                "document has {pages} pages, the limit is {}",
                config.max_pages
            )));
        }
    }

    let args = command::build_args(&request);
    let result = exec::submit(
        &config.lp_command,
        &args,
        workspace.file_path(),
        Duration::from_secs(config.spool_timeout_secs),
        config.max_output_bytes,
    )
    .await;
    workspace.release();

    let copies = u64::from(request.copies.unwrap_or(1));
    match result {
        Ok(reply) => {
            let billed = u64::from(pages.unwrap_or(0)) * copies;
            state.metrics.record(&PrintEvent {
                username: username.clone(),
                pages: billed,
                success: true,
            });
            Ok(JobOutcome {
                job_id: reply.job_id,
                raw_output: reply.stdout,
                success: true,
                pages,
                username,
            })
        }
        Err(e) => {
            state.metrics.record(&PrintEvent {
                username,
                pages: 0,
                success: false,
            });
            Err(e)
        }
    }
}

/// `GET /printers` — spooler destinations, default first.
async fn printers(State(state): State<AppState>) -> Response {
    let timeout = Duration::from_secs(state.config.spool_timeout_secs);
    match listing::list_printers(&state.config.lpstat_command, timeout).await {
        Ok(listing) => (StatusCode::OK, Json(listing)).into_response(),
        Err(e) => {
            warn!(error = %e, "printer enumeration failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: format!("failed to enumerate printers: {e}"),
                }),
            )
                .into_response()
        }
    }
}

/// `GET /metrics` — Prometheus exposition, bearer-gated.
async fn metrics_export(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(handle) = state.prometheus.clone() else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };

    if let Some(expected) = state.config.metrics_token.as_deref() {
        let authorized = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|token| token == expected)
            .unwrap_or(false);
        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "invalid bearer token".into(),
                }),
            )
                .into_response();
        }
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
        .into_response()
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

fn multipart_error(e: MultipartError) -> Response {
    let status = e.status();
    (
        status,
        Json(ErrorBody {
            error: e.body_text(),
        }),
    )
        .into_response()
}

fn error_response(e: &DruckportError) -> Response {
    (status_for(e), Json(ErrorBody { error: e.to_string() })).into_response()
}

fn status_for(e: &DruckportError) -> StatusCode {
    match e {
        DruckportError::Validation { .. } => StatusCode::BAD_REQUEST,
        DruckportError::LimitExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
        DruckportError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use druckport_core::ServerConfig;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use crate::metrics::testsupport;

    const BOUNDARY: &str = "druckport-test-boundary";

    fn fake_tool(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    /// An lp stand-in that records its invocation and reports a job id.
    fn fake_spooler(dir: &tempfile::TempDir) -> (PathBuf, PathBuf) {
        let marker = dir.path().join("lp-invoked");
        let lp = fake_tool(
            dir,
            "lp",
            &format!(
                "touch {}\necho \"request id is HP_LaserJet-88 (1 file(s))\"",
                marker.display()
            ),
        );
        (lp, marker)
    }

    fn test_state(dir: &tempfile::TempDir, pdfinfo_pages: u32) -> (AppState, PathBuf) {
        let (lp, marker) = fake_spooler(dir);
        let pdfinfo = fake_tool(dir, "pdfinfo", &format!("echo 'Pages:          {pdfinfo_pages}'"));
        let (metrics, prometheus) = testsupport::recorder();

        let config = ServerConfig {
            lp_command: lp,
            pdfinfo_command: pdfinfo,
            ..ServerConfig::default()
        };
        let state = AppState {
            config: Arc::new(config),
            metrics,
            prometheus: Some(prometheus),
        };
        (state, marker)
    }

    fn part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
        .into_bytes()
    }

    fn file_part(file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn multipart_request(parts: Vec<Vec<u8>>, identity: Option<&str>) -> Request<Body> {
        let mut body = Vec::new();
        for p in parts {
            body.extend_from_slice(&p);
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/print")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            );
        if let Some(user) = identity {
            builder = builder.header("remote-user", user);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn response_json(response: Response) -> (StatusCode, serde_json::Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn end_to_end_print_succeeds_and_records_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let (state, marker) = test_state(&dir, 3);
        let handle = state.prometheus.clone().unwrap();
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                part("copies", "2"),
                part("duplex", "two-sided-long-edge"),
                part("color", "grayscale"),
                file_part("report.pdf", "application/pdf", b"%PDF-1.4 test"),
            ],
            Some("helga"),
        );

        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["jobId"], "HP_LaserJet-88");
        assert!(marker.exists(), "spooler should have been invoked");

        // 3 pages × 2 copies.
        let rendered = handle.render();
        assert!(
            rendered.contains(r#"pages_printed_total{username="helga"} 6"#),
            "unexpected exposition:\n{rendered}"
        );
    }

    #[tokio::test]
    async fn invalid_printer_is_rejected_before_any_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let (state, marker) = test_state(&dir, 3);
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "lp; rm -rf /"),
                file_part("doc.pdf", "application/pdf", b"%PDF-1.4"),
            ],
            None,
        );

        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("printer"));
        assert!(!marker.exists(), "no process may be spawned for bad input");
    }

    #[tokio::test]
    async fn crafted_format_never_reaches_the_spooler() {
        let dir = tempfile::tempdir().unwrap();
        let (state, marker) = test_state(&dir, 3);
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                part("format", "a4; rm -rf /"),
                file_part("doc.pdf", "application/pdf", b"%PDF-1.4"),
            ],
            None,
        );

        let (status, _) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_file_is_a_400() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir, 3);
        let app = router(state);

        let request = multipart_request(vec![part("printer", "HP_LaserJet")], None);
        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("file"));
    }

    #[tokio::test]
    async fn page_limit_rejects_with_413_and_no_print_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, marker) = test_state(&dir, 31);
        // The inspector records the scratch path it was handed, so the test
        // can check the workspace is gone after the rejection.
        let seen = dir.path().join("pdfinfo-arg");
        let pdfinfo = fake_tool(
            &dir,
            "pdfinfo-recording",
            &format!(
                "printf '%s' \"$1\" > {}\necho 'Pages:          31'",
                seen.display()
            ),
        );
        {
            let config = Arc::get_mut(&mut state.config).unwrap();
            config.pdfinfo_command = pdfinfo;
        }
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                file_part("big.pdf", "application/pdf", b"%PDF-1.4"),
            ],
            None,
        );

        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(json["error"].as_str().unwrap().contains("31"));
        assert!(!marker.exists(), "print must not be attempted past the page limit");

        let stored = PathBuf::from(std::fs::read_to_string(&seen).unwrap());
        assert!(!stored.exists(), "scratch file must be gone after rejection");
        assert!(
            !stored.parent().unwrap().exists(),
            "scratch dir must be gone after rejection"
        );
    }

    #[tokio::test]
    async fn unsupported_media_is_a_415() {
        let dir = tempfile::tempdir().unwrap();
        let (state, marker) = test_state(&dir, 3);
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                file_part("archive.zip", "application/zip", b"PK\x03\x04"),
            ],
            None,
        );

        let (status, _) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn oversize_upload_is_a_413() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, marker) = test_state(&dir, 3);
        {
            let config = Arc::get_mut(&mut state.config).unwrap();
            config.max_upload_bytes = 512;
        }
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                file_part("big.pdf", "application/pdf", &[0u8; 2048]),
            ],
            None,
        );

        let (status, _) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn spooler_failure_is_a_500_with_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, _) = test_state(&dir, 3);
        // The failing spooler records the scratch path it was handed (the
        // final argument), so the test can check cleanup after the failure.
        let seen = dir.path().join("lp-arg");
        let broken = fake_tool(
            &dir,
            "lp-broken",
            &format!(
                "for a in \"$@\"; do last=\"$a\"; done\nprintf '%s' \"$last\" > {}\necho 'lp: no such destination' >&2\nexit 1",
                seen.display()
            ),
        );
        {
            let config = Arc::get_mut(&mut state.config).unwrap();
            config.lp_command = broken;
        }
        let app = router(state);

        let request = multipart_request(
            vec![
                part("printer", "HP_LaserJet"),
                file_part("doc.pdf", "application/pdf", b"%PDF-1.4"),
            ],
            None,
        );

        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("no such destination"));

        let stored = PathBuf::from(std::fs::read_to_string(&seen).unwrap());
        assert!(!stored.exists(), "scratch file must be gone after a failed print");
        assert!(
            !stored.parent().unwrap().exists(),
            "scratch dir must be gone after a failed print"
        );
    }

    #[tokio::test]
    async fn printers_listing_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, _) = test_state(&dir, 3);
        let lpstat = fake_tool(
            &dir,
            "lpstat",
            r#"case "$1" in
-p) echo "printer Office_Mono is idle."; echo "printer HP_LaserJet is idle." ;;
-d) echo "system default destination: HP_LaserJet" ;;
esac"#,
        );
        {
            let config = Arc::get_mut(&mut state.config).unwrap();
            config.lpstat_command = lpstat;
        }
        let app = router(state);

        let request = Request::builder()
            .uri("/printers")
            .body(Body::empty())
            .unwrap();
        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["default"], "HP_LaserJet");
        assert_eq!(json["printers"][0], "HP_LaserJet");
        assert_eq!(json["printers"][1], "Office_Mono");
    }

    #[tokio::test]
    async fn metrics_endpoint_is_bearer_gated() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, _) = test_state(&dir, 3);
        {
            let config = Arc::get_mut(&mut state.config).unwrap();
            config.metrics_token = Some("s3cret".into());
        }
        state.metrics.record(&crate::metrics::PrintEvent {
            username: "gate-user".into(),
            pages: 1,
            success: true,
        });
        let app = router(state.clone());

        // No token.
        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Wrong token.
        let request = Request::builder()
            .uri("/metrics")
            .header(header::AUTHORIZATION, "Bearer wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Right token.
        let request = Request::builder()
            .uri("/metrics")
            .header(header::AUTHORIZATION, "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&bytes).contains("print_jobs_total"));
    }

    #[tokio::test]
    async fn metrics_endpoint_is_404_when_export_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let (mut state, _) = test_state(&dir, 3);
        state.prometheus = None;
        state.metrics = crate::metrics::MetricsRecorder::disabled();
        let app = router(state);

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let dir = tempfile::tempdir().unwrap();
        let (state, _) = test_state(&dir, 3);
        let app = router(state);

        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let (status, json) = response_json(app.oneshot(request).await.unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }
}
