// SPDX-License-Identifier: MIT
// Allow-list validation of raw multipart form fields.
//
// Checks run in a fixed order and short-circuit with a distinct error naming
// the offending field. The output is a typed `PrintRequest`; no raw user
// string survives validation except the printer and format values, both of
// which must match the character allow-list below.

use druckport_core::error::{DruckportError, Result};
use druckport_core::types::{ColorMode, DuplexMode, PrintRequest, UploadedFile};
use once_cell::sync::Lazy;
use regex::Regex;

/// Character allow-list for printer names and media format keywords.
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("static regex"));

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/postscript",
    "text/plain",
    "image/png",
    "image/jpeg",
];

/// Raw multipart fields as collected by the HTTP layer, before validation.
#[derive(Debug, Default)]
pub struct RawPrintForm {
    pub printer: Option<String>,
    pub duplex: Option<String>,
    pub color: Option<String>,
    pub copies: Option<String>,
    pub format: Option<String>,
    pub fit_to_page: Option<String>,
    pub file: Option<UploadedFile>,
}

/// Validate a raw form into a typed [`PrintRequest`].
pub fn validate(form: RawPrintForm, max_upload_bytes: usize) -> Result<PrintRequest> {
    let file = form
        .file
        .ok_or_else(|| DruckportError::validation("file", "no file uploaded"))?;

    let printer = form
        .printer
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DruckportError::validation("printer", "no printer selected"))?;
    if !NAME_PATTERN.is_match(printer) {
        return Err(DruckportError::validation(
            "printer",
            "printer name contains disallowed characters",
        ));
    }

    let copies = match form.copies.as_deref() {
        None => None,
        Some(raw) => Some(parse_copies(raw)?),
    };

    let duplex = match form.duplex.as_deref() {
        None => DuplexMode::default(),
        Some(raw) => DuplexMode::from_keyword(raw).ok_or_else(|| {
            DruckportError::validation("duplex", format!("unknown duplex mode {raw:?}"))
        })?,
    };

    let color = match form.color.as_deref() {
        None => None,
        Some(raw) => Some(ColorMode::from_keyword(raw).ok_or_else(|| {
            DruckportError::validation("color", format!("unknown color mode {raw:?}"))
        })?),
    };

    let format = match form.format {
        None => None,
        Some(raw) => {
            if !NAME_PATTERN.is_match(&raw) {
                return Err(DruckportError::validation(
                    "format",
                    "media format contains disallowed characters",
                ));
            }
            Some(raw)
        }
    };

    let fit_to_page = match form.fit_to_page.as_deref() {
        None => false,
        Some(raw) => parse_bool(raw).ok_or_else(|| {
            DruckportError::validation("fitToPage", format!("expected a boolean, got {raw:?}"))
        })?,
    };

    if file.data.len() > max_upload_bytes {
        return Err(DruckportError::LimitExceeded(format!(
            "upload of {} bytes exceeds the {} byte ceiling",
            file.data.len(),
            max_upload_bytes
        )));
    }

    if let Some(declared) = file.content_type.as_deref() {
        let mime = declared
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        if !mime.is_empty() && !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(DruckportError::UnsupportedMedia(mime));
        }
    }

    Ok(PrintRequest {
        printer: printer.to_string(),
        duplex,
        color,
        copies,
        format,
        fit_to_page,
        file,
    })
}

/// Copies must be a pure-digit string parsing into [1, 100].
fn parse_copies(raw: &str) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DruckportError::validation(
            "copies",
            format!("expected a number, got {raw:?}"),
        ));
    }
    let n: u32 = raw
        .parse()
        .map_err(|_| DruckportError::validation("copies", format!("{raw:?} is out of range")))?;
    if !(1..=100).contains(&n) {
        return Err(DruckportError::validation(
            "copies",
            format!("{n} is outside the range 1-100"),
        ));
    }
    Ok(n)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" | "" => Some(false),
        _ => None,
    }
}
