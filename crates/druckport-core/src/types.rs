// SPDX-License-Identifier: MIT
// Core domain types for the Druckport print gateway.

use serde::{Deserialize, Serialize};

/// Duplex printing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DuplexMode {
    Simplex,
    LongEdge,
    ShortEdge,
}

impl DuplexMode {
    /// CUPS `sides` keyword for this mode.
    pub fn sides_keyword(&self) -> &'static str {
        match self {
            Self::Simplex => "one-sided",
            Self::LongEdge => "two-sided-long-edge",
            Self::ShortEdge => "two-sided-short-edge",
        }
    }

    /// Parse the keyword form. Anything outside the three literals is rejected.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "one-sided" => Some(Self::Simplex),
            "two-sided-long-edge" => Some(Self::LongEdge),
            "two-sided-short-edge" => Some(Self::ShortEdge),
            _ => None,
        }
    }
}

impl Default for DuplexMode {
    fn default() -> Self {
        Self::Simplex
    }
}

/// Color rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Color,
    Grayscale,
}

impl ColorMode {
    /// CUPS `ColorModel` keyword for this mode.
    pub fn color_model_keyword(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Grayscale => "Gray",
        }
    }

    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "color" => Some(Self::Color),
            "grayscale" => Some(Self::Grayscale),
            _ => None,
        }
    }
}

/// Extensions the workspace will store a payload under.
///
/// The client-supplied filename is never used on disk; only its extension is
/// consulted, and anything unrecognised falls back to `.pdf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocExtension {
    Pdf,
    Ps,
    Txt,
    Png,
    Jpg,
    Jpeg,
}

impl DocExtension {
    /// Derive a safe extension from the declared upload filename.
    pub fn from_file_name(name: &str) -> Self {
        let ext = name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "ps" => Self::Ps,
            "txt" => Self::Txt,
            "png" => Self::Png,
            "jpg" => Self::Jpg,
            "jpeg" => Self::Jpeg,
            _ => Self::Pdf,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Ps => "ps",
            Self::Txt => "txt",
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }

    /// Whether the stored file should be treated as a PDF for page counting.
    pub fn is_pdf(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

/// The uploaded payload as received from the multipart form.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-declared filename (only its extension is ever consulted).
    pub name: String,
    /// Client-declared MIME type, if any.
    pub content_type: Option<String>,
    /// The buffered payload bytes.
    pub data: Vec<u8>,
}

/// A fully validated print request.
///
/// Every field has passed its allow-list check; the command builder consumes
/// these values structurally and never interpolates raw user text.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub printer: String,
    pub duplex: DuplexMode,
    pub color: Option<ColorMode>,
    /// Copies in [1, 100]; absent means the spooler default of 1.
    pub copies: Option<u32>,
    /// Media format keyword, same character allow-list as printer names.
    pub format: Option<String>,
    pub fit_to_page: bool,
    pub file: UploadedFile,
}

/// Result of one submission to the spooler.
///
/// Produced once per request, converted into metrics observations and the
/// HTTP response, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    /// Job identifier extracted from spooler output, if it reported one.
    pub job_id: Option<String>,
    /// Raw spooler standard output (possibly truncated at the output cap).
    pub raw_output: String,
    pub success: bool,
    /// Best-effort page count from document inspection.
    pub pages: Option<u32>,
    /// Requesting identity from the trusted upstream header; may be empty.
    pub username: String,
}

/// Printers known to the spooler, default destination first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterListing {
    pub printers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}
