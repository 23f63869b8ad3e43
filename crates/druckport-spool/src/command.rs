// SPDX-License-Identifier: MIT
// Spooler argument construction.
//
// Maps a validated `PrintRequest` into the ordered `lp` argument vector.
// Values arriving here have already passed an enum or allow-list check, and
// the vector is handed to the process-creation call as discrete arguments —
// there is no shell to escape for.

use druckport_core::types::{DuplexMode, PrintRequest};

/// Build the `lp` option vector. The executor appends the stored file path
/// as the final argument.
pub fn build_args(request: &PrintRequest) -> Vec<String> {
    let mut args = vec!["-d".to_string(), request.printer.clone()];

    if let Some(copies) = request.copies {
        args.push("-n".to_string());
        args.push(copies.to_string());
    }

    if request.duplex != DuplexMode::Simplex {
        args.push("-o".to_string());
        args.push(format!("sides={}", request.duplex.sides_keyword()));
    }

    if let Some(color) = request.color {
        args.push("-o".to_string());
        args.push(format!("ColorModel={}", color.color_model_keyword()));
    }

    if let Some(ref format) = request.format {
        args.push("-o".to_string());
        args.push(format!("media={format}"));
    }

    if request.fit_to_page {
        args.push("-o".to_string());
        args.push("fit-to-page".to_string());
    }

    args
}
