//! Content-type resolution for served files.

use std::ffi::OsStr;
use std::path::Path;

/// Fallback for unknown or opaque content.
const OCTET_STREAM: &str = "application/octet-stream";

/// Content type that receives the reload script.
pub(crate) const HTML: &str = "text/html";

/// Guess the content type of a file from its extension.
///
/// Compressed files are never labelled with the type of their payload:
/// gzip suffixes (`.gz`, `.tgz`, `.svgz`) are `application/gzip`, any other
/// compression suffix is opaque.
#[must_use]
pub fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("gz" | "tgz" | "svgz") => "application/gzip",
        Some("bz2" | "xz" | "z" | "br") => OCTET_STREAM,
        _ => mime_guess::from_path(path)
            .first_raw()
            .unwrap_or(OCTET_STREAM),
    }
}
