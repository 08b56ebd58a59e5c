//! Content-type classification for downloaded images.
//!
//! Maps response content-types to the file extensions the image store uses,
//! and recognises HTML served where an image was expected.

/// Media type without parameters, trimmed and lowercased.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Returns the file extension for a recognised image content-type, or an empty string.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match essence(content_type).as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "",
    }
}

/// True when the content-type announces an HTML document.
pub fn declares_html(content_type: &str) -> bool {
    matches!(
        essence(content_type).as_str(),
        "text/html" | "application/xhtml+xml"
    )
}

/// Checks if bytes look like an HTML document (case-insensitive check of the first 50 bytes).
///
/// Catches error and consent pages served with an image content-type.
pub fn looks_like_html(bytes: &[u8]) -> bool {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let prefix = &bytes[start..bytes.len().min(start + 50)];

    let prefix_lower = prefix.to_ascii_lowercase();

    prefix_lower.starts_with(b"<!doctype html") || prefix_lower.starts_with(b"<html")
}
