//! Source URL checks and destination filename resolution.

mod sanitize;

pub use sanitize::sanitize_filename;

use crate::checksum::url_digest;
use crate::error::DownloadError;

/// Schemes the transfer protocol accepts.
pub const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parse `url` and reject anything but http/https.
pub fn check_scheme(url: &str) -> Result<url::Url, DownloadError> {
    let parsed = url::Url::parse(url)
        .map_err(|e| DownloadError::validation(format!("invalid URL {url}: {e}")))?;
    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(DownloadError::validation(format!(
            "unsupported scheme {:?} in {url}",
            parsed.scheme()
        )));
    }
    Ok(parsed)
}

/// Last non-empty path segment of `url`, sanitized.
pub fn last_segment(url: &url::Url) -> Option<String> {
    let seg = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let name = sanitize_filename(seg);
    (!name.is_empty()).then_some(name)
}

/// Destination filename: the caller's `given` name, else the URL's last
/// path segment, else the hex SHA-256 of the URL. The digest fallback is
/// stable, so resubmitting the same URL finds the same staging file.
pub fn resolve_name(url: &url::Url, given: Option<&str>) -> String {
    given
        .map(sanitize_filename)
        .filter(|n| !n.is_empty())
        .or_else(|| last_segment(url))
        .unwrap_or_else(|| url_digest(url.as_str()))
}
