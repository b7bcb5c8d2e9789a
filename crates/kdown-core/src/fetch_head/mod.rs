//! Metadata probe: length, range support and validator tag of a resource.

use crate::error::{DownloadError, NetworkError};
use crate::transport::{HeadOnly, Header, HttpTransport, ResponseHead};

/// What the probe learned about a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    /// `Content-Length`; absence is tolerated.
    pub content_length: Option<u64>,
    /// Server advertised `Accept-Ranges: bytes`.
    pub resumable: bool,
    pub etag: Option<String>,
}

impl From<ResponseHead> for ProbeResult {
    fn from(h: ResponseHead) -> Self {
        Self {
            content_length: h.content_length,
            resumable: h.accept_ranges,
            etag: h.etag,
        }
    }
}

/// Compressed transfer sizes would not match the bytes written to disk.
pub(crate) fn identity_encoding() -> Header {
    ("Accept-Encoding", "identity".to_string())
}

/// HEAD `url`; servers that refuse HEAD (405, 501) get a GET that is cut
/// off right after the response head. A non-2xx final status is an error.
pub fn probe(transport: &dyn HttpTransport, url: &str) -> Result<ProbeResult, DownloadError> {
    let headers = [identity_encoding()];
    let head = transport.head(url, &headers)?;
    let head = match head.status {
        405 | 501 => {
            tracing::debug!(url, status = head.status, "HEAD refused, probing with GET");
            let mut sink = HeadOnly::default();
            transport.get(url, &headers, &mut sink)?;
            sink.head.ok_or(NetworkError::NoResponse)?
        }
        _ => head,
    };
    if !head.is_success() {
        return Err(NetworkError::Http(head.status).into());
    }
    let result = ProbeResult::from(head);
    tracing::debug!(
        url,
        length = ?result.content_length,
        resumable = result.resumable,
        etag = ?result.etag,
        "probe"
    );
    Ok(result)
}
