//! HTTP transport capability consumed by the transfer protocol.
//!
//! The protocol only needs two operations: a header probe and a streaming
//! GET. Both take custom headers. Bodies are pushed into a [`BodySink`] in
//! chunks of at most [`CHUNK_SIZE`] bytes so the sink can stop the transfer
//! cooperatively at any chunk boundary.

mod curl;
mod parse;

pub use self::curl::CurlTransport;
pub use parse::{parse_head_block, parse_status_line};

use crate::error::{DownloadError, NetworkError};

/// Fixed size of one body chunk handed to the sink.
pub const CHUNK_SIZE: usize = 32 * 1024;

/// A request header as (name, value).
pub type Header = (&'static str, String);

/// Parsed head of the final (post-redirect) response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u32,
    /// `Content-Length`, if present and numeric.
    pub content_length: Option<u64>,
    /// True if the server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
    /// `ETag` with surrounding quotes stripped.
    pub etag: Option<String>,
}

impl ResponseHead {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Whether the transfer should keep going after a sink callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    Stop,
}

/// How a streaming GET ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEnd {
    /// The server finished sending the body.
    Complete,
    /// The sink returned [`SinkFlow::Stop`].
    Stopped,
}

/// Receiver of a streaming response.
pub trait BodySink {
    /// Called once with the final response head, before any body bytes.
    fn on_head(&mut self, head: &ResponseHead) -> Result<SinkFlow, DownloadError>;
    /// Called for each body chunk (at most [`CHUNK_SIZE`] bytes).
    fn on_chunk(&mut self, chunk: &[u8]) -> Result<SinkFlow, DownloadError>;
}

/// Blocking HTTP client capability. Implementations must be callable from
/// several worker threads at once.
pub trait HttpTransport: Send + Sync {
    /// Issue a HEAD request and return the final response head.
    fn head(&self, url: &str, headers: &[Header]) -> Result<ResponseHead, NetworkError>;

    /// Issue a GET request and stream the response into `sink`. Errors
    /// returned by the sink are passed through unchanged.
    fn get(
        &self,
        url: &str,
        headers: &[Header],
        sink: &mut dyn BodySink,
    ) -> Result<TransferEnd, DownloadError>;
}

/// Sink that records the head of a GET and stops before the body.
#[derive(Debug, Default)]
pub(crate) struct HeadOnly {
    pub(crate) head: Option<ResponseHead>,
}

impl BodySink for HeadOnly {
    fn on_head(&mut self, head: &ResponseHead) -> Result<SinkFlow, DownloadError> {
        self.head = Some(head.clone());
        Ok(SinkFlow::Stop)
    }

    fn on_chunk(&mut self, _chunk: &[u8]) -> Result<SinkFlow, DownloadError> {
        Ok(SinkFlow::Stop)
    }
}
