//! Classify attempt failures into retry policy error kinds.

use crate::error::{DownloadError, NetworkError};
use crate::retry::policy::ErrorKind;

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Classify a curl error for retry decisions.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect()
        || e.is_couldnt_resolve_host()
        || e.is_couldnt_resolve_proxy()
        || e.is_read_error()
        || e.is_recv_error()
        || e.is_send_error()
        || e.is_got_nothing()
        || e.is_partial_file()
    {
        return ErrorKind::Connection;
    }
    ErrorKind::Other
}

/// Classify an attempt failure. Only network failures are ever retryable.
pub fn classify(e: &DownloadError) -> ErrorKind {
    match e {
        DownloadError::Network(NetworkError::Curl(ce)) => classify_curl_error(ce),
        DownloadError::Network(NetworkError::Http(code)) => classify_http_status(*code),
        DownloadError::Network(NetworkError::PartialTransfer { .. })
        | DownloadError::Network(NetworkError::MissingBody)
        | DownloadError::Network(NetworkError::NoResponse) => ErrorKind::Connection,
        DownloadError::Validation(_)
        | DownloadError::Storage(_)
        | DownloadError::WrongExecutionContext => ErrorKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    #[test]
    fn http_429_and_503_throttled() {
        assert_eq!(classify_http_status(429), ErrorKind::Throttled);
        assert_eq!(classify_http_status(503), ErrorKind::Throttled);
    }

    #[test]
    fn http_5xx_retryable() {
        assert!(matches!(classify_http_status(500), ErrorKind::Http5xx(500)));
        assert!(matches!(classify_http_status(502), ErrorKind::Http5xx(502)));
    }

    #[test]
    fn http_4xx_other() {
        assert_eq!(classify_http_status(404), ErrorKind::Other);
        assert_eq!(classify_http_status(403), ErrorKind::Other);
    }

    #[test]
    fn partial_transfer_is_connection() {
        let e = DownloadError::from(NetworkError::PartialTransfer {
            expected: 10,
            received: 4,
        });
        assert_eq!(classify(&e), ErrorKind::Connection);
    }

    #[test]
    fn validation_and_storage_never_retry() {
        assert_eq!(
            classify(&DownloadError::Validation("x".into())),
            ErrorKind::Other
        );
        let e = DownloadError::from(StorageError::NotWritable("/x".into()));
        assert_eq!(classify(&e), ErrorKind::Other);
        assert_eq!(classify(&DownloadError::WrongExecutionContext), ErrorKind::Other);
    }
}
