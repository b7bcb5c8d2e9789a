//! libcurl-backed transport.
//!
//! One `Easy` handle per request; the transport itself holds only tuning
//! options, so it is shared freely across worker threads.

use std::cell::RefCell;
use std::str;
use std::time::Duration;

use curl::easy::{Easy, List};

use super::parse::{parse_head_block, parse_status_line};
use super::{BodySink, Header, HttpTransport, ResponseHead, SinkFlow, TransferEnd, CHUNK_SIZE};
use crate::config::HttpConfig;
use crate::error::{DownloadError, NetworkError};

const MAX_REDIRECTS: u32 = 10;

/// Blocking HTTP transport built on the `curl` crate.
#[derive(Debug, Clone, Default)]
pub struct CurlTransport {
    http: HttpConfig,
}

impl CurlTransport {
    pub fn new(http: HttpConfig) -> Self {
        Self { http }
    }

    fn easy(&self, url: &str, headers: &[Header]) -> Result<Easy, curl::Error> {
        let mut easy = Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(Duration::from_secs(self.http.connect_timeout_secs))?;
        easy.low_speed_limit(self.http.low_speed_limit)?;
        easy.low_speed_time(Duration::from_secs(self.http.low_speed_time_secs))?;
        if let Some(ua) = &self.http.user_agent {
            easy.useragent(ua)?;
        }
        if !headers.is_empty() {
            let mut list = List::new();
            for (k, v) in headers {
                list.append(&format!("{}: {}", k, v.trim()))?;
            }
            easy.http_headers(list)?;
        }
        Ok(easy)
    }
}

impl HttpTransport for CurlTransport {
    fn head(&self, url: &str, headers: &[Header]) -> Result<ResponseHead, NetworkError> {
        let mut lines: Vec<String> = Vec::new();
        let mut easy = self.easy(url, headers)?;
        easy.nobody(true)?;
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.perform()?;
        }
        parse_head_block(&lines).ok_or(NetworkError::NoResponse)
    }

    fn get(
        &self,
        url: &str,
        headers: &[Header],
        sink: &mut dyn BodySink,
    ) -> Result<TransferEnd, DownloadError> {
        let mut easy = self.easy(url, headers).map_err(NetworkError::from)?;
        easy.buffer_size(CHUNK_SIZE).map_err(NetworkError::from)?;

        let state = RefCell::new(GetState {
            sink,
            lines: Vec::new(),
            pending: None,
            head_sent: false,
            stopped: false,
            error: None,
        });

        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .header_function(|data| state.borrow_mut().header_line(data))
                .map_err(NetworkError::from)?;
            transfer
                .write_function(|data| {
                    let mut st = state.borrow_mut();
                    if st.body(data) {
                        Ok(data.len())
                    } else {
                        // Short count makes libcurl abort with a write error.
                        Ok(0)
                    }
                })
                .map_err(NetworkError::from)?;
            transfer.perform()
        };

        let mut st = state.into_inner();
        if let Some(err) = st.error.take() {
            return Err(err);
        }
        if st.stopped {
            return Ok(TransferEnd::Stopped);
        }
        performed.map_err(NetworkError::from)?;

        if !st.head_sent {
            match st.flush_head() {
                Some(true) => {}
                Some(false) => {
                    return match st.error.take() {
                        Some(err) => Err(err),
                        None => Ok(TransferEnd::Stopped),
                    }
                }
                None => return Err(NetworkError::NoResponse.into()),
            }
        }
        Ok(TransferEnd::Complete)
    }
}

struct GetState<'s> {
    sink: &'s mut dyn BodySink,
    lines: Vec<String>,
    /// Parsed informational or redirect block, held back in case it turns
    /// out to be the final one.
    pending: Option<ResponseHead>,
    head_sent: bool,
    stopped: bool,
    error: Option<DownloadError>,
}

impl GetState<'_> {
    fn header_line(&mut self, data: &[u8]) -> bool {
        let line = String::from_utf8_lossy(data).trim_end().to_string();
        if parse_status_line(&line).is_some() {
            self.lines.clear();
            self.pending = None;
        }
        if !line.is_empty() {
            self.lines.push(line);
            return true;
        }
        let Some(head) = parse_head_block(&self.lines) else {
            return true;
        };
        self.lines.clear();
        if (100..200).contains(&head.status) || (300..400).contains(&head.status) {
            self.pending = Some(head);
            return true;
        }
        self.deliver_head(&head)
    }

    fn body(&mut self, data: &[u8]) -> bool {
        if !self.head_sent {
            match self.flush_head() {
                Some(true) => {}
                Some(false) => return false,
                None => {
                    self.error = Some(NetworkError::NoResponse.into());
                    return false;
                }
            }
        }
        for chunk in data.chunks(CHUNK_SIZE) {
            match self.sink.on_chunk(chunk) {
                Ok(SinkFlow::Continue) => {}
                Ok(SinkFlow::Stop) => {
                    self.stopped = true;
                    return false;
                }
                Err(e) => {
                    self.error = Some(e);
                    return false;
                }
            }
        }
        true
    }

    /// Deliver a held-back head. `None` if there is nothing to deliver.
    fn flush_head(&mut self) -> Option<bool> {
        let head = self.pending.take().or_else(|| parse_head_block(&self.lines))?;
        Some(self.deliver_head(&head))
    }

    fn deliver_head(&mut self, head: &ResponseHead) -> bool {
        self.head_sent = true;
        match self.sink.on_head(head) {
            Ok(SinkFlow::Continue) => true,
            Ok(SinkFlow::Stop) => {
                self.stopped = true;
                false
            }
            Err(e) => {
                self.error = Some(e);
                false
            }
        }
    }
}
