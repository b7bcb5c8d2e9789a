//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves one static body at every path. HEAD answers with Content-Length,
//! Accept-Ranges and ETag; GET honours `Range: bytes=a-b` with 206. Extra
//! knobs: a delay between body pieces, a one-shot connection cut after N
//! body bytes, and a log of every request. Tracks concurrent GETs.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const PIECE: usize = 16 * 1024;

#[derive(Debug, Clone)]
pub struct RangeServerOptions {
    /// If false, HEAD returns 405 (servers that block HEAD).
    pub head_allowed: bool,
    /// If false, GET ignores Range and always returns 200 with the full body.
    pub support_ranges: bool,
    pub etag: Option<String>,
    /// Sleep between body pieces of 16 KiB.
    pub piece_delay: Option<Duration>,
    /// Close the first GET after this many body bytes.
    pub cut_after: Option<usize>,
}

impl Default for RangeServerOptions {
    fn default() -> Self {
        Self {
            head_allowed: true,
            support_ranges: true,
            etag: Some("\"v1\"".into()),
            piece_delay: None,
            cut_after: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub range: Option<String>,
}

struct State {
    body: Vec<u8>,
    opts: RangeServerOptions,
    cut_pending: Mutex<Option<usize>>,
    log: Mutex<Vec<Request>>,
    active_gets: AtomicUsize,
    peak_gets: AtomicUsize,
}

/// Handle to a running server. The server thread lives until process exit.
#[derive(Clone)]
pub struct RangeServer {
    base: String,
    state: Arc<State>,
}

impl RangeServer {
    pub fn start(body: Vec<u8>) -> Self {
        Self::start_with_options(body, RangeServerOptions::default())
    }

    pub fn start_with_options(body: Vec<u8>, opts: RangeServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State {
            body,
            cut_pending: Mutex::new(opts.cut_after),
            opts,
            log: Mutex::new(Vec::new()),
            active_gets: AtomicUsize::new(0),
            peak_gets: AtomicUsize::new(0),
        });
        let st = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let st = Arc::clone(&st);
                thread::spawn(move || handle(stream, &st));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}/", port),
            state,
        }
    }

    /// URL of `path` on this server (e.g. `url("a.bin")`).
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.log.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == "GET")
            .collect()
    }

    /// Highest number of GET bodies being served at the same time.
    pub fn peak_concurrent_gets(&self) -> usize {
        self.state.peak_gets.load(Ordering::SeqCst)
    }
}

struct ActiveGet<'a>(&'a State);

impl<'a> ActiveGet<'a> {
    fn enter(st: &'a State) -> Self {
        let now = st.active_gets.fetch_add(1, Ordering::SeqCst) + 1;
        st.peak_gets.fetch_max(now, Ordering::SeqCst);
        Self(st)
    }
}

impl Drop for ActiveGet<'_> {
    fn drop(&mut self) {
        self.0.active_gets.fetch_sub(1, Ordering::SeqCst);
    }
}

fn handle(mut stream: TcpStream, st: &State) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(text) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let req = parse_request(text);
    st.log.lock().unwrap().push(req.clone());

    let total = st.body.len() as u64;
    let etag = st
        .opts
        .etag
        .as_ref()
        .map(|t| format!("ETag: {}\r\n", t))
        .unwrap_or_default();
    let ranges = if st.opts.support_ranges {
        "Accept-Ranges: bytes\r\n"
    } else {
        ""
    };

    match req.method.as_str() {
        "HEAD" if !st.opts.head_allowed => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
        "HEAD" => {
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{}{}Connection: close\r\n\r\n",
                total, ranges, etag
            );
            let _ = stream.write_all(head.as_bytes());
        }
        "GET" => {
            let _active = ActiveGet::enter(st);
            let range = req
                .range
                .as_deref()
                .and_then(parse_range)
                .filter(|_| st.opts.support_ranges);
            let (status, extra, slice) = match range {
                Some((start, end_incl)) => {
                    let end_incl = end_incl.min(total.saturating_sub(1));
                    if start > end_incl {
                        let head = format!(
                            "HTTP/1.1 416 Range Not Satisfiable\r\nContent-Range: bytes */{}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                            total
                        );
                        let _ = stream.write_all(head.as_bytes());
                        return;
                    }
                    (
                        "206 Partial Content",
                        format!("Content-Range: bytes {}-{}/{}\r\n", start, end_incl, total),
                        &st.body[start as usize..=end_incl as usize],
                    )
                }
                None => ("200 OK", String::new(), &st.body[..]),
            };
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}{}{}Connection: close\r\n\r\n",
                status,
                slice.len(),
                extra,
                ranges,
                etag
            );
            if stream.write_all(head.as_bytes()).is_err() {
                return;
            }
            let cut = st.cut_pending.lock().unwrap().take();
            let send = cut.map_or(slice.len(), |c| c.min(slice.len()));
            for piece in slice[..send].chunks(PIECE) {
                if stream.write_all(piece).is_err() {
                    return;
                }
                if let Some(d) = st.opts.piece_delay {
                    thread::sleep(d);
                }
            }
            let _ = stream.flush();
            if cut.is_some() {
                let _ = stream.shutdown(std::net::Shutdown::Both);
            }
        }
        _ => {
            let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        }
    }
}

fn parse_request(text: &str) -> Request {
    let mut lines = text.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_ascii_uppercase();
    let path = first.next().unwrap_or("/").to_string();
    let mut range = None;
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("range") {
                range = Some(value.trim().to_string());
            }
        }
    }
    Request {
        method,
        path,
        range,
    }
}

/// `bytes=a-b` or `bytes=a-` to (start, end_inclusive).
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let ranges = value.strip_prefix("bytes=")?;
    let (a, b) = ranges.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = match b.trim() {
        "" => u64::MAX,
        s => s.parse().ok()?,
    };
    Some((start, end))
}
