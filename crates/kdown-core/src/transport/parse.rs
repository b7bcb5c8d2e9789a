//! Parse raw HTTP response header lines into a `ResponseHead`.

use super::ResponseHead;

/// Status code from a line like `HTTP/1.1 206 Partial Content`.
pub fn parse_status_line(line: &str) -> Option<u32> {
    let mut parts = line.split_whitespace();
    let proto = parts.next()?;
    if !proto.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Parse one header block (status line plus fields). When `lines` holds
/// several blocks (redirects, `100 Continue`), only the last one counts.
pub fn parse_head_block(lines: &[String]) -> Option<ResponseHead> {
    let start = lines
        .iter()
        .rposition(|l| parse_status_line(l.trim()).is_some())?;
    let status = parse_status_line(lines[start].trim())?;
    let mut head = ResponseHead {
        status,
        ..ResponseHead::default()
    };

    for line in &lines[start + 1..] {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                head.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("accept-ranges") {
                head.accept_ranges = value.eq_ignore_ascii_case("bytes");
            } else if name.eq_ignore_ascii_case("etag") {
                let tag = value.trim_start_matches("W/").trim_matches('"');
                if !tag.is_empty() {
                    head.etag = Some(tag.to_string());
                }
            }
        }
    }

    Some(head)
}
