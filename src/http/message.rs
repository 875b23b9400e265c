//! Shared message-framing helpers used by both the request and response
//! parser tasks: accumulating pipe chunks into a contiguous buffer and
//! decoding `Transfer-Encoding: chunked` bodies.

use bytes::{Buf, BytesMut};
use tokio::sync::mpsc;

/// How the body of a message in progress is delimited.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BodyLength {
    Fixed(usize),
    Chunked,
    /// Neither header present: no body.
    Empty,
}

pub(crate) fn body_length(headers: &[httparse::Header<'_>]) -> BodyLength {
    let mut content_length = None;
    let mut chunked = false;
    for h in headers {
        let name = h.name.to_ascii_lowercase();
        if name == "content-length" {
            content_length = std::str::from_utf8(h.value).ok().and_then(|v| v.trim().parse().ok());
        } else if name == "transfer-encoding" {
            if let Ok(v) = std::str::from_utf8(h.value) {
                chunked = v.to_ascii_lowercase().contains("chunked");
            }
        }
    }
    if chunked {
        BodyLength::Chunked
    } else if let Some(n) = content_length {
        BodyLength::Fixed(n)
    } else {
        BodyLength::Empty
    }
}

pub(crate) fn header_value<'a>(headers: &'a [httparse::Header<'a>], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .and_then(|h| std::str::from_utf8(h.value).ok())
}

/// Attempts to decode a complete chunked body starting at the front of
/// `buf`. Returns the decoded bytes and how many input bytes they consumed,
/// or `None` if the terminating `0\r\n\r\n` chunk hasn't arrived yet.
pub(crate) fn decode_chunked(buf: &[u8]) -> Option<(Vec<u8>, usize)> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    loop {
        let line_end = find_crlf(&buf[pos..])? + pos;
        let size_line = std::str::from_utf8(&buf[pos..line_end]).ok()?;
        let size_str = size_line.split(';').next().unwrap_or(size_line).trim();
        let size = usize::from_str_radix(size_str, 16).ok()?;
        let chunk_start = line_end + 2;
        if size == 0 {
            let trailer_end = find_crlf(&buf[chunk_start..])? + chunk_start;
            return Some((out, trailer_end + 2));
        }
        let chunk_end = chunk_start + size;
        if buf.len() < chunk_end + 2 {
            return None;
        }
        out.extend_from_slice(&buf[chunk_start..chunk_end]);
        pos = chunk_end + 2;
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}

/// Pulls chunks off `rx` into `buf` until it's closed. Returns `false` once
/// the channel is drained and no more data will ever arrive.
pub(crate) async fn recv_more(rx: &mut mpsc::Receiver<bytes::Bytes>, buf: &mut BytesMut) -> bool {
    match rx.recv().await {
        Some(chunk) => {
            buf.extend_from_slice(&chunk);
            true
        }
        None => false,
    }
}

pub(crate) fn advance(buf: &mut BytesMut, n: usize) {
    buf.advance(n);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_simple_chunked_body() {
        let input = b"5\r\nhello\r\n0\r\n\r\n";
        let (body, consumed) = decode_chunked(input).unwrap();
        assert_eq!(body, b"hello");
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn incomplete_chunked_body_is_none() {
        let input = b"5\r\nhel";
        assert!(decode_chunked(input).is_none());
    }
}
