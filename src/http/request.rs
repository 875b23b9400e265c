//! Request parser task (§4.4): reads HTTP requests off one connection's
//! client→server pipe and formats them into envelopes for the serializer.

use crate::color::{colorize, GREEN};
use crate::http::body;
use crate::http::message::{advance, body_length, decode_chunked, header_value, recv_more, BodyLength};
use crate::reassembly::ConnectionInfo;
use bytes::{Bytes, BytesMut};
use chrono::Local;
use tokio::sync::mpsc;
use tracing::warn;

pub(crate) async fn run(
    conn: ConnectionInfo,
    mut rx: mpsc::Receiver<Bytes>,
    out: mpsc::Sender<String>,
    color: bool,
    payload_len: usize,
) {
    let mut buf = BytesMut::new();
    let mut seq = 0u64;
    while let Some(envelope) = next_request(&mut buf, &mut rx, &conn, &mut seq, color, payload_len).await {
        if out.send(envelope).await.is_err() {
            return;
        }
    }
}

async fn next_request(
    buf: &mut BytesMut,
    rx: &mut mpsc::Receiver<Bytes>,
    conn: &ConnectionInfo,
    seq: &mut u64,
    color: bool,
    payload_len: usize,
) -> Option<String> {
    loop {
        let mut headers_storage = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut headers_storage);
        match req.parse(buf) {
            Ok(httparse::Status::Complete(headers_end)) => {
                let method = req.method.unwrap_or("").to_string();
                let path = req.path.unwrap_or("").to_string();
                let version = req.version.unwrap_or(1);
                let length = body_length(req.headers);
                let content_type = header_value(req.headers, "content-type").map(str::to_string);
                let content_encoding = header_value(req.headers, "content-encoding").map(str::to_string);
                let header_lines: Vec<String> = req
                    .headers
                    .iter()
                    .map(|h| format!("{}: {}", h.name, String::from_utf8_lossy(h.value)))
                    .collect();

                let (body_bytes, total_len) = match length {
                    BodyLength::Fixed(n) => {
                        while buf.len() < headers_end + n {
                            if !recv_more(rx, buf).await {
                                warn!(client = %conn.client_addr, server = %conn.server_addr, "connection closed mid-request-body");
                                return None;
                            }
                        }
                        (buf[headers_end..headers_end + n].to_vec(), headers_end + n)
                    }
                    BodyLength::Chunked => loop {
                        if let Some((decoded, consumed)) = decode_chunked(&buf[headers_end..]) {
                            break (decoded, headers_end + consumed);
                        }
                        if !recv_more(rx, buf).await {
                            warn!(client = %conn.client_addr, server = %conn.server_addr, "connection closed mid-chunked-request-body");
                            return None;
                        }
                    },
                    BodyLength::Empty => (Vec::new(), headers_end),
                };

                *seq += 1;
                let start_line = colorize(color, GREEN, &format!("{method} {path} HTTP/1.{version}"));
                let headers_block = header_lines
                    .iter()
                    .map(|l| colorize(color, GREEN, l))
                    .collect::<Vec<_>>()
                    .join("\n");
                let rendered = body::render(
                    &body_bytes,
                    content_type.as_deref(),
                    content_encoding.as_deref(),
                    color,
                    payload_len,
                );

                let header_line = format!(
                    "[{}] {} -> {}:{}, req #{}",
                    Local::now().format("%d.%m.%Y %H:%M:%S"),
                    conn.client_addr,
                    conn.server_addr,
                    conn.server_port,
                    seq,
                );

                let mut envelope = format!("{header_line}\n{start_line}\n{headers_block}\n");
                if rendered.has_body {
                    envelope.push('\n');
                    envelope.push_str(&rendered.text);
                }

                advance(buf, total_len);
                return Some(envelope);
            }
            Ok(httparse::Status::Partial) => {
                if !recv_more(rx, buf).await {
                    return None;
                }
            }
            Err(e) => {
                warn!(client = %conn.client_addr, server = %conn.server_addr, "malformed request: {e}");
                // httparse gives no resync offset on error; drop what we
                // have buffered and pick back up on the next chunk.
                buf.clear();
                if !recv_more(rx, buf).await {
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn conn() -> ConnectionInfo {
        ConnectionInfo {
            client_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            client_port: 4000,
            server_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            server_port: 80,
        }
    }

    #[tokio::test]
    async fn bodyless_request_with_color_has_no_spurious_body_block() {
        let (tx, rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        tx.send(Bytes::from_static(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n")).await.unwrap();
        drop(tx);

        run(conn(), rx, out_tx, true, 2048).await;

        let envelope = out_rx.recv().await.unwrap();
        assert!(!envelope.contains(crate::color::BLUE), "no body block should be emitted: {envelope:?}");
        assert_eq!(envelope.matches('\n').count(), 3);
        assert!(out_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn chunked_request_body_is_reassembled() {
        let (tx, rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let msg = b"POST /upload HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n";
        tx.send(Bytes::from_static(msg)).await.unwrap();
        drop(tx);

        run(conn(), rx, out_tx, false, 2048).await;

        let envelope = out_rx.recv().await.unwrap();
        assert!(envelope.ends_with("hello"));
        assert!(envelope.contains("POST /upload HTTP/1.1"));
    }
}
