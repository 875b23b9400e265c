//! Response parser task (§4.4): symmetric to [`crate::http::request`], but
//! colors the status line by status class (§4.4) instead of unconditionally.

use crate::color::{colorize, status_color};
use crate::http::body;
use crate::http::message::{advance, body_length, decode_chunked, header_value, recv_more, BodyLength};
use crate::reassembly::ConnectionInfo;
use bytes::{Bytes, BytesMut};
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
    while let Some(envelope) = next_response(&mut buf, &mut rx, &conn, color, payload_len).await {
        if out.send(envelope).await.is_err() {
            return;
        }
    }
}

async fn next_response(
    buf: &mut BytesMut,
    rx: &mut mpsc::Receiver<Bytes>,
    conn: &ConnectionInfo,
    color: bool,
    payload_len: usize,
) -> Option<String> {
    loop {
        let mut headers_storage = [httparse::EMPTY_HEADER; 64];
        let mut resp = httparse::Response::new(&mut headers_storage);
        match resp.parse(buf) {
            Ok(httparse::Status::Complete(headers_end)) => {
                let code = resp.code.unwrap_or(0);
                let reason = resp.reason.unwrap_or("").to_string();
                let version = resp.version.unwrap_or(1);
                let length = body_length(resp.headers);
                let content_type = header_value(resp.headers, "content-type").map(str::to_string);
                let content_encoding = header_value(resp.headers, "content-encoding").map(str::to_string);
                let header_lines: Vec<String> = resp
                    .headers
                    .iter()
                    .map(|h| format!("{}: {}", h.name, String::from_utf8_lossy(h.value)))
                    .collect();

                let (body_bytes, total_len) = match length {
                    BodyLength::Fixed(n) => {
                        while buf.len() < headers_end + n {
                            if !recv_more(rx, buf).await {
                                warn!(client = %conn.client_addr, server = %conn.server_addr, "connection closed mid-response-body");
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
                            warn!(client = %conn.client_addr, server = %conn.server_addr, "connection closed mid-chunked-response-body");
                            return None;
                        }
                    },
                    BodyLength::Empty => (Vec::new(), headers_end),
                };

                let color_code = status_color(code);
                let start_line = colorize(color, color_code, &format!("HTTP/1.{version} {code} {reason}"));
                let headers_block = header_lines
                    .iter()
                    .map(|l| colorize(color, crate::color::YELLOW, l))
                    .collect::<Vec<_>>()
                    .join("\n");
                let rendered = body::render(
                    &body_bytes,
                    content_type.as_deref(),
                    content_encoding.as_deref(),
                    color,
                    payload_len,
                );

                let mut envelope = format!("{start_line}\n{headers_block}\n");
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
                warn!(client = %conn.client_addr, server = %conn.server_addr, "malformed response: {e}");
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
    async fn bodyless_response_with_color_has_no_spurious_body_block() {
        let (tx, rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        tx.send(Bytes::from_static(b"HTTP/1.1 204 No Content\r\n\r\n")).await.unwrap();
        drop(tx);

        run(conn(), rx, out_tx, true, 2048).await;

        let envelope = out_rx.recv().await.unwrap();
        assert!(!envelope.contains(crate::color::BLUE), "no body block should be emitted: {envelope:?}");
        assert_eq!(envelope.matches('\n').count(), 2);
    }

    #[tokio::test]
    async fn response_body_is_rendered_and_colored() {
        let (tx, rx) = mpsc::channel(4);
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let msg = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nhi";
        tx.send(Bytes::from_static(msg)).await.unwrap();
        drop(tx);

        run(conn(), rx, out_tx, true, 2048).await;

        let envelope = out_rx.recv().await.unwrap();
        assert!(envelope.contains(&format!("{}hi{}", crate::color::BLUE, crate::color::RESET)));
    }
}
