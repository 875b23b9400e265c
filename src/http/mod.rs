//! HTTP listener (§4.4): sits on the [`crate::reassembly::TcpListener`]
//! boundary, decides which TCP connections carry HTTP, and spins up the
//! per-connection parser/serializer tasks described in §5.

mod body;
mod message;
mod probe;
mod request;
mod response;
mod serializer;

use crate::config::Config;
use crate::reassembly::{ConnectionInfo, TcpListener};
use crate::stats::Stats;
use bytes::{Bytes, BytesMut};
use probe::Probe;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::Stdout;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Per-message parse failures recovered locally (§7); kept for symmetry with
/// the other modules' error taxonomy even though `http`'s own parse errors
/// are logged inline by `request`/`response` rather than returned here.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("malformed HTTP message: {0}")]
    Malformed(String),
}

const PIPE_DEPTH: usize = 64;

enum ConnState {
    Probing { buf: BytesMut },
    Http {
        client_tx: mpsc::Sender<Bytes>,
        server_tx: mpsc::Sender<Bytes>,
    },
    NotHttp,
}

pub struct HttpListener {
    config: Config,
    handle: Handle,
    writer: Arc<Mutex<Stdout>>,
    stats: Arc<Stats>,
    conns: HashMap<ConnectionInfo, ConnState>,
    /// Per-connection request-parser/response-parser/serializer tasks
    /// (§5). The top level awaits this after capture ends so shutdown is
    /// orderly rather than abandoning in-flight parses.
    tasks: tokio::task::JoinSet<()>,
}

impl HttpListener {
    pub fn new(config: Config, handle: Handle, writer: Arc<Mutex<Stdout>>, stats: Arc<Stats>) -> HttpListener {
        HttpListener {
            config,
            handle,
            writer,
            stats,
            conns: HashMap::new(),
            tasks: tokio::task::JoinSet::new(),
        }
    }

    /// Waits for every outstanding per-connection task to finish. Call once
    /// capture has ended and no more `data`/`closed_connection` calls will
    /// arrive.
    pub async fn join_all(mut self) {
        while self.tasks.join_next().await.is_some() {}
    }

    fn promote_to_http(&mut self, conn: &ConnectionInfo, initial: Bytes, from_client: bool) -> ConnState {
        let (client_tx, client_rx) = mpsc::channel(PIPE_DEPTH);
        let (server_tx, server_rx) = mpsc::channel(PIPE_DEPTH);
        let (req_tx, req_rx) = mpsc::channel(PIPE_DEPTH);
        let (resp_tx, resp_rx) = mpsc::channel(PIPE_DEPTH);

        let info = *conn;
        let color = self.config.color;
        let payload_len = self.config.payload_len;
        self.tasks
            .spawn_on(request::run(info, client_rx, req_tx, color, payload_len), &self.handle);
        self.tasks
            .spawn_on(response::run(info, server_rx, resp_tx, color, payload_len), &self.handle);
        self.tasks.spawn_on(
            serializer::run(req_rx, resp_rx, self.writer.clone(), self.config.mutual),
            &self.handle,
        );

        let sender = if from_client { &client_tx } else { &server_tx };
        if sender.blocking_send(initial).is_err() {
            warn!(client = %conn.client_addr, server = %conn.server_addr, "parser task died before receiving first bytes");
        }

        ConnState::Http { client_tx, server_tx }
    }
}

enum Action {
    None,
    MarkNotHttp,
    Promote(Bytes),
}

impl TcpListener for HttpListener {
    fn new_connection(&mut self, conn: &ConnectionInfo) {
        debug!(client = %conn.client_addr, server = %conn.server_addr, "new TCP connection");
        self.stats.connection_opened();
        self.conns.insert(*conn, ConnState::Probing { buf: BytesMut::new() });
    }

    fn data(&mut self, conn: &ConnectionInfo, is_client: bool, payload: Bytes) {
        let action = match self.conns.get_mut(conn) {
            None => return,
            Some(ConnState::NotHttp) => Action::None,
            Some(ConnState::Http { client_tx, server_tx }) => {
                let sender = if is_client { client_tx.clone() } else { server_tx.clone() };
                if sender.blocking_send(payload).is_err() {
                    Action::MarkNotHttp
                } else {
                    Action::None
                }
            }
            Some(ConnState::Probing { buf }) => {
                buf.extend_from_slice(&payload);
                match probe::probe(buf) {
                    Probe::Undecided => Action::None,
                    Probe::NotHttp => Action::MarkNotHttp,
                    Probe::Http => Action::Promote(std::mem::take(buf).freeze()),
                }
            }
        };

        match action {
            Action::None => {}
            Action::MarkNotHttp => {
                debug!(client = %conn.client_addr, server = %conn.server_addr, "not HTTP, unsubscribing");
                self.conns.insert(*conn, ConnState::NotHttp);
            }
            Action::Promote(initial) => {
                self.stats.http_connection_opened();
                let state = self.promote_to_http(conn, initial, is_client);
                self.conns.insert(*conn, state);
            }
        }
    }

    fn closed_connection(&mut self, conn: &ConnectionInfo) {
        // Dropping the `Http` state's senders closes both pipes; the parser
        // tasks observe that as clean EOF and the serializer drains and exits.
        self.stats.connection_closed();
        self.conns.remove(conn);
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

    fn test_config() -> Config {
        Config { payload_len: 2048, debug: false, print_packets: false, color: false, mutual: true }
    }

    #[tokio::test]
    async fn non_http_traffic_is_marked_and_then_ignored() {
        let handle = Handle::current();
        let writer = Arc::new(Mutex::new(tokio::io::stdout()));
        let stats = Arc::new(Stats::default());
        let mut listener = HttpListener::new(test_config(), handle, writer, stats);

        let c = conn();
        listener.new_connection(&c);
        listener.data(&c, true, Bytes::from_static(b"\x16\x03\x01not http traffic"));
        assert!(matches!(listener.conns.get(&c), Some(ConnState::NotHttp)));

        // Further data on a connection already marked NotHttp is a no-op.
        listener.data(&c, true, Bytes::from_static(b"more junk"));
        listener.closed_connection(&c);
        assert!(listener.conns.get(&c).is_none());

        listener.join_all().await;
    }

    #[tokio::test]
    async fn http_traffic_promotes_and_spawns_parser_tasks() {
        // `data()` calls `blocking_send`, which panics if called directly
        // from an async context; run it the same way the real pipeline
        // does, off the blocking pool (see `pipeline::run`).
        let handle = Handle::current();
        let listener = tokio::task::spawn_blocking(move || {
            let writer = Arc::new(Mutex::new(tokio::io::stdout()));
            let stats = Arc::new(Stats::default());
            let mut listener = HttpListener::new(test_config(), handle, writer, stats);

            let c = conn();
            listener.new_connection(&c);
            listener.data(&c, true, Bytes::from_static(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"));
            assert!(matches!(listener.conns.get(&c), Some(ConnState::Http { .. })));
            listener.closed_connection(&c);
            listener
        })
        .await
        .unwrap();

        listener.join_all().await;
    }
}
