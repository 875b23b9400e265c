//! Periodic debug stats (§10.6): reports live-connection counts every 10s
//! when `-d/--debug` is set, to aid diagnosing a long-running capture.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Default)]
pub struct Stats {
    live_connections: AtomicUsize,
    http_connections: AtomicUsize,
}

impl Stats {
    pub fn connection_opened(&self) {
        self.live_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.live_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn http_connection_opened(&self) {
        self.http_connections.fetch_add(1, Ordering::Relaxed);
    }
}

pub fn spawn_reporter(stats: Arc<Stats>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        loop {
            interval.tick().await;
            info!(
                live_connections = stats.live_connections.load(Ordering::Relaxed),
                http_connections = stats.http_connections.load(Ordering::Relaxed),
                "capture stats"
            );
        }
    })
}
