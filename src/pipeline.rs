//! Wires capture → dissect → reassembly → HTTP listener together and
//! dispatches the synchronous half onto the blocking pool (§5, §10.5).

use crate::capture::CaptureReader;
use crate::capture_source::{self, Input};
use crate::config::Config;
use crate::dissect::{self, DissectedPacket};
use crate::error::{Error, Result};
use crate::http::HttpListener;
use crate::packet_log;
use crate::reassembly::Reassembler;
use crate::stats::Stats;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

pub async fn run(config: Config, source: crate::config::CaptureSource) -> Result<i32> {
    let opened = capture_source::open(&source).await?;
    let writer = Arc::new(Mutex::new(tokio::io::stdout()));
    let stats = Arc::new(Stats::default());

    if config.debug {
        crate::stats::spawn_reporter(stats.clone());
    }

    let handle = tokio::runtime::Handle::current();
    let listener = HttpListener::new(config.clone(), handle, writer.clone(), stats);

    let blocking_result =
        tokio::task::spawn_blocking(move || run_capture_loop(opened.input, config, listener))
            .await
            .expect("capture task panicked");

    let exit_code = match blocking_result {
        Ok(listener) => {
            listener.join_all().await;
            0
        }
        Err(e) => {
            error!("fatal capture error: {e}");
            1
        }
    };

    if let Some(mut child) = opened.child {
        let status = child.wait().await.map_err(Error::Io)?;
        return Ok(status.code().unwrap_or(exit_code));
    }

    Ok(exit_code)
}

fn run_capture_loop(input: Input, config: Config, listener: HttpListener) -> Result<HttpListener> {
    let mut reader: CaptureReader<Input> = CaptureReader::open(input).map_err(Error::from)?;
    let mut reassembler = Reassembler::new(listener);

    loop {
        let record = match reader.next_record() {
            Ok(Some(r)) => r,
            Ok(None) => break,
            Err(e) => return Err(Error::Capture(e)),
        };

        let packet = match dissect::dissect(record.link_type, record.frame_bytes.as_ref()) {
            Ok(Some(p)) => p,
            Ok(None) => continue,
            Err(e) => {
                debug!("dropping malformed packet: {e}");
                continue;
            }
        };

        if config.print_packets {
            let line = packet_log::summarize(record.timestamp, &packet);
            println!("{line}");
        }

        if let DissectedPacket::Tcp(tcp) = packet {
            reassembler.process(tcp);
        }
    }

    Ok(reassembler.into_listener())
}
