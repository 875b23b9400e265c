//! Resolves the `-r`/`-i` CLI surface (§6, §10.4) into something the
//! demultiplexer can read synchronously, plus whatever we have to wait on
//! afterwards to get an exit code.

use crate::config::CaptureSource;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

/// What the blocking capture task actually reads from.
pub enum Input {
    File(File),
    Stdin(io::Stdin),
    /// A live capture's bytes, bridged from the child's async stdout pipe
    /// onto a bounded channel that this adapter drains synchronously.
    ChildStdout(ChildStdoutBridge),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::File(f) => f.read(buf),
            Input::Stdin(s) => s.read(buf),
            Input::ChildStdout(b) => b.read(buf),
        }
    }
}

pub struct ChildStdoutBridge {
    rx: mpsc::Receiver<Bytes>,
    leftover: Bytes,
}

impl Read for ChildStdoutBridge {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.leftover.is_empty() {
            self.leftover = match self.rx.blocking_recv() {
                Some(chunk) => chunk,
                None => return Ok(0),
            };
        }
        let n = self.leftover.len().min(buf.len());
        buf[..n].copy_from_slice(&self.leftover[..n]);
        self.leftover = self.leftover.slice(n..);
        Ok(n)
    }
}

/// A live capture also hands back the still-running subprocess, whose exit
/// status becomes the process's own exit code once capture finishes (§6).
pub struct Opened {
    pub input: Input,
    pub child: Option<Child>,
}

pub async fn open(source: &CaptureSource) -> Result<Opened> {
    match source {
        CaptureSource::File(path) if path == "-" => Ok(Opened {
            input: Input::Stdin(io::stdin()),
            child: None,
        }),
        CaptureSource::File(path) => {
            let file = File::open(path).map_err(Error::Io)?;
            Ok(Opened {
                input: Input::File(file),
                child: None,
            })
        }
        CaptureSource::Interface { iface, filter } => {
            let mut cmd = Command::new("tcpdump");
            cmd.arg("-i").arg(iface).arg("-w").arg("-");
            cmd.args(filter);
            cmd.stdout(Stdio::piped());
            cmd.stdin(Stdio::null());
            let mut child = cmd.spawn().map_err(Error::Subprocess)?;
            let mut stdout = child.stdout.take().expect("stdout was piped");

            let (tx, rx) = mpsc::channel(16);
            tokio::spawn(async move {
                let mut chunk = vec![0u8; 64 * 1024];
                loop {
                    match stdout.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            if tx.send(Bytes::copy_from_slice(&chunk[..n])).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            });

            Ok(Opened {
                input: Input::ChildStdout(ChildStdoutBridge {
                    rx,
                    leftover: Bytes::new(),
                }),
                child: Some(child),
            })
        }
    }
}
