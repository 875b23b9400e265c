//! CLI surface and the [`Config`] record threaded through the pipeline,
//! reassembler, and HTTP listener.
//!
//! Built once in `main` and passed down by reference or cheap clone; no
//! global/`static` configuration state exists (see Design Notes on global
//! mutable state).

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug, Clone)]
#[command(name = "httpdump", about = "A passive HTTP traffic inspector")]
#[command(group(ArgGroup::new("source").required(true).args(["read", "interface"])))]
pub struct Cli {
    /// Read capture from file. `-` means stdin.
    #[arg(short = 'r', long = "read", value_name = "PATH")]
    pub read: Option<String>,

    /// Live-capture by invoking an external packet-capture subprocess on this interface.
    #[arg(short = 'i', long = "interface", value_name = "IFACE")]
    pub interface: Option<String>,

    /// Maximum printed body length in bytes.
    #[arg(long = "payload-len", default_value_t = 2048)]
    pub payload_len: usize,

    /// Enable debug logging and periodic connection-count stats.
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Emit a one-line summary per packet in addition to HTTP transcripts.
    #[arg(long = "print-packets")]
    pub print_packets: bool,

    /// Disable ANSI colorization.
    #[arg(long = "no-color")]
    pub no_color: bool,

    /// Filter expression passed verbatim to the external capture subprocess.
    pub filter: Vec<String>,
}

/// The configuration actually consumed by the pipeline, derived from [`Cli`]
/// plus whatever runtime facts (is stdout a tty?) the CLI itself can't know.
#[derive(Debug, Clone)]
pub struct Config {
    pub payload_len: usize,
    pub debug: bool,
    pub print_packets: bool,
    pub color: bool,
    /// Request/response pairing mode: wait for the response before emitting
    /// the request, so the two always appear as one contiguous unit.
    pub mutual: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Config {
        let color = !cli.no_color && std::io::IsTerminal::is_terminal(&std::io::stdout());
        Config {
            payload_len: cli.payload_len,
            debug: cli.debug,
            print_packets: cli.print_packets,
            color,
            mutual: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CaptureSource {
    File(String),
    Interface { iface: String, filter: Vec<String> },
}

impl Cli {
    pub fn capture_source(&self) -> CaptureSource {
        match (&self.read, &self.interface) {
            (Some(path), None) => CaptureSource::File(path.clone()),
            (None, Some(iface)) => CaptureSource::Interface {
                iface: iface.clone(),
                filter: self.filter.clone(),
            },
            _ => unreachable!("clap group enforces exactly one of -r/-i"),
        }
    }
}
