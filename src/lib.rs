//! A passive HTTP traffic inspector: reassembles TCP streams out of a
//! pcap/pcapng capture and prints colorized HTTP request/response
//! transcripts.

pub mod block;
pub mod capture;
pub mod capture_source;
pub mod color;
pub mod config;
pub mod dissect;
pub mod error;
pub mod http;
pub mod iface;
pub mod packet_log;
pub mod pipeline;
pub mod reassembly;
pub mod stats;

pub use error::{Error, Result};
