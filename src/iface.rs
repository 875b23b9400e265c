//! Info about the network interfaces referenced by a pcapng capture.
//!
//! Only the fields the dissection pipeline actually needs are kept here:
//! the link type (to pick an Ethernet/null decoder) and enough of the
//! timestamp-resolution option to reconstruct packet timestamps. The
//! pcapng spec defines many more interface options (addresses, filter
//! strings, hardware description, ...); exposing all of them as getters
//! is out of scope for a reassembly pipeline.

use crate::block::{InterfaceDescription, Timestamp};
use std::time::{Duration, SystemTime};

/// The type of physical link backing a network interface.
///
/// Only `NULL` and `ETHERNET` are dissected; every other code is kept
/// around so we can name it in a log message before dropping the packet.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkType {
    /// No link layer information: a raw L3 packet preceded by a 32-bit
    /// host-byte-order address-family value.
    NULL,
    /// D/I/X and 802.3 Ethernet.
    ETHERNET,
    /// A link type we don't dissect.
    Unknown(u32),
}

impl LinkType {
    /// Both classic pcap (a 4-byte `network` field) and pcapng (a 2-byte
    /// `linktype` field) funnel through here.
    pub fn from_code(code: u32) -> LinkType {
        match code {
            0 => LinkType::NULL,
            1 => LinkType::ETHERNET,
            x => LinkType::Unknown(x),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub(crate) descr: InterfaceDescription,
}

impl InterfaceInfo {
    pub fn link_type(&self) -> LinkType {
        self.descr.link_type
    }

    /// Turn a raw tick count (as found in an Enhanced Packet Block) into
    /// a wall-clock time, using this interface's `if_tsresol`.
    pub fn resolve_ts(&self, ts: Timestamp) -> SystemTime {
        let units_per_sec = u64::from(self.descr.if_tsresol);
        let secs = ts.0 / units_per_sec;
        let nanos = ((ts.0 % units_per_sec) * 1_000_000_000 / units_per_sec) as u32;
        SystemTime::UNIX_EPOCH + Duration::new(secs, nanos)
    }
}
