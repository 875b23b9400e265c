use crate::block::opts::*;
use crate::block::util::*;
use bytes::{Buf, Bytes};

/// The standard container for storing packets coming from the network.
///
/// The epb_flags/epb_hash/epb_dropcount/epb_packetid/epb_queue options
/// describe things about capture-driver internals that this pipeline never
/// surfaces, so they're parsed past and discarded rather than kept.
///
/// This documentation is copyright (c) 2018 IETF Trust and the persons identified as the
/// authors of [this document][1]. All rights reserved. Please see the linked document for the full
/// copyright notice.
///
/// [1]: https://github.com/pcapng/pcapng
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EnhancedPacket {
    /// Specifies the interface this packet comes from; the correct interface will be the one whose
    /// Interface Description Block (within the current Section of the file) is identified by the
    /// same number of this field.
    pub interface_id: u32,
    /// Upper and lower 32 bits of a 64-bit tick count since the epoch. The
    /// unit is given by the referenced interface's `if_tsresol`.
    pub timestamp: Timestamp,
    /// Number of octets captured from the packet (the length of `packet_data`).
    pub captured_len: u32,
    /// The data coming from the network, including link-layer headers.
    pub packet_data: Bytes,
}

impl FromBytes for EnhancedPacket {
    fn parse<T: Buf>(mut buf: T, endianness: Endianness) -> Result<EnhancedPacket, BlockError> {
        ensure_remaining!(buf, 20);
        let interface_id = read_u32(&mut buf, endianness);
        let timestamp = read_ts(&mut buf, endianness);
        let captured_len = read_u32(&mut buf, endianness);
        let _packet_len = read_u32(&mut buf, endianness);
        let packet_data = read_bytes(&mut buf, captured_len)?;

        parse_options(buf, endianness, |_, _| {}); // no options we care about

        Ok(EnhancedPacket {
            interface_id,
            timestamp,
            captured_len,
            packet_data,
        })
    }
}
