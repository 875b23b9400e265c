use crate::block::opts::*;
use crate::block::util::*;
use crate::iface::LinkType;
use bytes::Buf;
use tracing::*;

/// Defines the link type and timestamp resolution of an interface used for
/// capturing traffic.
///
/// The pcapng spec gives Interface Description Blocks many more options
/// (addresses, filter string, hardware/OS description, speed, ...). None of
/// those drive reassembly or dissection, so only `link_type` and
/// `if_tsresol` are kept; everything else is parsed past and discarded by
/// `parse_options`.
///
/// This documentation is copyright (c) 2018 IETF Trust and the persons identified as the
/// authors of [this document][1]. All rights reserved. Please see the linked document for the full
/// copyright notice.
///
/// [1]: https://github.com/pcapng/pcapng
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InterfaceDescription {
    /// A value that defines the link layer type of this interface.
    pub link_type: LinkType,
    /// The if_tsresol option identifies the resolution of timestamps. If
    /// the Most Significant Bit is equal to zero, the remaining bits
    /// indicate the resolution as a negative power of 10 (e.g. 6 means
    /// microsecond resolution). If the MSB is one, the remaining bits
    /// indicate the resolution as a negative power of 2. Defaults to 10^-6
    /// (i.e. the resolution of classic pcap timestamps) when absent.
    pub if_tsresol: u32,
}

impl FromBytes for InterfaceDescription {
    fn parse<T: Buf>(
        mut buf: T,
        endianness: Endianness,
    ) -> Result<InterfaceDescription, BlockError> {
        ensure_remaining!(buf, 8);
        let link_type = {
            let code = read_u16(&mut buf, endianness);
            buf.advance(2); // 16 bits of padding
            LinkType::from_code(u32::from(code))
        };
        buf.advance(4); // snap_len; not needed to drive reassembly

        let mut if_tsresol = 1_000_000;
        parse_options(buf, endianness, |ty, bytes| {
            if ty == 9 {
                if let Some([v]) = bytes_to_array(bytes) {
                    let exp = u32::from(v & 0b0111_1111);
                    let base = match v >> 7 {
                        0 => 10_u32,
                        1 => 2_u32,
                        _ => unreachable!(),
                    };
                    if let Some(x) = base.checked_pow(exp) {
                        if_tsresol = x;
                    } else {
                        warn!(
                            "Saw an interface with a timestamp resolution \
                            of {base}^{exp}.  The timestamps of packets \
                            captured from this interface won't fit into  \
                            a u32."
                        )
                    }
                }
            }
            // Every other option (addresses, filter string, hardware/OS
            // description, speed, ...) is discarded.
        });

        Ok(InterfaceDescription {
            link_type,
            if_tsresol,
        })
    }
}
