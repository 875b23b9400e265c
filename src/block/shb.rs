use crate::block::opts::*;
use crate::block::util::*;
use bytes::Buf;

/// Identifies the beginning of a section of the capture file.
///
/// Only the version numbers are kept here; the section's descriptive
/// options (hardware/OS/application strings, section length) aren't
/// needed to drive reassembly and are discarded by `parse_options`.
///
/// This documentation is copyright (c) 2018 IETF Trust and the persons identified as the
/// authors of [this document][1]. All rights reserved. Please see the linked document for the full
/// copyright notice.
///
/// [1]: https://github.com/pcapng/pcapng
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SectionHeader {
    pub major_version: u16,
    pub minor_version: u16,
}

impl FromBytes for SectionHeader {
    fn parse<T: Buf>(mut buf: T, endianness: Endianness) -> Result<SectionHeader, BlockError> {
        ensure_remaining!(buf, 12);
        buf.advance(4); // the endianness magic - we've already parsed it
        let major_version = read_u16(&mut buf, endianness);
        let minor_version = read_u16(&mut buf, endianness);
        buf.advance(8); // section_length; not needed to drive reassembly
        parse_options(buf, endianness, |_, _| {}); // no options we care about
        Ok(SectionHeader {
            major_version,
            minor_version,
        })
    }
}
