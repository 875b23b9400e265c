//! Pcap-next-generation reader: a sequence of length-framed blocks, most of
//! which this pipeline skips. Only Section Header, Interface Description and
//! Enhanced Packet blocks drive anything (see [`crate::block`]).

use crate::block::{self, Block, BlockType, Endianness};
use crate::capture::{CaptureError, CaptureRecord};
use crate::iface::InterfaceInfo;
use buf_redux::policy::MinBuffered;
use buf_redux::BufReader;
use bytes::Bytes;
use std::io::{BufRead, Read};
use tracing::{trace, warn};

const BUF_CAPACITY: usize = 10_000_000;
const MIN_BUFFERED: usize = 8 * 1024;

#[derive(Debug)]
pub struct PcapNgReader<R> {
    rdr: BufReader<R, MinBuffered>,
    endianness: Endianness,
    consumed: usize,
    interfaces: Vec<InterfaceInfo>,
}

impl<R: Read> PcapNgReader<R> {
    pub fn new(rdr: R) -> Result<PcapNgReader<R>, CaptureError> {
        let rdr = BufReader::with_capacity(BUF_CAPACITY, rdr).set_policy(MinBuffered(MIN_BUFFERED));
        Ok(PcapNgReader {
            rdr,
            // Fixed up as soon as the first (Section Header) block is parsed.
            endianness: Endianness::Little,
            consumed: 0,
            interfaces: Vec::new(),
        })
    }

    pub fn next_record(&mut self) -> Result<Option<CaptureRecord>, CaptureError> {
        loop {
            self.rdr.consume(self.consumed);
            self.consumed = 0;

            let buf = self.rdr.fill_buf()?;
            if buf.is_empty() {
                return Ok(None);
            }

            let (block_type, data_len) = match block::parse_frame(buf, &mut self.endianness)? {
                Some(x) => x,
                None => return Err(CaptureError::UnexpectedEof),
            };
            let data = Bytes::copy_from_slice(&buf[8..8 + data_len]);
            self.consumed = data_len + 12;

            let block = Block::parse(block_type, data, self.endianness)?;
            match block {
                Block::SectionHeader(shb) => {
                    trace!("starting new section: {shb:?}");
                    self.interfaces.clear();
                }
                Block::InterfaceDescription(descr) => {
                    self.interfaces.push(InterfaceInfo { descr });
                }
                Block::EnhancedPacket(pkt) => {
                    let interface = match self.interfaces.get(pkt.interface_id as usize) {
                        Some(x) => x,
                        None => {
                            warn!(
                                "enhanced packet block referenced unknown interface {}",
                                pkt.interface_id
                            );
                            continue;
                        }
                    };
                    return Ok(Some(CaptureRecord {
                        timestamp: interface.resolve_ts(pkt.timestamp),
                        link_type: interface.link_type(),
                        frame_bytes: pkt.packet_data,
                    }));
                }
                Block::Unparsed(BlockType::Unknown(n)) => {
                    trace!("skipping unhandled block type {n:#x}");
                }
                Block::Unparsed(_) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le_block(block_type: u32, body: &[u8]) -> Vec<u8> {
        let total_len = 12 + body.len();
        let mut v = Vec::new();
        v.extend_from_slice(&block_type.to_le_bytes());
        v.extend_from_slice(&(total_len as u32).to_le_bytes());
        v.extend_from_slice(body);
        v.extend_from_slice(&(total_len as u32).to_le_bytes());
        v
    }

    fn shb_body_le() -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&0x4D3C2B1Au32.to_le_bytes()); // byte-order magic, little-endian
        v.extend_from_slice(&1u16.to_le_bytes()); // major
        v.extend_from_slice(&0u16.to_le_bytes()); // minor
        v.extend_from_slice(&[0xFF; 8]); // section_length = -1 (unspecified)
        v
    }

    fn idb_body_le(link_type: u16) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&link_type.to_le_bytes());
        v.extend_from_slice(&0u16.to_le_bytes()); // reserved
        v.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
        v
    }

    fn epb_body_le(interface_id: u32, data: &[u8]) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&interface_id.to_le_bytes());
        v.extend_from_slice(&0u32.to_le_bytes()); // ts high
        v.extend_from_slice(&1u32.to_le_bytes()); // ts low
        v.extend_from_slice(&(data.len() as u32).to_le_bytes()); // captured_len
        v.extend_from_slice(&(data.len() as u32).to_le_bytes()); // packet_len
        v.extend_from_slice(data);
        while v.len() % 4 != 0 {
            v.push(0);
        }
        v
    }

    #[test]
    fn reads_shb_idb_epb() {
        let mut bytes = Vec::new();
        bytes.extend(le_block(0x0A0D_0D0A, &shb_body_le()));
        bytes.extend(le_block(0x0000_0001, &idb_body_le(1)));
        bytes.extend(le_block(0x0000_0006, &epb_body_le(0, &[1, 2, 3, 4])));

        let mut r = PcapNgReader::new(std::io::Cursor::new(bytes)).unwrap();
        let rec = r.next_record().unwrap().unwrap();
        assert_eq!(rec.link_type, crate::iface::LinkType::ETHERNET);
        assert_eq!(&rec.frame_bytes[..], &[1, 2, 3, 4]);
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn unknown_interface_is_skipped_not_fatal() {
        let mut bytes = Vec::new();
        bytes.extend(le_block(0x0A0D_0D0A, &shb_body_le()));
        bytes.extend(le_block(0x0000_0006, &epb_body_le(3, &[9])));
        bytes.extend(le_block(0x0000_0001, &idb_body_le(1)));
        bytes.extend(le_block(0x0000_0006, &epb_body_le(0, &[8])));

        let mut r = PcapNgReader::new(std::io::Cursor::new(bytes)).unwrap();
        let rec = r.next_record().unwrap().unwrap();
        assert_eq!(&rec.frame_bytes[..], &[8]);
    }
}
