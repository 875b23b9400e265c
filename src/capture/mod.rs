//! Capture demultiplexer (§4.1): auto-detects classic pcap vs pcapng from
//! the stream's leading magic bytes and yields [`CaptureRecord`]s.

mod error;
pub mod pcap;
pub mod pcapng;

pub use error::CaptureError;

use crate::block::Endianness;
use crate::iface::LinkType;
use bytes::Bytes;
use std::io::{self, Read};
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct CaptureRecord {
    pub timestamp: SystemTime,
    pub link_type: LinkType,
    pub frame_bytes: Bytes,
}

/// Replays the up-to-4 bytes consumed to identify the format, then falls
/// through to the wrapped reader. Lets both sub-readers start from byte zero
/// without requiring the input to be seekable.
#[derive(Debug)]
struct Prefixed<R> {
    prefix: [u8; 4],
    prefix_len: u8,
    pos: u8,
    inner: R,
}

impl<R: Read> Read for Prefixed<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if usize::from(self.pos) < usize::from(self.prefix_len) {
            let remaining = &self.prefix[usize::from(self.pos)..usize::from(self.prefix_len)];
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            self.pos += n as u8;
            Ok(n)
        } else {
            self.inner.read(buf)
        }
    }
}

#[derive(Debug)]
pub enum CaptureReader<R> {
    /// Input was entirely empty; yields no records.
    Empty,
    Pcap(pcap::PcapReader<Prefixed<R>>),
    PcapNg(pcapng::PcapNgReader<Prefixed<R>>),
}

impl<R: Read> CaptureReader<R> {
    pub fn open(mut inner: R) -> Result<CaptureReader<R>, CaptureError> {
        let mut magic = [0u8; 4];
        let mut n = 0usize;
        while n < 4 {
            match inner.read(&mut magic[n..]) {
                Ok(0) => break,
                Ok(read) => n += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if n == 0 {
            return Ok(CaptureReader::Empty);
        }
        if n < 4 {
            return Err(CaptureError::UnexpectedEof);
        }

        let prefixed = Prefixed {
            prefix: magic,
            prefix_len: n as u8,
            pos: 0,
            inner,
        };

        match magic {
            [0xA1, 0xB2, 0xC3, 0xD4] => Ok(CaptureReader::Pcap(pcap::PcapReader::new(
                prefixed,
                Endianness::Big,
            )?)),
            [0xD4, 0xC3, 0xB2, 0xA1] => Ok(CaptureReader::Pcap(pcap::PcapReader::new(
                prefixed,
                Endianness::Little,
            )?)),
            [0x0A, 0x0D, 0x0D, 0x0A] => {
                Ok(CaptureReader::PcapNg(pcapng::PcapNgReader::new(prefixed)?))
            }
            _ => Err(CaptureError::NotACapture),
        }
    }

    pub fn next_record(&mut self) -> Result<Option<CaptureRecord>, CaptureError> {
        match self {
            CaptureReader::Empty => Ok(None),
            CaptureReader::Pcap(r) => r.next_record(),
            CaptureReader::PcapNg(r) => r.next_record(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_input_yields_nothing() {
        let mut r = CaptureReader::open(Cursor::new(Vec::<u8>::new())).unwrap();
        assert!(r.next_record().unwrap().is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = CaptureReader::open(Cursor::new(vec![0xFF, 0xFF, 0xFF, 0xFF, 0, 0, 0, 0]))
            .unwrap_err();
        assert!(matches!(err, CaptureError::NotACapture));
    }

    #[test]
    fn truncated_magic_is_unexpected_eof() {
        let err = CaptureReader::open(Cursor::new(vec![0xA1, 0xB2])).unwrap_err();
        assert!(matches!(err, CaptureError::UnexpectedEof));
    }
}
