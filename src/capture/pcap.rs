//! Classic pcap reader: a 24-byte global header followed by a sequence of
//! 16-byte record headers, each immediately followed by the captured frame.

use crate::block::Endianness;
use crate::capture::CaptureRecord;
use crate::capture::CaptureError;
use crate::iface::LinkType;
use byteorder::{BigEndian, ByteOrder, LittleEndian, ReadBytesExt};
use bytes::Bytes;
use std::io::{ErrorKind, Read};
use std::time::{Duration, SystemTime};

#[derive(Debug)]
pub struct PcapReader<R> {
    rdr: R,
    endianness: Endianness,
    link_type: LinkType,
}

impl<R: Read> PcapReader<R> {
    pub fn new(mut rdr: R, endianness: Endianness) -> Result<PcapReader<R>, CaptureError> {
        // The 4-byte magic has already been consumed by the caller; the rest
        // of the 24-byte global header follows.
        let network = match endianness {
            Endianness::Big => {
                rdr.read_u16::<BigEndian>()?; // version_major
                rdr.read_u16::<BigEndian>()?; // version_minor
                rdr.read_i32::<BigEndian>()?; // thiszone
                rdr.read_u32::<BigEndian>()?; // sigfigs
                rdr.read_u32::<BigEndian>()?; // snaplen
                rdr.read_u32::<BigEndian>()?
            }
            Endianness::Little => {
                rdr.read_u16::<LittleEndian>()?;
                rdr.read_u16::<LittleEndian>()?;
                rdr.read_i32::<LittleEndian>()?;
                rdr.read_u32::<LittleEndian>()?;
                rdr.read_u32::<LittleEndian>()?;
                rdr.read_u32::<LittleEndian>()?
            }
        };
        Ok(PcapReader {
            rdr,
            endianness,
            link_type: LinkType::from_code(network),
        })
    }

    pub fn next_record(&mut self) -> Result<Option<CaptureRecord>, CaptureError> {
        let ts_sec = match self.read_u32_checked_eof()? {
            Some(v) => v,
            None => return Ok(None),
        };
        let ts_usec = self.read_u32()?;
        let incl_len = self.read_u32()?;
        let _orig_len = self.read_u32()?;

        let mut data = vec![0u8; incl_len as usize];
        self.rdr.read_exact(&mut data)?;

        let timestamp =
            SystemTime::UNIX_EPOCH + Duration::new(u64::from(ts_sec), ts_usec * 1_000);

        Ok(Some(CaptureRecord {
            timestamp,
            link_type: self.link_type,
            frame_bytes: Bytes::from(data),
        }))
    }

    fn read_u32(&mut self) -> Result<u32, CaptureError> {
        Ok(match self.endianness {
            Endianness::Big => self.rdr.read_u32::<BigEndian>()?,
            Endianness::Little => self.rdr.read_u32::<LittleEndian>()?,
        })
    }

    /// Like [`read_u32`], but a clean EOF on the very first byte of the read
    /// is reported as `Ok(None)` rather than an error: it means we're at a
    /// record boundary with nothing left, not a truncated record.
    fn read_u32_checked_eof(&mut self) -> Result<Option<u32>, CaptureError> {
        let mut buf = [0u8; 4];
        let mut n = 0;
        while n < 4 {
            match self.rdr.read(&mut buf[n..]) {
                Ok(0) => break,
                Ok(read) => n += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if n == 0 {
            return Ok(None);
        }
        if n < 4 {
            return Err(CaptureError::UnexpectedEof);
        }
        Ok(Some(match self.endianness {
            Endianness::Big => BigEndian::read_u32(&buf),
            Endianness::Little => LittleEndian::read_u32(&buf),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn global_header_le(network: u32) -> Vec<u8> {
        let mut v = Vec::new();
        v.extend_from_slice(&2u16.to_le_bytes()); // version_major
        v.extend_from_slice(&4u16.to_le_bytes()); // version_minor
        v.extend_from_slice(&0i32.to_le_bytes()); // thiszone
        v.extend_from_slice(&0u32.to_le_bytes()); // sigfigs
        v.extend_from_slice(&65535u32.to_le_bytes()); // snaplen
        v.extend_from_slice(&network.to_le_bytes()); // network
        v
    }

    #[test]
    fn reads_one_record() {
        let mut bytes = global_header_le(1); // ethernet
        bytes.extend_from_slice(&1u32.to_le_bytes()); // ts_sec
        bytes.extend_from_slice(&2u32.to_le_bytes()); // ts_usec
        bytes.extend_from_slice(&3u32.to_le_bytes()); // incl_len
        bytes.extend_from_slice(&3u32.to_le_bytes()); // orig_len
        bytes.extend_from_slice(&[0xAA, 0xBB, 0xCC]);

        let mut r = PcapReader::new(Cursor::new(bytes), Endianness::Little).unwrap();
        let rec = r.next_record().unwrap().unwrap();
        assert_eq!(rec.link_type, LinkType::ETHERNET);
        assert_eq!(&rec.frame_bytes[..], &[0xAA, 0xBB, 0xCC]);
        assert!(r.next_record().unwrap().is_none());
    }
}
