use crate::dissect::DissectError;
use std::net::Ipv6Addr;

pub(crate) struct Ipv6Frame<'a> {
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
    pub next_header: u8,
    pub payload: &'a [u8],
}

/// Extension headers are out of scope: `next_header` is taken at face value
/// and handed straight to the transport dispatcher.
pub(crate) fn parse(frame: &[u8]) -> Result<Ipv6Frame<'_>, DissectError> {
    if frame.len() < 40 {
        return Err(DissectError::ShortNetworkHeader);
    }
    let version = frame[0] >> 4;
    if version != 6 {
        return Err(DissectError::BadIpVersion(version));
    }
    let payload_len = usize::from(u16::from_be_bytes([frame[4], frame[5]]));
    let next_header = frame[6];
    let mut src_bytes = [0u8; 16];
    src_bytes.copy_from_slice(&frame[8..24]);
    let mut dst_bytes = [0u8; 16];
    dst_bytes.copy_from_slice(&frame[24..40]);

    let end = 40 + payload_len;
    if end > frame.len() {
        return Err(DissectError::PayloadOutOfBounds);
    }

    Ok(Ipv6Frame {
        src: Ipv6Addr::from(src_bytes),
        dst: Ipv6Addr::from(dst_bytes),
        next_header,
        payload: &frame[40..end],
    })
}
