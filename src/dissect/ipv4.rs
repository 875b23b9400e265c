use crate::dissect::DissectError;
use std::net::Ipv4Addr;

pub(crate) struct Ipv4Frame<'a> {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub payload: &'a [u8],
}

pub(crate) fn parse(frame: &[u8]) -> Result<Ipv4Frame<'_>, DissectError> {
    if frame.len() < 20 {
        return Err(DissectError::ShortNetworkHeader);
    }
    let version = frame[0] >> 4;
    if version != 4 {
        return Err(DissectError::BadIpVersion(version));
    }
    let ihl = usize::from(frame[0] & 0x0F) * 4;
    if ihl < 20 || frame.len() < ihl {
        return Err(DissectError::ShortNetworkHeader);
    }
    let total_len = usize::from(u16::from_be_bytes([frame[2], frame[3]]));
    if total_len < ihl || total_len > frame.len() {
        return Err(DissectError::PayloadOutOfBounds);
    }
    let protocol = frame[9];
    let src = Ipv4Addr::new(frame[12], frame[13], frame[14], frame[15]);
    let dst = Ipv4Addr::new(frame[16], frame[17], frame[18], frame[19]);
    Ok(Ipv4Frame {
        src,
        dst,
        protocol,
        payload: &frame[ihl..total_len],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_version() {
        let mut frame = vec![0x55; 20];
        frame[0] = 0x55; // version 5
        assert!(matches!(parse(&frame), Err(DissectError::BadIpVersion(5))));
    }

    #[test]
    fn rejects_oversized_total_length() {
        let mut frame = vec![0u8; 20];
        frame[0] = 0x45;
        frame[2..4].copy_from_slice(&100u16.to_be_bytes());
        assert!(matches!(parse(&frame), Err(DissectError::PayloadOutOfBounds)));
    }
}
