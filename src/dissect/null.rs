use crate::dissect::DissectError;

/// BSD loopback framing: a 4-byte address family ahead of the IP header.
/// Real-world captures from x86 hosts write this little-endian (`AF_INET` =
/// 2), which is what we assume here; the caller falls back to probing both
/// IP versions when the value doesn't come out to a value it recognizes.
pub(crate) fn parse(frame: &[u8]) -> Result<(u32, &[u8]), DissectError> {
    if frame.len() < 4 {
        return Err(DissectError::ShortLinkHeader);
    }
    let family = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
    Ok((family, &frame[4..]))
}
