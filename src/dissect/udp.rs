use crate::dissect::DissectError;

pub(crate) fn parse(frame: &[u8]) -> Result<(u16, u16), DissectError> {
    if frame.len() < 8 {
        return Err(DissectError::ShortTransportHeader);
    }
    let src_port = u16::from_be_bytes([frame[0], frame[1]]);
    let dst_port = u16::from_be_bytes([frame[2], frame[3]]);
    Ok((src_port, dst_port))
}
