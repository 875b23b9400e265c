use crate::dissect::DissectError;

pub(crate) struct EthernetFrame<'a> {
    pub ethertype: u16,
    pub payload: &'a [u8],
}

pub(crate) fn parse(frame: &[u8]) -> Result<EthernetFrame<'_>, DissectError> {
    if frame.len() < 14 {
        return Err(DissectError::ShortLinkHeader);
    }
    let ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    Ok(EthernetFrame {
        ethertype,
        payload: &frame[14..],
    })
}
