use crate::dissect::DissectError;

pub(crate) fn parse(frame: &[u8]) -> Result<u8, DissectError> {
    if frame.is_empty() {
        return Err(DissectError::ShortTransportHeader);
    }
    Ok(frame[0])
}
