use crate::dissect::{DissectError, TcpFlags, TcpSegment};

pub(crate) fn parse(frame: &[u8]) -> Result<TcpSegment<'_>, DissectError> {
    if frame.len() < 20 {
        return Err(DissectError::ShortTransportHeader);
    }
    let src_port = u16::from_be_bytes([frame[0], frame[1]]);
    let dst_port = u16::from_be_bytes([frame[2], frame[3]]);
    let seq = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);
    let ack = u32::from_be_bytes([frame[8], frame[9], frame[10], frame[11]]);

    let data_offset = usize::from(frame[12] >> 4) * 4;
    if data_offset < 20 || frame.len() < data_offset {
        return Err(DissectError::ShortTransportHeader);
    }

    let flags = TcpFlags {
        ns: frame[12] & 0x01 != 0,
        cwr: frame[13] & 0x80 != 0,
        ece: frame[13] & 0x40 != 0,
        urg: frame[13] & 0x20 != 0,
        ack: frame[13] & 0x10 != 0,
        psh: frame[13] & 0x08 != 0,
        rst: frame[13] & 0x04 != 0,
        syn: frame[13] & 0x02 != 0,
        fin: frame[13] & 0x01 != 0,
    };

    Ok(TcpSegment {
        src_port,
        dst_port,
        seq,
        ack,
        flags,
        payload: &frame[data_offset..],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_payload() {
        let mut frame = vec![0u8; 20];
        frame[0..2].copy_from_slice(&1111u16.to_be_bytes());
        frame[2..4].copy_from_slice(&80u16.to_be_bytes());
        frame[4..8].copy_from_slice(&42u32.to_be_bytes());
        frame[12] = 0x50; // data offset 5
        frame[13] = 0b0000_0010; // SYN
        frame.extend_from_slice(b"hi");

        let seg = parse(&frame).unwrap();
        assert_eq!(seg.src_port, 1111);
        assert_eq!(seg.seq, 42);
        assert!(seg.flags.syn);
        assert!(!seg.flags.ack);
        assert_eq!(seg.payload, b"hi");
    }
}
