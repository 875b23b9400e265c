//! Layer dissector (§4.2): peels link, network and transport headers off a
//! captured frame. Any malformed header aborts dissection of that single
//! packet only; the caller logs and moves on to the next packet.

mod ethernet;
mod icmp;
mod ipv4;
mod ipv6;
mod null;
mod tcp;
mod udp;

use crate::iface::LinkType;
use std::net::IpAddr;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum DissectError {
    #[error("link-layer header too short")]
    ShortLinkHeader,
    #[error("network-layer header too short or invalid")]
    ShortNetworkHeader,
    #[error("unexpected IP version nibble {0}")]
    BadIpVersion(u8),
    #[error("transport-layer header too short")]
    ShortTransportHeader,
    #[error("declared payload extends past the captured frame")]
    PayloadOutOfBounds,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TcpFlags {
    pub ns: bool,
    pub cwr: bool,
    pub ece: bool,
    pub urg: bool,
    pub ack: bool,
    pub psh: bool,
    pub rst: bool,
    pub syn: bool,
    pub fin: bool,
}

#[derive(Debug)]
pub struct TcpSegment<'a> {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub payload: &'a [u8],
}

#[derive(Debug)]
pub struct DissectedTcp<'a> {
    pub src_addr: IpAddr,
    pub dst_addr: IpAddr,
    pub segment: TcpSegment<'a>,
}

#[derive(Debug)]
pub enum DissectedPacket<'a> {
    Tcp(DissectedTcp<'a>),
    Udp {
        src_addr: IpAddr,
        dst_addr: IpAddr,
        src_port: u16,
        dst_port: u16,
        payload_len: usize,
    },
    Icmp {
        src_addr: IpAddr,
        dst_addr: IpAddr,
        icmp_type: u8,
        payload_len: usize,
    },
}

enum NetFrame<'a> {
    V4(ipv4::Ipv4Frame<'a>),
    V6(ipv6::Ipv6Frame<'a>),
}

fn link_to_network(link_type: LinkType, frame: &[u8]) -> Result<Option<NetFrame<'_>>, DissectError> {
    match link_type {
        LinkType::ETHERNET => {
            let eth = ethernet::parse(frame)?;
            match eth.ethertype {
                0x0800 => Ok(Some(NetFrame::V4(ipv4::parse(eth.payload)?))),
                0x86DD => Ok(Some(NetFrame::V6(ipv6::parse(eth.payload)?))),
                other => {
                    trace!("dropping frame with unsupported ethertype {other:#06x}");
                    Ok(None)
                }
            }
        }
        LinkType::NULL => {
            let (family, payload) = null::parse(frame)?;
            if family == 2 {
                Ok(Some(NetFrame::V4(ipv4::parse(payload)?)))
            } else if let Ok(v6) = ipv6::parse(payload) {
                Ok(Some(NetFrame::V6(v6)))
            } else {
                Ok(Some(NetFrame::V4(ipv4::parse(payload)?)))
            }
        }
        LinkType::Unknown(code) => {
            trace!("dropping packet on unsupported link type {code}");
            Ok(None)
        }
    }
}

/// Dissect a single captured frame. `Ok(None)` means the frame was well
/// formed but nothing downstream cares about it (unsupported ethertype,
/// unsupported IPv6 next-header, ...); this is not an error.
pub fn dissect(link_type: LinkType, frame: &[u8]) -> Result<Option<DissectedPacket<'_>>, DissectError> {
    let net = match link_to_network(link_type, frame)? {
        Some(n) => n,
        None => return Ok(None),
    };
    let (src_addr, dst_addr, protocol, payload) = match net {
        NetFrame::V4(v4) => (IpAddr::V4(v4.src), IpAddr::V4(v4.dst), v4.protocol, v4.payload),
        NetFrame::V6(v6) => (
            IpAddr::V6(v6.src),
            IpAddr::V6(v6.dst),
            v6.next_header,
            v6.payload,
        ),
    };
    match protocol {
        6 => {
            let segment = tcp::parse(payload)?;
            Ok(Some(DissectedPacket::Tcp(DissectedTcp {
                src_addr,
                dst_addr,
                segment,
            })))
        }
        17 => {
            let (src_port, dst_port) = udp::parse(payload)?;
            Ok(Some(DissectedPacket::Udp {
                src_addr,
                dst_addr,
                src_port,
                dst_port,
                payload_len: payload.len().saturating_sub(8),
            }))
        }
        1 | 58 => {
            let icmp_type = icmp::parse(payload)?;
            Ok(Some(DissectedPacket::Icmp {
                src_addr,
                dst_addr,
                icmp_type,
                payload_len: payload.len().saturating_sub(1),
            }))
        }
        other => {
            trace!("dropping packet with unsupported transport protocol {other}");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ethernet_ipv4_tcp_frame(payload: &[u8]) -> Vec<u8> {
        let mut frame = Vec::new();
        frame.extend_from_slice(&[0; 12]); // dst/src MAC, not inspected
        frame.extend_from_slice(&0x0800u16.to_be_bytes());

        let tcp_len = 20 + payload.len();
        let total_len = 20 + tcp_len;
        let mut ip = Vec::new();
        ip.push(0x45); // version 4, IHL 5
        ip.push(0); // DSCP/ECN
        ip.extend_from_slice(&(total_len as u16).to_be_bytes());
        ip.extend_from_slice(&[0, 0, 0, 0]); // id, flags/fragoff
        ip.push(64); // ttl
        ip.push(6); // protocol = TCP
        ip.extend_from_slice(&[0, 0]); // checksum
        ip.extend_from_slice(&[10, 0, 0, 1]); // src
        ip.extend_from_slice(&[10, 0, 0, 2]); // dst
        frame.extend_from_slice(&ip);

        let mut tcp = Vec::new();
        tcp.extend_from_slice(&1234u16.to_be_bytes()); // src port
        tcp.extend_from_slice(&80u16.to_be_bytes()); // dst port
        tcp.extend_from_slice(&100u32.to_be_bytes()); // seq
        tcp.extend_from_slice(&0u32.to_be_bytes()); // ack
        tcp.push(0x50); // data offset 5, reserved/NS
        tcp.push(0x18); // PSH|ACK
        tcp.extend_from_slice(&[0, 0]); // window
        tcp.extend_from_slice(&[0, 0]); // checksum
        tcp.extend_from_slice(&[0, 0]); // urgent ptr
        tcp.extend_from_slice(payload);
        frame.extend_from_slice(&tcp);

        frame
    }

    #[test]
    fn dissects_ethernet_ipv4_tcp() {
        let frame = ethernet_ipv4_tcp_frame(b"hello");
        let packet = dissect(LinkType::ETHERNET, &frame).unwrap().unwrap();
        match packet {
            DissectedPacket::Tcp(tcp) => {
                assert_eq!(tcp.src_addr, IpAddr::from([10, 0, 0, 1]));
                assert_eq!(tcp.dst_addr, IpAddr::from([10, 0, 0, 2]));
                assert_eq!(tcp.segment.src_port, 1234);
                assert_eq!(tcp.segment.dst_port, 80);
                assert_eq!(tcp.segment.seq, 100);
                assert!(tcp.segment.flags.ack && tcp.segment.flags.psh);
                assert_eq!(tcp.segment.payload, b"hello");
            }
            _ => panic!("expected TCP"),
        }
    }

    #[test]
    fn unsupported_ethertype_is_not_an_error() {
        let mut frame = vec![0; 12];
        frame.extend_from_slice(&0x8100u16.to_be_bytes()); // 802.1Q, unsupported
        frame.extend_from_slice(&[0; 10]);
        assert!(dissect(LinkType::ETHERNET, &frame).unwrap().is_none());
    }

    #[test]
    fn truncated_header_is_an_error() {
        assert!(dissect(LinkType::ETHERNET, &[0; 4]).is_err());
    }
}
