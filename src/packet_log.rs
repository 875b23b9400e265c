//! `--print-packets` summary logging (§10.6): one line per packet,
//! independent of whether the connection turns out to carry HTTP.

use crate::dissect::DissectedPacket;
use chrono::{DateTime, Local};
use std::net::IpAddr;
use std::time::SystemTime;

pub(crate) fn summarize(timestamp: SystemTime, packet: &DissectedPacket<'_>) -> String {
    let ts = DateTime::<Local>::from(timestamp).format("%d.%m.%Y %H:%M:%S%.3f");
    match packet {
        DissectedPacket::Tcp(tcp) => format!(
            "[{ts}] {} {}:{} -> {}:{} [{}] len={}",
            "tcp",
            addr(tcp.src_addr),
            tcp.segment.src_port,
            addr(tcp.dst_addr),
            tcp.segment.dst_port,
            flag_letters(&tcp.segment.flags),
            tcp.segment.payload.len(),
        ),
        DissectedPacket::Udp {
            src_addr,
            dst_addr,
            src_port,
            dst_port,
            payload_len,
        } => format!(
            "[{ts}] udp {}:{} -> {}:{} len={payload_len}",
            addr(*src_addr),
            src_port,
            addr(*dst_addr),
            dst_port,
        ),
        DissectedPacket::Icmp {
            src_addr,
            dst_addr,
            icmp_type,
            payload_len,
        } => format!(
            "[{ts}] icmp {} -> {} type={icmp_type} len={payload_len}",
            addr(*src_addr),
            addr(*dst_addr),
        ),
    }
}

fn addr(a: IpAddr) -> String {
    a.to_string()
}

fn flag_letters(flags: &crate::dissect::TcpFlags) -> String {
    let mut s = String::new();
    if flags.syn {
        s.push('S');
    }
    if flags.ack {
        s.push('A');
    }
    if flags.fin {
        s.push('F');
    }
    if flags.rst {
        s.push('R');
    }
    if flags.psh {
        s.push('P');
    }
    if s.is_empty() {
        s.push('.');
    }
    s
}
