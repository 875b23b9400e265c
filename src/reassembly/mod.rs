//! TCP reassembly engine (§4.3): turns a sequence of dissected TCP segments
//! into ordered, per-direction byte deliveries to a [`TcpListener`].
//!
//! The connection table keys on [`FlowKey`] in both directions but the two
//! keys of a connection alias one [`Connection`]; see the arena-of-slots
//! design in Design Notes §9.

use crate::dissect::{DissectedTcp, TcpFlags};
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowKey {
    pub src_addr: IpAddr,
    pub src_port: u16,
    pub dst_addr: IpAddr,
    pub dst_port: u16,
}

impl FlowKey {
    fn reverse(&self) -> FlowKey {
        FlowKey {
            src_addr: self.dst_addr,
            src_port: self.dst_port,
            dst_addr: self.src_addr,
            dst_port: self.src_port,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionInfo {
    pub client_addr: IpAddr,
    pub client_port: u16,
    pub server_addr: IpAddr,
    pub server_port: u16,
}

#[derive(Debug)]
struct Flow {
    address: FlowKey,
    initial_sequence_number: u32,
    expected_sequence_number: u32,
    finished: bool,
}

impl Flow {
    fn new(address: FlowKey, seq: u32) -> Flow {
        Flow {
            address,
            initial_sequence_number: seq,
            expected_sequence_number: seq,
            finished: false,
        }
    }
}

/// `a` is ahead of, level with, or behind `b` in modular sequence space.
fn seq_cmp(a: u32, b: u32) -> std::cmp::Ordering {
    let diff = a.wrapping_sub(b) as i32;
    diff.cmp(&0)
}

struct Connection {
    client_flow: Flow,
    server_flow: Flow,
    client_buffer: BTreeMap<u32, (TcpFlags, Bytes)>,
    server_buffer: BTreeMap<u32, (TcpFlags, Bytes)>,
    new_connection_sent: bool,
}

impl Connection {
    fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            client_addr: self.client_flow.address.src_addr,
            client_port: self.client_flow.address.src_port,
            server_addr: self.server_flow.address.src_addr,
            server_port: self.server_flow.address.src_port,
        }
    }

    fn is_client_key(&self, key: &FlowKey) -> bool {
        *key == self.client_flow.address
    }
}

/// Callbacks driven by the reassembler. `is_client` is `true` when the
/// payload travelled client → server.
pub trait TcpListener {
    fn new_connection(&mut self, conn: &ConnectionInfo);
    fn data(&mut self, conn: &ConnectionInfo, is_client: bool, payload: Bytes);
    fn closed_connection(&mut self, conn: &ConnectionInfo);
}

pub struct Reassembler<L: TcpListener> {
    slots: Vec<Option<Connection>>,
    free_slots: Vec<usize>,
    table: HashMap<FlowKey, usize>,
    listener: L,
}

impl<L: TcpListener> Reassembler<L> {
    pub fn new(listener: L) -> Reassembler<L> {
        Reassembler {
            slots: Vec::new(),
            free_slots: Vec::new(),
            table: HashMap::new(),
            listener,
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    fn insert(&mut self, conn: Connection) -> usize {
        if let Some(idx) = self.free_slots.pop() {
            self.slots[idx] = Some(conn);
            idx
        } else {
            self.slots.push(Some(conn));
            self.slots.len() - 1
        }
    }

    fn evict(&mut self, idx: usize) {
        if let Some(conn) = self.slots[idx].take() {
            self.table.remove(&conn.client_flow.address);
            self.table.remove(&conn.server_flow.address);
        }
        self.free_slots.push(idx);
    }

    /// Feed one dissected TCP segment through the state machine.
    pub fn process(&mut self, packet: DissectedTcp<'_>) {
        let DissectedTcp {
            src_addr,
            dst_addr,
            segment,
        } = packet;
        let forward_key = FlowKey {
            src_addr,
            src_port: segment.src_port,
            dst_addr,
            dst_port: segment.dst_port,
        };

        if segment.flags.syn && !segment.flags.ack {
            if let Some(&idx) = self.table.get(&forward_key) {
                debug!("evicting existing connection on repeated SYN");
                self.evict(idx);
            }
            let client_flow = Flow::new(forward_key, segment.seq);
            let server_flow = Flow::new(forward_key.reverse(), 0);
            let conn = Connection {
                client_flow,
                server_flow,
                client_buffer: BTreeMap::new(),
                server_buffer: BTreeMap::new(),
                new_connection_sent: false,
            };
            let idx = self.insert(conn);
            self.table.insert(forward_key, idx);
            self.table.insert(forward_key.reverse(), idx);
            self.ingest(idx, forward_key, segment.seq, segment.flags, segment.payload);
            return;
        }

        let Some(&idx) = self.table.get(&forward_key) else {
            trace!("dropping segment for unknown connection");
            return;
        };
        self.ingest(idx, forward_key, segment.seq, segment.flags, segment.payload);
    }

    fn ingest(&mut self, idx: usize, key: FlowKey, seq: u32, flags: TcpFlags, payload: &[u8]) {
        let conn = self.slots[idx].as_mut().expect("slot must be occupied");
        let is_client = conn.is_client_key(&key);

        if flags.syn {
            let from_flow = if is_client {
                &mut conn.client_flow
            } else {
                &mut conn.server_flow
            };
            from_flow.initial_sequence_number = seq;
            from_flow.expected_sequence_number = seq;
        }

        self.deliver(idx, is_client, seq, flags, Bytes::copy_from_slice(payload));
    }

    fn deliver(&mut self, idx: usize, is_client: bool, seq: u32, flags: TcpFlags, payload: Bytes) {
        let conn = self.slots[idx].as_mut().expect("slot must be occupied");
        let expected = if is_client {
            conn.client_flow.expected_sequence_number
        } else {
            conn.server_flow.expected_sequence_number
        };

        match seq_cmp(seq, expected) {
            std::cmp::Ordering::Greater => {
                let buffer = if is_client {
                    &mut conn.client_buffer
                } else {
                    &mut conn.server_buffer
                };
                buffer.entry(seq).or_insert((flags, payload));
                return;
            }
            std::cmp::Ordering::Less => {
                trace!("dropping retransmitted/duplicate segment");
                return;
            }
            std::cmp::Ordering::Equal => {}
        }

        if !payload.is_empty() {
            if !conn.new_connection_sent {
                conn.new_connection_sent = true;
                let info = conn.info();
                self.listener.new_connection(&info);
            }
            let from_flow = if is_client {
                &mut conn.client_flow
            } else {
                &mut conn.server_flow
            };
            from_flow.expected_sequence_number =
                from_flow.expected_sequence_number.wrapping_add(payload.len() as u32);
            let info = conn.info();
            self.listener.data(&info, is_client, payload);
        } else if flags.syn || flags.fin {
            let from_flow = if is_client {
                &mut conn.client_flow
            } else {
                &mut conn.server_flow
            };
            from_flow.expected_sequence_number = from_flow.expected_sequence_number.wrapping_add(1);
        }

        if flags.fin {
            let from_flow = if is_client {
                &mut conn.client_flow
            } else {
                &mut conn.server_flow
            };
            from_flow.finished = true;
        }

        let conn = self.slots[idx].as_ref().expect("slot must be occupied");
        let both_finished = conn.client_flow.finished && conn.server_flow.finished;

        if flags.rst {
            self.close(idx);
            return;
        }
        if both_finished {
            self.close(idx);
            return;
        }

        self.drain_buffer(idx, is_client);
    }

    fn drain_buffer(&mut self, idx: usize, is_client: bool) {
        loop {
            let conn = self.slots[idx].as_mut().expect("slot must be occupied");
            let expected = if is_client {
                conn.client_flow.expected_sequence_number
            } else {
                conn.server_flow.expected_sequence_number
            };
            let buffer = if is_client {
                &mut conn.client_buffer
            } else {
                &mut conn.server_buffer
            };
            let Some((flags, payload)) = buffer.remove(&expected) else {
                return;
            };
            self.deliver(idx, is_client, expected, flags, payload);
            if self.slots[idx].is_none() {
                return;
            }
        }
    }

    fn close(&mut self, idx: usize) {
        if let Some(conn) = &self.slots[idx] {
            let info = conn.info();
            self.listener.closed_connection(&info);
        }
        self.evict(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dissect::TcpSegment;
    use std::net::Ipv4Addr;

    #[derive(Default)]
    struct RecordingListener {
        new_conns: usize,
        data: Vec<(bool, Vec<u8>)>,
        closed: usize,
    }

    impl TcpListener for RecordingListener {
        fn new_connection(&mut self, _conn: &ConnectionInfo) {
            self.new_conns += 1;
        }
        fn data(&mut self, _conn: &ConnectionInfo, is_client: bool, payload: Bytes) {
            self.data.push((is_client, payload.to_vec()));
        }
        fn closed_connection(&mut self, _conn: &ConnectionInfo) {
            self.closed += 1;
        }
    }

    fn client_key() -> FlowKey {
        FlowKey {
            src_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)),
            src_port: 4000,
            dst_addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
            dst_port: 80,
        }
    }

    fn segment(seq: u32, flags: TcpFlags, payload: &'static [u8]) -> TcpSegment<'static> {
        TcpSegment {
            src_port: client_key().src_port,
            dst_port: client_key().dst_port,
            seq,
            ack: 0,
            flags,
            payload,
        }
    }

    fn dissected(key: FlowKey, segment: TcpSegment<'static>) -> DissectedTcp<'static> {
        DissectedTcp {
            src_addr: key.src_addr,
            dst_addr: key.dst_addr,
            segment,
        }
    }

    #[test]
    fn handshake_then_in_order_request() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));

        let synack = TcpFlags { syn: true, ack: true, ..Default::default() };
        r.process(dissected(client_key().reverse(), segment(500, synack, b"")));

        let push_ack = TcpFlags { ack: true, psh: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, push_ack, b"hello")));

        assert_eq!(r.listener().new_conns, 1);
        assert_eq!(r.listener().data, vec![(true, b"hello".to_vec())]);
    }

    #[test]
    fn out_of_order_segments_are_buffered_then_drained() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));

        let ack = TcpFlags { ack: true, ..Default::default() };
        // B arrives first (seq 111, 20 bytes), should be buffered.
        let b_payload: &'static [u8] = b"BBBBBBBBBBBBBBBBBBBB";
        r.process(dissected(client_key(), segment(111, ack, b_payload)));
        assert!(r.listener().data.is_empty());

        // A arrives (seq 101, 10 bytes) and should trigger delivery of both.
        let a_payload: &'static [u8] = b"AAAAAAAAAA";
        r.process(dissected(client_key(), segment(101, ack, a_payload)));

        assert_eq!(r.listener().data.len(), 2);
        assert_eq!(r.listener().data[0].1, a_payload);
        assert_eq!(r.listener().data[1].1, b_payload);
    }

    #[test]
    fn duplicate_segment_is_a_no_op() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));

        let ack = TcpFlags { ack: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, ack, b"hi")));
        r.process(dissected(client_key(), segment(101, ack, b"hi")));

        assert_eq!(r.listener().data.len(), 1);
    }

    #[test]
    fn both_fins_close_the_connection() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));
        let synack = TcpFlags { syn: true, ack: true, ..Default::default() };
        r.process(dissected(client_key().reverse(), segment(500, synack, b"")));

        let fin = TcpFlags { fin: true, ack: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, fin, b"")));
        r.process(dissected(client_key().reverse(), segment(501, fin, b"")));

        assert_eq!(r.listener().closed, 1);
    }

    #[test]
    fn rst_closes_immediately() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));

        let rst = TcpFlags { rst: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, rst, b"")));

        assert_eq!(r.listener().closed, 1);
    }

    #[test]
    fn out_of_order_bare_fin_still_closes_the_connection() {
        let mut r = Reassembler::new(RecordingListener::default());
        let syn = TcpFlags { syn: true, ..Default::default() };
        r.process(dissected(client_key(), segment(100, syn, b"")));
        let synack = TcpFlags { syn: true, ack: true, ..Default::default() };
        r.process(dissected(client_key().reverse(), segment(500, synack, b"")));

        // Client's FIN (seq 106) arrives before the data that precedes it
        // (seq 101, 5 bytes) — the FIN must survive buffering and draining.
        let fin = TcpFlags { fin: true, ack: true, ..Default::default() };
        r.process(dissected(client_key(), segment(106, fin, b"")));
        assert!(r.listener().data.is_empty());

        let ack = TcpFlags { ack: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, ack, b"hello")));
        assert_eq!(r.listener().data, vec![(true, b"hello".to_vec())]);

        let server_fin = TcpFlags { fin: true, ack: true, ..Default::default() };
        r.process(dissected(client_key().reverse(), segment(501, server_fin, b"")));

        assert_eq!(r.listener().closed, 1);
    }

    #[test]
    fn unknown_connection_mid_stream_is_dropped() {
        let mut r = Reassembler::new(RecordingListener::default());
        let ack = TcpFlags { ack: true, ..Default::default() };
        r.process(dissected(client_key(), segment(101, ack, b"hi")));
        assert!(r.listener().data.is_empty());
        assert_eq!(r.listener().new_conns, 0);
    }
}
