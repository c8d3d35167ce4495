//! End-to-end scenarios against literal bytes, covering the worked
//! examples from the specification this crate implements: GET encoding,
//! ACK parsing, the Observe registration/notify round-trip, buffer
//! overflow on encode, and the 404-on-unknown-path dispatch default.

use core::net::{IpAddr, Ipv4Addr, SocketAddr};

use coap_lite_core::endpoint::{Request, ResponseWriter};
use coap_lite_core::error::HandlingError;
use coap_lite_core::header::{MessageClass, MessageType, RequestType, ResponseType};
use coap_lite_core::option::Opt;
use coap_lite_core::socket::Socket;
use coap_lite_core::time::{Clock, MessageIdSource};
use coap_lite_core::{Endpoint, Packet};

struct QueueSocket {
    incoming: heapless::Vec<(heapless::Vec<u8, 256>, SocketAddr), 8>,
    sent: heapless::Vec<(heapless::Vec<u8, 256>, SocketAddr), 8>,
}

impl QueueSocket {
    fn new() -> Self {
        QueueSocket { incoming: heapless::Vec::new(), sent: heapless::Vec::new() }
    }

    fn push_incoming(&mut self, bytes: &[u8], from: SocketAddr) {
        let mut buf = heapless::Vec::new();
        let _ = buf.extend_from_slice(bytes);
        let _ = self.incoming.push((buf, from));
    }
}

impl Socket for QueueSocket {
    type Error = ();

    fn bind(&mut self, _port: u16) -> Result<(), Self::Error> {
        Ok(())
    }

    fn poll(&mut self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, Self::Error> {
        if self.incoming.is_empty() {
            return Ok(None);
        }
        let (data, from) = self.incoming.swap_remove(0);
        buf[..data.len()].copy_from_slice(&data);
        Ok(Some((data.len(), from)))
    }

    fn send(&mut self, buf: &[u8], to: SocketAddr) -> Result<(), Self::Error> {
        let mut owned = heapless::Vec::new();
        let _ = owned.extend_from_slice(buf);
        let _ = self.sent.push((owned, to));
        Ok(())
    }
}

struct FixedClock(u64);
impl Clock for FixedClock {
    fn now_ms(&mut self) -> u64 {
        self.0
    }
}

struct FixedIds(u16);
impl MessageIdSource for FixedIds {
    fn next_id(&mut self) -> u16 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }
}

fn peer(port: u16) -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 42)), port)
}

/// S1 -- GET request encoding: CON GET to "/well-known/core", no token,
/// message-id 0x1234, host 127.0.0.1.
#[test]
fn s1_get_request_encoding() {
    let mut ep: Endpoint<QueueSocket, 64, 64> = Endpoint::new(QueueSocket::new());
    let mut ids = FixedIds(0x1233);
    ep.get(&mut ids, "127.0.0.1", 5683, "well-known/core", &[]).unwrap();

    let (buf, to) = &ep.socket().sent[0];
    assert_eq!(*to, SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 5683));

    // 0x40 = ver 1, CON, TKL 0; 0x01 = GET; message id 0x1234.
    assert_eq!(&buf[0..4], &[0x40, 0x01, 0x12, 0x34]);

    let parsed = Packet::parse(buf).unwrap();
    assert_eq!(parsed.header.code, MessageClass::Request(RequestType::Get));
    assert_eq!(parsed.header.message_id, 0x1234);
    assert!(parsed.token().is_empty());

    let host_opt = parsed.options.iter().find(|o| o.number == 3).unwrap();
    assert_eq!(host_opt.value, b"127.0.0.1");
    let paths: heapless::Vec<&[u8], 4> =
        parsed.options.iter().filter(|o| o.number == 11).map(|o| o.value).collect();
    assert_eq!(paths.as_slice(), &[b"well-known".as_slice(), b"core".as_slice()]);
}

/// S2 -- parsing a 2.05 Content ACK with a two-byte payload and no options.
#[test]
fn s2_parse_content_ack() {
    let bytes: &[u8] = &[0x60, 0x45, 0xAB, 0xCD, 0xFF, 0x68, 0x69];
    let packet = Packet::parse(bytes).unwrap();
    assert_eq!(packet.header.get_type(), MessageType::Acknowledgement);
    assert!(packet.token().is_empty());
    assert_eq!(packet.header.code, MessageClass::Response(ResponseType::Content));
    assert_eq!(packet.header.message_id, 0xABCD);
    assert!(packet.options.is_empty());
    assert_eq!(packet.payload, b"hi");
}

fn temp_handler(req: &Request, out: &mut ResponseWriter) -> Result<(), HandlingError> {
    assert!(req.wants_observe);
    out.write_payload(b"20")
}

/// S3/S4 -- a client registers Observe on "temp" with token [0xAA, 0xBB];
/// the server's piggy-backed ACK carries Observe: 1 and Content-Format: 0,
/// and three subsequent `notify` calls emit sequence numbers 2, 3, 4.
#[test]
fn s3_s4_observe_registration_and_notify_sequence() {
    let mut ep: Endpoint<QueueSocket, 64, 64> = Endpoint::new(QueueSocket::new());
    ep.server("temp", &temp_handler);
    let mut clock = FixedClock(0);
    let mut ids = FixedIds(0);

    let mut req = Packet::new();
    req.header.set_type(MessageType::Confirmable);
    req.header.code = MessageClass::Request(RequestType::Get);
    req.header.message_id = 7;
    req.set_token(&[0xAA, 0xBB]);
    req.add_option(Opt { number: 6, value: &[0] }).unwrap(); // Observe: 0 (register)
    req.add_option(Opt { number: 11, value: b"temp" }).unwrap();
    let mut buf = [0u8; 64];
    let n = req.encode_into(&mut buf).unwrap();
    ep.socket_mut().push_incoming(&buf[..n], peer(1000));

    assert!(ep.poll(&mut clock).unwrap());

    let (resp_buf, to) = &ep.socket().sent[0];
    assert_eq!(*to, peer(1000));
    let resp = Packet::parse(resp_buf).unwrap();
    assert_eq!(resp.header.get_type(), MessageType::Acknowledgement);
    assert_eq!(resp.header.message_id, 7);
    assert_eq!(resp.token(), &[0xAA, 0xBB]);
    let observe_opt = resp.options.iter().find(|o| o.number == 6).unwrap();
    assert_eq!(observe_opt.value, &[1]);
    let cf_opt = resp.options.iter().find(|o| o.number == 12).unwrap();
    assert_eq!(cf_opt.value, &[] as &[u8]); // text/plain (0) encodes as empty

    // S4: three notify() calls after S3 emit Observe 2, 3, 4.
    let mut seqs: heapless::Vec<u32, 4> = heapless::Vec::new();
    for _ in 0..3 {
        ep.notify(&mut ids, 0, "temp", b"21", Some(0));
    }
    for (buf, _) in ep.socket().sent.iter().skip(1) {
        let notification = Packet::parse(buf).unwrap();
        assert_eq!(notification.header.get_type(), MessageType::NonConfirmable);
        let seq_opt = notification.options.iter().find(|o| o.number == 6).unwrap();
        let seq = coap_lite_core::option::decode_uint(seq_opt.value).unwrap();
        seqs.push(seq).unwrap();
    }
    assert_eq!(seqs.as_slice(), &[2, 3, 4]);
}

/// S5 -- encoding a 12-byte payload into a 16-byte buffer overflows.
#[test]
fn s5_encode_buffer_overflow() {
    let mut packet = Packet::new();
    packet.payload = b"0123456789AB"; // 12 bytes
    let mut buf = [0u8; 16];
    assert!(packet.encode_into(&mut buf).is_err());
}

fn unreachable_handler(_req: &Request, _out: &mut ResponseWriter) -> Result<(), HandlingError> {
    panic!("should never be dispatched");
}

/// S6 -- a GET for an unregistered path yields a 4.04 ACK with the same
/// Message-ID, empty payload, and no Content-Format option.
#[test]
fn s6_unknown_path_yields_404() {
    let mut ep: Endpoint<QueueSocket, 64, 64> = Endpoint::new(QueueSocket::new());
    ep.server("known", &unreachable_handler);
    let mut clock = FixedClock(0);

    let mut req = Packet::new();
    req.header.set_type(MessageType::Confirmable);
    req.header.code = MessageClass::Request(RequestType::Get);
    req.header.message_id = 0x55;
    req.add_option(Opt { number: 11, value: b"missing" }).unwrap();
    let mut buf = [0u8; 32];
    let n = req.encode_into(&mut buf).unwrap();
    ep.socket_mut().push_incoming(&buf[..n], peer(2000));

    assert!(ep.poll(&mut clock).unwrap());

    let (resp_buf, _) = &ep.socket().sent[0];
    let resp = Packet::parse(resp_buf).unwrap();
    assert_eq!(resp.header.code, MessageClass::Response(ResponseType::NotFound));
    assert_eq!(u8::from(resp.header.code), 0x84);
    assert_eq!(resp.header.message_id, 0x55);
    assert!(resp.payload.is_empty());
    assert!(resp.options.iter().all(|o| o.number != 12));
}
