//! Endpoint dispatch: the part of the original `Coap` class that owned
//! the UDP port, parsed incoming datagrams in `loop()`, and routed them to
//! a registered `callback` or a 404. Generalized here to a caller-driven
//! `poll()` over an injected [`Socket`], [`Clock`], and [`MessageIdSource`]
//! instead of Arduino's global `UDP`/`rand()`.

use core::net::SocketAddr;

use heapless::Vec as HVec;

use crate::config::{COAP_BUF_MAX_SIZE, COAP_DEFAULT_PORT, COAP_MAX_CALLBACK, COAP_MAX_OBSERVERS};
use crate::error::{HandlingError, MessageError};
use crate::header::{MessageClass, MessageType, RequestType, ResponseType};
use crate::observer::ObserverRegistry;
use crate::option::{CoapOptionNumber, Opt};
use crate::packet::Packet;
use crate::route::RouteTable;
use crate::socket::Socket;
use crate::time::{Clock, MessageIdSource};
use crate::url;

/// A parsed incoming request, handed to a matched [`Handler`].
pub struct Request<'a> {
    pub method: RequestType,
    pub token: &'a [u8],
    pub options: &'a [Opt<'a>],
    pub payload: &'a [u8],
    pub source: SocketAddr,
    pub message_id: u16,
    pub wants_observe: bool,
}

impl<'a> Request<'a> {
    /// `true` if this request carries `Observe: 0` (register).
    pub fn is_observe_register(&self) -> bool {
        self.wants_observe
    }
}

/// The buffer a [`Handler`] writes its response into. Bounded by `TXN`,
/// the same const-generic that sizes [`Endpoint`]'s transmit buffer.
pub struct ResponseWriter<'a> {
    pub code: ResponseType,
    pub content_format: Option<u16>,
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> ResponseWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        ResponseWriter {
            // Matches the original's sendResponse() defaults: 2.05 Content
            // with Content-Format text/plain unless the handler overrides
            // either.
            code: ResponseType::Content,
            content_format: Some(0),
            buf,
            len: 0,
        }
    }

    pub fn set_code(&mut self, code: ResponseType) {
        self.code = code;
    }

    pub fn set_content_format(&mut self, format: impl Into<u16>) {
        self.content_format = Some(format.into());
    }

    /// Omits the Content-Format option entirely, overriding the
    /// text/plain default.
    pub fn clear_content_format(&mut self) {
        self.content_format = None;
    }

    /// Copies `payload` into the response buffer, failing if it doesn't fit.
    pub fn write_payload(&mut self, payload: &[u8]) -> Result<(), HandlingError> {
        if payload.len() > self.buf.len() {
            return Err(HandlingError::internal("response payload too large"));
        }
        self.buf[..payload.len()].copy_from_slice(payload);
        self.len = payload.len();
        Ok(())
    }

    fn payload(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Handles a matched request. Implemented for any `Fn(&Request, &mut
/// ResponseWriter) -> Result<(), HandlingError>`, so a plain function item
/// (suitable for embedded targets with no closure captures) or a capturing
/// closure (suitable for hosted targets) both work, per the polymorphism
/// this crate's design notes call for.
pub trait Handler<S: Socket> {
    fn handle(&self, req: &Request, out: &mut ResponseWriter) -> Result<(), HandlingError>;
}

impl<S, F> Handler<S> for F
where
    S: Socket,
    F: Fn(&Request, &mut ResponseWriter) -> Result<(), HandlingError>,
{
    fn handle(&self, req: &Request, out: &mut ResponseWriter) -> Result<(), HandlingError> {
        self(req, out)
    }
}

/// The response-callback collaborator from `SPEC_FULL.md` §6: invoked for
/// every received ACK, carrying the packet and the peer it arrived from.
/// Implemented for any `Fn(&Packet, SocketAddr)`, the same polymorphism
/// [`Handler`] uses.
pub trait ResponseHandler {
    fn handle(&self, packet: &Packet, peer: SocketAddr);
}

impl<F> ResponseHandler for F
where
    F: Fn(&Packet, SocketAddr),
{
    fn handle(&self, packet: &Packet, peer: SocketAddr) {
        self(packet, peer)
    }
}

/// Owns the socket, route table, and observer registry, and drives the
/// request/response lifecycle. `RXN`/`TXN` size the receive/transmit
/// buffers; `ROUTES`/`OBSERVERS` size the route table and observer
/// registry respectively.
pub struct Endpoint<
    S: Socket,
    const RXN: usize = COAP_BUF_MAX_SIZE,
    const TXN: usize = COAP_BUF_MAX_SIZE,
    const ROUTES: usize = COAP_MAX_CALLBACK,
    const OBSERVERS: usize = COAP_MAX_OBSERVERS,
> {
    socket: S,
    routes: RouteTable<S, ROUTES>,
    observers: ObserverRegistry<OBSERVERS>,
    response_handler: Option<&'static dyn ResponseHandler>,
}

impl<S, const RXN: usize, const TXN: usize, const ROUTES: usize, const OBSERVERS: usize>
    Endpoint<S, RXN, TXN, ROUTES, OBSERVERS>
where
    S: Socket,
{
    pub fn new(socket: S) -> Self {
        Endpoint {
            socket,
            routes: RouteTable::new(),
            observers: ObserverRegistry::new(),
            response_handler: None,
        }
    }

    /// Installs the callback invoked for every received ACK (`SPEC_FULL.md`
    /// §6's "Response callback"). Replaces any previously installed callback.
    pub fn on_response(&mut self, handler: &'static dyn ResponseHandler) {
        self.response_handler = Some(handler);
    }

    /// Binds the underlying socket to the default CoAP port.
    pub fn start(&mut self) -> Result<(), S::Error> {
        self.start_on(COAP_DEFAULT_PORT)
    }

    pub fn start_on(&mut self, port: u16) -> Result<(), S::Error> {
        self.socket.bind(port)
    }

    /// Borrows the underlying socket, mainly useful for tests driving a
    /// fake transport directly.
    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Registers `handler` to serve requests whose joined Uri-Path
    /// segments equal `path` (no leading `/`, segments joined with `/`,
    /// matching [`crate::url`]'s own convention).
    pub fn server(&mut self, path: &'static str, handler: &'static dyn Handler<S>) -> bool {
        self.routes.register(path, handler)
    }

    /// Drains the socket non-blockingly: reads and dispatches every
    /// currently-available datagram before returning, rather than just
    /// one. Returns `true` if at least one datagram was processed
    /// (whether or not it parsed cleanly).
    pub fn poll<C: Clock>(&mut self, clock: &mut C) -> Result<bool, S::Error> {
        let mut processed_any = false;
        while self.poll_one(clock)? {
            processed_any = true;
        }
        Ok(processed_any)
    }

    /// Reads and dispatches one pending datagram, if any. Returns `true`
    /// if a datagram was processed (whether or not it parsed cleanly),
    /// `false` if none was available.
    ///
    /// The receive buffer lives on this call's stack, not on `Endpoint`
    /// itself: the parsed [`Packet`] borrows option values and payload
    /// straight out of it, and keeping it off `self` means that borrow
    /// never overlaps the `&mut self` calls (route lookup, observer
    /// registration, socket send) dispatch needs afterwards.
    fn poll_one<C: Clock>(&mut self, clock: &mut C) -> Result<bool, S::Error> {
        let mut rx_buf = [0u8; RXN];
        let (len, source) = match self.socket.poll(&mut rx_buf)? {
            Some(v) => v,
            None => return Ok(false),
        };

        let packet = match Packet::parse(&rx_buf[..len]) {
            Ok(p) => p,
            Err(_) => {
                coap_warn!("coap: dropping malformed datagram from {:?}", source);
                return Ok(true);
            }
        };

        if packet.header.get_type() == MessageType::Acknowledgement {
            if let Some(handler) = self.response_handler {
                handler.handle(&packet, source);
            }
            return Ok(true);
        }

        if packet.header.get_type() == MessageType::Reset {
            // RSTs have no further action defined by this crate --
            // correlating them to outstanding confirmable requests is left
            // to the caller, per this crate's concurrency model.
            return Ok(true);
        }

        let method = match packet.header.code {
            MessageClass::Request(m) => m,
            _ => {
                coap_warn!("coap: non-request message from {:?}", source);
                return Ok(true);
            }
        };

        let mut path_buf: heapless::String<{ crate::config::COAP_MAX_OBSERVE_URL_LEN }> =
            heapless::String::new();
        let mut wants_observe = false;
        for opt in packet.options.iter() {
            match CoapOptionNumber::from(opt.number) {
                CoapOptionNumber::UriPath => {
                    if !path_buf.is_empty() {
                        let _ = path_buf.push('/');
                    }
                    if let Ok(segment) = core::str::from_utf8(opt.value) {
                        let _ = path_buf.push_str(segment);
                    }
                }
                CoapOptionNumber::Observe => {
                    wants_observe = opt.value.is_empty() || opt.value == [0];
                }
                _ => {}
            }
        }

        let request = Request {
            method,
            token: packet.token(),
            options: &packet.options,
            payload: packet.payload,
            source,
            message_id: packet.header.message_id,
            wants_observe,
        };

        let mut tx_buf = [0u8; TXN];
        match self.routes.find(path_buf.as_str()) {
            Some(handler) => {
                let mut writer_buf = [0u8; TXN];
                let mut writer = ResponseWriter::new(&mut writer_buf);
                match handler.handle(&request, &mut writer) {
                    Ok(()) => {
                        let code = writer.code;
                        let content_format = writer.content_format;
                        // The registration's piggy-backed ack is itself the
                        // first notification in the Observe sequence, so its
                        // seq comes from the registry's own counter (advanced
                        // by one here) rather than a hardcoded 1 -- otherwise
                        // the first later `notify()` would repeat it.
                        let observe_seq = if wants_observe {
                            let seq = self.observers.add_observer_and_seq(
                                path_buf.as_str(),
                                source,
                                request.token,
                                clock.now_ms(),
                            );
                            if seq.is_none() {
                                coap_warn!(
                                    "coap: observer table full, not registering {}",
                                    path_buf.as_str()
                                );
                            }
                            seq
                        } else {
                            None
                        };
                        self.send_ack(
                            &mut tx_buf,
                            source,
                            request.message_id,
                            request.token,
                            code,
                            content_format,
                            observe_seq,
                            writer.payload(),
                        )?;
                    }
                    Err(e) => {
                        coap_debug!("coap: handler error for {}: {}", path_buf.as_str(), e.message);
                        self.send_ack(
                            &mut tx_buf,
                            source,
                            request.message_id,
                            request.token,
                            e.code,
                            None,
                            None,
                            e.message.as_bytes(),
                        )?;
                    }
                }
            }
            None => {
                coap_debug!("coap: no handler for {}", path_buf.as_str());
                self.send_ack(
                    &mut tx_buf,
                    source,
                    request.message_id,
                    request.token,
                    ResponseType::NotFound,
                    None,
                    None,
                    &[],
                )?;
            }
        }

        Ok(true)
    }

    /// Builds and sends a piggy-backed ACK, the shape both a handled
    /// request's reply and the synthetic 4.04 for an unmatched path take.
    /// `observe_seq`, when present, adds the Observe option -- this is
    /// this crate's `sendObserveResponse`, folded into the normal response
    /// path rather than exposed as a separate call a handler must choose
    /// to invoke.
    fn send_ack(
        &mut self,
        tx_buf: &mut [u8],
        to: SocketAddr,
        message_id: u16,
        token: &[u8],
        code: ResponseType,
        content_format: Option<u16>,
        observe_seq: Option<u32>,
        payload: &[u8],
    ) -> Result<(), S::Error> {
        let mut packet = Packet::new();
        packet.header.set_type(MessageType::Acknowledgement);
        packet.header.code = MessageClass::Response(code);
        packet.header.message_id = message_id;
        packet.set_token(token);
        packet.payload = payload;

        // Observe (6) must be added before Content-Format (12): option
        // numbers are emitted in ascending order via running-delta
        // subtraction.
        let mut observe_buf = [0u8; 4];
        if let Some(seq) = observe_seq {
            let len = crate::option::encode_uint(seq & 0x00FF_FFFF, &mut observe_buf);
            let _ = packet.add_option(Opt {
                number: u16::from(CoapOptionNumber::Observe),
                value: &observe_buf[..len],
            });
        }

        let mut fmt_buf = [0u8; 4];
        if let Some(format) = content_format {
            let len = crate::option::encode_uint(format as u32, &mut fmt_buf);
            let _ = packet.add_option(Opt {
                number: u16::from(CoapOptionNumber::ContentFormat),
                value: &fmt_buf[..len],
            });
        }

        match packet.encode_into(tx_buf) {
            Ok(n) => self.socket.send(&tx_buf[..n], to),
            Err(_) => Ok(()),
        }
    }

    /// Sends a confirmable GET for `url` on `host`:`port`, using
    /// `message_ids` for the Message-ID and `token` as the request token.
    pub fn get<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        host: &str,
        port: u16,
        url: &str,
        token: &[u8],
    ) -> Result<u16, MessageError> {
        self.send(message_ids, host, port, url, MessageType::Confirmable, RequestType::Get, token, &[])
    }

    pub fn put<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        host: &str,
        port: u16,
        url: &str,
        token: &[u8],
        payload: &[u8],
    ) -> Result<u16, MessageError> {
        self.send(message_ids, host, port, url, MessageType::Confirmable, RequestType::Put, token, payload)
    }

    /// Builds and sends a request, mirroring the original's `send()`.
    /// `content_format = None` omits the Content-Format option entirely.
    pub fn send<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        host: &str,
        port: u16,
        url: &str,
        msg_type: MessageType,
        method: RequestType,
        token: &[u8],
        payload: &[u8],
    ) -> Result<u16, MessageError> {
        self.send_with(message_ids, host, port, url, msg_type, method, token, payload, None, None, false)
    }

    /// Sends a confirmable GET for `url` carrying an Observe: 0
    /// (register) option, the client-side half of the Observe handshake
    /// from `SPEC_FULL.md` §4.5 / §8 scenario S3.
    pub fn get_observe<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        host: &str,
        port: u16,
        url: &str,
        token: &[u8],
    ) -> Result<u16, MessageError> {
        self.send_with(
            message_ids,
            host,
            port,
            url,
            MessageType::Confirmable,
            RequestType::Get,
            token,
            &[],
            None,
            None,
            true,
        )
    }

    /// The general form behind [`Endpoint::send`] and [`Endpoint::get_observe`]:
    /// an explicit `content_format` and/or `message_id` override, and an
    /// `observe_register` flag that inserts an Observe: 0 option in its
    /// correct ascending-number slot (between Uri-Host and Uri-Path).
    #[allow(clippy::too_many_arguments)]
    pub fn send_with<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        host: &str,
        port: u16,
        url: &str,
        msg_type: MessageType,
        method: RequestType,
        token: &[u8],
        payload: &[u8],
        content_format: Option<u16>,
        message_id: Option<u16>,
        observe_register: bool,
    ) -> Result<u16, MessageError> {
        let mut options: HVec<Opt, { COAP_BUF_MAX_SIZE }> = HVec::new();
        options
            .push(Opt {
                number: u16::from(CoapOptionNumber::UriHost),
                value: host.as_bytes(),
            })
            .map_err(|_| MessageError::BadOption)?;

        if observe_register {
            options
                .push(Opt { number: u16::from(CoapOptionNumber::Observe), value: &[] })
                .map_err(|_| MessageError::BadOption)?;
        }

        let (path, _) = match url.find('?') {
            Some(idx) => (&url[..idx], Some(&url[idx + 1..])),
            None => (url, None),
        };
        if !url::split_path(path, &mut options) {
            return Err(MessageError::BadOption);
        }

        let mut fmt_buf = [0u8; 4];
        if let Some(format) = content_format {
            let len = crate::option::encode_uint(format as u32, &mut fmt_buf);
            options
                .push(Opt { number: u16::from(CoapOptionNumber::ContentFormat), value: &fmt_buf[..len] })
                .map_err(|_| MessageError::BadOption)?;
        }

        if !url::split_query(url, &mut options) {
            return Err(MessageError::BadOption);
        }

        let message_id = message_id.unwrap_or_else(|| message_ids.next_id());
        let mut packet = Packet::new();
        packet.header.set_type(msg_type);
        packet.header.code = MessageClass::Request(method);
        packet.header.message_id = message_id;
        packet.set_token(token);
        packet.payload = payload;
        for opt in options {
            packet.add_option(opt)?;
        }

        let mut tx_buf = [0u8; TXN];
        let n = packet.encode_into(&mut tx_buf)?;

        let addr = parse_socket_addr(host, port).ok_or(MessageError::BadOption)?;
        self.socket.send(&tx_buf[..n], addr).map_err(|_| MessageError::BufferTooSmall)?;

        Ok(message_id)
    }

    /// Notifies every current (non-lease-expired) observer of `path` with
    /// `payload`, tagged with `content_format`. Returns the number of
    /// notifications actually handed to the socket -- a socket-level send
    /// failure is logged and skipped rather than aborting the remaining
    /// observers, matching `SPEC_FULL.md` §4.5's "a socket-level send
    /// failure does not increment the count".
    pub fn notify<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        now_ms: u64,
        path: &str,
        payload: &[u8],
        content_format: Option<u16>,
    ) -> usize {
        let mut pending: HVec<(SocketAddr, [u8; 8], u8, u32), OBSERVERS> = HVec::new();
        self.observers.notify(path, now_ms, |addr, token, seq| {
            let mut token_buf = [0u8; 8];
            let token_len = token.len().min(8);
            token_buf[..token_len].copy_from_slice(&token[..token_len]);
            let _ = pending.push((addr, token_buf, token_len as u8, seq));
        });

        let mut delivered = 0;
        for (addr, token_buf, token_len, seq) in pending {
            let message_id = message_ids.next_id();
            match self.build_and_send_notification(
                message_id,
                addr,
                &token_buf[..token_len as usize],
                seq,
                content_format,
                payload,
            ) {
                Ok(()) => delivered += 1,
                Err(_) => coap_warn!("coap: notify send failed for {:?}", addr),
            }
        }

        delivered
    }

    /// The ad-hoc single-target variant of [`Endpoint::notify`]: sends one
    /// NONCON 2.05 Content notification directly to `addr`/`token` with
    /// caller-supplied `seq`, consulting neither the observer registry nor
    /// its lease (`SPEC_FULL.md` §4.5's "does not consult the registry").
    pub fn notify_one<M: MessageIdSource>(
        &mut self,
        message_ids: &mut M,
        addr: SocketAddr,
        token: &[u8],
        seq: u32,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<(), S::Error> {
        let message_id = message_ids.next_id();
        self.build_and_send_notification(message_id, addr, token, seq, content_format, payload)
    }

    fn build_and_send_notification(
        &mut self,
        message_id: u16,
        addr: SocketAddr,
        token: &[u8],
        seq: u32,
        content_format: Option<u16>,
        payload: &[u8],
    ) -> Result<(), S::Error> {
        let mut packet = Packet::new();
        packet.header.set_type(MessageType::NonConfirmable);
        packet.header.code = MessageClass::Response(ResponseType::Content);
        packet.header.message_id = message_id;
        packet.set_token(token);
        packet.payload = payload;

        let mut seq_buf = [0u8; 4];
        let seq_len = crate::option::encode_uint(seq & 0x00FF_FFFF, &mut seq_buf);
        let _ = packet.add_option(Opt {
            number: u16::from(CoapOptionNumber::Observe),
            value: &seq_buf[..seq_len],
        });

        let mut fmt_buf = [0u8; 4];
        if let Some(format) = content_format {
            let len = crate::option::encode_uint(format as u32, &mut fmt_buf);
            let _ = packet.add_option(Opt {
                number: u16::from(CoapOptionNumber::ContentFormat),
                value: &fmt_buf[..len],
            });
        }

        let mut tx_buf = [0u8; TXN];
        match packet.encode_into(&mut tx_buf) {
            Ok(n) => self.socket.send(&tx_buf[..n], addr),
            Err(_) => Ok(()),
        }
    }
}

fn parse_socket_addr(host: &str, port: u16) -> Option<SocketAddr> {
    use core::net::IpAddr;
    let ip: IpAddr = host.parse().ok()?;
    Some(SocketAddr::new(ip, port))
}
