//! A lightweight, `#![no_std]` CoAP (RFC 7252) endpoint library with
//! Observe (RFC 7641) support, ideal for constrained devices speaking UDP
//! to peers.
//!
//! ## Overview
//! This crate provides the wire codec ([`Packet`]), the request-dispatch
//! state machine ([`Endpoint`]) driven by a caller-polled, non-blocking
//! [`Socket`], and the [`ObserverRegistry`] backing long-lived Observe
//! subscriptions. Buffers, route tables and observer tables are all
//! fixed-capacity and sized at compile time via const generics, matching
//! the bounded-memory reality of the embedded devices this crate targets.
//!
//! It does not require allocation -- every borrowed [`Packet`] references
//! bytes owned by the caller, never the heap.
//!
//! ## Usage
//! ```rust
//! use coap_lite_core::{
//!     header::{MessageClass, MessageType, RequestType},
//!     option::Opt,
//!     Packet,
//! };
//!
//! let mut request = Packet::new();
//! request.header.message_id = 23839;
//! request.header.code = MessageClass::Request(RequestType::Get);
//! request.header.set_type(MessageType::Confirmable);
//! request.set_token(&[0, 0, 57, 116]);
//! request.add_option(Opt { number: 3, value: b"localhost" }).unwrap();
//! request.add_option(Opt { number: 11, value: b"tv1" }).unwrap();
//!
//! let mut buf = [0u8; 64];
//! let len = request.encode_into(&mut buf).unwrap();
//! let decoded = Packet::parse(&buf[..len]).unwrap();
//! assert_eq!(decoded.header.message_id, 23839);
//! assert_eq!(decoded.token(), &[0, 0, 57, 116]);
//! ```
//!
//! See the `endpoint` module for wiring a [`Packet`] codec to a socket,
//! route table, and observer registry into a full CoAP server.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
mod log;

#[cfg_attr(tarpaulin, skip)]
pub mod error;

pub mod config;
pub mod endpoint;
pub mod header;
pub mod observer;
pub mod option;
pub mod packet;
pub mod route;
pub mod socket;
#[cfg(feature = "std")]
pub mod std_socket;
pub mod time;
pub mod url;

pub use endpoint::{Endpoint, Handler, Request, ResponseWriter};
pub use header::{Header, HeaderRaw, MessageClass, MessageType, RequestType, ResponseType};
pub use observer::ObserverRegistry;
pub use option::{CoapOptionNumber, ContentFormat, Opt};
pub use packet::Packet;
pub use route::RouteTable;
pub use socket::Socket;
#[cfg(feature = "std")]
pub use std_socket::{StdClock, StdUdpSocket, XorshiftIds};
pub use time::{Clock, MessageIdSource};
