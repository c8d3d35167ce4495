//! Compile-time configuration constants.
//!
//! These mirror the `#define`s of the Arduino original (`COAP_BUF_MAX_SIZE`,
//! `COAP_MAX_OPTION_NUM`, ...) and double as the default const-generic
//! arguments for [`crate::packet::Packet`], [`crate::route::RouteTable`],
//! [`crate::observer::ObserverRegistry`] and [`crate::endpoint::Endpoint`].
//! Callers that need different capacities pick a different const-generic
//! argument at the type level instead of editing these.

/// Standard CoAP UDP port (RFC 7252 §12.8).
pub const COAP_DEFAULT_PORT: u16 = 5683;

/// Default RX/TX buffer size in bytes.
pub const COAP_BUF_MAX_SIZE: usize = 128;

/// Default maximum number of options per packet.
pub const COAP_MAX_OPTION_NUM: usize = 10;

/// Default route-table capacity.
pub const COAP_MAX_CALLBACK: usize = 10;

/// Default observer-table capacity.
pub const COAP_MAX_OBSERVERS: usize = 4;

/// Default observer lease, in milliseconds. `0` disables lease expiry.
pub const COAP_OBSERVER_LEASE_MS: u64 = 60_000;

/// Default bound on an observed path, including the implicit terminator
/// the C original reserves for `'\0'`.
pub const COAP_MAX_OBSERVE_URL_LEN: usize = 32;
