//! The errors of the `coap-lite-core` crate.

use core::fmt;
#[cfg(feature = "std")]
use std::error;

use crate::header::ResponseType;

/// The errors that can occur when encoding/decoding packets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageError {
    /// The datagram is shorter than the 4-byte header, has a version other
    /// than 1, or claims a token length greater than 8.
    InvalidHeader,
    /// A reserved delta/length nibble (`15`) was used, an extended
    /// delta/length field was truncated, or an option value ran past the
    /// end of the buffer.
    BadOption,
    /// Encoding the packet would exceed the caller-supplied buffer. No
    /// partial datagram is left behind and no socket send occurs.
    BufferTooSmall,
}

impl fmt::Display for MessageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageError::InvalidHeader => {
                write!(f, "CoAP error: invalid header")
            }
            MessageError::BadOption => {
                write!(f, "CoAP error: malformed option")
            }
            MessageError::BufferTooSmall => {
                write!(f, "CoAP error: buffer too small to encode packet")
            }
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for MessageError {}

/// The error that can occur when parsing a Content-Format option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidContentFormat;

impl fmt::Display for InvalidContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CoAP error: invalid content-format number")
    }
}

#[cfg(feature = "std")]
impl error::Error for InvalidContentFormat {}

/// The error that can occur when parsing the Observe option's flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidObserve;

impl fmt::Display for InvalidObserve {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CoAP error: invalid observe option value")
    }
}

#[cfg(feature = "std")]
impl error::Error for InvalidObserve {}

/// Lets a request handler hand back a protocol-visible failure without
/// building the response packet itself; [`crate::endpoint::Endpoint::poll`]
/// turns this into a piggy-backed ACK carrying `code` and `message`.
#[derive(Debug, Clone, Copy)]
pub struct HandlingError {
    pub code: ResponseType,
    pub message: &'static str,
}

impl fmt::Display for HandlingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "handling error {}: {}", self.code, self.message)
    }
}

#[cfg(feature = "std")]
impl error::Error for HandlingError {}

impl HandlingError {
    pub fn not_found() -> Self {
        Self::with_code(ResponseType::NotFound, "not found")
    }

    pub fn bad_request(message: &'static str) -> Self {
        Self::with_code(ResponseType::BadRequest, message)
    }

    pub fn internal(message: &'static str) -> Self {
        Self::with_code(ResponseType::InternalServerError, message)
    }

    pub fn method_not_allowed() -> Self {
        Self::with_code(ResponseType::MethodNotAllowed, "method not allowed")
    }

    pub fn with_code(code: ResponseType, message: &'static str) -> Self {
        Self { code, message }
    }
}
