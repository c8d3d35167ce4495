//! The 4-byte CoAP header (RFC 7252 §3) and the message-code taxonomy.

use core::{convert::TryFrom, fmt};

use crate::error::MessageError;

/// The raw byte header, useful for encoding/decoding directly.
#[derive(Debug, Clone, Copy)]
pub struct HeaderRaw {
    ver_type_tkl: u8,
    code: u8,
    message_id: u16,
}

impl HeaderRaw {
    /// Writes the header into the first 4 bytes of `buf`.
    pub fn serialize_into(&self, buf: &mut [u8]) -> Result<(), MessageError> {
        if buf.len() < 4 {
            return Err(MessageError::BufferTooSmall);
        }
        buf[0] = self.ver_type_tkl;
        buf[1] = self.code;
        buf[2..4].copy_from_slice(&self.message_id.to_be_bytes());
        Ok(())
    }
}

impl Default for HeaderRaw {
    fn default() -> HeaderRaw {
        HeaderRaw {
            ver_type_tkl: 0x40, // version: 1, type: Confirmable, TKL: 0
            code: 0x01,         // GET
            message_id: 0,
        }
    }
}

impl TryFrom<&[u8]> for HeaderRaw {
    type Error = MessageError;

    fn try_from(buf: &[u8]) -> Result<HeaderRaw, MessageError> {
        if buf.len() < 4 {
            return Err(MessageError::InvalidHeader);
        }
        let mut id_bytes = [0u8; 2];
        id_bytes.copy_from_slice(&buf[2..4]);
        Ok(HeaderRaw {
            ver_type_tkl: buf[0],
            code: buf[1],
            message_id: u16::from_be_bytes(id_bytes),
        })
    }
}

/// The detailed class (request/response/empty) of a message, with its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    Empty,
    Request(RequestType),
    Response(ResponseType),
    /// A class/detail pair this crate doesn't assign meaning to.
    Reserved(u8),
}

/// Packs `class` (0-7) and `detail` (0-31) the way RFC 7252 §3 does: the
/// class occupies the top 3 bits, the detail the bottom 5. Computing this
/// instead of hardcoding the resulting byte keeps the 2.xx/4.xx/5.xx tables
/// below honest with each other.
const fn response_code(class: u8, detail: u8) -> u8 {
    (class << 5) | detail
}

impl From<u8> for MessageClass {
    fn from(code: u8) -> MessageClass {
        if code == 0x00 {
            return MessageClass::Empty;
        }
        match code {
            c if c == response_code(0, 1) => MessageClass::Request(RequestType::Get),
            c if c == response_code(0, 2) => MessageClass::Request(RequestType::Post),
            c if c == response_code(0, 3) => MessageClass::Request(RequestType::Put),
            c if c == response_code(0, 4) => MessageClass::Request(RequestType::Delete),

            c if c == response_code(2, 1) => MessageClass::Response(ResponseType::Created),
            c if c == response_code(2, 2) => MessageClass::Response(ResponseType::Deleted),
            c if c == response_code(2, 3) => MessageClass::Response(ResponseType::Valid),
            c if c == response_code(2, 4) => MessageClass::Response(ResponseType::Changed),
            c if c == response_code(2, 5) => MessageClass::Response(ResponseType::Content),

            c if c == response_code(4, 0) => MessageClass::Response(ResponseType::BadRequest),
            c if c == response_code(4, 1) => MessageClass::Response(ResponseType::Unauthorized),
            c if c == response_code(4, 2) => MessageClass::Response(ResponseType::BadOption),
            c if c == response_code(4, 3) => MessageClass::Response(ResponseType::Forbidden),
            c if c == response_code(4, 4) => MessageClass::Response(ResponseType::NotFound),
            c if c == response_code(4, 5) => {
                MessageClass::Response(ResponseType::MethodNotAllowed)
            }
            c if c == response_code(4, 6) => MessageClass::Response(ResponseType::NotAcceptable),
            c if c == response_code(4, 12) => {
                MessageClass::Response(ResponseType::PreconditionFailed)
            }
            c if c == response_code(4, 13) => {
                MessageClass::Response(ResponseType::RequestEntityTooLarge)
            }
            c if c == response_code(4, 15) => {
                MessageClass::Response(ResponseType::UnsupportedContentFormat)
            }

            c if c == response_code(5, 0) => {
                MessageClass::Response(ResponseType::InternalServerError)
            }
            c if c == response_code(5, 1) => MessageClass::Response(ResponseType::NotImplemented),
            c if c == response_code(5, 2) => MessageClass::Response(ResponseType::BadGateway),
            c if c == response_code(5, 3) => {
                MessageClass::Response(ResponseType::ServiceUnavailable)
            }
            c if c == response_code(5, 4) => MessageClass::Response(ResponseType::GatewayTimeout),
            c if c == response_code(5, 5) => {
                MessageClass::Response(ResponseType::ProxyingNotSupported)
            }
            other => MessageClass::Reserved(other),
        }
    }
}

impl From<MessageClass> for u8 {
    fn from(class: MessageClass) -> u8 {
        match class {
            MessageClass::Empty => 0x00,

            MessageClass::Request(RequestType::Get) => response_code(0, 1),
            MessageClass::Request(RequestType::Post) => response_code(0, 2),
            MessageClass::Request(RequestType::Put) => response_code(0, 3),
            MessageClass::Request(RequestType::Delete) => response_code(0, 4),

            MessageClass::Response(ResponseType::Created) => response_code(2, 1),
            MessageClass::Response(ResponseType::Deleted) => response_code(2, 2),
            MessageClass::Response(ResponseType::Valid) => response_code(2, 3),
            MessageClass::Response(ResponseType::Changed) => response_code(2, 4),
            MessageClass::Response(ResponseType::Content) => response_code(2, 5),

            MessageClass::Response(ResponseType::BadRequest) => response_code(4, 0),
            MessageClass::Response(ResponseType::Unauthorized) => response_code(4, 1),
            MessageClass::Response(ResponseType::BadOption) => response_code(4, 2),
            MessageClass::Response(ResponseType::Forbidden) => response_code(4, 3),
            MessageClass::Response(ResponseType::NotFound) => response_code(4, 4),
            MessageClass::Response(ResponseType::MethodNotAllowed) => response_code(4, 5),
            MessageClass::Response(ResponseType::NotAcceptable) => response_code(4, 6),
            MessageClass::Response(ResponseType::PreconditionFailed) => response_code(4, 12),
            MessageClass::Response(ResponseType::RequestEntityTooLarge) => response_code(4, 13),
            MessageClass::Response(ResponseType::UnsupportedContentFormat) => {
                response_code(4, 15)
            }

            MessageClass::Response(ResponseType::InternalServerError) => response_code(5, 0),
            MessageClass::Response(ResponseType::NotImplemented) => response_code(5, 1),
            MessageClass::Response(ResponseType::BadGateway) => response_code(5, 2),
            MessageClass::Response(ResponseType::ServiceUnavailable) => response_code(5, 3),
            MessageClass::Response(ResponseType::GatewayTimeout) => response_code(5, 4),
            MessageClass::Response(ResponseType::ProxyingNotSupported) => response_code(5, 5),

            MessageClass::Reserved(code) => code,
        }
    }
}

impl fmt::Display for MessageClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code: u8 = (*self).into();
        write!(f, "{}.{:02}", code >> 5, code & 0x1F)
    }
}

/// The four CoAP request methods (RFC 7252 §12.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Get,
    Post,
    Put,
    Delete,
}

/// The response codes this crate assigns meaning to (RFC 7252 §12.1.2, base
/// specification only -- extensions like block-wise transfer's 2.31
/// Continue are out of scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseType {
    // 2.xx
    Created,
    Deleted,
    Valid,
    Changed,
    Content,

    // 4.xx
    BadRequest,
    Unauthorized,
    BadOption,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    NotAcceptable,
    PreconditionFailed,
    RequestEntityTooLarge,
    UnsupportedContentFormat,

    // 5.xx
    InternalServerError,
    NotImplemented,
    BadGateway,
    ServiceUnavailable,
    GatewayTimeout,
    ProxyingNotSupported,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&MessageClass::Response(*self), f)
    }
}

/// The four message types (RFC 7252 §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Confirmable,
    NonConfirmable,
    Acknowledgement,
    Reset,
}

/// The message header: version + type + token length (packed), code,
/// Message-ID.
#[derive(Debug, Clone, Copy)]
pub struct Header {
    ver_type_tkl: u8,
    pub code: MessageClass,
    pub message_id: u16,
}

impl Default for Header {
    fn default() -> Header {
        Header::from_raw(&HeaderRaw::default())
    }
}

impl Header {
    pub fn new() -> Header {
        Default::default()
    }

    pub fn from_raw(raw: &HeaderRaw) -> Header {
        Header {
            ver_type_tkl: raw.ver_type_tkl,
            code: raw.code.into(),
            message_id: raw.message_id,
        }
    }

    pub fn to_raw(&self) -> HeaderRaw {
        HeaderRaw {
            ver_type_tkl: self.ver_type_tkl,
            code: self.code.into(),
            message_id: self.message_id,
        }
    }

    #[inline]
    pub fn set_version(&mut self, v: u8) {
        let type_tkl = 0x3F & self.ver_type_tkl;
        self.ver_type_tkl = v << 6 | type_tkl;
    }

    #[inline]
    pub fn get_version(&self) -> u8 {
        self.ver_type_tkl >> 6
    }

    #[inline]
    pub fn set_type(&mut self, t: MessageType) {
        let tn = match t {
            MessageType::Confirmable => 0,
            MessageType::NonConfirmable => 1,
            MessageType::Acknowledgement => 2,
            MessageType::Reset => 3,
        };
        let ver_tkl = 0xCF & self.ver_type_tkl;
        self.ver_type_tkl = tn << 4 | ver_tkl;
    }

    #[inline]
    pub fn get_type(&self) -> MessageType {
        match (0x30 & self.ver_type_tkl) >> 4 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }

    /// Sets the token length nibble. `tkl` must be `<= 8`; CoAP reserves
    /// 9-15 (RFC 7252 §3).
    #[inline]
    pub fn set_token_length(&mut self, tkl: u8) {
        debug_assert!(tkl <= 8, "token length must be <= 8");
        let ver_type = 0xF0 & self.ver_type_tkl;
        self.ver_type_tkl = (tkl & 0x0F) | ver_type;
    }

    #[inline]
    pub fn get_token_length(&self) -> u8 {
        0x0F & self.ver_type_tkl
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn response_codes_match_rfc7252() {
        assert_eq!(u8::from(MessageClass::Response(ResponseType::Content)), 0x45);
        assert_eq!(u8::from(MessageClass::Response(ResponseType::NotFound)), 0x84);
        assert_eq!(
            u8::from(MessageClass::Response(ResponseType::InternalServerError)),
            0xA0
        );
        assert_eq!(
            MessageClass::Response(ResponseType::Content).to_string(),
            "2.05"
        );
        assert_eq!(
            MessageClass::Response(ResponseType::NotFound).to_string(),
            "4.04"
        );
    }

    #[test]
    fn header_codes_roundtrip() {
        for code in 0u16..=255 {
            let class: MessageClass = (code as u8).into();
            if matches!(class, MessageClass::Reserved(_)) {
                continue;
            }
            assert_eq!(u8::from(class), code as u8);
        }
    }

    #[test]
    fn serialize_raw_fail() {
        let h = HeaderRaw::default();
        let mut buf = [0u8; 3];
        assert_eq!(MessageError::BufferTooSmall, h.serialize_into(&mut buf).unwrap_err());
    }

    #[test]
    fn from_bytes_fail() {
        let b: &[u8] = &[1, 2, 3];
        assert_eq!(MessageError::InvalidHeader, HeaderRaw::try_from(b).unwrap_err());
    }

    #[test]
    fn types() {
        let mut h = Header::new();
        h.set_type(MessageType::Acknowledgement);
        assert_eq!(MessageType::Acknowledgement, h.get_type());
        h.set_type(MessageType::Confirmable);
        assert_eq!(MessageType::Confirmable, h.get_type());
        h.set_type(MessageType::NonConfirmable);
        assert_eq!(MessageType::NonConfirmable, h.get_type());
        h.set_type(MessageType::Reset);
        assert_eq!(MessageType::Reset, h.get_type());
    }
}
