//! CoAP options: numbers, content-formats, and the variable-length uint
//! encoding shared by several option values (RFC 7252 §3.2, §12.2 - §12.3).

use crate::error::{InvalidContentFormat, InvalidObserve};

/// A decoded option: its number and a borrowed view of its value bytes.
/// Borrowing directly from the datagram (on decode) or from caller-owned
/// storage (on encode) is what lets [`crate::packet::Packet`] stay
/// allocation-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opt<'a> {
    pub number: u16,
    pub value: &'a [u8],
}

/// The option numbers this crate assigns meaning to (RFC 7252 §12.2, plus
/// Observe from RFC 7641 §2). Anything else decodes to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoapOptionNumber {
    IfMatch,
    UriHost,
    ETag,
    IfNoneMatch,
    Observe,
    UriPort,
    LocationPath,
    UriPath,
    ContentFormat,
    MaxAge,
    UriQuery,
    Accept,
    LocationQuery,
    ProxyUri,
    ProxyScheme,
    Unknown(u16),
}

impl From<u16> for CoapOptionNumber {
    fn from(number: u16) -> CoapOptionNumber {
        match number {
            1 => CoapOptionNumber::IfMatch,
            3 => CoapOptionNumber::UriHost,
            4 => CoapOptionNumber::ETag,
            5 => CoapOptionNumber::IfNoneMatch,
            6 => CoapOptionNumber::Observe,
            7 => CoapOptionNumber::UriPort,
            8 => CoapOptionNumber::LocationPath,
            11 => CoapOptionNumber::UriPath,
            12 => CoapOptionNumber::ContentFormat,
            14 => CoapOptionNumber::MaxAge,
            15 => CoapOptionNumber::UriQuery,
            17 => CoapOptionNumber::Accept,
            20 => CoapOptionNumber::LocationQuery,
            35 => CoapOptionNumber::ProxyUri,
            39 => CoapOptionNumber::ProxyScheme,
            other => CoapOptionNumber::Unknown(other),
        }
    }
}

impl From<CoapOptionNumber> for u16 {
    fn from(number: CoapOptionNumber) -> u16 {
        match number {
            CoapOptionNumber::IfMatch => 1,
            CoapOptionNumber::UriHost => 3,
            CoapOptionNumber::ETag => 4,
            CoapOptionNumber::IfNoneMatch => 5,
            CoapOptionNumber::Observe => 6,
            CoapOptionNumber::UriPort => 7,
            CoapOptionNumber::LocationPath => 8,
            CoapOptionNumber::UriPath => 11,
            CoapOptionNumber::ContentFormat => 12,
            CoapOptionNumber::MaxAge => 14,
            CoapOptionNumber::UriQuery => 15,
            CoapOptionNumber::Accept => 17,
            CoapOptionNumber::LocationQuery => 20,
            CoapOptionNumber::ProxyUri => 35,
            CoapOptionNumber::ProxyScheme => 39,
            CoapOptionNumber::Unknown(other) => other,
        }
    }
}

/// The Content-Format registry entries this crate assigns meaning to
/// (RFC 7252 §12.3). `Unknown` preserves the raw number for anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    TextPlain,
    LinkFormat,
    Xml,
    OctetStream,
    Exi,
    Json,
    Cbor,
    Unknown(u16),
}

impl TryFrom<u16> for ContentFormat {
    type Error = InvalidContentFormat;

    fn try_from(number: u16) -> Result<ContentFormat, InvalidContentFormat> {
        Ok(match number {
            0 => ContentFormat::TextPlain,
            40 => ContentFormat::LinkFormat,
            41 => ContentFormat::Xml,
            42 => ContentFormat::OctetStream,
            47 => ContentFormat::Exi,
            50 => ContentFormat::Json,
            60 => ContentFormat::Cbor,
            other => ContentFormat::Unknown(other),
        })
    }
}

impl From<ContentFormat> for u16 {
    fn from(format: ContentFormat) -> u16 {
        match format {
            ContentFormat::TextPlain => 0,
            ContentFormat::LinkFormat => 40,
            ContentFormat::Xml => 41,
            ContentFormat::OctetStream => 42,
            ContentFormat::Exi => 47,
            ContentFormat::Json => 50,
            ContentFormat::Cbor => 60,
            ContentFormat::Unknown(other) => other,
        }
    }
}

/// Encodes `value` as a big-endian uint with no leading zero bytes,
/// writing into `out` and returning the number of bytes used (RFC 7252
/// §3.2 "option value formats": a zero value encodes as the empty
/// sequence).
pub fn encode_uint(value: u32, out: &mut [u8; 4]) -> usize {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0);
    match first_nonzero {
        None => 0,
        Some(start) => {
            let len = 4 - start;
            out[..len].copy_from_slice(&bytes[start..]);
            len
        }
    }
}

/// Decodes a big-endian variable-length uint option value. A value longer
/// than 4 bytes cannot be represented in a `u32` and is rejected.
pub fn decode_uint(bytes: &[u8]) -> Result<u32, InvalidObserve> {
    if bytes.len() > 4 {
        return Err(InvalidObserve);
    }
    let mut value: u32 = 0;
    for &b in bytes {
        value = (value << 8) | b as u32;
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uint_roundtrip() {
        let cases = [0u32, 1, 0xFF, 0x100, 0xFFFF, 0x10000, 0xFFFFFFFF];
        for &v in &cases {
            let mut buf = [0u8; 4];
            let len = encode_uint(v, &mut buf);
            assert_eq!(decode_uint(&buf[..len]).unwrap(), v);
        }
    }

    #[test]
    fn zero_encodes_to_empty() {
        let mut buf = [0u8; 4];
        assert_eq!(encode_uint(0, &mut buf), 0);
    }

    #[test]
    fn content_format_roundtrip() {
        assert_eq!(ContentFormat::try_from(50u16).unwrap(), ContentFormat::Json);
        assert_eq!(u16::from(ContentFormat::Json), 50);
        assert_eq!(ContentFormat::try_from(9999u16).unwrap(), ContentFormat::Unknown(9999));
    }

    #[test]
    fn option_number_roundtrip() {
        assert_eq!(CoapOptionNumber::from(11u16), CoapOptionNumber::UriPath);
        assert_eq!(u16::from(CoapOptionNumber::UriPath), 11);
        assert_eq!(CoapOptionNumber::from(999u16), CoapOptionNumber::Unknown(999));
    }
}
