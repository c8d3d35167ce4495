//! The wire codec: parsing and encoding a single CoAP datagram into/from a
//! borrowed-option, no-alloc [`Packet`] (RFC 7252 §3).

use heapless::Vec as HVec;

use crate::config::COAP_MAX_OPTION_NUM;
use crate::error::MessageError;
use crate::header::{Header, HeaderRaw, MessageType};
use crate::option::Opt;

const PAYLOAD_MARKER: u8 = 0xFF;

/// A parsed or to-be-encoded CoAP message. Options and payload borrow
/// directly from whatever buffer backs them -- the decoded datagram on
/// parse, or caller-owned storage on encode -- so building or reading a
/// `Packet` never touches the heap.
#[derive(Debug, Clone)]
pub struct Packet<'a> {
    pub header: Header,
    token: [u8; 8],
    token_len: u8,
    pub options: HVec<Opt<'a>, COAP_MAX_OPTION_NUM>,
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Builds an empty packet with the default header (Confirmable GET,
    /// Message-ID 0) and no token, options, or payload.
    pub fn new() -> Packet<'a> {
        Packet {
            header: Header::new(),
            token: [0; 8],
            token_len: 0,
            options: HVec::new(),
            payload: &[],
        }
    }

    pub fn token(&self) -> &[u8] {
        &self.token[..self.token_len as usize]
    }

    /// Sets the token. `token.len()` must be `<= 8`; longer tokens are
    /// truncated and the header's token length field reflects the
    /// truncated length.
    pub fn set_token(&mut self, token: &[u8]) {
        let len = token.len().min(8);
        self.token[..len].copy_from_slice(&token[..len]);
        self.token_len = len as u8;
        self.header.set_token_length(self.token_len);
    }

    /// Appends an option. Options must be added in ascending order of
    /// `number` -- debug builds assert this since it's what makes the
    /// running-delta encoding correct; release builds trust the caller
    /// (matching the rest of this crate's no-panics-in-release stance).
    /// Fails with [`MessageError::BadOption`] if the option table is full.
    pub fn add_option(&mut self, opt: Opt<'a>) -> Result<(), MessageError> {
        if let Some(last) = self.options.last() {
            debug_assert!(
                opt.number >= last.number,
                "options must be added in ascending order"
            );
        }
        self.options.push(opt).map_err(|_| MessageError::BadOption)
    }

    /// Parses a datagram. Borrows option values and the payload directly
    /// from `buf`, so the returned `Packet` cannot outlive it.
    pub fn parse(buf: &'a [u8]) -> Result<Packet<'a>, MessageError> {
        if buf.len() < 4 {
            return Err(MessageError::InvalidHeader);
        }
        if (buf[0] & 0xC0) >> 6 != 1 {
            return Err(MessageError::InvalidHeader);
        }

        let header_raw = HeaderRaw::try_from(buf)?;
        let header = Header::from_raw(&header_raw);
        let token_len = header.get_token_length();
        if token_len > 8 {
            return Err(MessageError::InvalidHeader);
        }
        let token_len = token_len as usize;

        if buf.len() < 4 + token_len {
            return Err(MessageError::InvalidHeader);
        }
        let mut token = [0u8; 8];
        token[..token_len].copy_from_slice(&buf[4..4 + token_len]);

        let mut options: HVec<Opt<'a>, COAP_MAX_OPTION_NUM> = HVec::new();
        let mut pos = 4 + token_len;
        let mut running_delta: u32 = 0;

        while pos < buf.len() && buf[pos] != PAYLOAD_MARKER {
            let (opt, consumed) = parse_option(&buf[pos..], running_delta)?;
            running_delta = opt.number as u32;
            options
                .push(opt)
                .map_err(|_| MessageError::BadOption)?;
            pos += consumed;
        }

        // Corrected payload-marker predicate: a single-byte payload (the
        // marker plus exactly one byte) is valid, unlike the off-by-one
        // check `p + 1 < end` used by some CoAP implementations. But the
        // marker as the very last byte, with nothing after it, is not a
        // zero-length payload -- RFC 7252 forbids the marker with no
        // payload following, so that's rejected rather than silently
        // treated as "no payload".
        let payload: &'a [u8] = if pos < buf.len() && buf[pos] == PAYLOAD_MARKER {
            if pos + 1 >= buf.len() {
                return Err(MessageError::BadOption);
            }
            &buf[pos + 1..]
        } else {
            &[]
        };

        Ok(Packet {
            header,
            token,
            token_len: token_len as u8,
            options,
            payload,
        })
    }

    /// Encodes the packet into `buf`, returning the number of bytes
    /// written. Fails with [`MessageError::BufferTooSmall`] before writing
    /// anything past what already fits -- there is no partial write on
    /// error.
    pub fn encode_into(&self, buf: &mut [u8]) -> Result<usize, MessageError> {
        if buf.len() < 4 {
            return Err(MessageError::BufferTooSmall);
        }
        let mut header = self.header;
        header.set_token_length(self.token_len);
        header.to_raw().serialize_into(&mut buf[..4])?;

        let mut pos = 4;
        let token = self.token();
        if pos + token.len() > buf.len() {
            return Err(MessageError::BufferTooSmall);
        }
        buf[pos..pos + token.len()].copy_from_slice(token);
        pos += token.len();

        let mut running_delta: u32 = 0;
        for opt in &self.options {
            let delta = opt.number as u32 - running_delta;
            pos = encode_option(buf, pos, delta, opt.value)?;
            running_delta = opt.number as u32;
        }

        if !self.payload.is_empty() {
            if pos + 1 + self.payload.len() > buf.len() {
                return Err(MessageError::BufferTooSmall);
            }
            buf[pos] = PAYLOAD_MARKER;
            pos += 1;
            buf[pos..pos + self.payload.len()].copy_from_slice(self.payload);
            pos += self.payload.len();
        }

        Ok(pos)
    }

    /// `true` if the header's type is Confirmable.
    pub fn is_confirmable(&self) -> bool {
        self.header.get_type() == MessageType::Confirmable
    }
}

impl<'a> Default for Packet<'a> {
    fn default() -> Packet<'a> {
        Packet::new()
    }
}

fn nibble_for(field: u32) -> Result<u8, MessageError> {
    Ok(if field < 13 {
        field as u8
    } else if field <= 0xFF + 13 {
        13
    } else if field <= 0xFFFF + 269 {
        14
    } else {
        return Err(MessageError::BadOption);
    })
}

fn encode_option(
    buf: &mut [u8],
    mut pos: usize,
    delta: u32,
    value: &[u8],
) -> Result<usize, MessageError> {
    let length = value.len() as u32;
    let delta_nibble = nibble_for(delta)?;
    let length_nibble = nibble_for(length)?;

    // +1 for the option header byte, +1 for the payload marker we may
    // still need to write -- matches the Arduino original's buffer guard
    // `packetSize + 5 + length >= BUF_MAX_SIZE` in spirit, generalized to
    // an arbitrary caller-sized buffer rather than a fixed 50-byte one.
    if pos >= buf.len() {
        return Err(MessageError::BufferTooSmall);
    }
    buf[pos] = (delta_nibble << 4) | length_nibble;
    pos += 1;

    if delta_nibble == 13 {
        check_room(buf, pos, 1)?;
        buf[pos] = (delta - 13) as u8;
        pos += 1;
    } else if delta_nibble == 14 {
        check_room(buf, pos, 2)?;
        let ext = (delta - 269) as u16;
        buf[pos..pos + 2].copy_from_slice(&ext.to_be_bytes());
        pos += 2;
    }

    if length_nibble == 13 {
        check_room(buf, pos, 1)?;
        buf[pos] = (length - 13) as u8;
        pos += 1;
    } else if length_nibble == 14 {
        check_room(buf, pos, 2)?;
        let ext = (length - 269) as u16;
        buf[pos..pos + 2].copy_from_slice(&ext.to_be_bytes());
        pos += 2;
    }

    check_room(buf, pos, value.len())?;
    buf[pos..pos + value.len()].copy_from_slice(value);
    pos += value.len();

    Ok(pos)
}

fn check_room(buf: &[u8], pos: usize, len: usize) -> Result<(), MessageError> {
    if pos + len > buf.len() {
        Err(MessageError::BufferTooSmall)
    } else {
        Ok(())
    }
}

/// Parses one option starting at `buf[0]`, given the running delta sum
/// accumulated so far. Returns the option and the number of bytes consumed.
fn parse_option<'a>(
    buf: &'a [u8],
    running_delta: u32,
) -> Result<(Opt<'a>, usize), MessageError> {
    if buf.is_empty() {
        return Err(MessageError::BadOption);
    }
    let mut head_len = 1;
    let mut delta: u32 = ((buf[0] & 0xF0) >> 4) as u32;
    let mut length = (buf[0] & 0x0F) as u32;

    if delta == 13 {
        head_len += 1;
        if buf.len() < head_len {
            return Err(MessageError::BadOption);
        }
        delta = buf[1] as u32 + 13;
    } else if delta == 14 {
        head_len += 2;
        if buf.len() < head_len {
            return Err(MessageError::BadOption);
        }
        delta = u16::from_be_bytes([buf[1], buf[2]]) as u32 + 269;
    } else if delta == 15 {
        return Err(MessageError::BadOption);
    }

    let delta_extra = head_len - 1;

    if length == 13 {
        head_len += 1;
        if buf.len() < head_len {
            return Err(MessageError::BadOption);
        }
        length = buf[1 + delta_extra] as u32 + 13;
    } else if length == 14 {
        head_len += 2;
        if buf.len() < head_len {
            return Err(MessageError::BadOption);
        }
        length = u16::from_be_bytes([buf[1 + delta_extra], buf[2 + delta_extra]]) as u32 + 269;
    } else if length == 15 {
        return Err(MessageError::BadOption);
    }

    let total = head_len + length as usize;
    if buf.len() < total {
        return Err(MessageError::BadOption);
    }

    let number = running_delta + delta;
    if number > u16::MAX as u32 {
        return Err(MessageError::BadOption);
    }

    Ok((
        Opt {
            number: number as u16,
            value: &buf[head_len..total],
        },
        total,
    ))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::header::{MessageClass, RequestType};

    fn get_request(token: &[u8]) -> Packet<'static> {
        let mut p = Packet::new();
        p.header.code = MessageClass::Request(RequestType::Get);
        p.header.message_id = 0x1234;
        p.header.set_type(MessageType::Confirmable);
        p.set_token(token);
        p
    }

    #[test]
    fn encode_decode_roundtrip_no_options() {
        let packet = get_request(&[0xAB]);
        let mut buf = [0u8; 64];
        let len = packet.encode_into(&mut buf).unwrap();
        let decoded = Packet::parse(&buf[..len]).unwrap();
        assert_eq!(decoded.header.code, MessageClass::Request(RequestType::Get));
        assert_eq!(decoded.header.message_id, 0x1234);
        assert_eq!(decoded.token(), &[0xAB]);
        assert!(decoded.options.is_empty());
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn single_byte_payload_survives() {
        let mut packet = get_request(&[]);
        packet.payload = b"x";
        let mut buf = [0u8; 16];
        let len = packet.encode_into(&mut buf).unwrap();
        let decoded = Packet::parse(&buf[..len]).unwrap();
        assert_eq!(decoded.payload, b"x");
    }

    #[test]
    fn options_roundtrip_with_deltas() {
        let mut packet = get_request(&[]);
        packet.add_option(Opt { number: 3, value: b"host" }).unwrap();
        packet.add_option(Opt { number: 11, value: b"a" }).unwrap();
        packet.add_option(Opt { number: 11, value: b"b" }).unwrap();
        let mut buf = [0u8; 64];
        let len = packet.encode_into(&mut buf).unwrap();
        let decoded = Packet::parse(&buf[..len]).unwrap();
        assert_eq!(decoded.options.len(), 3);
        assert_eq!(decoded.options[0].number, 3);
        assert_eq!(decoded.options[1].value, b"a");
        assert_eq!(decoded.options[2].value, b"b");
    }

    #[test]
    fn extended_option_delta_13_and_14() {
        let mut packet = get_request(&[]);
        // number 20 needs a 1-byte extended delta (>= 13).
        packet.add_option(Opt { number: 20, value: b"x" }).unwrap();
        // number 300 from there needs a 2-byte extended delta (>= 269 total).
        packet.add_option(Opt { number: 300, value: b"y" }).unwrap();
        let mut buf = [0u8; 64];
        let len = packet.encode_into(&mut buf).unwrap();
        let decoded = Packet::parse(&buf[..len]).unwrap();
        assert_eq!(decoded.options[0].number, 20);
        assert_eq!(decoded.options[1].number, 300);
    }

    #[test]
    fn reject_marker_with_no_payload() {
        // 0x40 0x01 0x00 0x00: header only, then a bare 0xFF marker and
        // nothing after it.
        let buf: &[u8] = &[0x40, 0x01, 0, 0, PAYLOAD_MARKER];
        assert_eq!(MessageError::BadOption, Packet::parse(buf).unwrap_err());
    }

    #[test]
    fn reject_reserved_delta_nibble() {
        // 0xF0: delta nibble 15 is reserved.
        let buf: &[u8] = &[0x40, 0x01, 0, 0, 0xF0];
        assert_eq!(MessageError::BadOption, Packet::parse(buf).unwrap_err());
    }

    #[test]
    fn reject_too_short_header() {
        let buf: &[u8] = &[0x40, 0x01, 0];
        assert_eq!(MessageError::InvalidHeader, Packet::parse(buf).unwrap_err());
    }

    #[test]
    fn encode_fails_when_buffer_too_small() {
        let mut packet = get_request(&[]);
        packet.payload = b"0123456789";
        let mut buf = [0u8; 6];
        assert_eq!(
            MessageError::BufferTooSmall,
            packet.encode_into(&mut buf).unwrap_err()
        );
    }

    #[test]
    fn option_table_full_is_rejected() {
        let mut packet = get_request(&[]);
        for i in 0..COAP_MAX_OPTION_NUM as u16 {
            packet.add_option(Opt { number: i, value: &[] }).unwrap();
        }
        assert_eq!(
            MessageError::BadOption,
            packet.add_option(Opt { number: 9999, value: &[] }).unwrap_err()
        );
    }
}
