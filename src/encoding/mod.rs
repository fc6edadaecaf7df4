//! BACnet tag encoding and decoding.
//!
//! Primitive values travel on the wire behind a one byte tag header that carries
//! the tag number, a class bit (application or context) and a length. Lengths
//! above four use an extended length octet (or a 16/32 bit length behind the
//! markers 254/255). Context tags 6/7 in the length field mark the opening and
//! closing of constructed data.
//!
//! Every decoder returns the decoded value together with the number of bytes it
//! consumed so callers can walk a buffer.
//!
//! ```
//! use bacnet_sim::encoding::*;
//!
//! let mut buffer = Vec::new();
//! encode_unsigned(&mut buffer, 1476).unwrap();
//! encode_real(&mut buffer, 21.5).unwrap();
//!
//! let (max_apdu, consumed) = decode_unsigned(&buffer).unwrap();
//! let (temperature, _) = decode_real(&buffer[consumed..]).unwrap();
//! assert_eq!(max_apdu, 1476);
//! assert_eq!(temperature, 21.5);
//! ```

use thiserror::Error;

/// Result type for encoding operations
pub type Result<T> = std::result::Result<T, EncodingError>;

/// Errors that can occur while encoding or decoding tagged data
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("buffer underflow during decoding")]
    BufferUnderflow,
    #[error("invalid tag encountered")]
    InvalidTag,
    #[error("invalid length value")]
    InvalidLength,
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("value out of valid range")]
    ValueOutOfRange,
}

/// BACnet application tag numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApplicationTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectIdentifier = 12,
}

impl TryFrom<u8> for ApplicationTag {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::UnsignedInt),
            3 => Ok(Self::SignedInt),
            4 => Ok(Self::Real),
            5 => Ok(Self::Double),
            6 => Ok(Self::OctetString),
            7 => Ok(Self::CharacterString),
            8 => Ok(Self::BitString),
            9 => Ok(Self::Enumerated),
            10 => Ok(Self::Date),
            11 => Ok(Self::Time),
            12 => Ok(Self::ObjectIdentifier),
            _ => Err(EncodingError::InvalidTag),
        }
    }
}

/// Character sets a BACnet character string may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CharacterSet {
    /// ANSI X3.4, read as UTF-8
    Utf8 = 0,
    /// UCS-2, big endian
    Ucs2 = 4,
    /// ISO 8859-1
    Iso8859_1 = 5,
}

impl TryFrom<u8> for CharacterSet {
    type Error = EncodingError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Utf8),
            4 => Ok(Self::Ucs2),
            5 => Ok(Self::Iso8859_1),
            other => Err(EncodingError::InvalidFormat(format!(
                "unsupported character set {}",
                other
            ))),
        }
    }
}

/// One decoded tag header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagHeader {
    /// Application tag. For booleans `length` holds the value itself.
    Application { tag: ApplicationTag, length: usize },
    Context { number: u8, length: usize },
    Opening(u8),
    Closing(u8),
}

fn push_tag(buffer: &mut Vec<u8>, first: u8, length: usize) {
    if length < 5 {
        buffer.push(first | length as u8);
        return;
    }

    buffer.push(first | 5);
    if length < 254 {
        buffer.push(length as u8);
    } else if length < 65536 {
        buffer.push(254);
        buffer.extend_from_slice(&(length as u16).to_be_bytes());
    } else {
        buffer.push(255);
        buffer.extend_from_slice(&(length as u32).to_be_bytes());
    }
}

/// Reads the extended length that follows a tag byte whose length field is 5
fn read_extended_length(data: &[u8]) -> Result<(usize, usize)> {
    let marker = *data.get(1).ok_or(EncodingError::BufferUnderflow)?;
    match marker {
        0..=253 => Ok((marker as usize, 2)),
        254 => {
            let bytes = data.get(2..4).ok_or(EncodingError::BufferUnderflow)?;
            Ok((u16::from_be_bytes([bytes[0], bytes[1]]) as usize, 4))
        }
        255 => {
            let bytes = data.get(2..6).ok_or(EncodingError::BufferUnderflow)?;
            Ok((
                u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize,
                6,
            ))
        }
    }
}

/// Decode any tag header at the start of `data`
///
/// Returns the header and the number of header bytes.
pub fn decode_tag(data: &[u8]) -> Result<(TagHeader, usize)> {
    let first = *data.first().ok_or(EncodingError::BufferUnderflow)?;
    let number = first >> 4;
    let context = first & 0x08 != 0;
    let length_field = first & 0x07;

    if number == 0x0F {
        // extended tag numbers are never produced by the services handled here
        return Err(EncodingError::InvalidTag);
    }

    if context {
        return match length_field {
            6 => Ok((TagHeader::Opening(number), 1)),
            7 => Ok((TagHeader::Closing(number), 1)),
            5 => {
                let (length, consumed) = read_extended_length(data)?;
                Ok((TagHeader::Context { number, length }, consumed))
            }
            length => Ok((
                TagHeader::Context {
                    number,
                    length: length as usize,
                },
                1,
            )),
        };
    }

    let tag = ApplicationTag::try_from(number)?;
    if length_field == 5 && tag != ApplicationTag::Boolean {
        let (length, consumed) = read_extended_length(data)?;
        return Ok((TagHeader::Application { tag, length }, consumed));
    }
    if length_field > 5 {
        return Err(EncodingError::InvalidLength);
    }

    Ok((
        TagHeader::Application {
            tag,
            length: length_field as usize,
        },
        1,
    ))
}

/// Encode a BACnet application tag
pub fn encode_application_tag(
    buffer: &mut Vec<u8>,
    tag: ApplicationTag,
    length: usize,
) -> Result<()> {
    push_tag(buffer, (tag as u8) << 4, length);
    Ok(())
}

/// Decode a BACnet application tag
///
/// Returns the tag, the content length and the number of header bytes.
pub fn decode_application_tag(data: &[u8]) -> Result<(ApplicationTag, usize, usize)> {
    match decode_tag(data)? {
        (TagHeader::Application { tag, length }, consumed) => Ok((tag, length, consumed)),
        _ => Err(EncodingError::InvalidTag),
    }
}

/// Slices out the content of an application tagged value of the expected type
fn application_content(data: &[u8], expected: ApplicationTag) -> Result<(&[u8], usize)> {
    let (tag, length, header) = decode_application_tag(data)?;
    if tag != expected {
        return Err(EncodingError::InvalidTag);
    }
    let content = data
        .get(header..header + length)
        .ok_or(EncodingError::BufferUnderflow)?;
    Ok((content, header + length))
}

fn unsigned_len(value: u32) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

fn signed_len(value: i32) -> usize {
    match value {
        -128..=127 => 1,
        -32768..=32767 => 2,
        -8_388_608..=8_388_607 => 3,
        _ => 4,
    }
}

/// Interpret 1 to 4 big endian octets as an unsigned value
pub fn unsigned_from_octets(octets: &[u8]) -> Result<u32> {
    if octets.is_empty() || octets.len() > 4 {
        return Err(EncodingError::InvalidLength);
    }
    Ok(octets
        .iter()
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32))
}

fn signed_from_octets(octets: &[u8]) -> Result<i32> {
    if octets.is_empty() || octets.len() > 4 {
        return Err(EncodingError::InvalidLength);
    }
    let fill = if octets[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut bytes = [fill; 4];
    bytes[4 - octets.len()..].copy_from_slice(octets);
    Ok(i32::from_be_bytes(bytes))
}

/// Encode an application tagged null
pub fn encode_null(buffer: &mut Vec<u8>) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Null, 0)
}

/// Encode a BACnet boolean value
pub fn encode_boolean(buffer: &mut Vec<u8>, value: bool) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Boolean, value as usize)
}

/// Decode a BACnet boolean value
pub fn decode_boolean(data: &[u8]) -> Result<(bool, usize)> {
    let (tag, length, consumed) = decode_application_tag(data)?;
    if tag != ApplicationTag::Boolean {
        return Err(EncodingError::InvalidTag);
    }

    match length {
        0 => Ok((false, consumed)),
        1 => Ok((true, consumed)),
        _ => Err(EncodingError::InvalidLength),
    }
}

/// Encode a BACnet unsigned integer
pub fn encode_unsigned(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    let len = unsigned_len(value);
    encode_application_tag(buffer, ApplicationTag::UnsignedInt, len)?;
    buffer.extend_from_slice(&value.to_be_bytes()[4 - len..]);
    Ok(())
}

/// Decode a BACnet unsigned integer
pub fn decode_unsigned(data: &[u8]) -> Result<(u32, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::UnsignedInt)?;
    Ok((unsigned_from_octets(content)?, consumed))
}

/// Encode a BACnet signed integer
pub fn encode_signed(buffer: &mut Vec<u8>, value: i32) -> Result<()> {
    let len = signed_len(value);
    encode_application_tag(buffer, ApplicationTag::SignedInt, len)?;
    buffer.extend_from_slice(&value.to_be_bytes()[4 - len..]);
    Ok(())
}

/// Decode a BACnet signed integer
pub fn decode_signed(data: &[u8]) -> Result<(i32, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::SignedInt)?;
    Ok((signed_from_octets(content)?, consumed))
}

/// Encode a BACnet real (float) value
pub fn encode_real(buffer: &mut Vec<u8>, value: f32) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Real, 4)?;
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Decode a BACnet real (float) value
pub fn decode_real(data: &[u8]) -> Result<(f32, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::Real)?;
    let bytes: [u8; 4] = content
        .try_into()
        .map_err(|_| EncodingError::InvalidLength)?;
    Ok((f32::from_be_bytes(bytes), consumed))
}

/// Encode a BACnet double value
pub fn encode_double(buffer: &mut Vec<u8>, value: f64) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Double, 8)?;
    buffer.extend_from_slice(&value.to_be_bytes());
    Ok(())
}

/// Decode a BACnet double value
pub fn decode_double(data: &[u8]) -> Result<(f64, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::Double)?;
    let bytes: [u8; 8] = content
        .try_into()
        .map_err(|_| EncodingError::InvalidLength)?;
    Ok((f64::from_be_bytes(bytes), consumed))
}

/// Encode a BACnet octet string
pub fn encode_octet_string(buffer: &mut Vec<u8>, value: &[u8]) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::OctetString, value.len())?;
    buffer.extend_from_slice(value);
    Ok(())
}

/// Decode a BACnet octet string
pub fn decode_octet_string(data: &[u8]) -> Result<(Vec<u8>, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::OctetString)?;
    Ok((content.to_vec(), consumed))
}

/// Encode a BACnet character string (character set 0)
pub fn encode_character_string(buffer: &mut Vec<u8>, value: &str) -> Result<()> {
    let bytes = value.as_bytes();
    encode_application_tag(buffer, ApplicationTag::CharacterString, bytes.len() + 1)?;
    buffer.push(CharacterSet::Utf8 as u8);
    buffer.extend_from_slice(bytes);
    Ok(())
}

/// Decode a BACnet character string
///
/// UTF-8, UCS-2 and ISO 8859-1 payloads are converted to a Rust string.
pub fn decode_character_string(data: &[u8]) -> Result<(String, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::CharacterString)?;
    let (&charset, text) = content.split_first().ok_or(EncodingError::InvalidLength)?;

    let value = match CharacterSet::try_from(charset)? {
        CharacterSet::Utf8 => String::from_utf8(text.to_vec())
            .map_err(|_| EncodingError::InvalidFormat("invalid UTF-8 string".to_string()))?,
        CharacterSet::Ucs2 => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16BE.decode(text);
            if had_errors {
                return Err(EncodingError::InvalidFormat("invalid UCS-2 string".to_string()));
            }
            decoded.into_owned()
        }
        CharacterSet::Iso8859_1 => encoding_rs::WINDOWS_1252.decode(text).0.into_owned(),
    };

    Ok((value, consumed))
}

/// Encode a bit string, first bit in the most significant position
pub fn encode_bit_string(buffer: &mut Vec<u8>, bits: &[bool]) -> Result<()> {
    let byte_count = bits.len().div_ceil(8);
    let unused_bits = (byte_count * 8 - bits.len()) as u8;

    encode_application_tag(buffer, ApplicationTag::BitString, byte_count + 1)?;
    buffer.push(unused_bits);
    for chunk in bits.chunks(8) {
        let byte = chunk
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .fold(0u8, |acc, (pos, _)| acc | (0x80 >> pos));
        buffer.push(byte);
    }
    Ok(())
}

/// Decode a bit string
pub fn decode_bit_string(data: &[u8]) -> Result<(Vec<bool>, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::BitString)?;
    let (&unused_bits, octets) = content.split_first().ok_or(EncodingError::InvalidLength)?;
    if unused_bits > 7 || (octets.is_empty() && unused_bits != 0) {
        return Err(EncodingError::InvalidFormat(
            "invalid unused bits count".to_string(),
        ));
    }

    let total = octets.len() * 8 - unused_bits as usize;
    let bits = (0..total)
        .map(|i| octets[i / 8] & (0x80 >> (i % 8)) != 0)
        .collect();
    Ok((bits, consumed))
}

/// Encode a BACnet enumerated value
pub fn encode_enumerated(buffer: &mut Vec<u8>, value: u32) -> Result<()> {
    let len = unsigned_len(value);
    encode_application_tag(buffer, ApplicationTag::Enumerated, len)?;
    buffer.extend_from_slice(&value.to_be_bytes()[4 - len..]);
    Ok(())
}

/// Decode a BACnet enumerated value
pub fn decode_enumerated(data: &[u8]) -> Result<(u32, usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::Enumerated)?;
    Ok((unsigned_from_octets(content)?, consumed))
}

/// Encode a BACnet date, `year` as the full year or 255 for unspecified
pub fn encode_date(buffer: &mut Vec<u8>, year: u16, month: u8, day: u8, weekday: u8) -> Result<()> {
    let year_octet = match year {
        255 => 255,
        1900..=2154 => (year - 1900) as u8,
        _ => return Err(EncodingError::ValueOutOfRange),
    };
    encode_application_tag(buffer, ApplicationTag::Date, 4)?;
    buffer.extend_from_slice(&[year_octet, month, day, weekday]);
    Ok(())
}

/// Decode a BACnet date
pub fn decode_date(data: &[u8]) -> Result<((u16, u8, u8, u8), usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::Date)?;
    let [year, month, day, weekday]: [u8; 4] = content
        .try_into()
        .map_err(|_| EncodingError::InvalidLength)?;
    let year = if year == 255 { 255 } else { 1900 + year as u16 };
    Ok(((year, month, day, weekday), consumed))
}

/// Encode a BACnet time
pub fn encode_time(buffer: &mut Vec<u8>, hour: u8, minute: u8, second: u8, hundredths: u8) -> Result<()> {
    encode_application_tag(buffer, ApplicationTag::Time, 4)?;
    buffer.extend_from_slice(&[hour, minute, second, hundredths]);
    Ok(())
}

/// Decode a BACnet time
pub fn decode_time(data: &[u8]) -> Result<((u8, u8, u8, u8), usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::Time)?;
    let [hour, minute, second, hundredths]: [u8; 4] = content
        .try_into()
        .map_err(|_| EncodingError::InvalidLength)?;
    Ok(((hour, minute, second, hundredths), consumed))
}

/// Pack an object type and instance into the 32 bit wire identifier
pub fn object_id_to_u32(object_type: u16, instance: u32) -> Result<u32> {
    if object_type > 0x3FF || instance > 0x3F_FFFF {
        return Err(EncodingError::ValueOutOfRange);
    }
    Ok(((object_type as u32) << 22) | instance)
}

/// Split a 32 bit wire identifier into object type and instance
pub fn object_id_from_u32(value: u32) -> (u16, u32) {
    ((value >> 22) as u16, value & 0x3F_FFFF)
}

/// Encode a BACnet object identifier
pub fn encode_object_identifier(buffer: &mut Vec<u8>, object_type: u16, instance: u32) -> Result<()> {
    let object_id = object_id_to_u32(object_type, instance)?;
    encode_application_tag(buffer, ApplicationTag::ObjectIdentifier, 4)?;
    buffer.extend_from_slice(&object_id.to_be_bytes());
    Ok(())
}

/// Decode a BACnet object identifier
pub fn decode_object_identifier(data: &[u8]) -> Result<((u16, u32), usize)> {
    let (content, consumed) = application_content(data, ApplicationTag::ObjectIdentifier)?;
    let bytes: [u8; 4] = content
        .try_into()
        .map_err(|_| EncodingError::InvalidLength)?;
    Ok((object_id_from_u32(u32::from_be_bytes(bytes)), consumed))
}

/// Context specific tags used inside service requests
pub mod context {
    use super::*;

    /// Encode a context-specific tag header
    pub fn encode_context_tag(buffer: &mut Vec<u8>, tag_number: u8, length: usize) -> Result<()> {
        if tag_number > 14 {
            return Err(EncodingError::ValueOutOfRange);
        }
        push_tag(buffer, 0x08 | (tag_number << 4), length);
        Ok(())
    }

    /// Decode a context-specific tag header
    ///
    /// Returns the tag number, the content length and the header size.
    pub fn decode_context_tag(data: &[u8]) -> Result<(u8, usize, usize)> {
        match decode_tag(data)? {
            (TagHeader::Context { number, length }, consumed) => Ok((number, length, consumed)),
            _ => Err(EncodingError::InvalidTag),
        }
    }

    /// Encode opening tag for constructed data
    pub fn encode_opening_tag(buffer: &mut Vec<u8>, tag_number: u8) -> Result<()> {
        if tag_number > 14 {
            return Err(EncodingError::ValueOutOfRange);
        }
        buffer.push(0x0E | (tag_number << 4));
        Ok(())
    }

    /// Encode closing tag for constructed data
    pub fn encode_closing_tag(buffer: &mut Vec<u8>, tag_number: u8) -> Result<()> {
        if tag_number > 14 {
            return Err(EncodingError::ValueOutOfRange);
        }
        buffer.push(0x0F | (tag_number << 4));
        Ok(())
    }

    /// True when `data` starts with the opening tag `tag_number`
    pub fn is_opening_tag(data: &[u8], tag_number: u8) -> bool {
        matches!(decode_tag(data), Ok((TagHeader::Opening(n), _)) if n == tag_number)
    }

    /// True when `data` starts with the closing tag `tag_number`
    pub fn is_closing_tag(data: &[u8], tag_number: u8) -> bool {
        matches!(decode_tag(data), Ok((TagHeader::Closing(n), _)) if n == tag_number)
    }

    /// True when `data` starts with the primitive context tag `tag_number`
    pub fn peek_context_tag(data: &[u8], tag_number: u8) -> bool {
        matches!(decode_tag(data), Ok((TagHeader::Context { number, .. }, _)) if number == tag_number)
    }

    pub fn encode_context_unsigned(buffer: &mut Vec<u8>, tag_number: u8, value: u32) -> Result<()> {
        let len = unsigned_len(value);
        encode_context_tag(buffer, tag_number, len)?;
        buffer.extend_from_slice(&value.to_be_bytes()[4 - len..]);
        Ok(())
    }

    pub fn encode_context_enumerated(buffer: &mut Vec<u8>, tag_number: u8, value: u32) -> Result<()> {
        encode_context_unsigned(buffer, tag_number, value)
    }

    pub fn encode_context_object_id(
        buffer: &mut Vec<u8>,
        tag_number: u8,
        object_type: u16,
        instance: u32,
    ) -> Result<()> {
        let object_id = object_id_to_u32(object_type, instance)?;
        encode_context_tag(buffer, tag_number, 4)?;
        buffer.extend_from_slice(&object_id.to_be_bytes());
        Ok(())
    }

    fn context_content(data: &[u8], tag_number: u8) -> Result<(&[u8], usize)> {
        let (number, length, header) = decode_context_tag(data)?;
        if number != tag_number {
            return Err(EncodingError::InvalidTag);
        }
        let content = data
            .get(header..header + length)
            .ok_or(EncodingError::BufferUnderflow)?;
        Ok((content, header + length))
    }

    pub fn decode_context_unsigned(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
        let (content, consumed) = context_content(data, tag_number)?;
        Ok((unsigned_from_octets(content)?, consumed))
    }

    pub fn decode_context_enumerated(data: &[u8], tag_number: u8) -> Result<(u32, usize)> {
        decode_context_unsigned(data, tag_number)
    }

    pub fn decode_context_object_id(data: &[u8], tag_number: u8) -> Result<((u16, u32), usize)> {
        let (content, consumed) = context_content(data, tag_number)?;
        let bytes: [u8; 4] = content
            .try_into()
            .map_err(|_| EncodingError::InvalidLength)?;
        Ok((object_id_from_u32(u32::from_be_bytes(bytes)), consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::context::*;
    use super::*;

    #[test]
    fn test_encode_decode_boolean() {
        let mut buffer = Vec::new();
        encode_boolean(&mut buffer, true).unwrap();
        assert_eq!(buffer, vec![0x11]);
        assert_eq!(decode_boolean(&buffer).unwrap(), (true, 1));

        buffer.clear();
        encode_boolean(&mut buffer, false).unwrap();
        assert_eq!(decode_boolean(&buffer).unwrap(), (false, 1));
    }

    #[test]
    fn test_unsigned_uses_minimal_octets() {
        let cases: [(u32, &[u8]); 5] = [
            (0, &[0x21, 0x00]),
            (255, &[0x21, 0xFF]),
            (1476, &[0x22, 0x05, 0xC4]),
            (0x01_0000, &[0x23, 0x01, 0x00, 0x00]),
            (u32::MAX, &[0x24, 0xFF, 0xFF, 0xFF, 0xFF]),
        ];

        for (value, expected) in cases {
            let mut buffer = Vec::new();
            encode_unsigned(&mut buffer, value).unwrap();
            assert_eq!(buffer, expected);
            assert_eq!(decode_unsigned(&buffer).unwrap(), (value, expected.len()));
        }
    }

    #[test]
    fn test_signed_sign_extension() {
        let mut buffer = Vec::new();
        for value in [-1, -129, 127, -8_388_608, i32::MIN] {
            buffer.clear();
            encode_signed(&mut buffer, value).unwrap();
            assert_eq!(decode_signed(&buffer).unwrap().0, value);
        }
        assert_eq!(signed_from_octets(&[0xFF, 0x7F]).unwrap(), -129);
    }

    #[test]
    fn test_real_wire_format() {
        let mut buffer = Vec::new();
        encode_real(&mut buffer, 1.0).unwrap();
        assert_eq!(buffer, vec![0x44, 0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(decode_real(&buffer).unwrap(), (1.0, 5));
    }

    #[test]
    fn test_real_wrong_length_rejected() {
        let data = [0x43, 0x3F, 0x80, 0x00];
        assert_eq!(decode_real(&data), Err(EncodingError::InvalidLength));
    }

    #[test]
    fn test_character_string_extended_length() {
        let mut buffer = Vec::new();
        encode_character_string(&mut buffer, "BACnet Simulator Device").unwrap();
        assert_eq!(&buffer[..3], &[0x75, 24, 0x00]);

        let (value, consumed) = decode_character_string(&buffer).unwrap();
        assert_eq!(value, "BACnet Simulator Device");
        assert_eq!(consumed, buffer.len());
    }

    #[test]
    fn test_character_string_ucs2_and_latin1() {
        let ucs2 = [0x75, 0x05, 0x04, 0x00, 0x41, 0x00, 0xE9];
        assert_eq!(decode_character_string(&ucs2).unwrap().0, "Aé");

        let latin1 = [0x73, 0x05, 0x42, 0xB0];
        assert_eq!(decode_character_string(&latin1).unwrap().0, "B°");

        let unknown = [0x72, 0x03, 0x41];
        assert!(matches!(
            decode_character_string(&unknown),
            Err(EncodingError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_bit_string_status_flags() {
        let mut buffer = Vec::new();
        encode_bit_string(&mut buffer, &[false, true, false, true]).unwrap();
        assert_eq!(buffer, vec![0x82, 0x04, 0x50]);

        let (bits, consumed) = decode_bit_string(&buffer).unwrap();
        assert_eq!(bits, vec![false, true, false, true]);
        assert_eq!(consumed, 3);
    }

    #[test]
    fn test_object_identifier() {
        let mut buffer = Vec::new();
        encode_object_identifier(&mut buffer, 8, 1001).unwrap();
        assert_eq!(buffer, vec![0xC4, 0x02, 0x00, 0x03, 0xE9]);
        assert_eq!(decode_object_identifier(&buffer).unwrap(), ((8, 1001), 5));

        assert_eq!(
            encode_object_identifier(&mut buffer, 1024, 0),
            Err(EncodingError::ValueOutOfRange)
        );
        assert_eq!(
            encode_object_identifier(&mut buffer, 0, 0x40_0000),
            Err(EncodingError::ValueOutOfRange)
        );
    }

    #[test]
    fn test_date_and_time() {
        let mut buffer = Vec::new();
        encode_date(&mut buffer, 2024, 3, 15, 5).unwrap();
        encode_time(&mut buffer, 14, 30, 0, 0).unwrap();

        let (date, consumed) = decode_date(&buffer).unwrap();
        assert_eq!(date, (2024, 3, 15, 5));
        let (time, _) = decode_time(&buffer[consumed..]).unwrap();
        assert_eq!(time, (14, 30, 0, 0));
    }

    #[test]
    fn test_context_tags() {
        let mut buffer = Vec::new();
        encode_context_object_id(&mut buffer, 0, 0, 5).unwrap();
        encode_context_enumerated(&mut buffer, 1, 85).unwrap();
        encode_opening_tag(&mut buffer, 3).unwrap();
        encode_real(&mut buffer, 42.0).unwrap();
        encode_closing_tag(&mut buffer, 3).unwrap();

        let ((object_type, instance), mut pos) = decode_context_object_id(&buffer, 0).unwrap();
        assert_eq!((object_type, instance), (0, 5));
        let (property, consumed) = decode_context_enumerated(&buffer[pos..], 1).unwrap();
        assert_eq!(property, 85);
        pos += consumed;

        assert!(is_opening_tag(&buffer[pos..], 3));
        assert!(!is_opening_tag(&buffer[pos..], 4));
        assert!(is_closing_tag(&buffer[buffer.len() - 1..], 3));
        assert!(decode_context_unsigned(&buffer, 1).is_err());
    }

    #[test]
    fn test_context_tag_number_limit() {
        let mut buffer = Vec::new();
        assert_eq!(
            encode_context_tag(&mut buffer, 15, 1),
            Err(EncodingError::ValueOutOfRange)
        );
        assert_eq!(decode_tag(&[0xF9]), Err(EncodingError::InvalidTag));
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode_unsigned(&[]), Err(EncodingError::BufferUnderflow));
        assert_eq!(decode_unsigned(&[0x22, 0x05]), Err(EncodingError::BufferUnderflow));
        assert_eq!(decode_tag(&[0x75]), Err(EncodingError::BufferUnderflow));
    }
}
