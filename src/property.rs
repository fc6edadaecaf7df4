//! Tagged property values.
//!
//! A [`TaggedValue`] pairs a BACnet application data type with its value. It is
//! what the dispatcher produces for reads and what a WriteProperty request
//! carries as its payload.

use std::fmt;

use crate::encoding::{
    self, decode_application_tag, decode_tag, ApplicationTag, EncodingError, Result, TagHeader,
};
use crate::object::ObjectIdentifier;

/// BACnet date, `255` marks an unspecified field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Date {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub weekday: u8,
}

/// BACnet time, `255` marks an unspecified field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
}

/// A property value in BACnet's application-tagged shape
#[derive(Debug, Clone, PartialEq)]
pub enum TaggedValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString(Vec<bool>),
    Enumerated(u32),
    Date(Date),
    Time(Time),
    ObjectIdentifier(ObjectIdentifier),
    /// Sequence of values, encoded back to back
    Array(Vec<TaggedValue>),
}

impl TaggedValue {
    /// Append the application-tagged encoding to `buffer`
    pub fn encode(&self, buffer: &mut Vec<u8>) -> Result<()> {
        match self {
            TaggedValue::Null => encoding::encode_null(buffer),
            TaggedValue::Boolean(value) => encoding::encode_boolean(buffer, *value),
            TaggedValue::Unsigned(value) => encoding::encode_unsigned(buffer, *value),
            TaggedValue::Signed(value) => encoding::encode_signed(buffer, *value),
            TaggedValue::Real(value) => encoding::encode_real(buffer, *value),
            TaggedValue::Double(value) => encoding::encode_double(buffer, *value),
            TaggedValue::OctetString(value) => encoding::encode_octet_string(buffer, value),
            TaggedValue::CharacterString(value) => encoding::encode_character_string(buffer, value),
            TaggedValue::BitString(bits) => encoding::encode_bit_string(buffer, bits),
            TaggedValue::Enumerated(value) => encoding::encode_enumerated(buffer, *value),
            TaggedValue::Date(date) => {
                encoding::encode_date(buffer, date.year, date.month, date.day, date.weekday)
            }
            TaggedValue::Time(time) => {
                encoding::encode_time(buffer, time.hour, time.minute, time.second, time.hundredths)
            }
            TaggedValue::ObjectIdentifier(id) => {
                encoding::encode_object_identifier(buffer, id.object_type.into(), id.instance)
            }
            TaggedValue::Array(values) => values.iter().try_for_each(|value| value.encode(buffer)),
        }
    }

    /// Decode one application-tagged value from the start of `data`
    pub fn decode(data: &[u8]) -> Result<(TaggedValue, usize)> {
        let (tag, _, _) = decode_application_tag(data)?;
        let decoded = match tag {
            ApplicationTag::Null => (TaggedValue::Null, 1),
            ApplicationTag::Boolean => {
                let (value, consumed) = encoding::decode_boolean(data)?;
                (TaggedValue::Boolean(value), consumed)
            }
            ApplicationTag::UnsignedInt => {
                let (value, consumed) = encoding::decode_unsigned(data)?;
                (TaggedValue::Unsigned(value), consumed)
            }
            ApplicationTag::SignedInt => {
                let (value, consumed) = encoding::decode_signed(data)?;
                (TaggedValue::Signed(value), consumed)
            }
            ApplicationTag::Real => {
                let (value, consumed) = encoding::decode_real(data)?;
                (TaggedValue::Real(value), consumed)
            }
            ApplicationTag::Double => {
                let (value, consumed) = encoding::decode_double(data)?;
                (TaggedValue::Double(value), consumed)
            }
            ApplicationTag::OctetString => {
                let (value, consumed) = encoding::decode_octet_string(data)?;
                (TaggedValue::OctetString(value), consumed)
            }
            ApplicationTag::CharacterString => {
                let (value, consumed) = encoding::decode_character_string(data)?;
                (TaggedValue::CharacterString(value), consumed)
            }
            ApplicationTag::BitString => {
                let (bits, consumed) = encoding::decode_bit_string(data)?;
                (TaggedValue::BitString(bits), consumed)
            }
            ApplicationTag::Enumerated => {
                let (value, consumed) = encoding::decode_enumerated(data)?;
                (TaggedValue::Enumerated(value), consumed)
            }
            ApplicationTag::Date => {
                let ((year, month, day, weekday), consumed) = encoding::decode_date(data)?;
                let date = Date {
                    year,
                    month,
                    day,
                    weekday,
                };
                (TaggedValue::Date(date), consumed)
            }
            ApplicationTag::Time => {
                let ((hour, minute, second, hundredths), consumed) = encoding::decode_time(data)?;
                let time = Time {
                    hour,
                    minute,
                    second,
                    hundredths,
                };
                (TaggedValue::Time(time), consumed)
            }
            ApplicationTag::ObjectIdentifier => {
                let ((object_type, instance), consumed) = encoding::decode_object_identifier(data)?;
                let id = ObjectIdentifier::new(object_type.into(), instance);
                (TaggedValue::ObjectIdentifier(id), consumed)
            }
        };
        Ok(decoded)
    }

    /// Decode application-tagged values until `data` is exhausted or a
    /// context tag (such as a closing tag) is reached
    ///
    /// Returns the values and the number of bytes consumed.
    pub fn decode_all(data: &[u8]) -> Result<(Vec<TaggedValue>, usize)> {
        let mut values = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            match decode_tag(&data[pos..])? {
                (TagHeader::Application { .. }, _) => {
                    let (value, consumed) = TaggedValue::decode(&data[pos..])?;
                    values.push(value);
                    pos += consumed;
                }
                _ => break,
            }
        }

        if values.is_empty() {
            return Err(EncodingError::InvalidFormat(
                "expected at least one application tagged value".to_string(),
            ));
        }
        Ok((values, pos))
    }

    /// Human readable rendering used in logs
    pub fn as_display_string(&self) -> String {
        match self {
            TaggedValue::Null => "Null".to_string(),
            TaggedValue::Boolean(b) => (if *b { "True" } else { "False" }).to_string(),
            TaggedValue::Unsigned(u) => u.to_string(),
            TaggedValue::Signed(i) => i.to_string(),
            TaggedValue::Real(f) => format!("{:.2}", f),
            TaggedValue::Double(d) => format!("{:.2}", d),
            TaggedValue::OctetString(bytes) => hex::encode(bytes),
            TaggedValue::CharacterString(s) => s.clone(),
            TaggedValue::BitString(bits) => {
                let bit_str: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
                format!("Bits({})", bit_str)
            }
            TaggedValue::Enumerated(e) => format!("Enum({})", e),
            TaggedValue::Date(d) => {
                format!("{:04}-{:02}-{:02} (DoW:{})", d.year, d.month, d.day, d.weekday)
            }
            TaggedValue::Time(t) => {
                format!("{:02}:{:02}:{:02}.{:02}", t.hour, t.minute, t.second, t.hundredths)
            }
            TaggedValue::ObjectIdentifier(id) => id.to_string(),
            TaggedValue::Array(values) => {
                let items: Vec<String> = values.iter().map(TaggedValue::as_display_string).collect();
                format!("[{}]", items.join(", "))
            }
        }
    }

    /// Check if this is a numeric value
    pub fn is_numeric(&self) -> bool {
        self.as_numeric().is_some()
    }

    /// Numeric view of the value; enumerations count as numbers
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            TaggedValue::Real(f) => Some(*f as f64),
            TaggedValue::Double(d) => Some(*d),
            TaggedValue::Unsigned(u) => Some(*u as f64),
            TaggedValue::Signed(i) => Some(*i as f64),
            TaggedValue::Enumerated(e) => Some(*e as f64),
            _ => None,
        }
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_display_string())
    }
}
