//! Compact binary encoding.
//!
//! A type blob is `ANYTYPE_TOKEN, <type>`. A value blob is
//! `ANYTYPE_TOKEN, <type>, ANYVALUE_TOKEN, <value>`, so it can be decoded
//! without any out-of-band schema.

mod parse;
mod serialize;

pub use parse::BinaryParser;
pub use serialize::{write_type, write_value};

use crate::codec::primitives::Writer;
use crate::error::Result;
use crate::model::{AnyType, AnyValue, TypeKind, SCALAR_KINDS};

pub const EMPTY: u8 = 0x00;
pub const BOOL: u8 = 0x01;
pub const CHAR8: u8 = 0x02;
pub const INT8: u8 = 0x03;
pub const UINT8: u8 = 0x04;
pub const INT16: u8 = 0x05;
pub const UINT16: u8 = 0x06;
pub const INT32: u8 = 0x07;
pub const UINT32: u8 = 0x08;
pub const INT64: u8 = 0x09;
pub const UINT64: u8 = 0x0A;
pub const FLOAT32: u8 = 0x0B;
pub const FLOAT64: u8 = 0x0C;
/// String scalar; also introduces member names in struct types.
pub const STRING: u8 = 0x0D;
pub const START_STRUCT: u8 = 0x20;
pub const END_STRUCT: u8 = 0x21;
pub const START_ARRAY: u8 = 0x22;
pub const END_ARRAY: u8 = 0x23;
pub const ANYVALUE_TOKEN: u8 = 0xE0;
pub const ANYTYPE_TOKEN: u8 = 0xE1;

/// Returns the token of a scalar kind (`EMPTY` for non-scalar kinds).
pub fn scalar_token(kind: TypeKind) -> u8 {
    SCALAR_KINDS
        .iter()
        .position(|k| *k == kind)
        .map_or(EMPTY, |i| i as u8 + BOOL)
}

/// Returns the scalar kind of a token.
pub fn scalar_kind(token: u8) -> Option<TypeKind> {
    let index = token.checked_sub(BOOL)?;
    SCALAR_KINDS.get(usize::from(index)).copied()
}

/// Encodes a type as a type blob.
pub fn any_type_to_binary(ty: &AnyType) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_byte(ANYTYPE_TOKEN);
    write_type(&mut writer, ty);
    writer.into_bytes()
}

/// Encodes a value together with its type.
pub fn any_value_to_binary(value: &AnyValue) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.write_byte(ANYTYPE_TOKEN);
    write_type(&mut writer, &value.get_type());
    writer.write_byte(ANYVALUE_TOKEN);
    write_value(&mut writer, value);
    writer.into_bytes()
}

/// Decodes a type blob; the whole input must be consumed.
pub fn any_type_from_binary(data: &[u8]) -> Result<AnyType> {
    let mut parser = BinaryParser::new(data);
    parser.expect_token(ANYTYPE_TOKEN, "type section")?;
    let ty = parser.parse_type()?;
    parser.finish()?;
    Ok(ty)
}

/// Decodes a value blob; the whole input must be consumed.
///
/// String payloads and all names must be valid UTF-8. Other bytes are
/// rejected with [`Error::InvalidUtf8`](crate::error::Error::InvalidUtf8)
/// rather than decoded lossily.
pub fn any_value_from_binary(data: &[u8]) -> Result<AnyValue> {
    let mut parser = BinaryParser::new(data);
    parser.expect_token(ANYTYPE_TOKEN, "type section")?;
    let ty = parser.parse_type()?;
    parser.expect_token(ANYVALUE_TOKEN, "value section")?;
    let value = parser.parse_value(&ty)?;
    parser.finish()?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Char8, Scalar};

    fn sample() -> AnyValue {
        let mut inner = AnyValue::structure("Inner");
        inner
            .add_member("flag", true.into())
            .unwrap()
            .add_member("letter", Char8(b'z').into())
            .unwrap();
        let mut list = AnyValue::array(AnyType::INT64, "Longs").unwrap();
        list.add_element((-5i64).into())
            .unwrap()
            .add_element(i64::MAX.into())
            .unwrap();
        let mut value = AnyValue::structure("Outer");
        value
            .add_member("name", "héllo".into())
            .unwrap()
            .add_member("inner", inner)
            .unwrap()
            .add_member("list", list)
            .unwrap()
            .add_member("f", 1.25f32.into())
            .unwrap()
            .add_member("d", (-2.5f64).into())
            .unwrap()
            .add_member("u16", u16::MAX.into())
            .unwrap();
        value
    }

    #[test]
    fn test_token_table() {
        assert_eq!(scalar_token(TypeKind::Bool), 0x01);
        assert_eq!(scalar_token(TypeKind::Int32), 0x07);
        assert_eq!(scalar_token(TypeKind::String), 0x0D);
        assert_eq!(scalar_token(TypeKind::Struct), EMPTY);
        assert_eq!(scalar_kind(0x0A), Some(TypeKind::UInt64));
        assert_eq!(scalar_kind(0x00), None);
        assert_eq!(scalar_kind(0x0E), None);
    }

    #[test]
    fn test_fixed_int32_array_type_bytes() {
        let ty = AnyType::array(5, AnyType::INT32, "").unwrap();
        let bytes = any_type_to_binary(&ty);
        assert_eq!(bytes, vec![0xE1, 0x22, 0x00, 0x05, 0x07, 0x23]);
        assert_eq!(any_type_from_binary(&bytes).unwrap(), ty);
    }

    #[test]
    fn test_struct_type_bytes() {
        let ty = AnyType::struct_from("P", [("x", AnyType::UINT8)]).unwrap();
        assert_eq!(
            any_type_to_binary(&ty),
            vec![0xE1, 0x20, 1, b'P', 0x0D, 1, b'x', 0x04, 0x21]
        );
    }

    #[test]
    fn test_value_roundtrip() {
        let value = sample();
        let bytes = any_value_to_binary(&value);
        let decoded = any_value_from_binary(&bytes).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(decoded.get_type(), value.get_type());
        assert!(decoded["list[1]"].is_locked());
    }

    #[test]
    fn test_scalar_and_empty_roundtrip() {
        for value in [
            AnyValue::empty(),
            AnyValue::from(Scalar::UInt64(u64::MAX)),
            AnyValue::from(i8::MIN),
            AnyValue::from(String::new()),
        ] {
            let bytes = any_value_to_binary(&value);
            assert_eq!(any_value_from_binary(&bytes).unwrap(), value);
        }
        assert_eq!(
            any_value_to_binary(&AnyValue::from(0x0102i16)),
            vec![0xE1, 0x05, 0xE0, 0x05, 0x02, 0x01]
        );
    }

    #[test]
    fn test_long_string_size() {
        let text = "x".repeat(300);
        let bytes = any_value_to_binary(&AnyValue::from(text.as_str()));
        assert_eq!(&bytes[..5], &[0xE1, 0x0D, 0xE0, 0x0D, 0xFF]);
        assert_eq!(any_value_from_binary(&bytes).unwrap(), AnyValue::from(text));
    }

    #[test]
    fn test_wrong_leading_token() {
        let ty = AnyType::UINT8;
        let mut bytes = any_type_to_binary(&ty);
        bytes[0] = ANYVALUE_TOKEN;
        assert!(matches!(
            any_type_from_binary(&bytes),
            Err(Error::UnexpectedToken { token: 0xE0, .. })
        ));
        assert!(matches!(
            any_value_from_binary(&any_type_to_binary(&ty)),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut bytes = any_value_to_binary(&sample());
        bytes.push(0);
        assert!(matches!(
            any_value_from_binary(&bytes),
            Err(Error::TrailingBytes { remaining: 1 })
        ));

        let mut parser = BinaryParser::new(&bytes);
        parser.expect_token(ANYTYPE_TOKEN, "type").unwrap();
        let ty = parser.parse_type().unwrap();
        parser.expect_token(ANYVALUE_TOKEN, "value").unwrap();
        parser.parse_value(&ty).unwrap();
        assert!(!parser.is_finished());
    }

    #[test]
    fn test_every_truncation_fails() {
        let bytes = any_value_to_binary(&sample());
        for len in 0..bytes.len() {
            let err = any_value_from_binary(&bytes[..len]).unwrap_err();
            assert_eq!(err.kind(), crate::error::ErrorKind::ParseError, "len {len}");
        }
    }

    #[test]
    fn test_value_must_match_type() {
        // Type says uint8, value carries an int8 token.
        let bytes = [0xE1, 0x04, 0xE0, 0x03, 0x01];
        assert!(matches!(
            any_value_from_binary(&bytes),
            Err(Error::TypeMismatch { .. })
        ));

        // Fixed array of 2 with a count of 1.
        let bytes = [0xE1, 0x22, 0x00, 0x02, 0x04, 0x23, 0xE0, 0x22, 0x00, 0x01, 0x04, 0x07, 0x23];
        assert!(matches!(
            any_value_from_binary(&bytes),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_type_streams() {
        // Struct member with an empty type.
        let bytes = [0xE1, 0x20, 0x00, 0x0D, 0x01, b'a', 0x00, 0x21];
        assert!(matches!(
            any_type_from_binary(&bytes),
            Err(Error::Invalid(inner)) if matches!(*inner, Error::EmptyMember { .. })
        ));

        // Array with an empty element type.
        let bytes = [0xE1, 0x22, 0x00, 0x01, 0x00, 0x23];
        assert!(matches!(any_type_from_binary(&bytes), Err(Error::Invalid(_))));

        // Unknown token.
        let bytes = [0xE1, 0x42];
        assert!(matches!(
            any_type_from_binary(&bytes),
            Err(Error::UnexpectedToken { token: 0x42, .. })
        ));

        // Invalid bool payload.
        let bytes = [0xE1, 0x01, 0xE0, 0x01, 0x02];
        assert!(matches!(
            any_value_from_binary(&bytes),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_invalid_utf8_string_rejected() {
        let bytes = [ANYTYPE_TOKEN, STRING, ANYVALUE_TOKEN, 0x02, 0xC3, 0x28];
        assert!(matches!(
            any_value_from_binary(&bytes),
            Err(Error::InvalidUtf8 { field: "string" })
        ));
        let bytes = [ANYTYPE_TOKEN, STRING, ANYVALUE_TOKEN, 0x02, 0xC3, 0xA9];
        assert_eq!(any_value_from_binary(&bytes).unwrap(), AnyValue::from("é"));
    }

    #[test]
    fn test_deepest_accepted_value() {
        let mut ty = AnyType::UINT32;
        for _ in 0..crate::limits::MAX_BINARY_DEPTH - 1 {
            ty = AnyType::struct_from("Level", [("inner", ty)]).unwrap();
        }
        let value = AnyValue::from_type(&ty);
        let bytes = any_value_to_binary(&value);
        let decoded = any_value_from_binary(&bytes).unwrap();
        assert!(decoded == value);
        assert!(decoded.get_type() == ty);

        let copy = decoded.clone();
        drop(decoded);
        assert!(copy == value);
    }

    #[test]
    fn test_decoded_arrays_share_element_type() {
        let row = AnyValue::array_from(vec![1i16.into(), 2i16.into()], "Row").unwrap();
        let grid = AnyValue::array_from(vec![row.clone(), row], "Grid").unwrap();
        let decoded = any_value_from_binary(&any_value_to_binary(&grid)).unwrap();
        let rows = decoded.as_array().unwrap().elements();
        let first = rows[0].as_array().unwrap().array_type().element_type();
        let second = rows[1].as_array().unwrap().array_type().element_type();
        assert!(std::ptr::eq(first, second));
        assert_eq!(decoded, grid);
    }

    #[test]
    fn test_nesting_limit() {
        let depth = crate::limits::MAX_BINARY_DEPTH + 1;
        let mut bytes = vec![ANYTYPE_TOKEN];
        for _ in 0..depth {
            bytes.extend_from_slice(&[START_ARRAY, 0x00, 0x01]);
        }
        bytes.push(INT8);
        bytes.extend(std::iter::repeat_n(END_ARRAY, depth));
        assert!(matches!(
            any_type_from_binary(&bytes),
            Err(Error::LengthExceedsLimit { field: "nesting depth", .. })
        ));
    }
}
