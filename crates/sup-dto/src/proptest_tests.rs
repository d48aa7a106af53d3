//! Property-based tests for codec round-trips and conversion bounds.

use proptest::prelude::*;

use crate::codec::binary::{
    any_type_from_binary, any_type_to_binary, any_value_from_binary, any_value_to_binary,
};
use crate::codec::json::{
    any_type_from_json_string, any_type_to_json_string, any_value_from_json_string,
    any_value_to_json_string, typed_value_from_json_string, values_to_json_string,
};
use crate::model::{convert, AnyValue, Char8};

/// Strategy for generating scalar values of every kind.
fn arb_scalar() -> impl Strategy<Value = AnyValue> {
    prop_oneof![
        any::<bool>().prop_map(AnyValue::from),
        any::<u8>().prop_map(|c| AnyValue::from(Char8(c))),
        any::<i8>().prop_map(AnyValue::from),
        any::<u8>().prop_map(AnyValue::from),
        any::<i16>().prop_map(AnyValue::from),
        any::<u16>().prop_map(AnyValue::from),
        any::<i32>().prop_map(AnyValue::from),
        any::<u32>().prop_map(AnyValue::from),
        any::<i64>().prop_map(AnyValue::from),
        any::<u64>().prop_map(AnyValue::from),
        // Exactly representable, so text forms read back to the same bits.
        (-4096i32..4096).prop_map(|i| AnyValue::from(i as f32 / 16.0)),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(AnyValue::from),
        ".*".prop_map(AnyValue::from),
    ]
}

/// Strategy for generating value trees of nested structs and arrays.
fn arb_value() -> impl Strategy<Value = AnyValue> {
    arb_scalar().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(|members| {
                AnyValue::struct_from(
                    "S",
                    members
                        .into_iter()
                        .enumerate()
                        .map(|(i, member)| (format!("m{i}"), member)),
                )
                .unwrap()
            }),
            (inner.clone(), 1..5usize)
                .prop_map(|(element, n)| AnyValue::array_from(vec![element; n], "A").unwrap()),
            (inner, 0..4usize).prop_map(|(element, n)| {
                let mut array = AnyValue::array(element.get_type(), "").unwrap();
                for _ in 0..n {
                    array.add_element(element.clone()).unwrap();
                }
                array
            }),
        ]
    })
}

proptest! {
    #[test]
    fn binary_value_roundtrip(value in arb_value()) {
        let bytes = any_value_to_binary(&value);
        let decoded = any_value_from_binary(&bytes).unwrap();
        prop_assert_eq!(decoded.get_type(), value.get_type());
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn binary_type_roundtrip(value in arb_value()) {
        let ty = value.get_type();
        let decoded = any_type_from_binary(&any_type_to_binary(&ty)).unwrap();
        prop_assert_eq!(decoded, ty);
    }

    #[test]
    fn json_reversible_roundtrip(value in arb_value(), pretty in any::<bool>()) {
        let text = any_value_to_json_string(&value, pretty).unwrap();
        let parsed = any_value_from_json_string(&text, None).unwrap();
        prop_assert_eq!(parsed.get_type(), value.get_type());
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn json_type_roundtrip(value in arb_value(), pretty in any::<bool>()) {
        let ty = value.get_type();
        let text = any_type_to_json_string(&ty, pretty).unwrap();
        prop_assert_eq!(any_type_from_json_string(&text, None).unwrap(), ty);
    }

    #[test]
    fn json_typed_roundtrip(value in arb_value()) {
        let text = values_to_json_string(&value, false).unwrap();
        let parsed = typed_value_from_json_string(&value.get_type(), &text).unwrap();
        prop_assert_eq!(parsed, value);
    }

    /// Arbitrary bytes should not crash, only return errors.
    #[test]
    fn arbitrary_bytes_dont_crash(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = any_value_from_binary(&bytes);
        let _ = any_type_from_binary(&bytes);
    }

    /// Every strict prefix of a value blob is rejected.
    #[test]
    fn truncated_binary_returns_error(value in arb_value()) {
        let bytes = any_value_to_binary(&value);
        for len in 0..bytes.len() {
            prop_assert!(any_value_from_binary(&bytes[..len]).is_err());
        }
    }

    /// Mutated blobs return errors or values, never panic.
    #[test]
    fn mutated_binary_returns_error_or_value(
        value in arb_value(),
        mutation_idx in any::<usize>(),
        mutation_val in any::<u8>()
    ) {
        let mut bytes = any_value_to_binary(&value);
        let idx = mutation_idx % bytes.len();
        bytes[idx] = mutation_val;
        let _ = any_value_from_binary(&bytes);
    }

    #[test]
    fn integer_narrowing_checks_range(i in any::<i64>()) {
        prop_assert_eq!(convert::<i8, i64>(i).ok(), i8::try_from(i).ok());
        prop_assert_eq!(convert::<u16, i64>(i).ok(), u16::try_from(i).ok());
        prop_assert_eq!(convert::<u64, i64>(i).ok(), u64::try_from(i).ok());
        prop_assert_eq!(convert::<i64, i64>(i).unwrap(), i);
    }

    #[test]
    fn unsigned_to_signed_checks_range(u in any::<u64>()) {
        prop_assert_eq!(convert::<i64, u64>(u).ok(), i64::try_from(u).ok());
        prop_assert_eq!(convert::<i32, u64>(u).ok(), i32::try_from(u).ok());
    }

    #[test]
    fn float_to_int_truncates_in_range(f in any::<f64>()) {
        let expected = (!f.is_nan() && f.trunc() >= -2147483648.0 && f.trunc() <= 2147483647.0)
            .then(|| f.trunc() as i32);
        prop_assert_eq!(convert::<i32, f64>(f).ok(), expected);
    }
}
