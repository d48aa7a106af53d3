//! The reversible `[{"encoding"}, {"datatype"}, {"instance"}]` form.
//!
//! The envelope is split with `serde` into borrowed raw parts; the datatype
//! and instance parts are then streamed through the type and value builders.

use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::trace;

use super::event::parse_events;
use super::type_parser::TypeBuilder;
use super::value_parser::ValueBuilder;
use super::JSON_ENCODING;
use crate::error::{Error, Result};
use crate::model::{AnyType, AnyTypeRegistry, AnyValue};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EncodingPart<'a> {
    #[serde(borrow)]
    encoding: &'a RawValue,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DatatypePart<'a> {
    #[serde(borrow)]
    datatype: &'a RawValue,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InstancePart<'a> {
    #[serde(borrow)]
    instance: &'a RawValue,
}

type Envelope<'a> = (EncodingPart<'a>, DatatypePart<'a>, InstancePart<'a>);

/// Parses a type from its JSON type form.
pub(crate) fn parse_type(input: &str, registry: Option<&AnyTypeRegistry>) -> Result<AnyType> {
    let mut builder = TypeBuilder::new(registry);
    parse_events(input, &mut builder)?;
    builder.finish()
}

/// Parses a values-only document against a known type.
pub(crate) fn parse_typed_value(ty: &AnyType, input: &str) -> Result<AnyValue> {
    let mut builder = ValueBuilder::new(ty);
    parse_events(input, &mut builder)?;
    builder.finish()
}

/// Parses the reversible form.
pub(crate) fn parse_reversible(
    input: &str,
    registry: Option<&AnyTypeRegistry>,
) -> Result<AnyValue> {
    let mut deserializer = serde_json::Deserializer::from_str(input);
    // Raw parts are scanned without recursion; depth is checked per part.
    deserializer.disable_recursion_limit();
    let (encoding, datatype, instance) = <Envelope<'_>>::deserialize(&mut deserializer)
        .map_err(|err| Error::Json(err.to_string()))?;
    deserializer
        .end()
        .map_err(|err| Error::Json(err.to_string()))?;

    let found: String = serde_json::from_str(encoding.encoding.get())
        .map_err(|_| Error::UnsupportedEncoding {
            found: encoding.encoding.get().to_string(),
        })?;
    if found != JSON_ENCODING {
        return Err(Error::UnsupportedEncoding { found });
    }
    trace!(encoding = %found, "envelope encoding accepted");

    let ty = parse_type(datatype.datatype.get(), registry)?;
    trace!(kind = %ty.kind(), "envelope datatype parsed");

    let value = parse_typed_value(&ty, instance.instance.get())?;
    trace!("envelope instance parsed");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reversible(datatype: &str, instance: &str) -> String {
        format!(
            r#"[{{"encoding":"{JSON_ENCODING}"}},{{"datatype":{datatype}}},{{"instance":{instance}}}]"#
        )
    }

    #[test]
    fn test_parse_envelope() {
        let input = reversible(r#"{"type":"int16"}"#, "-12");
        assert_eq!(parse_reversible(&input, None).unwrap(), AnyValue::from(-12i16));
    }

    #[test]
    fn test_encoding_must_match_exactly() {
        for encoding in ["sup-dto/v1.1/JSON", "", "SUP-DTO/V1.0/JSON"] {
            let input = format!(
                r#"[{{"encoding":"{encoding}"}},{{"datatype":{{"type":"bool"}}}},{{"instance":true}}]"#
            );
            assert!(matches!(
                parse_reversible(&input, None),
                Err(Error::UnsupportedEncoding { found }) if found == encoding
            ));
        }
        let input = r#"[{"encoding":1},{"datatype":{"type":"bool"}},{"instance":true}]"#;
        assert!(matches!(
            parse_reversible(input, None),
            Err(Error::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_envelope_shape() {
        let parts = [
            format!(r#"[{{"encoding":"{JSON_ENCODING}"}},{{"datatype":{{"type":"bool"}}}}]"#),
            format!(
                r#"[{{"datatype":{{"type":"bool"}}}},{{"encoding":"{JSON_ENCODING}"}},{{"instance":true}}]"#
            ),
            format!(
                r#"[{{"encoding":"{JSON_ENCODING}","x":1}},{{"datatype":{{"type":"bool"}}}},{{"instance":true}}]"#
            ),
            format!("{},1", reversible(r#"{"type":"bool"}"#, "true")),
        ];
        for input in parts {
            assert!(
                matches!(parse_reversible(&input, None), Err(Error::Json(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_instance_must_match_datatype() {
        let input = reversible(r#"{"type":"uint8"}"#, r#""x""#);
        assert!(parse_reversible(&input, None).is_err());
        let input = reversible(r#"{"type":"Missing"}"#, "1");
        assert!(matches!(
            parse_reversible(&input, None),
            Err(Error::UnresolvedType { .. })
        ));
    }
}
