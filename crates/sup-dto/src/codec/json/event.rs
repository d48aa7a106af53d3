//! Event-level JSON reading.
//!
//! `serde_json` tokenizes the input and drives a [`serde::de::Visitor`] that
//! forwards every token to a [`JsonHandler`] as it is read, without building
//! an intermediate document. A handler error aborts the parse and is returned
//! unchanged.
//!
//! The visitor recurses once per nesting level. `serde_json`'s own recursion
//! limit is lifted and the stack grows on demand through `serde_stacker`;
//! nesting is capped at [`MAX_JSON_DEPTH`] instead.

use std::fmt;

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};

use crate::error::{Error, Result};
use crate::limits::MAX_JSON_DEPTH;

/// Receives JSON tokens in document order.
pub trait JsonHandler {
    fn null(&mut self) -> Result<()>;

    fn bool(&mut self, value: bool) -> Result<()>;

    /// A negative integer.
    fn int(&mut self, value: i64) -> Result<()>;

    /// A non-negative integer.
    fn uint(&mut self, value: u64) -> Result<()>;

    /// A number with a fraction or exponent, or one too large for `u64`.
    fn float(&mut self, value: f64) -> Result<()>;

    fn string(&mut self, value: &str) -> Result<()>;

    fn start_object(&mut self) -> Result<()>;

    fn key(&mut self, key: &str) -> Result<()>;

    fn end_object(&mut self) -> Result<()>;

    fn start_array(&mut self) -> Result<()>;

    fn end_array(&mut self) -> Result<()>;
}

struct Sink<'h, H> {
    handler: &'h mut H,
    depth: usize,
    failure: Option<Error>,
}

impl<H: JsonHandler> Sink<'_, H> {
    fn emit<E: de::Error>(&mut self, event: impl FnOnce(&mut H) -> Result<()>) -> Result<(), E> {
        event(self.handler).map_err(|err| self.fail(err))
    }

    fn enter<E: de::Error>(&mut self) -> Result<(), E> {
        self.depth += 1;
        if self.depth > MAX_JSON_DEPTH {
            return Err(self.fail(Error::LengthExceedsLimit {
                field: "JSON nesting depth",
                len: self.depth as u64,
                max: MAX_JSON_DEPTH as u64,
            }));
        }
        Ok(())
    }

    fn fail<E: de::Error>(&mut self, err: Error) -> E {
        let message = err.to_string();
        self.failure = Some(err);
        E::custom(message)
    }
}

struct EventSeed<'s, 'h, H> {
    sink: &'s mut Sink<'h, H>,
}

impl<'de, H: JsonHandler> DeserializeSeed<'de> for EventSeed<'_, '_, H> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de, H: JsonHandler> Visitor<'de> for EventSeed<'_, '_, H> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("any JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<(), E> {
        self.sink.emit(|h| h.null())
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<(), E> {
        self.sink.emit(|h| h.bool(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<(), E> {
        match u64::try_from(value) {
            Ok(value) => self.sink.emit(|h| h.uint(value)),
            Err(_) => self.sink.emit(|h| h.int(value)),
        }
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<(), E> {
        self.sink.emit(|h| h.uint(value))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<(), E> {
        self.sink.emit(|h| h.float(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<(), E> {
        self.sink.emit(|h| h.string(value))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<(), A::Error> {
        self.sink.enter::<A::Error>()?;
        self.sink.emit::<A::Error>(|h| h.start_array())?;
        while seq
            .next_element_seed(EventSeed {
                sink: &mut *self.sink,
            })?
            .is_some()
        {}
        self.sink.depth -= 1;
        self.sink.emit(|h| h.end_array())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<(), A::Error> {
        self.sink.enter::<A::Error>()?;
        self.sink.emit::<A::Error>(|h| h.start_object())?;
        while map
            .next_key_seed(KeySeed {
                sink: &mut *self.sink,
            })?
            .is_some()
        {
            map.next_value_seed(EventSeed {
                sink: &mut *self.sink,
            })?;
        }
        self.sink.depth -= 1;
        self.sink.emit(|h| h.end_object())
    }
}

struct KeySeed<'s, 'h, H> {
    sink: &'s mut Sink<'h, H>,
}

impl<'de, H: JsonHandler> DeserializeSeed<'de> for KeySeed<'_, '_, H> {
    type Value = ();

    fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<(), D::Error> {
        deserializer.deserialize_str(self)
    }
}

impl<'de, H: JsonHandler> Visitor<'de> for KeySeed<'_, '_, H> {
    type Value = ();

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("an object key")
    }

    fn visit_str<E: de::Error>(self, key: &str) -> Result<(), E> {
        self.sink.emit(|h| h.key(key))
    }
}

/// Feeds every token of `input` to `handler`.
///
/// The input must hold exactly one JSON document nested at most
/// [`MAX_JSON_DEPTH`] levels deep.
pub fn parse_events<H: JsonHandler>(input: &str, handler: &mut H) -> Result<()> {
    let mut deserializer = serde_json::Deserializer::from_str(input);
    deserializer.disable_recursion_limit();
    let mut sink = Sink {
        handler,
        depth: 0,
        failure: None,
    };
    let outcome = EventSeed { sink: &mut sink }
        .deserialize(serde_stacker::Deserializer::new(&mut deserializer));
    if let Some(err) = sink.failure {
        return Err(err);
    }
    outcome.map_err(|err| Error::Json(err.to_string()))?;
    deserializer
        .end()
        .map_err(|err| Error::Json(err.to_string()))
}
