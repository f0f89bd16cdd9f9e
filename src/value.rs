//! A codec-agnostic dynamic value.
//!
//! Every message payload that crosses the wire is a `Value`: the common
//! denominator between the msgpack and JSON codecs. Typed Rust data
//! (`ParameterSpec`, `ServiceSpec`, user RPC arguments) is bridged to and
//! from `Value` generically through [`to_value`] and [`from_value`], the
//! same way `serde_json::Value` bridges typed structs to JSON without a
//! bespoke conversion impl per type.
//!
//! Two extensions ride on top of the plain data model so that datetimes and
//! generator/stream markers survive both codecs identically: a `Value` that
//! serializes as a single-entry map with key `"__datetime__"` decodes back
//! into [`Value::Datetime`], and one with key `"__generator__"` decodes back
//! into [`Value::Stream`].

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use serde::de::{self, Deserialize, DeserializeOwned, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::{Error, Result};

const DATETIME_KEY: &str = "__datetime__";
const GENERATOR_KEY: &str = "__generator__";

/// A dynamically typed value exchanged between services and their clients.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    /// An ordered string-keyed map. Kept ordered (rather than a `HashMap`)
    /// so that encode/decode round-trips are deterministic and kwargs
    /// preserve call-site order.
    Map(Vec<(String, Value)>),
    Datetime(DateTime<Utc>),
    /// A placeholder for a streamed argument or return value. The actual
    /// items travel as separate `StreamStart`/`Data`/`StreamEnd` messages;
    /// this variant only marks the position a stream occupies within a
    /// structured payload.
    Stream,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a key in a `Map` value; `None` for any other variant or a
    /// missing key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "b<{} bytes>", b.len()),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k:?}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Datetime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Stream => write!(f, "<stream>"),
        }
    }
}

// ---- datetime marker encoding ----
//
// `DATETIME_KEY -> 8 big-endian bytes` holding nanoseconds since the Unix
// epoch. This is a from-scratch wire format local to this crate, not a
// reimplementation of any other encoder.

fn encode_datetime_bytes(dt: &DateTime<Utc>) -> Vec<u8> {
    let nanos = dt.timestamp_nanos_opt().unwrap_or(0);
    nanos.to_be_bytes().to_vec()
}

fn decode_datetime_bytes(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let arr: [u8; 8] = bytes.try_into().ok()?;
    let nanos = i64::from_be_bytes(arr);
    let secs = nanos.div_euclid(1_000_000_000);
    let subsec_nanos = nanos.rem_euclid(1_000_000_000) as u32;
    DateTime::from_timestamp(secs, subsec_nanos)
}

/// Extract a byte vector from a `Value`, accepting both `Bytes` (as
/// produced by msgpack, which has a native binary type) and an `Array` of
/// small integers (as produced by JSON, which doesn't).
fn value_as_bytes(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Bytes(b) => Some(b.clone()),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Uint(u) => u8::try_from(*u).ok(),
                Value::Int(i) => u8::try_from(*i).ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Uint(u) => serializer.serialize_u64(*u),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::String(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Datetime(dt) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(DATETIME_KEY, &Value::Bytes(encode_datetime_bytes(dt)))?;
                map.end()
            }
            Value::Stream => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(GENERATOR_KEY, &Value::Null)?;
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a corridor-rpc value")
    }

    fn visit_unit<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Deserialize::deserialize(deserializer)
    }

    fn visit_bool<E>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::Int(v))
    }

    fn visit_i128<E>(self, v: i128) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        i64::try_from(v).map(Value::Int).map_err(de::Error::custom)
    }

    fn visit_u64<E>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::Uint(v))
    }

    fn visit_u128<E>(self, v: u128) -> std::result::Result<Value, E>
    where
        E: de::Error,
    {
        u64::try_from(v).map(Value::Uint).map_err(de::Error::custom)
    }

    fn visit_f64<E>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(v.to_owned()))
    }

    fn visit_string<E>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_bytes<E>(self, v: &[u8]) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E>(self, v: Vec<u8>) -> std::result::Result<Value, E> {
        Ok(Value::Bytes(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            entries.push((k, v));
        }

        if entries.len() == 1 {
            if entries[0].0 == DATETIME_KEY {
                if let Some(b) = value_as_bytes(&entries[0].1) {
                    if let Some(dt) = decode_datetime_bytes(&b) {
                        return Ok(Value::Datetime(dt));
                    }
                }
            }
            if entries[0].0 == GENERATOR_KEY {
                return Ok(Value::Stream);
            }
        }

        Ok(Value::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

/// Convert any `Serialize` type into a [`Value`], the way `serde_json::to_value` does.
pub fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    value
        .serialize(ser::ValueSerializer)
        .map_err(|e| Error::encode(e, "<to_value>"))
}

/// Convert a [`Value`] back into any `Deserialize` type, the way `serde_json::from_value` does.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(de::ValueDeserializer::new(value)).map_err(|e| Error::decode(e, &[]))
}

mod de {
    use super::Value;
    use serde::de::IntoDeserializer;

    // `Value` already implements `Deserialize`; for `from_value` we need a
    // `Deserializer` impl that consumes a `Value` directly. serde's
    // `IntoDeserializer` blanket machinery doesn't apply to a hand-rolled
    // enum, so route through `serde::de::value`'s generic deserializers
    // per variant.
    pub struct ValueDeserializer(Value);

    impl ValueDeserializer {
        pub fn new(value: Value) -> Self {
            ValueDeserializer(value)
        }
    }

    #[derive(Debug)]
    pub struct ValueDeError(String);

    impl std::fmt::Display for ValueDeError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }
    impl std::error::Error for ValueDeError {}
    impl serde::de::Error for ValueDeError {
        fn custom<T: std::fmt::Display>(msg: T) -> Self {
            ValueDeError(msg.to_string())
        }
    }

    impl<'de> serde::Deserializer<'de> for ValueDeserializer {
        type Error = ValueDeError;

        fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: serde::de::Visitor<'de>,
        {
            match self.0 {
                Value::Null => visitor.visit_unit(),
                Value::Bool(b) => visitor.visit_bool(b),
                Value::Int(i) => visitor.visit_i64(i),
                Value::Uint(u) => visitor.visit_u64(u),
                Value::Float(x) => visitor.visit_f64(x),
                Value::String(s) => visitor.visit_string(s),
                Value::Bytes(b) => visitor.visit_byte_buf(b),
                Value::Array(items) => {
                    visitor.visit_seq(serde::de::value::SeqDeserializer::new(items.into_iter().map(ValueDeserializer)))
                }
                Value::Map(entries) => visitor.visit_map(serde::de::value::MapDeserializer::new(
                    entries.into_iter().map(|(k, v)| (k, ValueDeserializer(v))),
                )),
                Value::Datetime(dt) => visitor.visit_string(dt.to_rfc3339()),
                Value::Stream => visitor.visit_unit(),
            }
        }

        fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: serde::de::Visitor<'de>,
        {
            match self.0 {
                Value::Null => visitor.visit_none(),
                other => visitor.visit_some(ValueDeserializer(other)),
            }
        }

        serde::forward_to_deserialize_any! {
            bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
            bytes byte_buf unit unit_struct newtype_struct seq tuple
            tuple_struct map struct enum identifier ignored_any
        }
    }

    impl<'de> IntoDeserializer<'de, ValueDeError> for ValueDeserializer {
        type Deserializer = ValueDeserializer;
        fn into_deserializer(self) -> ValueDeserializer {
            self
        }
    }
}

mod ser {
    use super::Value;
    use serde::ser::{self, Serialize};

    #[derive(Debug)]
    pub struct ValueSerError(String);

    impl std::fmt::Display for ValueSerError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }
    impl std::error::Error for ValueSerError {}
    impl ser::Error for ValueSerError {
        fn custom<T: std::fmt::Display>(msg: T) -> Self {
            ValueSerError(msg.to_string())
        }
    }

    pub struct ValueSerializer;

    impl Serializer for ValueSerializer {
        type Ok = Value;
        type Error = ValueSerError;
        type SerializeSeq = SeqSer;
        type SerializeTuple = SeqSer;
        type SerializeTupleStruct = SeqSer;
        type SerializeTupleVariant = SeqSer;
        type SerializeMap = MapSer;
        type SerializeStruct = MapSer;
        type SerializeStructVariant = MapSer;

        fn serialize_bool(self, v: bool) -> Result<Value, Self::Error> {
            Ok(Value::Bool(v))
        }
        fn serialize_i8(self, v: i8) -> Result<Value, Self::Error> {
            self.serialize_i64(v as i64)
        }
        fn serialize_i16(self, v: i16) -> Result<Value, Self::Error> {
            self.serialize_i64(v as i64)
        }
        fn serialize_i32(self, v: i32) -> Result<Value, Self::Error> {
            self.serialize_i64(v as i64)
        }
        fn serialize_i64(self, v: i64) -> Result<Value, Self::Error> {
            Ok(Value::Int(v))
        }
        fn serialize_u8(self, v: u8) -> Result<Value, Self::Error> {
            self.serialize_u64(v as u64)
        }
        fn serialize_u16(self, v: u16) -> Result<Value, Self::Error> {
            self.serialize_u64(v as u64)
        }
        fn serialize_u32(self, v: u32) -> Result<Value, Self::Error> {
            self.serialize_u64(v as u64)
        }
        fn serialize_u64(self, v: u64) -> Result<Value, Self::Error> {
            Ok(Value::Uint(v))
        }
        fn serialize_f32(self, v: f32) -> Result<Value, Self::Error> {
            self.serialize_f64(v as f64)
        }
        fn serialize_f64(self, v: f64) -> Result<Value, Self::Error> {
            Ok(Value::Float(v))
        }
        fn serialize_char(self, v: char) -> Result<Value, Self::Error> {
            Ok(Value::String(v.to_string()))
        }
        fn serialize_str(self, v: &str) -> Result<Value, Self::Error> {
            Ok(Value::String(v.to_owned()))
        }
        fn serialize_bytes(self, v: &[u8]) -> Result<Value, Self::Error> {
            Ok(Value::Bytes(v.to_vec()))
        }
        fn serialize_none(self) -> Result<Value, Self::Error> {
            Ok(Value::Null)
        }
        fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Value, Self::Error> {
            value.serialize(self)
        }
        fn serialize_unit(self) -> Result<Value, Self::Error> {
            Ok(Value::Null)
        }
        fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, Self::Error> {
            Ok(Value::Null)
        }
        fn serialize_unit_variant(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
        ) -> Result<Value, Self::Error> {
            Ok(Value::String(variant.to_owned()))
        }
        fn serialize_newtype_struct<T: ?Sized + Serialize>(
            self,
            _name: &'static str,
            value: &T,
        ) -> Result<Value, Self::Error> {
            value.serialize(self)
        }
        fn serialize_newtype_variant<T: ?Sized + Serialize>(
            self,
            _name: &'static str,
            _index: u32,
            variant: &'static str,
            value: &T,
        ) -> Result<Value, Self::Error> {
            Ok(Value::Map(vec![(variant.to_owned(), value.serialize(ValueSerializer)?)]))
        }
        fn serialize_seq(self, len: Option<usize>) -> Result<SeqSer, Self::Error> {
            Ok(SeqSer(Vec::with_capacity(len.unwrap_or(0))))
        }
        fn serialize_tuple(self, len: usize) -> Result<SeqSer, Self::Error> {
            self.serialize_seq(Some(len))
        }
        fn serialize_tuple_struct(
            self,
            _name: &'static str,
            len: usize,
        ) -> Result<SeqSer, Self::Error> {
            self.serialize_seq(Some(len))
        }
        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            len: usize,
        ) -> Result<SeqSer, Self::Error> {
            self.serialize_seq(Some(len))
        }
        fn serialize_map(self, _len: Option<usize>) -> Result<MapSer, Self::Error> {
            Ok(MapSer { entries: Vec::new(), pending_key: None })
        }
        fn serialize_struct(
            self,
            _name: &'static str,
            len: usize,
        ) -> Result<MapSer, Self::Error> {
            Ok(MapSer { entries: Vec::with_capacity(len), pending_key: None })
        }
        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            len: usize,
        ) -> Result<MapSer, Self::Error> {
            Ok(MapSer { entries: Vec::with_capacity(len), pending_key: None })
        }
    }

    pub struct SeqSer(Vec<Value>);

    impl ser::SerializeSeq for SeqSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
            self.0.push(value.serialize(ValueSerializer)?);
            Ok(())
        }
        fn end(self) -> Result<Value, Self::Error> {
            Ok(Value::Array(self.0))
        }
    }
    impl ser::SerializeTuple for SeqSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
            ser::SerializeSeq::serialize_element(self, value)
        }
        fn end(self) -> Result<Value, Self::Error> {
            ser::SerializeSeq::end(self)
        }
    }
    impl ser::SerializeTupleStruct for SeqSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
            ser::SerializeSeq::serialize_element(self, value)
        }
        fn end(self) -> Result<Value, Self::Error> {
            ser::SerializeSeq::end(self)
        }
    }
    impl ser::SerializeTupleVariant for SeqSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
            ser::SerializeSeq::serialize_element(self, value)
        }
        fn end(self) -> Result<Value, Self::Error> {
            ser::SerializeSeq::end(self)
        }
    }

    pub struct MapSer {
        entries: Vec<(String, Value)>,
        pending_key: Option<String>,
    }

    impl ser::SerializeMap for MapSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), Self::Error> {
            let key_value = key.serialize(ValueSerializer)?;
            let key_str = match key_value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            self.pending_key = Some(key_str);
            Ok(())
        }
        fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), Self::Error> {
            let key = self.pending_key.take().ok_or_else(|| ser::Error::custom("serialize_value before serialize_key"))?;
            self.entries.push((key, value.serialize(ValueSerializer)?));
            Ok(())
        }
        fn end(self) -> Result<Value, Self::Error> {
            Ok(Value::Map(self.entries))
        }
    }
    impl ser::SerializeStruct for MapSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error> {
            self.entries.push((key.to_owned(), value.serialize(ValueSerializer)?));
            Ok(())
        }
        fn end(self) -> Result<Value, Self::Error> {
            Ok(Value::Map(self.entries))
        }
    }
    impl ser::SerializeStructVariant for MapSer {
        type Ok = Value;
        type Error = ValueSerError;
        fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error> {
            self.entries.push((key.to_owned(), value.serialize(ValueSerializer)?));
            Ok(())
        }
        fn end(self) -> Result<Value, Self::Error> {
            Ok(Value::Map(self.entries))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let v = Value::Map(vec![
            ("a".into(), Value::Int(-7)),
            ("b".into(), Value::Array(vec![Value::Bool(true), Value::Null])),
            ("c".into(), Value::String("hi".into())),
        ]);
        let bytes = serde_json::to_vec(&v).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn round_trips_through_msgpack() {
        let v = Value::Array(vec![Value::Uint(9), Value::Float(1.5), Value::Bytes(vec![1, 2, 3])]);
        let bytes = rmp_serde::to_vec_named(&v).unwrap();
        let back: Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn datetime_round_trips_through_json() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let v = Value::Datetime(dt);
        let bytes = serde_json::to_vec(&v).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn stream_marker_round_trips() {
        let bytes = serde_json::to_vec(&Value::Stream).unwrap();
        let back: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(back, Value::Stream);
    }

    #[derive(serde::Serialize, serde::Deserialize, Debug, PartialEq)]
    struct Point {
        x: i64,
        y: i64,
        label: String,
    }

    #[test]
    fn to_value_and_from_value_round_trip_a_struct() {
        let p = Point { x: 1, y: 2, label: "origin".into() };
        let v = to_value(&p).unwrap();
        assert_eq!(v, Value::Map(vec![
            ("x".into(), Value::Int(1)),
            ("y".into(), Value::Int(2)),
            ("label".into(), Value::String("origin".into())),
        ]));
        let back: Point = from_value(v).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn get_looks_up_map_keys() {
        let v = Value::Map(vec![("name".into(), Value::String("svc".into()))]);
        assert_eq!(v.get("name"), Some(&Value::String("svc".into())));
        assert_eq!(v.get("missing"), None);
    }
}
