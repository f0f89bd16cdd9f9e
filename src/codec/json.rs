use std::fmt;

use crate::error::Error;
use crate::value::Value;

use super::Codec;

/// JSON codec. Useful for debugging over a human-readable wire capture;
/// binary payloads round-trip as arrays of byte values rather than a
/// native binary type, since JSON has none.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(value).map_err(|e| Error::encode(e, value))
    }

    fn decode(&self, data: &[u8]) -> Result<Value, Error> {
        serde_json::from_slice(data).map_err(|e| Error::decode(e, data))
    }
}

impl fmt::Display for JsonCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let codec = JsonCodec;
        let value = Value::Array(vec![Value::String("a".into()), Value::Null]);
        let bytes = codec.encode(&value).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), value);
    }

    #[test]
    fn decode_error_carries_context() {
        let codec = JsonCodec;
        let err = codec.decode(b"not json").unwrap_err();
        assert!(err.to_string().contains("decode error"));
    }
}
