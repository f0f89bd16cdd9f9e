use std::fmt;

use crate::error::Error;
use crate::value::Value;

use super::Codec;

/// MessagePack codec, the default. Encodes maps with string keys by name
/// (matching how `rmp-serde` round-trips struct fields elsewhere in the
/// crate) rather than compact positional arrays.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgpackCodec;

impl Codec for MsgpackCodec {
    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error> {
        rmp_serde::to_vec_named(value).map_err(|e| Error::encode(e, value))
    }

    fn decode(&self, data: &[u8]) -> Result<Value, Error> {
        rmp_serde::from_slice(data).map_err(|e| Error::decode(e, data))
    }
}

impl fmt::Display for MsgpackCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("msgpack")
    }
}
