//! Pluggable wire codecs.
//!
//! A [`Codec`] turns a [`Value`] into bytes and back. Both codecs operate
//! on the exact same data model (see [`crate::value`]), so switching codecs
//! never changes what a service can send, only how many bytes it costs and
//! whether a human can read the wire capture.

mod json;
mod msgpack;

use std::fmt;

use crate::error::Error;
use crate::value::Value;

pub use json::JsonCodec;
pub use msgpack::MsgpackCodec;

/// Encodes and decodes [`Value`]s to and from bytes.
pub trait Codec: Send + Sync + fmt::Debug {
    /// The name this codec is negotiated under during the handshake, e.g. `"msgpack"`.
    fn name(&self) -> &'static str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, Error>;

    fn decode(&self, data: &[u8]) -> Result<Value, Error>;
}

/// Construct the codec matching `name`.
///
/// # Errors
/// Returns [`Error::Parameter`] if `name` doesn't match a known codec.
pub fn by_name(name: &str) -> Result<Box<dyn Codec>, Error> {
    match name {
        "msgpack" => Ok(Box::new(MsgpackCodec)),
        "json" => Ok(Box::new(JsonCodec::default())),
        other => Err(Error::Parameter(format!("unknown codec: {other}"))),
    }
}

/// The codec names this build supports, in negotiation preference order.
pub fn supported() -> &'static [&'static str] {
    &["msgpack", "json"]
}
