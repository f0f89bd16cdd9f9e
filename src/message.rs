//! Wire messages: the opcode tag and payload shape exchanged between two
//! connected peers once a codec has been negotiated.
//!
//! Every message is logically a 2-tuple `(op, data)`. `Op` is the
//! single-byte discriminant; `Message` pairs it with the decoded
//! [`Value`](crate::value::Value) payload for the five post-handshake
//! opcodes. The handshake itself (op 0) carries a raw codec name rather
//! than a `Value` and is handled directly by [`crate::handshake`].

use std::fmt;

use crate::error::Error;
use crate::value::Value;

/// The one-byte opcode every framed message on the wire starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Op {
    /// Initial handshake carrying the raw codec name. Never appears inside
    /// a [`Message`]; see [`crate::handshake`].
    Handshake = 0,
    /// Invoke a command: `(service, command, args, kwargs)`.
    Command = 1,
    /// A unary return value, or one item of a stream.
    Data = 2,
    /// `(name, message, traceback)` describing a failure.
    Error = 3,
    /// Marks the start of a stream. Carries no payload.
    StreamStart = 4,
    /// Marks the end of a stream. Carries no payload.
    StreamEnd = 5,
}

impl Op {
    pub fn from_u8(byte: u8) -> Result<Op, Error> {
        match byte {
            0 => Ok(Op::Handshake),
            1 => Ok(Op::Command),
            2 => Ok(Op::Data),
            3 => Ok(Op::Error),
            4 => Ok(Op::StreamStart),
            5 => Ok(Op::StreamEnd),
            other => Err(Error::ProtocolOp(other)),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Handshake => "handshake",
            Op::Command => "command",
            Op::Data => "data",
            Op::Error => "error",
            Op::StreamStart => "stream_start",
            Op::StreamEnd => "stream_end",
        };
        f.write_str(name)
    }
}

/// A decoded `(op, data)` pair, ready for (or just received from) the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub op: Op,
    pub data: Value,
}

impl Message {
    pub fn new(op: Op, data: Value) -> Message {
        Message { op, data }
    }

    /// A `Command` message invoking `service.command(*args, **kwargs)`.
    pub fn command(service: &str, command: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Message {
        Message::new(
            Op::Command,
            Value::Array(vec![
                Value::String(service.to_owned()),
                Value::String(command.to_owned()),
                Value::Array(args),
                Value::Map(kwargs),
            ]),
        )
    }

    /// A unary `Data` message.
    pub fn data(value: Value) -> Message {
        Message::new(Op::Data, value)
    }

    /// An `Error` message: `(name, message, traceback)`.
    pub fn error(name: &str, message: &str, traceback: &str) -> Message {
        Message::new(
            Op::Error,
            Value::Array(vec![
                Value::String(name.to_owned()),
                Value::String(message.to_owned()),
                Value::String(traceback.to_owned()),
            ]),
        )
    }

    pub fn stream_start() -> Message {
        Message::new(Op::StreamStart, Value::Null)
    }

    pub fn stream_end() -> Message {
        Message::new(Op::StreamEnd, Value::Null)
    }

    /// Split a `Command` message's payload into its four parts.
    pub fn into_command(self) -> Result<(String, String, Vec<Value>, Vec<(String, Value)>), Error> {
        let Value::Array(mut parts) = self.data else {
            return Err(Error::Parameter("command payload must be an array".into()));
        };
        if parts.len() != 4 {
            return Err(Error::Parameter(format!(
                "command payload must have 4 elements, got {}",
                parts.len()
            )));
        }
        let kwargs_v = parts.pop().unwrap();
        let args_v = parts.pop().unwrap();
        let cmd_v = parts.pop().unwrap();
        let svc_v = parts.pop().unwrap();

        let svc = svc_v.as_str().ok_or_else(|| Error::Parameter("service name must be a string".into()))?.to_owned();
        let cmd = cmd_v.as_str().ok_or_else(|| Error::Parameter("command name must be a string".into()))?.to_owned();
        let args = match args_v {
            Value::Array(a) => a,
            other => return Err(Error::Parameter(format!("command args must be an array, got {other}"))),
        };
        let kwargs = match kwargs_v {
            Value::Map(m) => m,
            other => return Err(Error::Parameter(format!("command kwargs must be a map, got {other}"))),
        };

        Ok((svc, cmd, args, kwargs))
    }

    /// Split an `Error` message's payload into `(name, message, traceback)`.
    pub fn into_error_parts(self) -> Result<(String, String, String), Error> {
        let Value::Array(mut parts) = self.data else {
            return Err(Error::Parameter("error payload must be an array".into()));
        };
        if parts.len() != 3 {
            return Err(Error::Parameter(format!(
                "error payload must have 3 elements, got {}",
                parts.len()
            )));
        }
        let tb = parts.pop().unwrap();
        let msg = parts.pop().unwrap();
        let name = parts.pop().unwrap();

        let as_string = |v: Value| -> String {
            match v {
                Value::String(s) => s,
                other => other.to_string(),
            }
        };
        Ok((as_string(name), as_string(msg), as_string(tb)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_round_trips_through_u8() {
        for op in [Op::Handshake, Op::Command, Op::Data, Op::Error, Op::StreamStart, Op::StreamEnd] {
            assert_eq!(Op::from_u8(op.as_u8()).unwrap(), op);
        }
    }

    #[test]
    fn invalid_opcode_is_rejected() {
        assert!(matches!(Op::from_u8(42), Err(Error::ProtocolOp(42))));
    }

    #[test]
    fn command_message_round_trips_into_command() {
        let msg = Message::command(
            "echo",
            "call",
            vec![Value::Int(1)],
            vec![("loud".into(), Value::Bool(true))],
        );
        let (svc, cmd, args, kwargs) = msg.into_command().unwrap();
        assert_eq!(svc, "echo");
        assert_eq!(cmd, "call");
        assert_eq!(args, vec![Value::Int(1)]);
        assert_eq!(kwargs, vec![("loud".to_string(), Value::Bool(true))]);
    }

    #[test]
    fn error_message_round_trips_into_parts() {
        let msg = Message::error("KeyError", "'x'", "");
        let (name, message, traceback) = msg.into_error_parts().unwrap();
        assert_eq!(name, "KeyError");
        assert_eq!(message, "'x'");
        assert_eq!(traceback, "");
    }
}
