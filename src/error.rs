//! Error and Result module.
//!
//! Mirrors the shape of the protocol's own error model (§4.7 of the spec):
//! transport failures, protocol-level opcode mismatches, codec failures, and
//! the client-visible errors raised by the registry and the proxy. Unlike a
//! one-`Kind`-enum-per-crate design, each case below carries exactly the
//! context callers need, via `thiserror`.

use std::fmt;

/// Result type returned from fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The unified error type for corridor-rpc.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A framing failure, connection loss, or TLS error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An unexpected opcode was received for the current protocol state.
    #[error("invalid opcode: {0}")]
    ProtocolOp(u8),

    /// A value could not be encoded by the active codec.
    #[error("encode error: {message} (value={elided})")]
    Encode {
        /// The underlying codec failure.
        message: String,
        /// A truncated `Debug` rendering of the value that failed to encode.
        elided: String,
    },

    /// A byte payload could not be decoded by the active codec.
    #[error("decode error: {message} (data={elided})")]
    Decode {
        /// The underlying codec failure.
        message: String,
        /// A truncated rendering of the payload that failed to decode.
        elided: String,
    },

    /// An `Error` message was received from the remote peer.
    #[error("{}", .0.display())]
    Remote(RemoteError),

    /// Invalid use of the streaming-argument protocol, or a stream/unary
    /// mismatch between a proxy's expectation and what the server returned.
    #[error("parameter error: {0}")]
    Parameter(String),

    /// The client attempted to use a service the server doesn't expose.
    #[error("invalid service: {0}")]
    InvalidService(String),

    /// The client attempted to call a command the service doesn't expose.
    #[error("invalid command: {0}.{1}")]
    InvalidCommand(String, String),

    /// Attempted to register a service name that's already taken.
    #[error("already registered: {0}")]
    Registry(String),
}

impl Error {
    pub(crate) fn encode(cause: impl fmt::Display, value: impl fmt::Debug) -> Error {
        Error::Encode {
            message: cause.to_string(),
            elided: elide(format!("{:?}", value)),
        }
    }

    pub(crate) fn decode(cause: impl fmt::Display, data: &[u8]) -> Error {
        Error::Decode {
            message: cause.to_string(),
            elided: elide(format!("{:?}", data)),
        }
    }

    /// True if this error is (or wraps) a [`TransportError`].
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    /// The class name reported in an outgoing `Error` message, mirroring
    /// the original's use of the raised exception's class name.
    pub fn class_name(&self) -> &'static str {
        match self {
            Error::Transport(_) => "TransportError",
            Error::ProtocolOp(_) => "ProtocolOpError",
            Error::Encode { .. } => "EncodeError",
            Error::Decode { .. } => "DecodeError",
            Error::Remote(_) => "RemoteError",
            Error::Parameter(_) => "ParameterError",
            Error::InvalidService(_) => "InvalidService",
            Error::InvalidCommand(_, _) => "InvalidCommand",
            Error::Registry(_) => "RegistryError",
        }
    }

    /// Split into the three fields an `Error` message carries on the wire.
    /// A `Remote` error forwards its original `(name, message, traceback)`
    /// unchanged rather than being re-wrapped. `include_traceback` gates
    /// whether a local error's traceback field is populated, matching
    /// `remote_tracebacks` on the server that's about to send this.
    pub fn into_wire_parts(self, include_traceback: bool) -> (String, String, String) {
        match self {
            Error::Remote(remote) => (remote.name, remote.message, remote.traceback),
            other => {
                let name = other.class_name().to_string();
                let message = other.to_string();
                let traceback = if include_traceback { format!("{other:?}") } else { String::new() };
                (name, message, traceback)
            }
        }
    }
}

/// Truncate a diagnostic representation to 100 characters, as the spec's
/// codec section requires for encode/decode error context.
fn elide(mut s: String) -> String {
    const LIMIT: usize = 100;
    if s.len() > LIMIT {
        // floor_char_boundary isn't stable; walk back to a char boundary.
        let mut cut = LIMIT;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// Transport-layer failures: framing, connection loss, TLS.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// An I/O error occurred on the underlying socket/stream.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// TLS handshake or configuration failure.
    #[error("tls error: {0}")]
    Tls(String),

    /// Fewer bytes were sent than expected.
    #[error("send interrupted")]
    SendInterrupted,

    /// Fewer bytes were received than expected (peer closed mid-frame).
    #[error("receive interrupted")]
    ReceiveInterrupted,

    /// A connection is not yet established, or was closed.
    #[error("not connected")]
    NotConnected,

    /// The listener could not be bound.
    #[error("listen error: {0}")]
    Listen(String),

    /// A malformed handshake frame was received.
    #[error("invalid handshake: {0}")]
    Handshake(String),
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Error {
        Error::Transport(err)
    }
}

/// An error materialized from a remote `Error` message (op=3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// The remote exception/error class name.
    pub name: String,
    /// The remote error message.
    pub message: String,
    /// A remote traceback, if the server was configured with
    /// `remote_tracebacks = true`; empty otherwise.
    pub traceback: String,
}

impl RemoteError {
    /// Construct a `RemoteError` from its three wire fields.
    pub fn new(name: impl Into<String>, message: impl Into<String>, traceback: impl Into<String>) -> Self {
        RemoteError {
            name: name.into(),
            message: message.into(),
            traceback: traceback.into(),
        }
    }

    fn display(&self) -> String {
        if self.traceback.is_empty() {
            format!("{}: {}", self.name, self.message)
        } else {
            self.traceback.clone()
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::error::Error for RemoteError {}

impl From<RemoteError> for Error {
    fn from(err: RemoteError) -> Error {
        Error::Remote(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_display_prefers_traceback() {
        let e = RemoteError::new("KeyError", "'x'", "Traceback (most recent call last): ...");
        assert_eq!(e.to_string(), "Traceback (most recent call last): ...");
    }

    #[test]
    fn remote_error_display_falls_back_to_name_message() {
        let e = RemoteError::new("KeyError", "'x'", "");
        assert_eq!(e.to_string(), "KeyError: 'x'");
    }

    #[test]
    fn elide_truncates_long_values() {
        let s = elide("x".repeat(200));
        assert!(s.chars().count() <= 101);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn elide_leaves_short_values_alone() {
        assert_eq!(elide("short".to_string()), "short");
    }

    #[test]
    fn into_wire_parts_forwards_remote_errors_unchanged() {
        let err: Error = RemoteError::new("KeyError", "'x'", "trace").into();
        let (name, message, traceback) = err.into_wire_parts(false);
        assert_eq!(name, "KeyError");
        assert_eq!(message, "'x'");
        assert_eq!(traceback, "trace");
    }

    #[test]
    fn into_wire_parts_derives_class_name_for_local_errors() {
        let err = Error::InvalidService("bogus".into());
        let (name, _, traceback) = err.into_wire_parts(false);
        assert_eq!(name, "InvalidService");
        assert_eq!(traceback, "");
    }

    #[test]
    fn into_wire_parts_includes_traceback_when_requested() {
        let err = Error::InvalidService("bogus".into());
        let (_, _, traceback) = err.into_wire_parts(true);
        assert!(!traceback.is_empty());
    }
}
