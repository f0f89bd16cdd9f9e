//! Codec negotiation.
//!
//! The first byte exchanged on a fresh connection is always the
//! `Op::Handshake` opcode. The client sends it alone (no payload) to ask
//! "which codec are we speaking?"; the server answers with the same
//! opcode followed by its codec's name. Everything sent afterwards is
//! framed as `(op, data)` and encoded with that codec.
//!
//! Because the handshake precedes codec negotiation, it is the one place
//! in the protocol that can't itself be codec-encoded: it's a single raw
//! opcode byte, optionally followed by the ASCII codec name.

use tracing::debug;

use crate::codec::{by_name, Codec};
use crate::error::{Error, TransportError};
use crate::message::Op;
use crate::transport::Connection;

/// Client side: ask the server which codec to use, then construct it.
///
/// If `preferred` is given, send it as a hint; servers that don't
/// recognize it are expected to fall back to their default, so the
/// returned codec may differ from what was requested.
pub async fn negotiate_client(con: &mut dyn Connection, preferred: Option<&str>) -> Result<Box<dyn Codec>, Error> {
    let request = match preferred {
        Some(name) => vec![Op::Handshake.as_u8()].into_iter().chain(name.bytes()).collect::<Vec<u8>>(),
        None => vec![Op::Handshake.as_u8()],
    };

    debug!(url = con.remote_url(), "handshake ->");
    con.send(&request).await?;

    let response = con.recv().await?.ok_or(TransportError::ReceiveInterrupted)?;
    let (op_byte, name_bytes) = response.split_first().ok_or(TransportError::ReceiveInterrupted)?;
    let op = Op::from_u8(*op_byte)?;
    if op != Op::Handshake {
        return Err(Error::ProtocolOp(*op_byte));
    }

    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| TransportError::Handshake("codec name is not valid utf8".into()))?;
    debug!(url = con.remote_url(), codec = name, "handshake <-");

    by_name(name)
}

/// Server side: read the client's handshake request, pick a codec, and
/// reply with its name.
///
/// The client's requested codec name, if any, is honored when known;
/// unknown or absent names fall back to `default_codec`.
pub async fn negotiate_server(con: &mut dyn Connection, default_codec: &str) -> Result<Box<dyn Codec>, Error> {
    let request = con.recv().await?.ok_or(TransportError::ReceiveInterrupted)?;
    let requested = parse_client_request(&request)?;
    debug!(url = con.remote_url(), requested = requested.as_deref(), "handshake <-");

    let codec = match requested.as_deref().map(by_name) {
        Some(Ok(codec)) => codec,
        _ => by_name(default_codec)?,
    };

    let mut reply = vec![Op::Handshake.as_u8()];
    reply.extend(codec.name().bytes());

    debug!(url = con.remote_url(), codec = codec.name(), "handshake ->");
    con.send(&reply).await?;

    Ok(codec)
}

/// Parse the raw bytes of a client's handshake request (opcode + optional
/// codec name) as received by a server.
pub fn parse_client_request(data: &[u8]) -> Result<Option<String>, Error> {
    let (op_byte, name_bytes) = data.split_first().ok_or(TransportError::ReceiveInterrupted)?;
    let op = Op::from_u8(*op_byte)?;
    if op != Op::Handshake {
        return Err(Error::ProtocolOp(*op_byte));
    }
    if name_bytes.is_empty() {
        return Ok(None);
    }
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| TransportError::Handshake("codec name is not valid utf8".into()))?;
    Ok(Some(name.to_owned()))
}
