//! # corridor-rpc
//!
//! A bidirectional, codec-agnostic RPC protocol over interchangeable byte
//! transports (TCP, Unix domain sockets, chunked HTTP).
//!
//! The core pieces are the [`protocol`] engine, the [`transport`]
//! abstraction, [`codec`] negotiation, the [`service`] registry, and the
//! client-side [`proxy`]. A [`Server`](server::Server) owns a registry of
//! named [`Service`](service::Service)s and dispatches incoming `Command`
//! messages to them; a [`Client`](client::Client) resolves a named service
//! into a [`ServiceProxy`](proxy::ServiceProxy) whose commands are
//! synthesized from the server's published [`ServiceSpec`](service::ServiceSpec).
//!
//! ## Wire model
//!
//! Every message on the wire is a 2-tuple `(op, data)` encoded with the
//! connection's negotiated [`Codec`](codec::Codec). See [`message`] for the
//! five opcodes and [`handshake`] for how the codec is agreed on.

pub mod client;
pub mod codec;
pub mod error;
pub mod handshake;
pub mod message;
pub mod protocol;
pub mod proxy;
pub mod retry;
pub mod server;
pub mod service;
pub mod transport;
pub mod url;
pub mod value;

pub use crate::client::Client;
pub use crate::error::{Error, Result};
pub use crate::server::Server;
pub use crate::service::{Service, ServiceSpec};
pub use crate::url::Url;
pub use crate::value::Value;

/// Default codec name used when none is configured: `"msgpack"`.
pub const DEFAULT_CODEC: &str = "msgpack";
