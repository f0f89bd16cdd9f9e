//! Byte transports: TCP, Unix domain sockets, and chunked HTTP.
//!
//! A [`Transport`] knows how to dial or bind a [`Url`](crate::url::Url); a
//! [`Connection`] is the resulting duplex byte stream, framed so that
//! [`send`](Connection::send)/[`recv`](Connection::recv) always exchange
//! whole messages rather than partial reads. Framing differs per
//! transport (a 4-byte length prefix for TCP/Unix, chunked-encoding
//! hex-length lines for HTTP) but the trait hides that from callers of
//! [`crate::handshake`] and [`crate::protocol`].

mod framing;
mod http;
mod tcp;
#[cfg(feature = "tls")]
mod tls;
mod unix;

use async_trait::async_trait;

use crate::error::{Error, TransportError};
use crate::url::{Address, Url};

pub use self::http::HttpTransport;
pub use self::tcp::TcpTransport;
#[cfg(feature = "tls")]
pub use self::tls::{TlsClientConfig, TlsServerConfig};
pub use self::unix::UnixTransport;

/// A framed, bidirectional byte connection to a single remote peer.
#[async_trait]
pub trait Connection: Send {
    /// Send one complete frame.
    async fn send(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Receive one complete frame, or `None` if the peer closed the
    /// connection cleanly between frames.
    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Error>;

    /// The address of the remote peer, for logging.
    fn remote_url(&self) -> &str;

    async fn close(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// A dialer that opens outbound [`Connection`]s, or a binder that produces
/// a [`Listener`] for inbound ones.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open an outbound connection to this transport's URL.
    async fn connect(&self) -> Result<Box<dyn Connection>, Error>;

    /// Bind to this transport's URL, ready to accept connections.
    async fn bind(&self) -> Result<Box<dyn Listener>, Error>;

    fn url(&self) -> &Url;
}

/// A bound socket, ready to accept inbound [`Connection`]s.
///
/// `accept` is cancel-safe: [`crate::server::Server::serve`] races it
/// against a shutdown signal with `tokio::select!`, so the listener is
/// never left holding a half-accepted connection when a wakeup loses the
/// race.
#[async_trait]
pub trait Listener: Send + Sync {
    async fn accept(&self) -> Result<Box<dyn Connection>, Error>;

    fn url(&self) -> &Url;
}

/// Construct the [`Transport`] matching a URL's scheme.
pub fn by_url(url: Url) -> Result<Box<dyn Transport>, Error> {
    match url.scheme() {
        "tcp" => Ok(Box::new(TcpTransport::new(url))),
        "unix" => Ok(Box::new(UnixTransport::new(url))),
        "http" => Ok(Box::new(HttpTransport::new(url))),
        other => Err(Error::Parameter(format!("unknown transport scheme: {other}"))),
    }
}

pub(crate) fn tcp_addr(url: &Url) -> Result<(String, u16), Error> {
    match url.address() {
        Address::Tcp(host, port) => Ok((host.clone(), *port)),
        Address::Unix(_) => Err(Error::Parameter("tcp/http transport requires a host:port URL".into())),
    }
}

pub(crate) fn unix_path(url: &Url) -> Result<String, Error> {
    match url.address() {
        Address::Unix(path) => Ok(path.clone()),
        Address::Tcp(..) => Err(Error::Parameter("unix transport requires a unix:// URL".into())),
    }
}

pub(crate) fn connection_closed() -> Error {
    TransportError::ReceiveInterrupted.into()
}
