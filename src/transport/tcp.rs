use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::error::{Error, TransportError};
use crate::url::Url;

#[cfg(feature = "tls")]
use std::sync::Arc;
#[cfg(feature = "tls")]
use tokio_rustls::rustls::pki_types::ServerName;
#[cfg(feature = "tls")]
use tokio_rustls::rustls::{ClientConfig, ServerConfig};

use super::framing::{read_frame, write_frame};
#[cfg(feature = "tls")]
use super::tls::{self, TlsClientConfig, TlsServerConfig};
use super::{tcp_addr, Connection, Listener, Transport};

#[cfg(feature = "tls")]
enum TlsMode {
    Server(Arc<ServerConfig>),
    Client(Arc<ClientConfig>, ServerName<'static>),
}

#[cfg(not(feature = "tls"))]
enum TlsMode {}

#[derive(Debug)]
pub struct TcpTransport {
    url: Url,
    #[cfg_attr(not(feature = "tls"), allow(dead_code))]
    tls: Option<TlsMode>,
}

impl std::fmt::Debug for TlsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TlsMode")
    }
}

impl TcpTransport {
    pub fn new(url: Url) -> TcpTransport {
        TcpTransport { url, tls: None }
    }

    /// Build a TCP transport that wraps every accepted socket in TLS using
    /// the given cert+key context. Only meaningful on the listener side;
    /// pair with [`TcpTransport::new`] on the dialing side unless the peer
    /// also verifies this server's certificate.
    #[cfg(feature = "tls")]
    pub fn new_with_server_tls(url: Url, config: &TlsServerConfig) -> Result<TcpTransport, Error> {
        let server_config = tls::build_server_config(config)?;
        Ok(TcpTransport { url, tls: Some(TlsMode::Server(Arc::new(server_config))) })
    }

    /// Build a TCP transport that wraps every dialed socket in TLS,
    /// verifying the peer against the given CA.
    #[cfg(feature = "tls")]
    pub fn new_with_client_tls(url: Url, config: &TlsClientConfig) -> Result<TcpTransport, Error> {
        let (client_config, name) = tls::build_client_config(config)?;
        Ok(TcpTransport { url, tls: Some(TlsMode::Client(Arc::new(client_config), name)) })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<Box<dyn Connection>, Error> {
        let (host, port) = tcp_addr(&self.url)?;
        let stream = TcpStream::connect((host.as_str(), port))
            .await
            .map_err(TransportError::Io)?;
        let remote = stream.peer_addr().map(|a| a.to_string()).unwrap_or_else(|_| self.url.netloc());

        #[cfg(feature = "tls")]
        let stream = match &self.tls {
            Some(TlsMode::Client(config, name)) => {
                let connector = tokio_rustls::TlsConnector::from(Arc::clone(config));
                let tls_stream = connector
                    .connect(name.clone(), stream)
                    .await
                    .map_err(|err| TransportError::Tls(err.to_string()))?;
                Stream::TlsClient(Box::new(tls_stream))
            }
            _ => Stream::Plain(stream),
        };
        #[cfg(not(feature = "tls"))]
        let stream = Stream::Plain(stream);

        debug!(url = %remote, "connected");
        Ok(Box::new(TcpConnection { stream, remote }))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, Error> {
        let (host, port) = tcp_addr(&self.url)?;
        let listener = TcpListener::bind((host.as_str(), port)).await.map_err(TransportError::Io)?;
        info!(url = %self.url, "listening");

        #[cfg(feature = "tls")]
        let tls = match &self.tls {
            Some(TlsMode::Server(config)) => Some(Arc::clone(config)),
            _ => None,
        };

        Ok(Box::new(TcpListenerImpl {
            listener,
            url: self.url.clone(),
            #[cfg(feature = "tls")]
            tls,
        }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

struct TcpListenerImpl {
    listener: TcpListener,
    url: Url,
    #[cfg(feature = "tls")]
    tls: Option<Arc<ServerConfig>>,
}

#[async_trait]
impl Listener for TcpListenerImpl {
    async fn accept(&self) -> Result<Box<dyn Connection>, Error> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;
        let remote = addr.to_string();

        #[cfg(feature = "tls")]
        let stream = match &self.tls {
            Some(config) => {
                let acceptor = tokio_rustls::TlsAcceptor::from(Arc::clone(config));
                match acceptor.accept(stream).await {
                    Ok(tls_stream) => Stream::TlsServer(Box::new(tls_stream)),
                    Err(err) => {
                        error!(url = %remote, %err, "tls handshake failed");
                        return Err(TransportError::Tls(err.to_string()).into());
                    }
                }
            }
            None => Stream::Plain(stream),
        };
        #[cfg(not(feature = "tls"))]
        let stream = Stream::Plain(stream);

        debug!(url = %remote, "connected");
        Ok(Box::new(TcpConnection { stream, remote }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

/// Either a bare TCP socket or one wrapped in TLS. [`read_frame`]/
/// [`write_frame`] are generic over `AsyncRead`/`AsyncWrite`, so framing
/// doesn't need to know which.
enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    TlsServer(Box<tokio_rustls::server::TlsStream<TcpStream>>),
    #[cfg(feature = "tls")]
    TlsClient(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl AsyncRead for Stream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Stream::TlsServer(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Stream::TlsClient(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Stream::TlsServer(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Stream::TlsClient(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_flush(cx),
            #[cfg(feature = "tls")]
            Stream::TlsServer(s) => Pin::new(s.as_mut()).poll_flush(cx),
            #[cfg(feature = "tls")]
            Stream::TlsClient(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(s) => Pin::new(s).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Stream::TlsServer(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Stream::TlsClient(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

pub struct TcpConnection {
    stream: Stream,
    remote: String,
}

#[async_trait]
impl Connection for TcpConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        write_frame(&mut self.stream, data).await
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Error> {
        read_frame(&mut self.stream).await
    }

    fn remote_url(&self) -> &str {
        &self.remote
    }

    async fn close(&mut self) -> Result<(), Error> {
        use tokio::io::AsyncWriteExt;
        let _ = self.stream.shutdown().await;
        debug!(url = %self.remote, "disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_defaults_to_no_tls() {
        let transport = TcpTransport::new(Url::parse("tcp://127.0.0.1:0").unwrap());
        assert!(transport.tls.is_none());
    }

    #[cfg(feature = "tls")]
    #[test]
    fn server_tls_rejects_missing_cert_file() {
        let config = TlsServerConfig::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        let err = TcpTransport::new_with_server_tls(Url::parse("tcp://127.0.0.1:0").unwrap(), &config);
        assert!(err.is_err());
    }

    #[cfg(feature = "tls")]
    #[test]
    fn client_tls_rejects_missing_ca_file() {
        let config = TlsClientConfig::new("/nonexistent/ca.pem", "example.com");
        let err = TcpTransport::new_with_client_tls(Url::parse("tcp://127.0.0.1:0").unwrap(), &config);
        assert!(err.is_err());
    }
}
