//! Chunked-transfer-encoded HTTP/1.1 POST as a transport.
//!
//! A single long-lived POST request/response pair carries the whole
//! connection's worth of messages: the client's request body and the
//! server's response body are each an independent stream of
//! `chunk-size\r\n<chunk-bytes>\r\n` frames, one frame per protocol
//! message. Request/status line and header parsing uses `httparse`.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

use crate::error::{Error, TransportError};
use crate::url::Url;

use super::{tcp_addr, Connection, Listener, Transport};

const USER_AGENT: &str = concat!("corridor-rpc/", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct HttpTransport {
    url: Url,
}

impl HttpTransport {
    pub fn new(url: Url) -> HttpTransport {
        HttpTransport { url }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn connect(&self) -> Result<Box<dyn Connection>, Error> {
        let (host, port) = tcp_addr(&self.url)?;
        let stream = TcpStream::connect((host.as_str(), port)).await.map_err(TransportError::Io)?;
        let mut reader = BufReader::new(stream);

        let request = format!(
            "POST / HTTP/1.1\r\n\
             Host: {host}:{port}\r\n\
             User-Agent: {USER_AGENT}\r\n\
             Connection: keep-alive\r\n\
             Content-Type: application/octet-stream\r\n\
             Transfer-Encoding: chunked\r\n\r\n"
        );
        reader.write_all(request.as_bytes()).await.map_err(TransportError::Io)?;
        reader.flush().await.map_err(TransportError::Io)?;

        let remote = self.url.netloc();
        debug!(url = %remote, "connected");
        Ok(Box::new(HttpConnection {
            stream: reader,
            remote,
            response_consumed_headers: false,
        }))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, Error> {
        let (host, port) = tcp_addr(&self.url)?;
        let listener = TcpListener::bind((host.as_str(), port)).await.map_err(TransportError::Io)?;
        info!(url = %self.url, "listening");
        Ok(Box::new(HttpListenerImpl { listener, url: self.url.clone() }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

struct HttpListenerImpl {
    listener: TcpListener,
    url: Url,
}

#[async_trait]
impl Listener for HttpListenerImpl {
    async fn accept(&self) -> Result<Box<dyn Connection>, Error> {
        let (stream, addr) = self.listener.accept().await.map_err(TransportError::Io)?;
        let remote = addr.to_string();
        let mut reader = BufReader::new(stream);

        read_request_head(&mut reader).await?;
        write_response_head(&mut reader).await?;

        debug!(url = %remote, "connected");
        Ok(Box::new(HttpConnection {
            stream: reader,
            remote,
            response_consumed_headers: true,
        }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

/// Consume the request line and headers, validating it's the POST this
/// transport expects. The body is read separately, chunk by chunk.
async fn read_request_head(reader: &mut BufReader<TcpStream>) -> Result<(), Error> {
    let mut raw = Vec::new();
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).await.map_err(TransportError::Io)?;
        if n == 0 {
            return Err(TransportError::ReceiveInterrupted.into());
        }
        let end_of_headers = line == b"\r\n" || line == b"\n";
        raw.extend_from_slice(&line);
        if end_of_headers {
            break;
        }
    }

    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut req = httparse::Request::new(&mut headers);
    match req.parse(&raw) {
        Ok(httparse::Status::Complete(_)) => {}
        _ => return Err(TransportError::Handshake("malformed HTTP request".into()).into()),
    }
    if req.method != Some("POST") {
        return Err(TransportError::Handshake(format!("unsupported HTTP method: {:?}", req.method)).into());
    }
    Ok(())
}

async fn write_response_head(writer: &mut BufReader<TcpStream>) -> Result<(), Error> {
    let head = format!(
        "HTTP/1.1 200 OK\r\n\
         Server: {USER_AGENT}\r\n\
         Connection: keep-alive\r\n\
         Content-Type: application/octet-stream\r\n\
         Transfer-Encoding: chunked\r\n\r\n"
    );
    writer.write_all(head.as_bytes()).await.map_err(TransportError::Io)?;
    writer.flush().await.map_err(TransportError::Io)?;
    Ok(())
}

/// Consume the HTTP response's status line and headers, leaving the
/// reader positioned at the first chunk of the body.
async fn read_response_head(reader: &mut BufReader<TcpStream>) -> Result<(), Error> {
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).await.map_err(TransportError::Io)?;
        if n == 0 {
            return Err(TransportError::ReceiveInterrupted.into());
        }
        if line == b"\r\n" || line == b"\n" {
            return Ok(());
        }
    }
}

pub struct HttpConnection {
    stream: BufReader<TcpStream>,
    remote: String,
    /// Set once the response status line/headers have been consumed (on
    /// the client side) so it only happens before the first chunk.
    response_consumed_headers: bool,
}

#[async_trait]
impl Connection for HttpConnection {
    async fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        let header = format!("{:X}\r\n", data.len());
        self.stream.write_all(header.as_bytes()).await.map_err(TransportError::Io)?;
        self.stream.write_all(data).await.map_err(TransportError::Io)?;
        self.stream.write_all(b"\r\n").await.map_err(TransportError::Io)?;
        self.stream.flush().await.map_err(TransportError::Io)?;
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Error> {
        if !self.response_consumed_headers {
            read_response_head(&mut self.stream).await?;
            self.response_consumed_headers = true;
        }

        let mut line = Vec::new();
        let n = self.stream.read_until(b'\n', &mut line).await.map_err(TransportError::Io)?;
        if n == 0 {
            return Ok(None);
        }
        let line_str = std::str::from_utf8(&line)
            .map_err(|_| TransportError::Handshake("invalid chunk length line".into()))?
            .trim_end();
        let chunk_len = usize::from_str_radix(line_str, 16)
            .map_err(|_| TransportError::Handshake(format!("invalid chunk length: {line_str:?}")))?;

        if chunk_len == 0 {
            return Ok(None);
        }

        let mut data = vec![0u8; chunk_len];
        tokio::io::AsyncReadExt::read_exact(&mut self.stream, &mut data)
            .await
            .map_err(|_| TransportError::ReceiveInterrupted)?;

        let mut crlf = [0u8; 2];
        tokio::io::AsyncReadExt::read_exact(&mut self.stream, &mut crlf)
            .await
            .map_err(|_| TransportError::ReceiveInterrupted)?;

        Ok(Some(data))
    }

    fn remote_url(&self) -> &str {
        &self.remote
    }

    async fn close(&mut self) -> Result<(), Error> {
        let _ = self.stream.shutdown().await;
        debug!(url = %self.remote, "disconnected");
        Ok(())
    }
}
