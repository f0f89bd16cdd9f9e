use async_trait::async_trait;
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, info};

use crate::error::{Error, TransportError};
use crate::url::Url;

use super::framing::{read_frame, write_frame};
use super::{unix_path, Connection, Listener, Transport};

#[derive(Debug)]
pub struct UnixTransport {
    url: Url,
}

impl UnixTransport {
    pub fn new(url: Url) -> UnixTransport {
        UnixTransport { url }
    }
}

#[async_trait]
impl Transport for UnixTransport {
    async fn connect(&self) -> Result<Box<dyn Connection>, Error> {
        let path = unix_path(&self.url)?;
        let stream = UnixStream::connect(&path).await.map_err(TransportError::Io)?;
        debug!(url = %path, "connected");
        Ok(Box::new(UnixConnection { stream, remote: path }))
    }

    async fn bind(&self) -> Result<Box<dyn Listener>, Error> {
        let path = unix_path(&self.url)?;
        // A stale socket file from a previous run blocks bind(); discard it
        // the way a fresh listen() is expected to reclaim the path.
        let _ = std::fs::remove_file(&path);
        let listener = UnixListener::bind(&path).map_err(TransportError::Io)?;
        info!(url = %self.url, "listening");
        Ok(Box::new(UnixListenerImpl { listener, url: self.url.clone(), path }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

struct UnixListenerImpl {
    listener: UnixListener,
    url: Url,
    path: String,
}

impl Drop for UnixListenerImpl {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[async_trait]
impl Listener for UnixListenerImpl {
    async fn accept(&self) -> Result<Box<dyn Connection>, Error> {
        let (stream, _addr) = self.listener.accept().await.map_err(TransportError::Io)?;
        debug!(url = %self.path, "connected");
        Ok(Box::new(UnixConnection { stream, remote: self.path.clone() }))
    }

    fn url(&self) -> &Url {
        &self.url
    }
}

pub struct UnixConnection {
    stream: UnixStream,
    remote: String,
}

#[async_trait]
impl Connection for UnixConnection {
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
