//! The RPC server: binds a [`Transport`], accepts connections, and runs
//! one tokio task per connection over the [`crate::protocol`] engine.
//!
//! A handful of server-wide facts (codec, transport, version, and the
//! service registry) are shared with the built-in `meta` service through
//! [`ServerInfo`](crate::service::ServerInfo), constructed via
//! `Arc::new_cyclic` so `meta` holds only a `Weak` back-reference.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::handshake;
use crate::protocol::{self, MessageChannel};
use crate::service::{MetadataService, RegistryBuilder, ServerInfo, Service};
use crate::transport::{self, Transport};
use crate::url::Url;

/// Builds a [`Server`]: transport URL, codec, version string,
/// `remote_tracebacks`, and the service registry.
pub struct ServerBuilder {
    url: Url,
    codec_name: String,
    version: Option<String>,
    remote_tracebacks: bool,
    registry: RegistryBuilder,
    #[cfg(feature = "tls")]
    tls: Option<crate::transport::TlsServerConfig>,
}

impl ServerBuilder {
    pub fn new(url: Url) -> ServerBuilder {
        ServerBuilder {
            url,
            codec_name: crate::DEFAULT_CODEC.to_string(),
            version: None,
            remote_tracebacks: false,
            registry: RegistryBuilder::new(),
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    /// Wrap every accepted connection in TLS using this cert+key context.
    /// Only meaningful with a `tcp://` URL; [`ServerBuilder::build`] errors
    /// otherwise.
    #[cfg(feature = "tls")]
    pub fn tls(mut self, config: crate::transport::TlsServerConfig) -> ServerBuilder {
        self.tls = Some(config);
        self
    }

    pub fn codec(mut self, name: impl Into<String>) -> ServerBuilder {
        self.codec_name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> ServerBuilder {
        self.version = Some(version.into());
        self
    }

    /// Whether an `Error` message's `traceback` field carries a rendering
    /// of the failure, or is left empty. Off by default: tracebacks can
    /// leak server-internal detail to clients.
    pub fn remote_tracebacks(mut self, enabled: bool) -> ServerBuilder {
        self.remote_tracebacks = enabled;
        self
    }

    /// Register a named service. Errors if the name is already taken, or
    /// is the reserved internal name `_meta`.
    pub fn register(mut self, name: impl Into<String>, service: Arc<dyn Service>) -> Result<ServerBuilder, Error> {
        let name = name.into();
        if name == "_meta" {
            return Err(Error::Registry(name));
        }
        self.registry.register(name, service)?;
        Ok(self)
    }

    pub fn build(mut self) -> Result<Server, Error> {
        if self.registry.is_registered("_meta") {
            return Err(Error::Registry("_meta".to_string()));
        }

        #[cfg(feature = "tls")]
        let transport: Box<dyn Transport> = match self.tls {
            Some(tls) => {
                if self.url.scheme() != "tcp" {
                    return Err(Error::Parameter("TLS is only supported on the tcp transport".into()));
                }
                Box::new(crate::transport::TcpTransport::new_with_server_tls(self.url, &tls)?)
            }
            None => transport::by_url(self.url)?,
        };
        #[cfg(not(feature = "tls"))]
        let transport = transport::by_url(self.url)?;

        let transport_name = transport.url().scheme().to_string();
        let codec_name = self.codec_name;
        let version = self.version;

        let info = Arc::new_cyclic(|weak| {
            let meta = Arc::new(MetadataService::new(weak.clone()));
            self.registry
                .register("_meta", meta)
                .expect("_meta was just checked unregistered");
            ServerInfo { version, codec_name, transport_name, registry: self.registry.build() }
        });

        Ok(Server { transport, info, remote_tracebacks: self.remote_tracebacks, stop: watch::channel(false).0 })
    }
}

/// A running (or not-yet-started) RPC server.
pub struct Server {
    transport: Box<dyn Transport>,
    info: Arc<ServerInfo>,
    remote_tracebacks: bool,
    stop: watch::Sender<bool>,
}

impl Server {
    pub fn builder(url: Url) -> ServerBuilder {
        ServerBuilder::new(url)
    }

    /// The facts this server reports via `meta.status()`.
    pub fn info(&self) -> &Arc<ServerInfo> {
        &self.info
    }

    /// Request that [`Server::serve`]'s accept loop stop after its current
    /// iteration. In-flight connection handlers are left to drain on
    /// their own; this doesn't close already-accepted sockets.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }

    /// Bind and accept connections until [`Server::stop`] is called.
    /// Each accepted connection runs its own request/response loop on a
    /// spawned task; a transport error on one connection doesn't affect
    /// any other.
    pub async fn serve(&self) -> Result<(), Error> {
        let listener = self.transport.bind().await?;
        info!(url = %listener.url(), "listening");

        let mut stop_rx = self.stop.subscribe();
        loop {
            let accepted = tokio::select! {
                biased;
                _ = stop_rx.changed() => {
                    info!("stop requested, accept loop exiting");
                    return Ok(());
                }
                accepted = listener.accept() => accepted,
            };

            let connection = match accepted {
                Ok(connection) => connection,
                Err(err) => {
                    error!(%err, "accept failed");
                    continue;
                }
            };

            let info = Arc::clone(&self.info);
            let remote_tracebacks = self.remote_tracebacks;
            tokio::spawn(async move {
                handle_connection(connection, info, remote_tracebacks).await;
            });
        }
    }
}

async fn handle_connection(mut connection: Box<dyn crate::transport::Connection>, info: Arc<ServerInfo>, remote_tracebacks: bool) {
    let url = connection.remote_url().to_string();
    debug!(%url, "connected");

    let codec = match handshake::negotiate_server(connection.as_mut(), &info.codec_name).await {
        Ok(codec) => codec,
        Err(err) => {
            warn!(%url, %err, "handshake failed");
            return;
        }
    };

    let mut channel = MessageChannel::new(connection, codec);
    loop {
        match protocol::serve_one(&mut channel, &info.registry, remote_tracebacks).await {
            Ok(true) => continue,
            Ok(false) => break,
            Err(err) => {
                warn!(%url, %err, "connection terminated");
                break;
            }
        }
    }

    let _ = channel.close().await;
    debug!(%url, "disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;
    #[async_trait::async_trait]
    impl Service for Noop {
        fn name(&self) -> &str {
            "noop"
        }
        fn spec(&self) -> crate::service::ServiceSpec {
            crate::service::ServiceSpec { name: "noop".into(), doc: None, commands: vec![] }
        }
        async fn call(
            &self,
            _command: &str,
            _args: Vec<crate::value::Value>,
            _kwargs: Vec<(String, crate::value::Value)>,
        ) -> Result<crate::service::CallOutcome, Error> {
            unimplemented!()
        }
    }

    #[test]
    fn builder_rejects_reserved_meta_name() {
        let url = Url::parse("tcp://127.0.0.1:0").unwrap();
        let err = ServerBuilder::new(url).register("_meta", Arc::new(Noop));
        assert!(err.is_err());
    }

    #[test]
    fn builder_constructs_server_info_with_meta_registered() {
        let url = Url::parse("tcp://127.0.0.1:0").unwrap();
        let server = ServerBuilder::new(url).version("1.2.3").build().unwrap();
        assert_eq!(server.info().version.as_deref(), Some("1.2.3"));
        assert!(server.info().registry.get("_meta").is_ok());
        assert!(server.info().registry.public_names().is_empty());
    }

    #[test]
    fn builder_registers_user_services_alongside_meta() {
        let url = Url::parse("tcp://127.0.0.1:0").unwrap();
        let server = ServerBuilder::new(url).register("noop", Arc::new(Noop)).unwrap().build().unwrap();
        assert_eq!(server.info().registry.public_names(), vec!["noop".to_string()]);
    }

    #[cfg(feature = "tls")]
    #[test]
    fn tls_is_rejected_on_non_tcp_transports() {
        let url = Url::parse("unix:///tmp/corridor-tls-test.sock").unwrap();
        let config = crate::transport::TlsServerConfig::new("/nonexistent/cert.pem", "/nonexistent/key.pem");
        let err = ServerBuilder::new(url).tls(config).build().unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }
}
