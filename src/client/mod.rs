//! The RPC client: dials a server lazily, negotiates a codec once, and
//! reuses that connection across calls until a transport error forces a
//! redial. [`Client::service`] resolves a named service into a
//! [`ServiceProxy`](crate::proxy::ServiceProxy).

use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::Mutex;

use crate::error::{Error, TransportError};
use crate::message::{Message, Op};
use crate::protocol::{self, CallResponse, MessageChannel};
use crate::proxy::ServiceProxy;
use crate::retry::RetryPolicy;
use crate::service::ServiceSpec;
use crate::transport::{self, Transport};
use crate::url::Url;
use crate::value::{from_value, Value};

/// Builds a [`Client`] with construction-time configuration: transport
/// URL, preferred codec, and retry policy. Matches the defaults in
/// [`crate::DEFAULT_CODEC`] and [`crate::url::DEFAULT_PORT`] when unset.
pub struct ClientBuilder {
    url: Url,
    codec_name: Option<String>,
    retry: RetryPolicy,
    #[cfg(feature = "tls")]
    tls: Option<crate::transport::TlsClientConfig>,
}

impl ClientBuilder {
    pub fn new(url: Url) -> ClientBuilder {
        ClientBuilder {
            url,
            codec_name: None,
            retry: RetryPolicy::default(),
            #[cfg(feature = "tls")]
            tls: None,
        }
    }

    pub fn codec(mut self, name: impl Into<String>) -> ClientBuilder {
        self.codec_name = Some(name.into());
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> ClientBuilder {
        self.retry = policy;
        self
    }

    /// Dial over TLS, verifying the server against this CA. Only
    /// meaningful with a `tcp://` URL; [`ClientBuilder::build`] errors
    /// otherwise.
    #[cfg(feature = "tls")]
    pub fn tls(mut self, config: crate::transport::TlsClientConfig) -> ClientBuilder {
        self.tls = Some(config);
        self
    }

    pub fn build(self) -> Result<Arc<Client>, Error> {
        #[cfg(feature = "tls")]
        let transport: Box<dyn Transport> = match self.tls {
            Some(tls) => {
                if self.url.scheme() != "tcp" {
                    return Err(Error::Parameter("TLS is only supported on the tcp transport".into()));
                }
                Box::new(crate::transport::TcpTransport::new_with_client_tls(self.url, &tls)?)
            }
            None => transport::by_url(self.url)?,
        };
        #[cfg(not(feature = "tls"))]
        let transport = transport::by_url(self.url)?;

        Ok(Arc::new(Client {
            transport,
            codec_name: self.codec_name,
            retry: self.retry,
            connection: Mutex::new(None),
        }))
    }
}

pub struct Client {
    transport: Box<dyn Transport>,
    codec_name: Option<String>,
    retry: RetryPolicy,
    /// The one connection this client keeps alive between calls. `None`
    /// when not yet dialed, or when the last use left it broken.
    connection: Mutex<Option<MessageChannel>>,
}

impl Client {
    pub fn builder(url: Url) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// A handle to a named service on this client's server. Lazily fetches
    /// the service's [`ServiceSpec`] the first time one of its commands is
    /// called.
    pub fn service(self: &Arc<Client>, name: impl Into<String>) -> ServiceProxy {
        ServiceProxy::new(Arc::clone(self), name.into())
    }

    async fn dial(&self) -> Result<MessageChannel, Error> {
        let mut connection = self.transport.connect().await?;
        let codec = crate::handshake::negotiate_client(&mut *connection, self.codec_name.as_deref()).await?;
        Ok(MessageChannel::new(connection, codec))
    }

    async fn take_connection(&self) -> Result<MessageChannel, Error> {
        let mut slot = self.connection.lock().await;
        match slot.take() {
            Some(channel) => Ok(channel),
            None => self.dial().await,
        }
    }

    async fn return_connection(&self, channel: MessageChannel) {
        *self.connection.lock().await = Some(channel);
    }

    pub(crate) async fn fetch_spec(&self, service: &str) -> Result<ServiceSpec, Error> {
        let value = self
            .call("_meta", "service", vec![Value::String(service.to_string())], vec![])
            .await?;
        from_value(value)
    }

    /// Invoke a unary command, retrying per the configured [`RetryPolicy`].
    pub(crate) async fn call(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, Error> {
        self.call_with_upload(service, command, args, kwargs, None).await
    }

    /// Invoke a unary command whose args/kwargs already carry one
    /// `Value::Stream` sentinel; `upload` is the items sent to fill it,
    /// via `StreamStart`/`Data*`/`StreamEnd` right after the `Command`
    /// frame, before the response is awaited.
    pub(crate) async fn call_with_upload(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        upload: Option<Vec<Value>>,
    ) -> Result<Value, Error> {
        self.retry
            .call(|| async {
                let mut channel = self.take_connection().await?;
                let message = Message::command(service, command, args.clone(), kwargs.clone());

                if let Err(err) = channel.send(&message).await {
                    let _ = channel.close().await;
                    return Err(err);
                }

                if let Some(items) = &upload {
                    if let Err(err) = protocol::send_upload_stream(&mut channel, items.clone()).await {
                        let _ = channel.close().await;
                        return Err(err);
                    }
                }

                match channel.recv().await {
                    Ok(Some(reply)) => match reply.op {
                        Op::Data => {
                            self.return_connection(channel).await;
                            Ok(reply.data)
                        }
                        Op::Error => {
                            self.return_connection(channel).await;
                            let (name, msg, traceback) = reply.into_error_parts()?;
                            Err(crate::error::RemoteError::new(name, msg, traceback).into())
                        }
                        other => {
                            let _ = channel.close().await;
                            Err(Error::Parameter(format!("{command} returned a {other} response for a unary call")))
                        }
                    },
                    Ok(None) => {
                        let _ = channel.close().await;
                        Err(TransportError::ReceiveInterrupted.into())
                    }
                    Err(err) => {
                        let _ = channel.close().await;
                        Err(err)
                    }
                }
            })
            .await
    }

    /// Invoke a streaming command. Once the server's response stream
    /// starts, the connection it arrived on is owned by the returned
    /// stream rather than kept for reuse; the next call redials.
    pub(crate) async fn call_stream(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>, Error> {
        self.call_stream_with_upload(service, command, args, kwargs, None).await
    }

    /// As [`Client::call_stream`], but also uploads `upload` to fill a
    /// `Value::Stream` sentinel already present in `args`/`kwargs`.
    pub(crate) async fn call_stream_with_upload(
        &self,
        service: &str,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        upload: Option<Vec<Value>>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>, Error> {
        self.retry
            .call_stream(|| async {
                let mut channel = self.take_connection().await?;
                let message = Message::command(service, command, args.clone(), kwargs.clone());

                if let Err(err) = channel.send(&message).await {
                    let _ = channel.close().await;
                    return Err(err);
                }

                if let Some(items) = &upload {
                    if let Err(err) = protocol::send_upload_stream(&mut channel, items.clone()).await {
                        let _ = channel.close().await;
                        return Err(err);
                    }
                }

                match protocol::read_call_response(channel).await {
                    Ok(CallResponse::Stream(stream)) => Ok(stream),
                    Ok(CallResponse::Unary(_)) => {
                        Err(Error::Parameter(format!("{command} returned a single value but was called as a stream")))
                    }
                    Err(err) => Err(err),
                }
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_to_no_retry() {
        let url = Url::parse("tcp://127.0.0.1:9999").unwrap();
        let client = ClientBuilder::new(url).build().unwrap();
        assert_eq!(client.retry.count, 0);
    }

    #[test]
    fn builder_accepts_codec_and_retry_overrides() {
        let url = Url::parse("tcp://127.0.0.1:9999").unwrap();
        let client = ClientBuilder::new(url)
            .codec("json")
            .retry(RetryPolicy::new(3, std::time::Duration::from_millis(10)))
            .build()
            .unwrap();
        assert_eq!(client.codec_name.as_deref(), Some("json"));
        assert_eq!(client.retry.count, 3);
    }

    #[cfg(feature = "tls")]
    #[test]
    fn tls_is_rejected_on_non_tcp_transports() {
        let url = Url::parse("unix:///tmp/corridor-tls-client-test.sock").unwrap();
        let config = crate::transport::TlsClientConfig::new("/nonexistent/ca.pem", "example.com");
        let err = ClientBuilder::new(url).tls(config).build().unwrap_err();
        assert!(matches!(err, Error::Parameter(_)));
    }
}
