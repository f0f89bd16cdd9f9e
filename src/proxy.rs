//! Client-side service proxies.
//!
//! A [`ServiceProxy`] binds to one named service on a [`Client`]'s server.
//! Its first call fetches that service's [`ServiceSpec`] through the
//! built-in `meta` service and caches it, so later calls can check a
//! command's stream-ness against the caller's expectation before ever
//! dialing out.

use std::pin::Pin;
use std::sync::Arc;

use futures_core::Stream;
use tokio::sync::OnceCell;

use crate::client::Client;
use crate::error::Error;
use crate::service::{ServiceSpec, SignatureSpec};
use crate::value::Value;

pub struct ServiceProxy {
    client: Arc<Client>,
    name: String,
    spec: OnceCell<ServiceSpec>,
}

impl ServiceProxy {
    pub(crate) fn new(client: Arc<Client>, name: String) -> ServiceProxy {
        ServiceProxy { client, name, spec: OnceCell::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn spec(&self) -> Result<&ServiceSpec, Error> {
        self.spec.get_or_try_init(|| self.client.fetch_spec(&self.name)).await
    }

    async fn signature(&self, command: &str) -> Result<&SignatureSpec, Error> {
        let spec = self.spec().await?;
        spec.commands
            .iter()
            .find(|sig| sig.name == command)
            .ok_or_else(|| Error::InvalidCommand(self.name.clone(), command.to_owned()))
    }

    /// Call a unary (non-streaming) remote command.
    ///
    /// Returns `ParameterError` without dialing if `command` is in fact a
    /// streaming command on the server.
    pub async fn call(&self, command: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<Value, Error> {
        let sig = self.signature(command).await?;
        if sig.is_generator {
            return Err(Error::Parameter(format!("{command} is a streaming command, call it with call_stream")));
        }
        self.client.call(&self.name, command, args, kwargs).await
    }

    /// As [`ServiceProxy::call`], but also uploads `upload` to fill the one
    /// `Value::Stream` sentinel that must already be present somewhere in
    /// `args`/`kwargs`.
    pub async fn call_with_upload(
        &self,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        upload: Vec<Value>,
    ) -> Result<Value, Error> {
        let sig = self.signature(command).await?;
        if sig.is_generator {
            return Err(Error::Parameter(format!("{command} is a streaming command, call it with call_stream")));
        }
        require_single_stream_sentinel(&args, &kwargs)?;
        self.client.call_with_upload(&self.name, command, args, kwargs, Some(upload)).await
    }

    /// Call a streaming remote command.
    ///
    /// Returns `ParameterError` without dialing if `command` is in fact a
    /// unary command on the server.
    pub async fn call_stream(
        &self,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>, Error> {
        let sig = self.signature(command).await?;
        if !sig.is_generator {
            return Err(Error::Parameter(format!("{command} is not a streaming command")));
        }
        self.client.call_stream(&self.name, command, args, kwargs).await
    }

    /// As [`ServiceProxy::call_stream`], but also uploads `upload` to fill
    /// the one `Value::Stream` sentinel that must already be present
    /// somewhere in `args`/`kwargs`.
    pub async fn call_stream_with_upload(
        &self,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        upload: Vec<Value>,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>, Error> {
        let sig = self.signature(command).await?;
        if !sig.is_generator {
            return Err(Error::Parameter(format!("{command} is not a streaming command")));
        }
        require_single_stream_sentinel(&args, &kwargs)?;
        self.client.call_stream_with_upload(&self.name, command, args, kwargs, Some(upload)).await
    }
}

/// Checks that exactly one argument slot (positional or keyword) carries a
/// `Value::Stream` sentinel, matching the server's own dispatch-time check.
fn require_single_stream_sentinel(args: &[Value], kwargs: &[(String, Value)]) -> Result<(), Error> {
    let count = args.iter().filter(|v| matches!(v, Value::Stream)).count()
        + kwargs.iter().filter(|(_, v)| matches!(v, Value::Stream)).count();
    match count {
        1 => Ok(()),
        0 => Err(Error::Parameter("no Value::Stream sentinel found for the upload argument".into())),
        _ => Err(Error::Parameter("at most one streamed argument is supported".into())),
    }
}
