//! The message engine: framed `(op, data)` exchange over a negotiated
//! [`Connection`]/[`Codec`] pair, and the server-side command dispatch
//! that sits on top of it.
//!
//! Everything here is transport- and codec-agnostic; [`crate::server`] and
//! [`crate::client`] supply the `Connection` (via [`crate::transport`]) and
//! drive the handshake (via [`crate::handshake`]) before handing a
//! [`MessageChannel`] to these functions.

use futures_core::Stream;
use futures_util::StreamExt;
use tracing::debug;

use crate::codec::Codec;
use crate::error::{Error, TransportError};
use crate::message::{Message, Op};
use crate::service::{CallOutcome, Registry};
use crate::value::Value;

/// A connection with a codec already negotiated onto it. Every
/// [`Message`] sent or received passes through here: the codec turns its
/// `data` into bytes, the connection frames those bytes.
pub struct MessageChannel {
    connection: Box<dyn crate::transport::Connection>,
    codec: Box<dyn Codec>,
}

impl MessageChannel {
    pub fn new(connection: Box<dyn crate::transport::Connection>, codec: Box<dyn Codec>) -> MessageChannel {
        MessageChannel { connection, codec }
    }

    pub fn remote_url(&self) -> &str {
        self.connection.remote_url()
    }

    pub fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// Encodes the whole `(op, data)` tuple through the negotiated codec,
    /// then hands the result to the connection for framing.
    pub async fn send(&mut self, message: &Message) -> Result<(), Error> {
        let envelope = Value::Array(vec![Value::Int(message.op.as_u8() as i64), message.data.clone()]);
        let payload = self.codec.encode(&envelope)?;
        self.connection.send(&payload).await
    }

    /// Returns `None` if the peer closed the connection cleanly between
    /// messages.
    pub async fn recv(&mut self) -> Result<Option<Message>, Error> {
        let Some(frame) = self.connection.recv().await? else {
            return Ok(None);
        };
        let envelope = self.codec.decode(&frame)?;
        let Value::Array(mut parts) = envelope else {
            return Err(Error::Parameter("message envelope must be a 2-element array".into()));
        };
        if parts.len() != 2 {
            return Err(Error::Parameter(format!("message envelope must have 2 elements, got {}", parts.len())));
        }
        let data = parts.pop().unwrap();
        let op_byte = match parts.pop().unwrap() {
            Value::Int(n) => u8::try_from(n).map_err(|_| Error::Parameter(format!("message op out of range: {n}")))?,
            other => return Err(Error::Parameter(format!("message op must be an int, got {other}"))),
        };
        Ok(Some(Message::new(Op::from_u8(op_byte)?, data)))
    }

    pub async fn close(&mut self) -> Result<(), Error> {
        self.connection.close().await
    }
}

/// Read a complete uploaded stream: the `StreamStart` message the sender
/// already emitted, then `Data` items until `StreamEnd`. An `Error`
/// message mid-stream is raised as a [`crate::error::RemoteError`].
pub async fn read_upload_stream(channel: &mut MessageChannel) -> Result<Vec<Value>, Error> {
    match channel.recv().await?.ok_or(TransportError::ReceiveInterrupted)?.op {
        Op::StreamStart => {}
        other => return Err(Error::ProtocolOp(other.as_u8())),
    }

    let mut items = Vec::new();
    loop {
        let message = channel.recv().await?.ok_or(TransportError::ReceiveInterrupted)?;
        match message.op {
            Op::Data => items.push(message.data),
            Op::StreamEnd => return Ok(items),
            Op::Error => {
                let (name, msg, traceback) = message.into_error_parts()?;
                return Err(crate::error::RemoteError::new(name, msg, traceback).into());
            }
            other => return Err(Error::ProtocolOp(other.as_u8())),
        }
    }
}

/// Write a complete stream upload: `StreamStart`, one `Data` per item,
/// `StreamEnd`.
pub async fn send_upload_stream(channel: &mut MessageChannel, items: Vec<Value>) -> Result<(), Error> {
    channel.send(&Message::stream_start()).await?;
    for item in items {
        channel.send(&Message::data(item)).await?;
    }
    channel.send(&Message::stream_end()).await
}

/// Serve exactly one request/response cycle on `channel`.
///
/// Returns `Ok(false)` once the peer has cleanly closed the connection
/// (no more requests will arrive); `Ok(true)` to keep looping.
/// `TransportError`s propagate to the caller, which should terminate the
/// connection's handler task; any other failure during dispatch is
/// reported back to the peer as an `Error` message and the loop
/// continues.
pub async fn serve_one(channel: &mut MessageChannel, registry: &Registry, remote_tracebacks: bool) -> Result<bool, Error> {
    let message = match channel.recv().await {
        Ok(Some(message)) => message,
        Ok(None) => return Ok(false),
        Err(err) if err.is_transport() => return Err(err),
        Err(err) => {
            send_error(channel, err, remote_tracebacks).await?;
            return Ok(true);
        }
    };

    if message.op != Op::Command {
        send_error(channel, Error::ProtocolOp(message.op.as_u8()), remote_tracebacks).await?;
        return Ok(true);
    }

    let result = dispatch(channel, registry, message).await;
    match result {
        Err(err) if err.is_transport() => return Err(err),
        Err(err) => send_error(channel, err, remote_tracebacks).await?,
        Ok(CallOutcome::Unary(value)) => channel.send(&Message::data(value)).await?,
        Ok(CallOutcome::Stream(mut stream)) => {
            channel.send(&Message::stream_start()).await?;
            loop {
                match stream.next().await {
                    Some(Ok(item)) => channel.send(&Message::data(item)).await?,
                    Some(Err(err)) => {
                        send_error(channel, err, remote_tracebacks).await?;
                        break;
                    }
                    None => {
                        channel.send(&Message::stream_end()).await?;
                        break;
                    }
                }
            }
        }
    }
    Ok(true)
}

async fn send_error(channel: &mut MessageChannel, err: Error, remote_tracebacks: bool) -> Result<(), Error> {
    let (name, message, traceback) = err.into_wire_parts(remote_tracebacks);
    channel.send(&Message::error(&name, &message, &traceback)).await
}

async fn dispatch(channel: &mut MessageChannel, registry: &Registry, message: Message) -> Result<CallOutcome, Error> {
    let (service_name, command_name, mut args, mut kwargs) = message.into_command()?;
    debug!(url = channel.remote_url(), "cmd: {service_name}.{command_name} <-");

    let service = registry.get(&service_name)?;

    let sentinel_in_args = args.iter().position(|v| matches!(v, Value::Stream));
    let sentinel_in_kwargs = kwargs.iter().position(|(_, v)| matches!(v, Value::Stream));
    if sentinel_in_args.is_some() && sentinel_in_kwargs.is_some() {
        return Err(Error::Parameter("at most one streamed argument is supported".into()));
    }

    if let Some(index) = sentinel_in_args {
        let items = read_upload_stream(channel).await?;
        args[index] = Value::Array(items);
    } else if let Some(index) = sentinel_in_kwargs {
        let items = read_upload_stream(channel).await?;
        kwargs[index].1 = Value::Array(items);
    }

    let outcome = service.call(&command_name, args, kwargs).await;
    debug!(url = channel.remote_url(), "cmd: {service_name}.{command_name} ->");
    outcome
}

/// Read the response to a `Command` already sent by a client: a unary
/// `Data` value, a `RemoteError`, or a lazy stream starting with
/// `StreamStart`.
pub enum CallResponse {
    Unary(Value),
    Stream(Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>),
}

use std::pin::Pin;

/// Read the first message of a command's response and classify it.
/// For a streamed response, the returned stream reads subsequent
/// messages from `channel` lazily as it's polled.
pub async fn read_call_response(mut channel: MessageChannel) -> Result<CallResponse, Error> {
    let message = channel.recv().await?.ok_or(TransportError::ReceiveInterrupted)?;
    match message.op {
        Op::Data => Ok(CallResponse::Unary(message.data)),
        Op::Error => {
            let (name, msg, traceback) = message.into_error_parts()?;
            Err(crate::error::RemoteError::new(name, msg, traceback).into())
        }
        Op::StreamStart => Ok(CallResponse::Stream(Box::pin(response_stream(channel)))),
        other => Err(Error::ProtocolOp(other.as_u8())),
    }
}

/// A lazy stream over a channel's `Data*`/`StreamEnd` tail. Owns the
/// channel so nothing else can interleave reads on it, matching the
/// protocol's no-multiplexing guarantee. Yields `None` (ending the
/// stream) once `StreamEnd`, an `Error`, or a closed connection is seen.
fn response_stream(channel: MessageChannel) -> impl Stream<Item = Result<Value, Error>> + Send {
    futures_util::stream::unfold(Some(channel), |state| async move {
        let mut channel = state?;
        let outcome = match channel.recv().await {
            Ok(None) => Err(TransportError::ReceiveInterrupted.into()),
            Ok(Some(message)) => match message.op {
                Op::Data => return Some((Ok(message.data), Some(channel))),
                Op::StreamEnd => return None,
                Op::Error => match message.into_error_parts() {
                    Ok((name, msg, traceback)) => Err(crate::error::RemoteError::new(name, msg, traceback).into()),
                    Err(err) => Err(err),
                },
                other => Err(Error::ProtocolOp(other.as_u8())),
            },
            Err(err) => Err(err),
        };
        Some((outcome, None))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, JsonCodec};
    use crate::service::{RegistryBuilder, Service, ServiceSpec};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct PairedConnection {
        outbox: Arc<Mutex<Vec<Vec<u8>>>>,
        inbox: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl crate::transport::Connection for PairedConnection {
        async fn send(&mut self, data: &[u8]) -> Result<(), Error> {
            self.outbox.lock().unwrap().push(data.to_vec());
            Ok(())
        }
        async fn recv(&mut self) -> Result<Option<Vec<u8>>, Error> {
            let mut inbox = self.inbox.lock().unwrap();
            if inbox.is_empty() {
                Ok(None)
            } else {
                Ok(Some(inbox.remove(0)))
            }
        }
        fn remote_url(&self) -> &str {
            "test://peer"
        }
    }

    struct Echo;

    #[async_trait]
    impl Service for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn spec(&self) -> ServiceSpec {
            ServiceSpec { name: "echo".into(), doc: None, commands: vec![] }
        }
        async fn call(&self, command: &str, args: Vec<Value>, _kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
            match command {
                "call" => Ok(CallOutcome::Unary(args.into_iter().next().unwrap_or(Value::Null))),
                other => Err(Error::InvalidCommand("echo".into(), other.into())),
            }
        }
    }

    fn channel_with_inbox(frames: Vec<Vec<u8>>) -> MessageChannel {
        channel_with_inbox_and_outbox(frames).0
    }

    fn channel_with_inbox_and_outbox(frames: Vec<Vec<u8>>) -> (MessageChannel, Arc<Mutex<Vec<Vec<u8>>>>) {
        let outbox = Arc::new(Mutex::new(Vec::new()));
        let connection = PairedConnection { outbox: outbox.clone(), inbox: Mutex::new(frames) };
        (MessageChannel::new(Box::new(connection), Box::new(JsonCodec::default())), outbox)
    }

    fn frame(codec: &JsonCodec, op: Op, value: &Value) -> Vec<u8> {
        let envelope = Value::Array(vec![Value::Int(op.as_u8() as i64), value.clone()]);
        codec.encode(&envelope).unwrap()
    }

    fn decode_sent(codec: &JsonCodec, frame: &[u8]) -> (Op, Value) {
        let Value::Array(mut parts) = codec.decode(frame).unwrap() else {
            panic!("expected a 2-element array envelope");
        };
        let data = parts.pop().unwrap();
        let op = match parts.pop().unwrap() {
            Value::Int(n) => Op::from_u8(n as u8).unwrap(),
            other => panic!("expected an int op, got {other:?}"),
        };
        (op, data)
    }

    #[tokio::test]
    async fn serve_one_dispatches_unary_command() {
        let codec = JsonCodec::default();
        let command = Message::command("echo", "call", vec![Value::Int(42)], vec![]);
        let (mut channel, outbox) = channel_with_inbox_and_outbox(vec![frame(&codec, Op::Command, &command.data)]);

        let mut registry = RegistryBuilder::new();
        registry.register("echo", Arc::new(Echo)).unwrap();
        let registry = registry.build();

        let more = serve_one(&mut channel, &registry, false).await.unwrap();
        assert!(more);

        let sent = outbox.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (op, data) = decode_sent(&codec, &sent[0]);
        assert_eq!(op, Op::Data);
        assert_eq!(data, Value::Int(42));
    }

    #[tokio::test]
    async fn serve_one_reports_unknown_service_as_error_message() {
        let codec = JsonCodec::default();
        let command = Message::command("nope", "call", vec![], vec![]);
        let (mut channel, outbox) = channel_with_inbox_and_outbox(vec![frame(&codec, Op::Command, &command.data)]);
        let registry = RegistryBuilder::new().build();

        let more = serve_one(&mut channel, &registry, false).await.unwrap();
        assert!(more);

        let sent = outbox.lock().unwrap();
        let (op, data) = decode_sent(&codec, &sent[0]);
        assert_eq!(op, Op::Error);
        let (name, _, _) = Message::new(Op::Error, data).into_error_parts().unwrap();
        assert_eq!(name, "InvalidService");
    }

    #[tokio::test]
    async fn serve_one_returns_false_on_clean_close() {
        let mut channel = channel_with_inbox(vec![]);
        let registry = RegistryBuilder::new().build();
        let more = serve_one(&mut channel, &registry, false).await.unwrap();
        assert!(!more);
    }

    #[tokio::test]
    async fn read_upload_stream_collects_items_until_stream_end() {
        let codec = JsonCodec::default();
        let frames = vec![
            frame(&codec, Op::StreamStart, &Value::Null),
            frame(&codec, Op::Data, &Value::Int(1)),
            frame(&codec, Op::Data, &Value::Int(2)),
            frame(&codec, Op::StreamEnd, &Value::Null),
        ];
        let mut channel = channel_with_inbox(frames);
        let items = read_upload_stream(&mut channel).await.unwrap();
        assert_eq!(items, vec![Value::Int(1), Value::Int(2)]);
    }

    #[tokio::test]
    async fn read_upload_stream_raises_on_mid_stream_error() {
        let codec = JsonCodec::default();
        let error_data = Value::Array(vec![
            Value::String("Boom".into()),
            Value::String("bad item".into()),
            Value::String("".into()),
        ]);
        let frames = vec![frame(&codec, Op::StreamStart, &Value::Null), frame(&codec, Op::Error, &error_data)];
        let mut channel = channel_with_inbox(frames);
        let err = read_upload_stream(&mut channel).await.unwrap_err();
        assert!(matches!(err, Error::Remote(_)));
    }
}
