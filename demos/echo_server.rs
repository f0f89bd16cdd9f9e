#![deny(warnings)]
//! A minimal server exposing one service, `echo`, with a unary command and
//! a streaming command. Pair with `echo_client`.
//!
//! ```bash
//! cargo run --example echo_server -- tcp://127.0.0.1:12321
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;

use corridor_rpc::service::{CallOutcome, ParamKind, ParameterSpec, Service, ServiceSpec, SignatureSpec};
use corridor_rpc::{Error, Server, Url, Value};

struct Echo;

#[async_trait]
impl Service for Echo {
    fn name(&self) -> &str {
        "echo"
    }

    fn spec(&self) -> ServiceSpec {
        ServiceSpec {
            name: "echo".into(),
            doc: Some("echoes values back, unary or streamed".into()),
            commands: vec![
                SignatureSpec::new("call")
                    .with_doc("returns its single argument unchanged")
                    .with_parameters(vec![ParameterSpec::new("value", ParamKind::PositionalOrKeyword)]),
                SignatureSpec::new("repeat")
                    .with_doc("streams `value` back `count` times")
                    .with_parameters(vec![
                        ParameterSpec::new("value", ParamKind::PositionalOrKeyword),
                        ParameterSpec::new("count", ParamKind::PositionalOrKeyword).with_default(Value::Int(3)),
                    ])
                    .generator(),
            ],
        }
    }

    async fn call(&self, command: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
        match command {
            "call" => {
                let value = arg("value", 0, &args, &kwargs).unwrap_or(Value::Null);
                Ok(CallOutcome::Unary(value))
            }
            "repeat" => {
                let value = arg("value", 0, &args, &kwargs).unwrap_or(Value::Null);
                let count = match arg("count", 1, &args, &kwargs) {
                    Some(Value::Int(n)) => n.max(0) as usize,
                    _ => 3,
                };
                let items: Vec<Result<Value, Error>> = std::iter::repeat(value).take(count).map(Ok).collect();
                Ok(CallOutcome::Stream(Box::pin(stream::iter(items))))
            }
            other => Err(Error::InvalidCommand("echo".into(), other.into())),
        }
    }
}

fn arg(name: &str, position: usize, args: &[Value], kwargs: &[(String, Value)]) -> Option<Value> {
    args.get(position)
        .cloned()
        .or_else(|| kwargs.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "tcp://127.0.0.1:12321".to_string());
    let server = Server::builder(Url::parse(&url)?)
        .version(env!("CARGO_PKG_VERSION"))
        .register("echo", Arc::new(Echo))?
        .build()?;

    tracing::info!(%url, "echo_server starting");
    server.serve().await?;
    Ok(())
}
