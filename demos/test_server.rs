#![deny(warnings)]
//! A server exercising the less common corners: a Unix socket transport,
//! `remote_tracebacks` turned on, and a command that always fails, so the
//! error-reporting path can be poked at manually.
//!
//! ```bash
//! cargo run --example test_server -- unix:///tmp/corridor-test.sock
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use corridor_rpc::service::{CallOutcome, ParamKind, ParameterSpec, Service, ServiceSpec, SignatureSpec};
use corridor_rpc::{Error, Server, Url, Value};

struct Flaky;

#[async_trait]
impl Service for Flaky {
    fn name(&self) -> &str {
        "flaky"
    }

    fn spec(&self) -> ServiceSpec {
        ServiceSpec {
            name: "flaky".into(),
            doc: Some("always fails, for exercising the error-reporting path".into()),
            commands: vec![SignatureSpec::new("boom")
                .with_doc("raises a RemoteError")
                .with_parameters(vec![ParameterSpec::new("reason", ParamKind::PositionalOrKeyword)
                    .with_default(Value::String("kaboom".into()))])],
        }
    }

    async fn call(&self, command: &str, args: Vec<Value>, _kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
        match command {
            "boom" => {
                let reason = args.first().and_then(Value::as_str).unwrap_or("kaboom").to_string();
                Err(Error::Parameter(reason))
            }
            other => Err(Error::InvalidCommand("flaky".into(), other.into())),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "unix:///tmp/corridor-test.sock".to_string());
    let server = Server::builder(Url::parse(&url)?)
        .remote_tracebacks(true)
        .register("flaky", Arc::new(Flaky))?
        .build()?;

    tracing::info!(%url, "test_server starting, remote_tracebacks=true");
    server.serve().await?;
    Ok(())
}
