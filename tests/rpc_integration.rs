//! End-to-end tests driving a real [`Server`] over a Unix domain socket
//! with a real [`Client`], exercising unary calls, streaming calls, the
//! `meta` service, and error propagation across the wire.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;

use corridor_rpc::service::{CallOutcome, ParamKind, ParameterSpec, Service, ServiceSpec, SignatureSpec};
use corridor_rpc::{Client, Error, Server, Url, Value};

struct Calculator;

#[async_trait]
impl Service for Calculator {
    fn name(&self) -> &str {
        "calc"
    }

    fn spec(&self) -> ServiceSpec {
        ServiceSpec {
            name: "calc".into(),
            doc: None,
            commands: vec![
                SignatureSpec::new("add").with_parameters(vec![
                    ParameterSpec::new("a", ParamKind::PositionalOrKeyword),
                    ParameterSpec::new("b", ParamKind::PositionalOrKeyword),
                ]),
                SignatureSpec::new("count_to")
                    .with_parameters(vec![ParameterSpec::new("n", ParamKind::PositionalOrKeyword)])
                    .generator(),
                SignatureSpec::new("divide").with_parameters(vec![
                    ParameterSpec::new("a", ParamKind::PositionalOrKeyword),
                    ParameterSpec::new("b", ParamKind::PositionalOrKeyword),
                ]),
                SignatureSpec::new("sum_stream")
                    .with_parameters(vec![ParameterSpec::new("items", ParamKind::PositionalOrKeyword)]),
            ],
        }
    }

    async fn call(&self, command: &str, args: Vec<Value>, _kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
        match command {
            "add" => {
                let (a, b) = (int_arg(&args, 0), int_arg(&args, 1));
                Ok(CallOutcome::Unary(Value::Int(a + b)))
            }
            "count_to" => {
                let n = int_arg(&args, 0).max(0);
                let items: Vec<Result<Value, Error>> = (1..=n).map(Value::Int).map(Ok).collect();
                Ok(CallOutcome::Stream(Box::pin(futures_util::stream::iter(items))))
            }
            "divide" => {
                let (a, b) = (int_arg(&args, 0), int_arg(&args, 1));
                if b == 0 {
                    return Err(Error::Parameter("division by zero".into()));
                }
                Ok(CallOutcome::Unary(Value::Int(a / b)))
            }
            "sum_stream" => {
                let Some(Value::Array(items)) = args.into_iter().next() else {
                    return Err(Error::Parameter("sum_stream expects its uploaded items".into()));
                };
                let total: i64 = items
                    .iter()
                    .map(|v| match v {
                        Value::Int(n) => *n,
                        _ => 0,
                    })
                    .sum();
                Ok(CallOutcome::Unary(Value::Int(total)))
            }
            other => Err(Error::InvalidCommand("calc".into(), other.into())),
        }
    }
}

fn int_arg(args: &[Value], i: usize) -> i64 {
    match args.get(i) {
        Some(Value::Int(n)) => *n,
        _ => 0,
    }
}

async fn spawn_server() -> (Arc<corridor_rpc::server::Server>, Url, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("corridor.sock");
    let url = Url::parse(&format!("unix://{}", path.display())).unwrap();

    let server = Arc::new(
        Server::builder(url.clone())
            .version("test")
            .register("calc", Arc::new(Calculator))
            .unwrap()
            .build()
            .unwrap(),
    );

    let serve_handle = Arc::clone(&server);
    tokio::spawn(async move {
        let _ = serve_handle.serve().await;
    });

    // Give the accept loop a moment to bind before a client dials.
    for _ in 0..50 {
        if tokio::net::UnixStream::connect(&path).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    (server, url, dir)
}

#[tokio::test]
async fn unary_call_round_trips() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    let sum = calc.call("add", vec![Value::Int(2), Value::Int(3)], vec![]).await.unwrap();
    assert_eq!(sum, Value::Int(5));

    server.stop();
}

#[tokio::test]
async fn streaming_call_yields_every_item_in_order() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    let mut stream = calc.call_stream("count_to", vec![Value::Int(4)], vec![]).await.unwrap();

    let mut items = Vec::new();
    while let Some(item) = stream.next().await {
        items.push(item.unwrap());
    }
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);

    server.stop();
}

#[tokio::test]
async fn remote_error_surfaces_as_remote_error() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    let err = calc.call("divide", vec![Value::Int(1), Value::Int(0)], vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));
    assert!(err.to_string().contains("division by zero"));

    server.stop();
}

#[tokio::test]
async fn meta_service_reports_registered_services() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let meta = client.service("_meta");
    let names = meta.call("service_names", vec![], vec![]).await.unwrap();
    assert_eq!(names, Value::Array(vec![Value::String("calc".into())]));

    let spec_value = meta.call("service", vec![Value::String("calc".into())], vec![]).await.unwrap();
    let spec: ServiceSpec = corridor_rpc::value::from_value(spec_value).unwrap();
    assert_eq!(spec.name, "calc");
    assert!(spec.commands.iter().any(|c| c.name == "count_to" && c.is_generator));

    server.stop();
}

#[tokio::test]
async fn proxy_rejects_streaming_call_on_unary_command() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    let err = calc.call_stream("add", vec![Value::Int(1), Value::Int(2)], vec![]).await.unwrap_err();
    assert!(matches!(err, Error::Parameter(_)));

    server.stop();
}

#[tokio::test]
async fn upload_stream_argument_is_collected_server_side() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    let upload = vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)];
    let total = calc.call_with_upload("sum_stream", vec![Value::Stream], vec![], upload).await.unwrap();
    assert_eq!(total, Value::Int(10));

    server.stop();
}

#[tokio::test]
async fn client_reuses_connection_across_unary_calls() {
    let (server, url, _dir) = spawn_server().await;
    let client = Client::builder(url).build().unwrap();

    let calc = client.service("calc");
    for expected in [2, 4, 6] {
        let sum = calc.call("add", vec![Value::Int(expected / 2), Value::Int(expected / 2)], vec![]).await.unwrap();
        assert_eq!(sum, Value::Int(expected));
    }

    server.stop();
}
