#![deny(warnings)]
//! Connects to `echo_server`, makes a unary call and a streaming call.
//!
//! ```bash
//! cargo run --example echo_client -- tcp://127.0.0.1:12321
//! ```

use futures_util::StreamExt;

use corridor_rpc::{Client, Url, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let url = std::env::args().nth(1).unwrap_or_else(|| "tcp://127.0.0.1:12321".to_string());
    let client = Client::builder(Url::parse(&url)?).build()?;

    let echo = client.service("echo");
    let value = echo.call("call", vec![Value::String("hello".into())], vec![]).await?;
    println!("call -> {value}");

    let mut stream = echo.call_stream("repeat", vec![Value::String("hi".into()), Value::Int(3)], vec![]).await?;
    while let Some(item) = stream.next().await {
        println!("repeat -> {}", item?);
    }

    let meta = client.service("_meta");
    let names = meta.call("service_names", vec![], vec![]).await?;
    println!("services -> {names}");

    Ok(())
}
