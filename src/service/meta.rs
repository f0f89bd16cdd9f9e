//! The built-in `meta` service, registered under the internal name
//! `_meta` on every server so it's excluded from
//! [`Registry::public_names`]. Lets a client bootstrap a [`ServiceProxy`]
//! for any other service without out-of-band knowledge of its signature.
//!
//! [`ServiceProxy`]: crate::proxy::ServiceProxy

use std::sync::Weak;

use async_trait::async_trait;

use super::registry::Registry;
use super::{CallOutcome, Service, ServiceSpec};
use crate::error::Error;
use crate::value::{to_value, Value};

/// The handful of server-wide facts and the registry `meta` reports on.
/// Held behind an `Arc` by [`crate::server::Server`]; `MetadataService`
/// keeps only a [`Weak`] back-reference so the cycle doesn't leak.
pub struct ServerInfo {
    pub version: Option<String>,
    pub codec_name: String,
    pub transport_name: String,
    pub registry: Registry,
}

pub struct MetadataService {
    server: Weak<ServerInfo>,
}

impl MetadataService {
    pub fn new(server: Weak<ServerInfo>) -> MetadataService {
        MetadataService { server }
    }

    fn server(&self) -> Result<std::sync::Arc<ServerInfo>, Error> {
        self.server.upgrade().ok_or_else(|| Error::InvalidService("server is shutting down".into()))
    }
}

#[async_trait]
impl Service for MetadataService {
    fn name(&self) -> &str {
        "meta"
    }

    fn spec(&self) -> ServiceSpec {
        use super::{ParamKind, ParameterSpec, SignatureSpec};

        ServiceSpec {
            name: "meta".to_string(),
            doc: Some("built-in service metadata and signature discovery".to_string()),
            commands: vec![
                SignatureSpec::new("status").with_doc("server codec/transport/version"),
                SignatureSpec::new("service_names").with_doc("public service names"),
                SignatureSpec::new("services").with_doc("specs for every public service"),
                SignatureSpec::new("service")
                    .with_doc("spec for one named service")
                    .with_parameters(vec![ParameterSpec::new("name", ParamKind::PositionalOrKeyword)
                        .with_annotation("str")]),
            ],
        }
    }

    async fn call(&self, command: &str, args: Vec<Value>, kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
        let server = self.server()?;

        match command {
            "status" => {
                let status = Value::Map(vec![
                    ("codec".into(), Value::String(server.codec_name.clone())),
                    ("transport".into(), Value::String(server.transport_name.clone())),
                    (
                        "version".into(),
                        server.version.clone().map(Value::String).unwrap_or(Value::Null),
                    ),
                ]);
                Ok(CallOutcome::Unary(status))
            }
            "service_names" => {
                let names = server.registry.public_names().into_iter().map(Value::String).collect();
                Ok(CallOutcome::Unary(Value::Array(names)))
            }
            "services" => {
                let specs: Result<Vec<Value>, Error> =
                    server.registry.public_specs().iter().map(to_value).collect();
                Ok(CallOutcome::Unary(Value::Array(specs?)))
            }
            "service" => {
                let name = first_string_arg("name", &args, &kwargs)?;
                let svc = server.registry.get(&name)?;
                Ok(CallOutcome::Unary(to_value(&svc.spec())?))
            }
            other => Err(Error::InvalidCommand("meta".to_string(), other.to_string())),
        }
    }
}

fn first_string_arg(param: &str, args: &[Value], kwargs: &[(String, Value)]) -> Result<String, Error> {
    let value = args
        .first()
        .cloned()
        .or_else(|| kwargs.iter().find(|(k, _)| k == param).map(|(_, v)| v.clone()))
        .ok_or_else(|| Error::Parameter(format!("missing argument: {param}")))?;
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::Parameter(format!("{param} must be a string")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::registry::RegistryBuilder;
    use std::sync::Arc;

    #[tokio::test]
    async fn status_reports_server_facts() {
        let info = Arc::new_cyclic(|_weak| ServerInfo {
            version: Some("1.0".into()),
            codec_name: "msgpack".into(),
            transport_name: "tcp".into(),
            registry: RegistryBuilder::new().build(),
        });
        let meta = MetadataService::new(Arc::downgrade(&info));
        let outcome = meta.call("status", vec![], vec![]).await.unwrap();
        let CallOutcome::Unary(value) = outcome else { panic!("expected unary") };
        assert_eq!(value.get("codec"), Some(&Value::String("msgpack".into())));
    }

    #[tokio::test]
    async fn unknown_command_is_invalid_command() {
        let info = Arc::new_cyclic(|_weak| ServerInfo {
            version: None,
            codec_name: "msgpack".into(),
            transport_name: "tcp".into(),
            registry: RegistryBuilder::new().build(),
        });
        let meta = MetadataService::new(Arc::downgrade(&info));
        let err = meta.call("bogus", vec![], vec![]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidCommand(_, _)));
    }
}
