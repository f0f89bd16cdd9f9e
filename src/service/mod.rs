//! Service registration, metadata, and the per-connection dispatch trait.
//!
//! A [`Service`] is anything that can answer named commands. Unlike the
//! reflection-driven dispatch of a dynamic host language, a `Service` here
//! hand-declares its [`ServiceSpec`] and matches on the command name in
//! [`Service::call`] — there's no decorator or side-table of attached
//! metadata to walk, just an explicit table.

mod meta;
mod registry;

use async_trait::async_trait;
use futures_core::Stream;
use std::pin::Pin;

use crate::error::Error;
use crate::value::Value;

pub use meta::{MetadataService, ServerInfo};
pub use registry::{Registry, RegistryBuilder};

/// How a [`ParameterSpec`] binds to a call's positional/keyword arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

/// Describes one parameter of a command.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub doc: Option<String>,
    pub kind: ParamKind,
    pub annotation: Option<String>,
    pub default: Option<Value>,
    pub has_default: bool,
    /// Omitted from a client-visible signature (e.g. a constructor-injected
    /// dependency like a back-reference to the server).
    pub hide: bool,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> ParameterSpec {
        ParameterSpec {
            name: name.into(),
            doc: None,
            kind,
            annotation: None,
            default: None,
            has_default: false,
            hide: false,
        }
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> ParameterSpec {
        self.annotation = Some(annotation.into());
        self
    }

    pub fn with_default(mut self, default: Value) -> ParameterSpec {
        self.default = Some(default);
        self.has_default = true;
        self
    }
}

/// Describes one command's full call signature.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SignatureSpec {
    pub name: String,
    pub doc: Option<String>,
    pub parameters: Vec<ParameterSpec>,
    pub return_annotation: Option<String>,
    pub is_generator: bool,
}

impl SignatureSpec {
    pub fn new(name: impl Into<String>) -> SignatureSpec {
        SignatureSpec {
            name: name.into(),
            doc: None,
            parameters: Vec::new(),
            return_annotation: None,
            is_generator: false,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> SignatureSpec {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ParameterSpec>) -> SignatureSpec {
        self.parameters = parameters;
        self
    }

    pub fn generator(mut self) -> SignatureSpec {
        self.is_generator = true;
        self
    }
}

/// Describes one service's published command set.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub doc: Option<String>,
    pub commands: Vec<SignatureSpec>,
}

/// What invoking a command produced: either a single value, or a stream of
/// values delivered as `StreamStart`, `Data*`, `StreamEnd`.
pub enum CallOutcome {
    Unary(Value),
    Stream(Pin<Box<dyn Stream<Item = Result<Value, Error>> + Send>>),
}

impl CallOutcome {
    pub fn is_stream(&self) -> bool {
        matches!(self, CallOutcome::Stream(_))
    }
}

/// A named, callable service.
///
/// A stream-sentinel argument has already been resolved to a concrete
/// [`Value::Array`] of the items the client uploaded by the time `call`
/// runs — see [`crate::protocol`].
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    fn spec(&self) -> ServiceSpec;

    async fn call(
        &self,
        command: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<CallOutcome, Error>;
}

/// Names a service exposes publicly; names starting with `_` are
/// internal/hidden (reserved for built-ins like the real name of `meta`).
pub fn is_public(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_public_hides_underscore_prefixed_names() {
        assert!(is_public("echo"));
        assert!(!is_public("_meta"));
        assert!(!is_public(""));
    }

    #[test]
    fn signature_spec_round_trips_through_value() {
        let spec = SignatureSpec::new("add")
            .with_doc("adds two numbers")
            .with_parameters(vec![
                ParameterSpec::new("a", ParamKind::PositionalOrKeyword).with_annotation("int"),
                ParameterSpec::new("b", ParamKind::PositionalOrKeyword)
                    .with_annotation("int")
                    .with_default(Value::Int(1)),
            ]);
        let value = crate::value::to_value(&spec).unwrap();
        let back: SignatureSpec = crate::value::from_value(value).unwrap();
        assert_eq!(spec, back);
    }
}
