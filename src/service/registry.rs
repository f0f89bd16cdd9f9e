use std::collections::HashMap;
use std::sync::Arc;

use super::{Service, ServiceSpec};
use crate::error::Error;

/// The server's table of registered services, keyed by name.
///
/// Built once at server construction and shared read-only across
/// connection handler tasks behind an `Arc`; see
/// [`crate::server::ServerBuilder`].
pub struct Registry {
    services: HashMap<String, Arc<dyn Service>>,
}

impl Registry {
    pub(crate) fn new(services: HashMap<String, Arc<dyn Service>>) -> Registry {
        Registry { services }
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Service>, Error> {
        self.services
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidService(name.to_owned()))
    }

    /// Publicly visible service names: those not starting with `_`.
    pub fn public_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .services
            .keys()
            .filter(|name| super::is_public(name))
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Specs for every publicly visible service, sorted by name.
    pub fn public_specs(&self) -> Vec<ServiceSpec> {
        self.public_names()
            .into_iter()
            .filter_map(|name| self.services.get(&name).map(|svc| svc.spec()))
            .collect()
    }
}

/// Accumulates named services before they're sealed into an immutable
/// [`Registry`]. Detects duplicate registrations up front, the way the
/// original class-registry metaclass rejected a duplicate `_name_` at
/// import time.
#[derive(Default)]
pub struct RegistryBuilder {
    services: HashMap<String, Arc<dyn Service>>,
}

impl RegistryBuilder {
    pub fn new() -> RegistryBuilder {
        RegistryBuilder { services: HashMap::new() }
    }

    pub fn register(&mut self, name: impl Into<String>, service: Arc<dyn Service>) -> Result<(), Error> {
        let name = name.into();
        if self.services.contains_key(&name) {
            return Err(Error::Registry(name));
        }
        self.services.insert(name, service);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    pub(crate) fn build(self) -> Registry {
        Registry::new(self.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CallOutcome;
    use crate::value::Value;

    struct Dummy(&'static str);

    #[async_trait::async_trait]
    impl Service for Dummy {
        fn name(&self) -> &str {
            self.0
        }
        fn spec(&self) -> ServiceSpec {
            ServiceSpec { name: self.0.to_string(), doc: None, commands: vec![] }
        }
        async fn call(&self, _cmd: &str, _args: Vec<Value>, _kwargs: Vec<(String, Value)>) -> Result<CallOutcome, Error> {
            Ok(CallOutcome::Unary(Value::Null))
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut builder = RegistryBuilder::new();
        builder.register("echo", Arc::new(Dummy("echo"))).unwrap();
        let err = builder.register("echo", Arc::new(Dummy("echo"))).unwrap_err();
        assert!(matches!(err, Error::Registry(_)));
    }

    #[test]
    fn public_names_excludes_underscore_prefixed() {
        let mut builder = RegistryBuilder::new();
        builder.register("echo", Arc::new(Dummy("echo"))).unwrap();
        builder.register("_meta", Arc::new(Dummy("_meta"))).unwrap();
        let registry = builder.build();
        assert_eq!(registry.public_names(), vec!["echo".to_string()]);
    }

    #[test]
    fn get_unknown_service_is_invalid_service() {
        let registry = RegistryBuilder::new().build();
        assert!(matches!(registry.get("nope"), Err(Error::InvalidService(_))));
    }

    #[test]
    fn is_registered_reflects_prior_registrations() {
        let mut builder = RegistryBuilder::new();
        assert!(!builder.is_registered("echo"));
        builder.register("echo", Arc::new(Dummy("echo"))).unwrap();
        assert!(builder.is_registered("echo"));
    }
}
