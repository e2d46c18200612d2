use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::dispatcher::HttpError;
use crate::ids::RequestId;
use crate::metadata::{DeclarationId, NativeDocs};
use crate::router::ParamVec;

/// Parameters handed to a service method.
///
/// Path variables are bound by name; the query string is kept as a separate
/// list. `body` holds the decoded request body for `Post` and `Put`, and an
/// empty map for every other verb.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// Sanitized verb, e.g. `Get`
    pub method: String,
    /// Decoded request path
    pub path: String,
    /// Path variables in template order
    pub path_params: ParamVec,
    /// Query string parameters
    pub query_params: ParamVec,
    pub body: Value,
}

impl HandlerRequest {
    /// Get a path variable by name
    ///
    /// Uses "last write wins" semantics when a template repeats a name.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Path variable, falling back to the query string.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.get_path_param(name)
            .or_else(|| self.get_query_param(name))
    }

    /// Query and path parameters as one map; path variables win on conflict.
    #[must_use]
    pub fn uri_params(&self) -> Map<String, Value> {
        self.query_params
            .iter()
            .chain(self.path_params.iter())
            .map(|(k, v)| (k.to_string(), Value::String(v.clone())))
            .collect()
    }

    /// Convert path_params to HashMap
    /// Note: This allocates - use get_path_param() in hot paths
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    /// Top-level field of an object body.
    #[must_use]
    pub fn body_field(&self, name: &str) -> Option<&Value> {
        self.body.as_object().and_then(|map| map.get(name))
    }
}

/// Successful result of a service method.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    /// Encoded as an empty body
    #[default]
    Empty,
    Text(String),
    Data(Map<String, Value>),
}

impl Payload {
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Payload::Empty => Value::Null,
            Payload::Text(text) => Value::String(text),
            Payload::Data(map) => Value::Object(map),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Payload::Data(map)
    }
}

impl TryFrom<Value> for Payload {
    type Error = ServiceError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(Payload::Empty),
            Value::String(text) => Ok(Payload::Text(text)),
            Value::Object(map) => Ok(Payload::Data(map)),
            other => Err(ServiceError::Failure(anyhow::anyhow!(
                "service result must be a map, text or empty, got {other}"
            ))),
        }
    }
}

/// Failure returned by a service method.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Answered with the error's status and message
    #[error(transparent)]
    Status(#[from] HttpError),
    /// Answered with 500
    #[error("{0}")]
    Failure(anyhow::Error),
    /// Aborts the request without a response
    #[error("fatal: {0}")]
    Fatal(anyhow::Error),
}

impl ServiceError {
    pub fn fatal(err: impl Into<anyhow::Error>) -> Self {
        ServiceError::Fatal(err.into())
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        ServiceError::Failure(err)
    }
}

pub type HandlerResult = Result<Payload, ServiceError>;

/// Signature of a service method.
pub type MethodFn<S> = fn(&mut S, &HandlerRequest) -> HandlerResult;

type Invoker = Arc<dyn Fn(&HandlerRequest) -> HandlerResult + Send + Sync>;

/// One method of a service, type-erased.
#[derive(Clone)]
pub struct MethodDef {
    name: Arc<str>,
    doc: Option<String>,
    invoke: Invoker,
}

impl MethodDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Build a fresh service instance and run the method on it.
    ///
    /// # Errors
    ///
    /// Whatever the method returns.
    pub fn call(&self, request: &HandlerRequest) -> HandlerResult {
        (self.invoke)(request)
    }
}

impl fmt::Debug for MethodDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef")
            .field("name", &self.name)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// A registered service: its name, documentation and methods in declared
/// order.
#[derive(Debug, Clone)]
pub struct ServiceDef {
    name: Arc<str>,
    doc: Option<String>,
    methods: Vec<Arc<MethodDef>>,
}

impl ServiceDef {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    #[must_use]
    pub fn methods(&self) -> &[Arc<MethodDef>] {
        &self.methods
    }

    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Arc<MethodDef>> {
        self.methods.iter().find(|m| m.name() == name)
    }

    /// Declaration identity of one of this service's methods.
    #[must_use]
    pub fn method_declaration(&self, method: &str) -> DeclarationId {
        DeclarationId::method(self.name(), method)
    }
}

/// Typed builder for a [`ServiceDef`].
pub struct ServiceBuilder<S> {
    name: Arc<str>,
    doc: Option<String>,
    factory: Arc<dyn Fn() -> S + Send + Sync>,
    methods: Vec<Arc<MethodDef>>,
}

impl<S: 'static> ServiceBuilder<S> {
    /// Start a service whose instances are produced by `factory`.
    pub fn new<F>(name: impl Into<Arc<str>>, factory: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            doc: None,
            factory: Arc::new(factory),
            methods: Vec::new(),
        }
    }

    /// Documentation of the service type itself.
    #[must_use]
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// Add a method whose documentation comes from a documentation source.
    #[must_use]
    pub fn method(self, name: &str, handler: MethodFn<S>) -> Self {
        self.push(name, None, handler)
    }

    /// Add a method with its documentation given inline.
    #[must_use]
    pub fn method_with_doc(self, name: &str, doc: impl Into<String>, handler: MethodFn<S>) -> Self {
        self.push(name, Some(doc.into()), handler)
    }

    fn push(mut self, name: &str, doc: Option<String>, handler: MethodFn<S>) -> Self {
        let factory = Arc::clone(&self.factory);
        let service = Arc::clone(&self.name);
        let invoke: Invoker = Arc::new(move |request: &HandlerRequest| {
            debug!(
                request_id = %request.request_id,
                service = %service,
                "Creating new service instance"
            );
            let mut instance = factory();
            handler(&mut instance, request)
        });
        self.methods.push(Arc::new(MethodDef {
            name: Arc::from(name),
            doc,
            invoke,
        }));
        self
    }

    #[must_use]
    pub fn build(self) -> ServiceDef {
        ServiceDef {
            name: self.name,
            doc: self.doc,
            methods: self.methods,
        }
    }
}

impl<S: Default + 'static> ServiceBuilder<S> {
    /// Start a service whose instances are built with `S::default()`.
    pub fn with_default(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, S::default)
    }
}

/// Services by name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ServiceRegistry {
    services: Vec<Arc<ServiceDef>>,
    index: HashMap<String, usize>,
}

impl ServiceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service, replacing one with the same name.
    pub fn register(&mut self, service: ServiceDef) {
        let name = service.name().to_string();
        debug!(service = %name, methods = service.methods().len(), "Service registered");
        match self.index.get(&name) {
            Some(&i) => self.services[i] = Arc::new(service),
            None => {
                self.index.insert(name, self.services.len());
                self.services.push(Arc::new(service));
            }
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<ServiceDef>> {
        self.index.get(name).map(|&i| Arc::clone(&self.services[i]))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceDef>> {
        self.services.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Documentation given inline to the builders, as a doc source.
    #[must_use]
    pub fn native_docs(&self) -> NativeDocs {
        let mut docs = NativeDocs::new();
        for service in &self.services {
            if let Some(doc) = service.doc() {
                docs.insert(DeclarationId::of_type(service.name()), doc);
            }
            for method in service.methods() {
                if let Some(doc) = method.doc() {
                    docs.insert(service.method_declaration(method.name()), doc);
                }
            }
        }
        docs
    }
}
