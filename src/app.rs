//! Application bootstrap.
//!
//! [`ApplicationBuilder`] collects the services, documentation sources and
//! extra metadata types of an application; [`ApplicationBuilder::build`]
//! combines them with an [`AppConfig`] into a ready [`Dispatcher`]:
//!
//! ```rust
//! use tagroute::app::ApplicationBuilder;
//! use tagroute::config::{parse, ConfigFormat};
//! use tagroute::service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder};
//! use tagroute::server::Request;
//!
//! #[derive(Default)]
//! struct Health;
//!
//! impl Health {
//!     fn check(&mut self, _req: &HandlerRequest) -> HandlerResult {
//!         Ok(Payload::from("OK"))
//!     }
//! }
//!
//! let config = parse(
//!     r#"{"services": [{"service": "Health", "uri": "/health"}]}"#,
//!     ConfigFormat::Json,
//!     None,
//! )?;
//! let app = ApplicationBuilder::new()
//!     .service(
//!         ServiceBuilder::<Health>::with_default("Health")
//!             .method_with_doc("check", "@Get", Health::check)
//!             .build(),
//!     )
//!     .build(config)?;
//!
//! let response = app.dispatcher().dispatch(&Request::new("GET", "/health"))?;
//! assert_eq!(response.status, 200);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::config::{AppConfig, ConfigError};
use crate::dispatcher::{register_verbs, Dispatcher};
use crate::metadata::{DocSource, LayeredDocs, MetadataBuilder, MetadataError, MetadataRegistry, MetadataType};
use crate::service::{ServiceDef, ServiceRegistry};

/// Collects everything an application declares before configuration is
/// applied.
#[derive(Default)]
pub struct ApplicationBuilder {
    services: ServiceRegistry,
    doc_sources: Vec<Arc<dyn DocSource>>,
    metadata_types: Vec<MetadataType>,
    aliases: Vec<(String, String)>,
    ignored: Vec<String>,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn service(mut self, service: ServiceDef) -> Self {
        self.services.register(service);
        self
    }

    /// Add a documentation source, consulted after the documentation given
    /// inline to the service builders and after earlier sources.
    #[must_use]
    pub fn doc_source(mut self, source: impl DocSource + 'static) -> Self {
        self.doc_sources.push(Arc::new(source));
        self
    }

    /// Register an application-defined metadata type.
    #[must_use]
    pub fn metadata_type(mut self, ty: MetadataType) -> Self {
        self.metadata_types.push(ty);
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases.push((alias.to_string(), canonical.to_string()));
        self
    }

    /// Skip a metadata type while building collections.
    #[must_use]
    pub fn ignore(mut self, metadata_type: &str) -> Self {
        self.ignored.push(metadata_type.to_string());
        self
    }

    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    /// Build the dispatcher for `config`.
    ///
    /// # Errors
    ///
    /// Alias conflicts, a mapping naming an unregistered service, or any
    /// route template that does not compile.
    pub fn build(self, config: AppConfig) -> Result<Application> {
        let registry = Arc::new(MetadataRegistry::new());
        register_verbs(&registry).context("Failed to register verb metadata")?;
        for ty in self.metadata_types {
            registry.register(ty);
        }
        for (alias, canonical) in &self.aliases {
            registry
                .add_alias(alias, canonical)
                .with_context(|| format!("Failed to alias `{alias}` to `{canonical}`"))?;
        }
        registry.ignore(self.ignored);

        for mapping in &config.services {
            if !self.services.contains(&mapping.service) {
                return Err(ConfigError::UnknownService {
                    service: mapping.service.clone(),
                }
                .into());
            }
        }
        let routes = config.route_table().context("Failed to compile routes")?;

        let mut docs: Vec<Arc<dyn DocSource>> = vec![Arc::new(self.services.native_docs())];
        docs.extend(self.doc_sources);
        let metadata = Arc::new(MetadataBuilder::new(
            Arc::clone(&registry),
            Arc::new(LayeredDocs::new(docs)),
        ));

        info!(
            services = self.services.len(),
            routes = routes.len(),
            metadata_types = registry.type_names().len(),
            "Application built"
        );
        let dispatcher = Dispatcher::new(
            routes,
            self.services,
            metadata,
            config.dispatcher_settings(),
        );
        Ok(Application {
            config,
            dispatcher: Arc::new(dispatcher),
        })
    }
}

/// A configured application.
pub struct Application {
    config: AppConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Application {
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Build the metadata of every method of every routed service, so that
    /// malformed tags surface before the first request.
    ///
    /// Returns the number of declarations built.
    ///
    /// # Errors
    ///
    /// The first [`MetadataError`] met, with the declaration it belongs to.
    pub fn preload(&self) -> Result<usize, MetadataError> {
        let mut built = 0;
        let mut seen: Vec<&str> = Vec::new();
        for route in self.dispatcher.routes().routes() {
            if seen.contains(&route.service()) {
                continue;
            }
            seen.push(route.service());
            let Some(service) = self.dispatcher.services().get(route.service()) else {
                continue;
            };
            for method in service.methods() {
                self.dispatcher
                    .metadata()
                    .build(&service.method_declaration(method.name()))?;
                built += 1;
            }
        }
        Ok(built)
    }

    /// Serve over HTTP until the process exits.
    ///
    /// # Errors
    ///
    /// Binding failures.
    pub fn serve(&self, bind: &str, workers: usize) -> Result<()> {
        crate::server::serve(bind, Arc::clone(&self.dispatcher), workers)
            .with_context(|| format!("HTTP server on {bind} failed"))
    }
}
