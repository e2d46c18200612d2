use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::dispatcher::DispatcherSettings;
use crate::router::{compile_template, CompileError, RouteDefinition, RouteTable};

/// `settings` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Include the full error chain in 500 bodies
    pub display_errors: bool,
    pub xml: XmlSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlSettings {
    /// Indent XML responses
    pub pretty_format: bool,
}

/// `settings.logging` section. Unset fields fall back to the environment and
/// then to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: Option<String>,
    /// `json` or `pretty`
    pub format: Option<String>,
    #[serde(rename = "async")]
    pub async_writer: Option<bool>,
    pub target_filter: Option<String>,
    pub include_location: Option<bool>,
    /// Log every encoded response body at debug level
    pub log_responses: bool,
}

/// One `(service, uri)` pair of the `services` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceMapping {
    pub service: String,
    pub uri: String,
}

/// Resolved application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Environment the configuration was resolved for, if the file had any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub services: Vec<ServiceMapping>,
}

impl AppConfig {
    #[must_use]
    pub fn dispatcher_settings(&self) -> DispatcherSettings {
        DispatcherSettings {
            xml_pretty: self.settings.xml.pretty_format,
            display_errors: self.settings.display_errors,
            log_responses: self.settings.logging.log_responses,
        }
    }

    /// Check every template against the route grammar without building any
    /// route regex.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NoServices`] for an empty list, otherwise the first
    /// template that does not compile rejects the whole configuration.
    pub fn validate_routes(&self) -> Result<(), ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        for m in &self.services {
            compile_template(&m.uri).map_err(|source| invalid_template(m, source))?;
        }
        Ok(())
    }

    /// Compile every mapping, in order.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::validate_routes`].
    pub fn route_definitions(&self) -> Result<Vec<RouteDefinition>, ConfigError> {
        if self.services.is_empty() {
            return Err(ConfigError::NoServices);
        }
        self.services
            .iter()
            .map(|m| {
                RouteDefinition::new(m.service.as_str(), &m.uri)
                    .map_err(|source| invalid_template(m, source))
            })
            .collect()
    }

    /// Compile the route table.
    ///
    /// # Errors
    ///
    /// See [`AppConfig::route_definitions`].
    pub fn route_table(&self) -> Result<RouteTable, ConfigError> {
        self.route_definitions().map(RouteTable::new)
    }
}

fn invalid_template(mapping: &ServiceMapping, source: CompileError) -> ConfigError {
    ConfigError::InvalidTemplate {
        service: mapping.service.clone(),
        source,
    }
}

/// Bootstrap failures. None of them is ever mapped to an HTTP status.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {format} configuration: {reason}")]
    Parse {
        format: &'static str,
        reason: String,
    },
    #[error("environment `{environment}` is not defined (available: {})", .available.join(", "))]
    MissingEnvironment {
        environment: String,
        available: Vec<String>,
    },
    #[error("no services are configured")]
    NoServices,
    #[error("invalid uri template for service `{service}`: {source}")]
    InvalidTemplate {
        service: String,
        #[source]
        source: CompileError,
    },
    #[error("service `{service}` is mapped but not registered")]
    UnknownService { service: String },
}
