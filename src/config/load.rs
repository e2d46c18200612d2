use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

use super::types::{AppConfig, ConfigError};

/// Default environment when none is named.
pub const DEFAULT_ENVIRONMENT: &str = "production";

const ENVIRONMENTS_KEY: &str = "environments";

/// Configuration file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.yaml`/`.yml` and `.toml` by extension, anything else is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => ConfigFormat::Yaml,
            Some("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

/// Load and validate a configuration file.
///
/// # Errors
///
/// Any [`ConfigError`]: unreadable or malformed file, unknown environment,
/// no services, or a template that does not compile.
pub fn load(path: &Path, environment: Option<&str>) -> Result<AppConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let format = ConfigFormat::from_path(path);
    debug!(path = %path.display(), format = format.name(), "Reading configuration");
    let config = parse(&text, format, environment)?;
    info!(
        path = %path.display(),
        environment = config.environment.as_deref().unwrap_or("-"),
        services = config.services.len(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Parse and validate configuration text.
///
/// When the document has an `environments` map, the selected entry
/// (`environment`, or [`DEFAULT_ENVIRONMENT`]) is merged over the top-level
/// document: maps merge key by key, anything else replaces.
///
/// # Errors
///
/// See [`load`].
pub fn parse(
    text: &str,
    format: ConfigFormat,
    environment: Option<&str>,
) -> Result<AppConfig, ConfigError> {
    let parse_error = |reason: String| ConfigError::Parse {
        format: format.name(),
        reason,
    };
    let document: Value = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Toml => toml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
    };
    let mut root = match document {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        _ => return Err(parse_error("top level must be a map".to_string())),
    };

    let selected = match root.remove(ENVIRONMENTS_KEY) {
        Some(Value::Object(mut environments)) => {
            let name = environment.unwrap_or(DEFAULT_ENVIRONMENT);
            let Some(overrides) = environments.remove(name) else {
                let mut available: Vec<String> = environments.keys().cloned().collect();
                available.sort();
                return Err(ConfigError::MissingEnvironment {
                    environment: name.to_string(),
                    available,
                });
            };
            merge(&mut root, overrides);
            Some(name.to_string())
        }
        Some(Value::Null) | None => None,
        Some(_) => return Err(parse_error("`environments` must be a map".to_string())),
    };

    let mut config: AppConfig =
        serde_json::from_value(Value::Object(root)).map_err(|e| parse_error(e.to_string()))?;
    config.environment = selected;
    config.validate_routes()?;
    Ok(config)
}

fn merge(base: &mut Map<String, Value>, overrides: Value) {
    let Value::Object(overrides) = overrides else {
        return;
    };
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => {
                merge(existing, Value::Object(nested));
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
