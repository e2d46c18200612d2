//! # Configuration Module
//!
//! Application configuration: the ordered `(service, uri)` mappings fed to
//! the route compiler plus the dispatcher and logging settings.
//!
//! ## File Format
//!
//! YAML (`.yaml`/`.yml`), TOML (`.toml`) or JSON (anything else):
//!
//! ```yaml
//! settings:
//!   display_errors: false
//!   xml:
//!     pretty_format: false
//!   logging: { level: info, format: pretty, log_responses: false }
//! services:
//!   - service: Sample_Service
//!     uri: /sample/{$uriVar}/{$x[int]}
//! environments:
//!   production: {}
//!   development:
//!     settings: { display_errors: true }
//! ```
//!
//! Entries of `environments` are merged over the top-level document. The
//! environment is chosen by name, [`DEFAULT_ENVIRONMENT`] when none is given.
//!
//! Every error here is a startup failure ([`ConfigError`]); nothing is served
//! from a configuration that failed to load.

mod load;
mod types;

pub use load::{load, parse, ConfigFormat, DEFAULT_ENVIRONMENT};
pub use types::{AppConfig, ConfigError, LoggingSettings, ServiceMapping, Settings, XmlSettings};
