use regex::Regex;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::pattern::{compile_template, CompileError, CompiledTemplate, PathVariable};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Names are `Arc<str>` shared with the compiled route; values are per-request
/// data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Errors raised while matching a raw request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The path could not be turned into text the patterns can run against.
    #[error("request path `{path}` cannot be decoded: {reason}")]
    Unparsable { path: String, reason: String },
}

/// A compiled route: one URI template bound to one service type.
///
/// Immutable once built. The match regex has no capturing groups; the extract
/// regex has one group per entry of [`RouteDefinition::variable_names`].
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    service: Arc<str>,
    compiled: CompiledTemplate,
    match_re: Regex,
    extract_re: Regex,
}

impl RouteDefinition {
    /// Compile `template` and bind it to the service type `service`.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] when the template is invalid.
    pub fn new(service: impl Into<Arc<str>>, template: &str) -> Result<Self, CompileError> {
        let compiled = compile_template(template)?;
        let match_re = anchored(template, &compiled.match_pattern)?;
        let extract_re = anchored(template, &compiled.extract_pattern)?;
        Ok(Self {
            service: service.into(),
            compiled,
            match_re,
            extract_re,
        })
    }

    /// Name of the service type handling this route.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    #[must_use]
    pub fn service_arc(&self) -> Arc<str> {
        Arc::clone(&self.service)
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.compiled.template
    }

    /// Anchored match pattern text.
    #[must_use]
    pub fn match_pattern(&self) -> &str {
        self.match_re.as_str()
    }

    /// Anchored extract pattern text.
    #[must_use]
    pub fn extract_pattern(&self) -> &str {
        self.extract_re.as_str()
    }

    #[must_use]
    pub fn variables(&self) -> &[PathVariable] {
        &self.compiled.variables
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.compiled.variable_names()
    }

    /// Whether the full path is accepted by this route.
    #[inline]
    #[must_use]
    pub fn is_match(&self, path: &str) -> bool {
        self.match_re.is_match(path)
    }

    /// Bind every variable of the template to its value in `path`.
    ///
    /// Values are returned in template order; duplicate names appear once per
    /// occurrence. Returns `None` when the path is not accepted.
    #[must_use]
    pub fn extract(&self, path: &str) -> Option<ParamVec> {
        let caps = self.extract_re.captures(path)?;
        let mut params = ParamVec::new();
        for (i, var) in self.compiled.variables.iter().enumerate() {
            let value = caps.get(i + 1).map_or("", |m| m.as_str());
            params.push((Arc::clone(&var.name), value.to_string()));
        }
        Some(params)
    }
}

fn anchored(template: &str, pattern: &str) -> Result<Regex, CompileError> {
    Regex::new(&format!("^{pattern}$")).map_err(|e| CompileError::Pattern {
        template: template.to_string(),
        reason: e.to_string(),
    })
}

/// Result of matching a request path against the route table.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The winning route
    pub route: Arc<RouteDefinition>,
    /// Variable bindings in template order
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path variable by name.
    ///
    /// Uses "last write wins" semantics: if the template repeats a variable
    /// name, the value bound by the last occurrence is returned.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Convert path_params to a map (last occurrence wins).
    /// Note: This allocates - use get_path_param() in hot paths instead
    #[must_use]
    pub fn path_params_map(&self) -> HashMap<String, String> {
        self.path_params
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

/// Ordered list of compiled routes.
///
/// Matching is first-match-wins in declaration order: the earliest route whose
/// match pattern accepts the path is selected even if a later route is more
/// specific.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<RouteDefinition>>,
}

impl RouteTable {
    /// Build a table from already compiled routes.
    #[must_use]
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        let routes: Vec<Arc<RouteDefinition>> = routes.into_iter().map(Arc::new).collect();
        info!(routes_count = routes.len(), "Routing table loaded");
        for route in &routes {
            debug!(
                service = %route.service(),
                template = %route.template(),
                pattern = %route.match_pattern(),
                "Route registered"
            );
        }
        Self { routes }
    }

    /// Compile an ordered list of `(service, template)` pairs.
    ///
    /// # Errors
    ///
    /// The whole list is rejected on the first template that fails to compile.
    pub fn from_mappings<I, S, T>(mappings: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<Arc<str>>,
        T: AsRef<str>,
    {
        let routes = mappings
            .into_iter()
            .map(|(service, template)| RouteDefinition::new(service, template.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(routes))
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Match an already decoded path.
    #[must_use]
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        let route = self.routes.iter().find(|r| r.is_match(path))?;
        let path_params = route.extract(path)?;
        debug!(
            path = %path,
            service = %route.service(),
            params_count = path_params.len(),
            "Route matched"
        );
        Some(RouteMatch {
            route: Arc::clone(route),
            path_params,
        })
    }

    /// Percent-decode a raw request path, then match it.
    ///
    /// # Errors
    ///
    /// [`RouteError::Unparsable`] when the decoded bytes are not UTF-8. This is
    /// distinct from `Ok(None)`, which means no route accepts the path.
    pub fn resolve(&self, raw_path: &str) -> Result<Option<RouteMatch>, RouteError> {
        let decoded = decode_path(raw_path)?;
        Ok(self.match_path(&decoded))
    }

    /// Print the table to stdout, one route per line.
    pub fn dump_routes(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }

    /// Human readable description of every route, in match order.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.routes
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let vars: Vec<String> = r
                    .variables()
                    .iter()
                    .map(|v| format!("{}:{}", v.name, v.types))
                    .collect();
                format!(
                    "{:>3}  {:<40} -> {:<30} [{}]",
                    i + 1,
                    r.template(),
                    r.service(),
                    vars.join(", ")
                )
            })
            .collect()
    }
}

/// Percent-decode a request path.
pub fn decode_path(raw_path: &str) -> Result<Cow<'_, str>, RouteError> {
    urlencoding::decode(raw_path).map_err(|e| RouteError::Unparsable {
        path: raw_path.to_string(),
        reason: e.to_string(),
    })
}
