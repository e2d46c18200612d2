use http::StatusCode;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn};

use crate::codec::{self, ContentKind, EncodeOptions};
use crate::ids::{RequestId, REQUEST_ID_HEADER};
use crate::metadata::MetadataBuilder;
use crate::router::{decode_path, RouteTable};
use crate::server::{Request, Response};
use crate::service::{HandlerRequest, MethodDef, ServiceDef, ServiceError, ServiceRegistry};

use super::context::{DispatchContext, DispatchState};
use super::error::{FatalError, HttpError};
use super::negotiate::{request_kind, response_format, sanitize_method};
use super::verbs::{dispatch_verb_type, OPTION_VERBS};

/// Switches read from the `settings` section of the configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Indent XML responses
    pub xml_pretty: bool,
    /// Put the full error chain in 500 bodies
    pub display_errors: bool,
    /// Log every encoded response body at debug level
    pub log_responses: bool,
}

/// Routes requests to service methods.
///
/// The route table, the service registry and the metadata builder are
/// shared by every request; each call to [`Dispatcher::dispatch`] is
/// otherwise independent.
pub struct Dispatcher {
    routes: RouteTable,
    services: ServiceRegistry,
    metadata: Arc<MetadataBuilder>,
    settings: DispatcherSettings,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        routes: RouteTable,
        services: ServiceRegistry,
        metadata: Arc<MetadataBuilder>,
        settings: DispatcherSettings,
    ) -> Self {
        Self {
            routes,
            services,
            metadata,
            settings,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn services(&self) -> &ServiceRegistry {
        &self.services
    }

    #[must_use]
    pub fn metadata(&self) -> &Arc<MetadataBuilder> {
        &self.metadata
    }

    #[must_use]
    pub fn settings(&self) -> DispatcherSettings {
        self.settings
    }

    /// Dispatch one request.
    ///
    /// Every request-level failure (bad path, negotiation, unknown verb,
    /// malformed metadata, handler errors) is answered with an encoded error
    /// response.
    ///
    /// # Errors
    ///
    /// [`FatalError`] when a service method returns [`ServiceError::Fatal`];
    /// no response is produced for such a request.
    pub fn dispatch(&self, request: &Request) -> Result<Response, FatalError> {
        let request_id = RequestId::from_header_or_new(request.get_header(REQUEST_ID_HEADER));
        let span = info_span!("dispatch", request_id = %request_id);
        let _entered = span.enter();
        let start = Instant::now();

        let mut ctx = DispatchContext::new(request_id);
        let mut response = match self.run(request, &mut ctx) {
            Ok(response) => response,
            Err(ServiceError::Status(err)) => self.status_response(&mut ctx, &err),
            Err(ServiceError::Failure(err)) => self.failure_response(&mut ctx, &err),
            Err(ServiceError::Fatal(reason)) => {
                error!(
                    method = %request.method,
                    path = %request.path,
                    state = %ctx.state,
                    error = %format!("{reason:#}"),
                    "Fatal service error - request aborted"
                );
                return Err(FatalError { request_id, reason });
            }
        };
        response.set_header("X-Request-Id", request_id.to_string());
        ctx.advance(DispatchState::Send);

        info!(
            method = %request.method,
            path = %request.path,
            status = response.status.as_u16(),
            latency_ms = elapsed_ms(start.elapsed()),
            "Request completed"
        );
        Ok(response)
    }

    fn run(&self, request: &Request, ctx: &mut DispatchContext) -> Result<Response, ServiceError> {
        // D1: Route matching
        ctx.advance(DispatchState::MatchRoute);
        let raw_path = request.path.as_str();
        if raw_path.is_empty() || raw_path == "/" {
            return Err(HttpError::bad_request(format!("No service requested, uri({raw_path})")).into());
        }
        let path = match decode_path(raw_path) {
            Ok(path) => path.into_owned(),
            Err(e) => {
                error!(path = %raw_path, error = %e, "Request path is unparsable");
                return Err(HttpError::internal_server_error(
                    "The uri is unparsable, may contain unsupported characters",
                )
                .into());
            }
        };
        let Some(route) = self.routes.match_path(&path) else {
            warn!(path = %path, "No route matched");
            return Err(HttpError::bad_request(format!(
                "No service to match the requested uri ({path})"
            ))
            .into());
        };
        let service_name = route.route.service_arc();
        ctx.route = Some(route);

        // D2: Content negotiation
        ctx.advance(DispatchState::Negotiate);
        let method = sanitize_method(&request.method);
        ctx.method = Some(method.clone());
        let kind = request_kind(request.get_header("content-type"))?;
        ctx.request_kind = Some(kind);
        let format = response_format(request.get_header("accept"), kind)?;
        debug!(
            method = %method,
            request_kind = %kind,
            response_kind = %format.kind,
            "Content negotiated"
        );
        ctx.response_format = Some(format);

        let service = self.services.get(&service_name).ok_or_else(|| {
            anyhow::anyhow!("service `{service_name}` is routed but not registered")
        })?;
        ctx.service = Some(Arc::clone(&service));

        // D3: Verb handler lookup
        if method == "Options" {
            ctx.advance(DispatchState::BuildOptionsResponse);
            let options = self.options_payload(&service)?;
            return self.respond(ctx, options);
        }
        ctx.advance(DispatchState::MatchVerbHandler);
        let handler = self.find_handler(&service, &method)?.ok_or_else(|| {
            warn!(service = %service.name(), method = %method, "No service method for verb");
            HttpError::method_not_allowed("The requested method is not supported")
        })?;
        ctx.handler = Some(Arc::clone(&handler));

        // D4: Parameter binding
        ctx.advance(DispatchState::BindParameters);
        if matches!(method.as_str(), "Post" | "Put") {
            ctx.body = read_body(&request.body, kind)?;
        }
        let path_params = ctx
            .route
            .as_ref()
            .map(|r| r.path_params.clone())
            .unwrap_or_default();
        for (name, value) in &path_params {
            debug!(variable = %name, value = %value, "Path variable bound");
        }
        let handler_request = HandlerRequest {
            request_id: ctx.request_id,
            method,
            path,
            path_params,
            query_params: request.query.clone(),
            body: std::mem::take(&mut ctx.body),
        };

        // D5: Invocation
        ctx.advance(DispatchState::Invoke);
        info!(
            service = %service.name(),
            service_method = %handler.name(),
            method = %handler_request.method,
            "Request dispatched to service method"
        );
        let payload = handler.call(&handler_request)?;

        // D6: Response formatting
        self.respond(ctx, payload.into_value())
    }

    /// First method of `service`, in declared order, tagged with `verb`.
    ///
    /// Only `Get`, `Post`, `Put` and `Delete` select a method; any other verb
    /// is refused before metadata is consulted.
    fn find_handler(
        &self,
        service: &ServiceDef,
        verb: &str,
    ) -> Result<Option<Arc<MethodDef>>, ServiceError> {
        let Some(canonical) = dispatch_verb_type(verb) else {
            debug!(verb = %verb, "Verb is not dispatched");
            return Ok(None);
        };
        for method in service.methods() {
            let collection = self
                .metadata
                .build(&service.method_declaration(method.name()))
                .map_err(anyhow::Error::from)?;
            if collection.has(canonical) {
                debug!(service = %service.name(), service_method = %method.name(), verb = %verb, "Service method selected");
                return Ok(Some(Arc::clone(method)));
            }
        }
        Ok(None)
    }

    /// `{"optionList": {"option": [..]}}` listing each verb tagged on any
    /// method of `service` once, in order of first appearance.
    fn options_payload(&self, service: &ServiceDef) -> Result<Value, ServiceError> {
        let verbs: Vec<(&str, &str)> = OPTION_VERBS
            .iter()
            .filter_map(|verb| dispatch_verb_type(verb).map(|canonical| (*verb, canonical)))
            .collect();
        let mut options: Vec<String> = Vec::new();
        for method in service.methods() {
            let collection = self
                .metadata
                .build(&service.method_declaration(method.name()))
                .map_err(anyhow::Error::from)?;
            for (verb, canonical) in &verbs {
                let name = verb.to_ascii_lowercase();
                if collection.has(canonical) && !options.contains(&name) {
                    options.push(name);
                }
            }
        }
        if options.is_empty() {
            return Ok(json!({ "optionList": {} }));
        }
        Ok(json!({ "optionList": { "option": options } }))
    }

    fn respond(&self, ctx: &mut DispatchContext, value: Value) -> Result<Response, ServiceError> {
        ctx.advance(DispatchState::FormatResponse);
        let format = ctx.format();
        let body = if is_empty_result(&value) {
            String::new()
        } else {
            codec::encode(&value, format.kind, self.encode_options()).map_err(anyhow::Error::from)?
        };
        if self.settings.log_responses {
            debug!(body = %body, "Response body");
        }
        Ok(Response::new(StatusCode::OK, format.content_type(), body))
    }

    fn status_response(&self, ctx: &mut DispatchContext, err: &HttpError) -> Response {
        ctx.advance(DispatchState::HandleError);
        if err.status().is_server_error() {
            error!(status = err.status().as_u16(), error = %err.message(), "Request failed");
        } else {
            warn!(status = err.status().as_u16(), error = %err.message(), "Request rejected");
        }
        self.error_response(ctx, err.status(), &err.payload())
    }

    fn failure_response(&self, ctx: &mut DispatchContext, err: &anyhow::Error) -> Response {
        ctx.advance(DispatchState::HandleError);
        error!(state = %ctx.state, error = %format!("{err:#}"), "Service failure");
        let message = if self.settings.display_errors {
            format!("{err:#}")
        } else {
            err.to_string()
        };
        self.error_response(
            ctx,
            StatusCode::INTERNAL_SERVER_ERROR,
            &json!({ "error": message }),
        )
    }

    fn error_response(&self, ctx: &DispatchContext, status: StatusCode, payload: &Value) -> Response {
        let format = ctx.format();
        let body = codec::encode(payload, format.kind, self.encode_options()).unwrap_or_else(|e| {
            error!(error = %e, "Cannot encode error body");
            String::new()
        });
        if self.settings.log_responses {
            debug!(body = %body, "Response body");
        }
        Response::new(status, format.content_type(), body)
    }

    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            pretty_xml: self.settings.xml_pretty,
        }
    }
}

/// Decode a `Post`/`Put` body; a blank body is an empty map.
fn read_body(body: &[u8], kind: ContentKind) -> Result<Value, HttpError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    codec::decode(body, kind).map_err(|e| {
        warn!(error = %e, body_len = body.len(), "Request body rejected");
        let label = match kind {
            ContentKind::Json => "JSON",
            ContentKind::Xml => "XML",
        };
        HttpError::bad_request(format!("{label} sent could not be parsed"))
    })
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn elapsed_ms(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
