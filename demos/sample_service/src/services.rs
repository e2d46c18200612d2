//! Sample services. The verb tags below are read from this file at startup.

use serde_json::{json, Value};
use tagroute::service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder, ServiceError};
use tagroute::HttpError;

/// Health check; the same answer for every verb.
#[derive(Debug, Default)]
pub struct SimpleService;

impl SimpleService {
    /// @Get
    /// @Post
    /// @Put
    /// @Delete
    pub fn health_check(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from("OK"))
    }
}

/// Shows a structured error carrying its own status.
#[derive(Debug, Default)]
pub struct SampleService;

impl SampleService {
    /// @Get
    pub fn show_exception(&mut self, req: &HandlerRequest) -> HandlerResult {
        let element = req.get_path_param("uriVar").unwrap_or_default();
        let variation = req.get_path_param("x").unwrap_or_default();
        let body = json!({
            "errors": {
                "error": [
                    { "element": element, "message": "element doesn't exist" },
                    { "variation": variation, "message": "cannot be calculated" }
                ]
            }
        });
        let Value::Object(map) = body else {
            return Err(anyhow::anyhow!("error body is not a map").into());
        };
        Err(HttpError::not_found(map).into())
    }

    /// @Post
    pub fn make_a_post(&mut self, req: &HandlerRequest) -> HandlerResult {
        echo(req, json!({ "name": "Service" }))
    }
}

/// Reads parameters and body; `Post` and `Put` share one method.
#[derive(Debug, Default)]
pub struct ComplexService;

impl ComplexService {
    /// @Get
    pub fn example_function(&mut self, req: &HandlerRequest) -> HandlerResult {
        echo(req, json!({ "name": "ComplexService", "type": "B" }))
    }

    /// @Post
    /// @Put
    pub fn process_me(&mut self, req: &HandlerRequest) -> HandlerResult {
        echo(
            req,
            json!({ "name": "ComplexService", "type": "B", "test": "You Rock!" }),
        )
    }
}

/// One method per verb; `Get` always fails.
#[derive(Debug, Default)]
pub struct ComplexServiceB;

impl ComplexServiceB {
    /// @Post
    pub fn do_post(&mut self, req: &HandlerRequest) -> HandlerResult {
        echo(req, json!({ "name": "ComplexService", "type": "B" }))
    }

    /// @Get
    pub fn do_get(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Err(ServiceError::Failure(anyhow::anyhow!("Unexpected exception")))
    }

    /// @Put
    pub fn do_put(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from("Called the PUT method"))
    }

    /// @Delete
    pub fn do_delete(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Payload::try_from(json!({ "response": "called the DELETE method" }))
    }
}

/// Response echoing what the request carried, `"empty"` for missing parts.
fn echo(req: &HandlerRequest, response: Value) -> HandlerResult {
    let or_empty = |value: Option<Value>| value.unwrap_or_else(|| json!("empty"));
    let params = req.uri_params();
    let parameters = if params.is_empty() {
        json!("empty")
    } else {
        Value::Object(params)
    };
    let body = match &req.body {
        Value::Object(map) if map.is_empty() => None,
        Value::Null => None,
        other => Some(other.clone()),
    };
    Payload::try_from(json!({
        "complex": {
            "variables": {
                "myVar": or_empty(req.get_path_param("myVar").map(Value::from)),
                "y": or_empty(req.get_path_param("y").map(Value::from)),
            },
            "parameters": parameters,
            "body": or_empty(body),
            "response": response,
        }
    }))
}

/// Every sample service, in the order they are registered.
#[must_use]
pub fn all() -> Vec<tagroute::service::ServiceDef> {
    vec![
        ServiceBuilder::<SimpleService>::with_default("SimpleService")
            .method("health_check", SimpleService::health_check)
            .build(),
        ServiceBuilder::<SampleService>::with_default("SampleService")
            .method("show_exception", SampleService::show_exception)
            .method("make_a_post", SampleService::make_a_post)
            .build(),
        ServiceBuilder::<ComplexService>::with_default("ComplexService")
            .method("example_function", ComplexService::example_function)
            .method("process_me", ComplexService::process_me)
            .build(),
        ServiceBuilder::<ComplexServiceB>::with_default("ComplexServiceB")
            .method("do_post", ComplexServiceB::do_post)
            .method("do_get", ComplexServiceB::do_get)
            .method("do_put", ComplexServiceB::do_put)
            .method("do_delete", ComplexServiceB::do_delete)
            .build(),
    ]
}
