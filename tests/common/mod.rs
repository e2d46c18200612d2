//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tagroute::app::{Application, ApplicationBuilder};
use tagroute::config::{parse, AppConfig, ConfigFormat};
use tagroute::service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder, ServiceError};
use tagroute::HttpError;

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a fresh temporary file with the given extension.
    /// The file is removed when the handle is dropped.
    pub fn create_temp_config(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("tagroute_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_config(content, "yaml")
    }
}

/// Routes of the fixture application, in match order.
pub const FIXTURE_CONFIG: &str = r#"
settings:
  display_errors: false
services:
  - service: Api_Users
    uri: /users/{$id[int]}
  - service: Api_Items
    uri: /items/{$name[alpha]}
  - service: Api_Broken
    uri: /broken
  - service: Api_Health
    uri: /health
  - service: Api_Empty
    uri: /empty
"#;

#[derive(Default)]
pub struct Users;

impl Users {
    fn fetch(&mut self, req: &HandlerRequest) -> HandlerResult {
        Payload::try_from(json!({
            "user": {
                "id": req.get_path_param("id"),
                "verbose": req.get_query_param("verbose"),
            }
        }))
    }

    fn store(&mut self, req: &HandlerRequest) -> HandlerResult {
        Payload::try_from(json!({
            "stored": {
                "id": req.get_path_param("id"),
                "method": req.method,
                "body": req.body,
            }
        }))
    }
}

#[derive(Default)]
pub struct Items;

impl Items {
    fn read(&mut self, req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from(format!("item {}", req.param("name").unwrap_or_default())))
    }

    fn replace(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from("replaced"))
    }

    fn replace_again(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from("never selected"))
    }
}

#[derive(Default)]
pub struct Broken;

impl Broken {
    fn missing(&mut self, _req: &HandlerRequest) -> HandlerResult {
        let mut detail = Map::new();
        detail.insert("missing".to_string(), Value::from("widget"));
        Err(HttpError::not_found(detail).into())
    }

    fn failing(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Err(anyhow::anyhow!("Unexpected exception").into())
    }

    fn aborting(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Err(ServiceError::fatal(anyhow::anyhow!("storage is gone")))
    }

    fn teapot(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Err(HttpError::new(418, "short and stout").into())
    }
}

#[derive(Default)]
pub struct Health;

impl Health {
    fn check(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::from("OK"))
    }
}

#[derive(Default)]
pub struct Empty;

impl Empty {
    fn nothing(&mut self, _req: &HandlerRequest) -> HandlerResult {
        Ok(Payload::Empty)
    }
}

/// Builder with every fixture service registered.
pub fn fixture_builder() -> ApplicationBuilder {
    ApplicationBuilder::new()
        .service(
            ServiceBuilder::<Users>::with_default("Api_Users")
                .method_with_doc("fetch", "Fetch one user.\n\n@Get", Users::fetch)
                .method_with_doc("store", "@Post\n@Put", Users::store)
                .build(),
        )
        .service(
            ServiceBuilder::<Items>::with_default("Api_Items")
                .method_with_doc("read", "@Get", Items::read)
                .method_with_doc("replace", "@Put", Items::replace)
                .method_with_doc("replace_again", "@Put", Items::replace_again)
                .build(),
        )
        .service(
            ServiceBuilder::<Broken>::with_default("Api_Broken")
                .method_with_doc("missing", "@Get", Broken::missing)
                .method_with_doc("failing", "@Post", Broken::failing)
                .method_with_doc("aborting", "@Delete", Broken::aborting)
                .method_with_doc("teapot", "@Put", Broken::teapot)
                .build(),
        )
        .service(
            ServiceBuilder::<Health>::with_default("Api_Health")
                .method_with_doc("check", "@Get @Post @Put @Delete", Health::check)
                .build(),
        )
        .service(
            ServiceBuilder::<Empty>::with_default("Api_Empty")
                .method_with_doc("nothing", "@Get", Empty::nothing)
                .build(),
        )
}

pub fn fixture_config() -> AppConfig {
    parse(FIXTURE_CONFIG, ConfigFormat::Yaml, None).unwrap()
}

pub fn fixture_app() -> Application {
    fixture_builder().build(fixture_config()).unwrap()
}

/// Path of the sample service configuration shipped with the demo crate.
pub fn sample_config_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/sample_service/config/app.yaml")
}
