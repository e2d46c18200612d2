//! End-to-end tests of the dispatch state machine.
//!
//! Every test builds the fixture application from `common` and drives
//! [`Dispatcher::dispatch`] directly with in-memory requests:
//!
//! - verb selection from doc tags (200 / 405)
//! - OPTIONS enumeration
//! - content negotiation and 415 precedence
//! - body decoding for `Post` / `Put`
//! - status-carrying, generic and fatal service errors

mod common;

use common::{fixture_app, fixture_builder};
use serde_json::{json, Value};
use std::sync::Arc;
use tagroute::codec::{classify, ContentKind};
use tagroute::config::{parse, ConfigFormat};
use tagroute::dispatcher::{register_verbs, Dispatcher, DispatcherSettings};
use tagroute::metadata::{MetadataBuilder, MetadataRegistry, MetadataType, NativeDocs};
use tagroute::router::RouteTable;
use tagroute::service::{HandlerRequest, HandlerResult, Payload, ServiceBuilder, ServiceRegistry};
use tagroute::{ApplicationBuilder, Request, Response};

const XML_DECL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

fn dispatch(request: Request) -> Response {
    let app = fixture_app();
    app.dispatcher().dispatch(&request).unwrap()
}

fn json_body(response: &Response) -> Value {
    response.json().unwrap_or_else(|| panic!("not JSON: {}", response.body))
}

#[test]
fn test_get_defaults_to_xml() {
    let response = dispatch(Request::new("GET", "/users/42"));
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("text/xml"));
    assert!(response.body.starts_with(XML_DECL), "{}", response.body);
    assert!(response.body.contains("<user><id>42</id>"), "{}", response.body);
}

#[test]
fn test_get_with_json_accept_and_query() {
    let response = dispatch(
        Request::new("GET", "/users/42?verbose=yes").header("Accept", "application/json"),
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(
        json_body(&response),
        json!({"user": {"id": "42", "verbose": "yes"}})
    );
}

#[test]
fn test_verb_without_handler_is_405() {
    let response = dispatch(Request::new("DELETE", "/users/42"));
    assert_eq!(response.status, 405);
    assert!(response
        .body
        .ends_with("<error>The requested method is not supported</error>"));
}

#[test]
fn test_unknown_verb_is_405() {
    let response = dispatch(Request::new("PATCH", "/users/42"));
    assert_eq!(response.status, 405);
}

#[test]
fn test_tags_of_other_types_do_not_route_verbs() {
    #[derive(Default)]
    struct Editor;
    impl Editor {
        fn patch(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Ok(Payload::from("patched"))
        }
        fn target(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Ok(Payload::from("targeted"))
        }
        fn read(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Ok(Payload::from("read"))
        }
    }

    let config = parse(
        r#"{"services": [{"service": "Editor", "uri": "/doc"}]}"#,
        ConfigFormat::Json,
        None,
    )
    .unwrap();
    let app = ApplicationBuilder::new()
        .metadata_type(MetadataType::new("App_Patch"))
        .service(
            ServiceBuilder::<Editor>::with_default("Editor")
                .method_with_doc("patch", "@Patch", Editor::patch)
                .method_with_doc("target", "@Target(\"method\")", Editor::target)
                .method_with_doc("read", "@Get", Editor::read)
                .build(),
        )
        .build(config)
        .unwrap();

    for verb in ["PATCH", "TARGET"] {
        let response = app.dispatcher().dispatch(&Request::new(verb, "/doc")).unwrap();
        assert_eq!(response.status, 405, "{verb}");
    }
    let response = app.dispatcher().dispatch(&Request::new("GET", "/doc")).unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.ends_with("<root>read</root>"));
}

#[test]
fn test_post_and_put_share_one_method() {
    for method in ["POST", "PUT"] {
        let response = dispatch(
            Request::new(method, "/users/7")
                .header("Content-Type", "application/json")
                .header("Accept", "application/json")
                .body(br#"{"name": "Ann"}"#.to_vec()),
        );
        assert_eq!(response.status, 200, "{method}");
        let expected_method = if method == "POST" { "Post" } else { "Put" };
        assert_eq!(
            json_body(&response),
            json!({"stored": {"id": "7", "method": expected_method, "body": {"name": "Ann"}}})
        );
    }
}

#[test]
fn test_json_request_without_accept_answers_json() {
    let response = dispatch(
        Request::new("POST", "/users/7")
            .header("Content-Type", "application/json")
            .body(br#"{"name": "Ann"}"#.to_vec()),
    );
    assert_eq!(response.status, 200);
    let content_type = response.content_type().unwrap();
    assert_eq!(classify(content_type), Some(ContentKind::Json));
    assert_eq!(json_body(&response)["stored"]["body"], json!({"name": "Ann"}));
}

#[test]
fn test_xml_body_is_decoded() {
    let response = dispatch(
        Request::new("PUT", "/users/7")
            .header("Content-Type", "text/xml")
            .header("Accept", "text/json")
            .body(b"<user><name>Ann</name><tag>a</tag><tag>b</tag></user>".to_vec()),
    );
    assert_eq!(response.status, 200);
    assert_eq!(
        json_body(&response)["stored"]["body"],
        json!({"user": {"name": "Ann", "tag": ["a", "b"]}})
    );
}

#[test]
fn test_blank_body_is_an_empty_map() {
    let response = dispatch(
        Request::new("POST", "/users/7").header("Accept", "application/json"),
    );
    assert_eq!(response.status, 200);
    assert_eq!(json_body(&response)["stored"]["body"], json!({}));
}

#[test]
fn test_get_ignores_body() {
    let response = dispatch(
        Request::new("GET", "/users/7")
            .header("Accept", "application/json")
            .body(b"{not json".to_vec()),
    );
    assert_eq!(response.status, 200);
}

#[test]
fn test_unparsable_body_is_400() {
    let response = dispatch(
        Request::new("POST", "/users/7")
            .header("Content-Type", "application/json")
            .body(b"{not json".to_vec()),
    );
    assert_eq!(response.status, 400);
    assert_eq!(
        json_body(&response),
        json!({"error": "JSON sent could not be parsed"})
    );

    let response = dispatch(
        Request::new("PUT", "/users/7")
            .header("Content-Type", "application/xml")
            .body(b"<user><name>Ann</user>".to_vec()),
    );
    assert_eq!(response.status, 400);
    assert!(response.body.contains("XML sent could not be parsed"));
}

#[test]
fn test_unsupported_content_type_is_415() {
    let response = dispatch(Request::new("GET", "/health").header("Content-Type", "text/plain"));
    assert_eq!(response.status, 415);
    assert_eq!(response.content_type(), Some("text/xml"));
    assert!(response.body.contains("text/plain"));
}

#[test]
fn test_negotiation_errors_come_before_verb_matching() {
    let response = dispatch(
        Request::new("DELETE", "/users/42").header("Content-Type", "text/plain"),
    );
    assert_eq!(response.status, 415);
}

#[test]
fn test_accept_negotiation() {
    let response = dispatch(Request::new("GET", "/health").header("Accept", "text/html"));
    assert_eq!(response.status, 415);

    let response = dispatch(
        Request::new("GET", "/health").header("Accept", "text/html, application/json;q=0.9"),
    );
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(response.body, "\"OK\"");

    let response = dispatch(Request::new("GET", "/health").header("Accept", "*/*"));
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type(), Some("text/xml"));
    assert!(response.body.ends_with("<root>OK</root>"));
}

#[test]
fn test_options_lists_tagged_verbs_once() {
    let response = dispatch(
        Request::new("OPTIONS", "/items/abc").header("Accept", "application/json"),
    );
    assert_eq!(response.status, 200);
    assert_eq!(
        json_body(&response),
        json!({"optionList": {"option": ["get", "put"]}})
    );

    let response = dispatch(Request::new("OPTIONS", "/items/abc"));
    assert!(response
        .body
        .ends_with("<optionList><option>get</option><option>put</option></optionList>"));
}

#[test]
fn test_options_on_untagged_service_is_empty() {
    #[derive(Default)]
    struct Plain;
    impl Plain {
        fn run(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Ok(Payload::Empty)
        }
    }

    let config = parse(
        r#"{"services": [{"service": "Plain", "uri": "/plain"}]}"#,
        ConfigFormat::Json,
        None,
    )
    .unwrap();
    let app = ApplicationBuilder::new()
        .service(
            ServiceBuilder::<Plain>::with_default("Plain")
                .method_with_doc("run", "Runs without any verb tag.", Plain::run)
                .build(),
        )
        .build(config)
        .unwrap();
    let response = app
        .dispatcher()
        .dispatch(&Request::new("OPTIONS", "/plain").header("Accept", "text/json"))
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(json_body(&response), json!({"optionList": {}}));

    let response = app.dispatcher().dispatch(&Request::new("GET", "/plain")).unwrap();
    assert_eq!(response.status, 405);
}

#[test]
fn test_first_tagged_method_wins() {
    let response = dispatch(Request::new("PUT", "/items/abc").header("Accept", "text/json"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "\"replaced\"");
}

#[test]
fn test_path_is_percent_decoded() {
    let response = dispatch(Request::new("GET", "/items/ab%63").header("Accept", "text/json"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "\"item abc\"");
}

#[test]
fn test_empty_path_is_400() {
    for path in ["", "/"] {
        let response = dispatch(Request::new("GET", path));
        assert_eq!(response.status, 400, "{path:?}");
        assert!(response.body.contains("No service requested"));
    }
}

#[test]
fn test_unmatched_path_is_400() {
    let response = dispatch(Request::new("GET", "/users/abc"));
    assert_eq!(response.status, 400);
    assert!(response.body.contains("No service to match the requested uri"));
}

#[test]
fn test_unparsable_path_is_500() {
    let response = dispatch(Request::new("GET", "/users/%FF"));
    assert_eq!(response.status, 500);
    assert_eq!(response.content_type(), Some("text/xml"));
}

#[test]
fn test_status_error_with_structured_message() {
    let response = dispatch(Request::new("GET", "/broken").header("Accept", "application/json"));
    assert_eq!(response.status, 404);
    assert_eq!(json_body(&response), json!({"missing": "widget"}));

    let response = dispatch(Request::new("GET", "/broken"));
    assert_eq!(response.status, 404);
    assert!(response.body.ends_with("<missing>widget</missing>"));
}

#[test]
fn test_undeclared_status_becomes_500() {
    let response = dispatch(Request::new("PUT", "/broken").header("Accept", "application/json"));
    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response), json!({"error": "short and stout"}));
}

#[test]
fn test_generic_failure_is_500() {
    let response = dispatch(Request::new("POST", "/broken").header("Accept", "application/json"));
    assert_eq!(response.status, 500);
    assert_eq!(json_body(&response), json!({"error": "Unexpected exception"}));
}

#[test]
fn test_fatal_error_produces_no_response() {
    let app = fixture_app();
    let err = app
        .dispatcher()
        .dispatch(&Request::new("DELETE", "/broken"))
        .unwrap_err();
    assert!(err.to_string().contains("storage is gone"));
    assert!(err.to_string().contains(&err.request_id.to_string()));
}

#[test]
fn test_empty_result_has_empty_body() {
    let response = dispatch(Request::new("GET", "/empty"));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "");
    assert_eq!(response.get_header("Content-Length"), Some("0"));
}

#[test]
fn test_content_length_counts_bytes() {
    let response = dispatch(Request::new("GET", "/users/42"));
    assert_eq!(
        response.get_header("content-length"),
        Some(response.body.len().to_string().as_str())
    );
}

#[test]
fn test_request_id_is_propagated() {
    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let response = dispatch(Request::new("GET", "/health").header("X-Request-Id", id));
    assert_eq!(response.get_header("x-request-id"), Some(id));

    let response = dispatch(Request::new("GET", "/health").header("X-Request-Id", "nonsense"));
    let generated = response.get_header("x-request-id").unwrap();
    assert_ne!(generated, "nonsense");
    assert_eq!(generated.len(), 26);
}

#[test]
fn test_display_errors_shows_the_chain() {
    #[derive(Default)]
    struct Chain;
    impl Chain {
        fn run(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Err(anyhow::anyhow!("disk full").context("cannot save").into())
        }
    }

    let yaml = |display: bool| {
        format!(
            "settings:\n  display_errors: {display}\nservices:\n  - service: Chain\n    uri: /chain\n"
        )
    };
    for (display, expected) in [(false, "cannot save"), (true, "cannot save: disk full")] {
        let config = parse(&yaml(display), ConfigFormat::Yaml, None).unwrap();
        let app = ApplicationBuilder::new()
            .service(
                ServiceBuilder::<Chain>::with_default("Chain")
                    .method_with_doc("run", "@Get", Chain::run)
                    .build(),
            )
            .build(config)
            .unwrap();
        let response = app
            .dispatcher()
            .dispatch(&Request::new("GET", "/chain").header("Accept", "application/json"))
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(json_body(&response), json!({"error": expected}));
    }
}

#[test]
fn test_malformed_metadata_is_500_for_that_service_only() {
    let config = parse(
        r#"{"services": [
            {"service": "Api_Health", "uri": "/health"},
            {"service": "Bad", "uri": "/bad"}
        ]}"#,
        ConfigFormat::Json,
        None,
    )
    .unwrap();
    #[derive(Default)]
    struct Bad;
    impl Bad {
        fn run(&mut self, _req: &HandlerRequest) -> HandlerResult {
            Ok(Payload::from("unreachable"))
        }
    }
    let app = fixture_builder()
        .service(
            ServiceBuilder::<Bad>::with_default("Bad")
                .method_with_doc("run", "@Get(\"unterminated", Bad::run)
                .build(),
        )
        .build(config)
        .unwrap();

    let response = app.dispatcher().dispatch(&Request::new("GET", "/bad")).unwrap();
    assert_eq!(response.status, 500);
    let response = app.dispatcher().dispatch(&Request::new("GET", "/health")).unwrap();
    assert_eq!(response.status, 200);
    assert!(app.preload().is_err());
}

#[test]
fn test_routed_but_unregistered_service_is_500() {
    let registry = Arc::new(MetadataRegistry::new());
    register_verbs(&registry).unwrap();
    let metadata = Arc::new(MetadataBuilder::new(registry, Arc::new(NativeDocs::new())));
    let routes = RouteTable::from_mappings([("Ghost", "/ghost")]).unwrap();
    let dispatcher = Dispatcher::new(
        routes,
        ServiceRegistry::new(),
        metadata,
        DispatcherSettings::default(),
    );
    let response = dispatcher.dispatch(&Request::new("GET", "/ghost")).unwrap();
    assert_eq!(response.status, 500);
}

#[test]
fn test_pretty_xml_setting() {
    let config = parse(
        "settings:\n  xml:\n    pretty_format: true\nservices:\n  - service: Api_Users\n    uri: /users/{$id[int]}\n",
        ConfigFormat::Yaml,
        None,
    )
    .unwrap();
    let app = fixture_builder().build(config).unwrap();
    let response = app.dispatcher().dispatch(&Request::new("GET", "/users/1")).unwrap();
    assert_eq!(response.status, 200);
    assert!(response.body.contains("\n  <id>1</id>"), "{}", response.body);
}
