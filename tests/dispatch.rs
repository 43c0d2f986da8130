//! End-to-end dispatch tests driven through the layered router.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use rest_ingress::cors::{AllowedOrigins, CorsPolicy};
use rest_ingress::handler::{handler_fn, HandlerError, HandlerOutput};
use rest_ingress::http::response::{JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE};
use rest_ingress::http::ContentValue;

mod common;
use common::{app, app_with, binding, multipart_body, multipart_content_type, request, send, Recorder};

#[tokio::test]
async fn preflight_answers_without_invoking_handler() {
    let recorder = Recorder::default();
    let app = app(vec![
        binding("GET", "/items/:id", recorder.replying(json!({}))),
        binding("POST", "/items/:id", recorder.replying(json!({}))),
    ]);

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/items/9")
        .header("origin", "https://app.example")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body.is_empty());
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
    assert!(response
        .header("access-control-allow-methods")
        .unwrap()
        .contains("POST"));
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn preflight_from_disallowed_origin_gets_no_cors_headers() {
    let recorder = Recorder::default();
    let policy = CorsPolicy {
        allowed_origins: AllowedOrigins::List(vec!["https://app.example".into()]),
        ..CorsPolicy::default()
    };
    let app = app_with(vec![binding("GET", "/x", recorder.replying(json!({})))], policy);

    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/x")
        .header("origin", "https://evil.example")
        .header("access-control-request-method", "GET")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, preflight).await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.header("access-control-allow-origin").is_none());
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn json_body_reaches_handler() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/things", recorder.replying(json!({ "code": 201 })))]);

    let response = send(&app, request("POST", "/things", Some("application/json"), "{}")).await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert!(response.body.is_empty());

    let seen = recorder.last();
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.content, ContentValue::Json(json!({})));
}

#[tokio::test]
async fn empty_json_body_is_empty_content() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/things", recorder.replying(json!({})))]);

    let response = send(&app, request("POST", "/things", Some("application/json"), "")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(recorder.last().content, ContentValue::Empty);
}

#[tokio::test]
async fn truncated_json_is_bad_request() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/things", recorder.replying(json!({})))]);

    let response = send(&app, request("POST", "/things", Some("application/json"), "{")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().starts_with("invalid JSON body"));
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn form_keeps_first_value() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/form", recorder.replying(json!({})))]);

    let response = send(
        &app,
        request("POST", "/form", Some("application/x-www-form-urlencoded"), "a=1&a=2&b=x"),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let ContentValue::Form(form) = recorder.last().content else {
        panic!("expected form content");
    };
    assert_eq!(form.len(), 2);
    assert_eq!(form["a"], "1");
    assert_eq!(form["b"], "x");
}

#[tokio::test]
async fn bad_form_escape_is_bad_request() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/form", recorder.replying(json!({})))]);

    let response = send(
        &app,
        request("POST", "/form", Some("application/x-www-form-urlencoded"), "a=%zz"),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("%zz"));
}

#[tokio::test]
async fn multipart_file_reaches_handler() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/upload", recorder.replying(json!({})))]);

    let body = multipart_body(&[
        ("note", None, None, b"ignored".as_slice()),
        ("f", Some("t.txt"), Some("text/plain"), [0x41u8, 0x42].as_slice()),
    ]);
    let response = send(
        &app,
        request("POST", "/upload", Some(&multipart_content_type()), body),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);

    let ContentValue::Multipart { files } = recorder.last().content else {
        panic!("expected multipart content");
    };
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].field_key, "f");
    assert_eq!(files[0].file_name, "t.txt");
    assert_eq!(files[0].size_bytes, 2);
    assert_eq!(files[0].bytes, vec![0x41, 0x42]);
}

#[tokio::test]
async fn params_query_and_headers_are_flattened() {
    let recorder = Recorder::default();
    let app = app(vec![binding("get", "/users/:id/files/*rest", recorder.replying(json!({})))]);

    let req = Request::builder()
        .method("GET")
        .uri("/users/42/files/a/b.txt?tag=x&tag=y")
        .header("X-Custom", "one")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.status, StatusCode::OK);

    let seen = recorder.last();
    assert_eq!(seen.method, "GET");
    assert_eq!(seen.path_params["id"], "42");
    assert_eq!(seen.path_params["rest"], "/a/b.txt");
    assert_eq!(seen.query_params["tag"], "x,y");
    assert_eq!(seen.headers["x-custom"], "one");
    assert!(seen.headers.contains_key("x-request-id"));
    assert_eq!(seen.content, ContentValue::Raw(String::new()));
}

#[tokio::test]
async fn path_params_are_percent_decoded() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/users/:id", recorder.replying(json!({})))]);

    let response = send(&app, request("GET", "/users/a%20b", None, Body::empty())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(recorder.last().path_params["id"], "a b");
}

#[tokio::test]
async fn static_route_for_other_method_does_not_shadow_param_route() {
    let by_name = Recorder::default();
    let readme = Recorder::default();
    let app = app(vec![
        binding("GET", "/files/:name", by_name.replying(json!({}))),
        binding("POST", "/files/readme", readme.replying(json!({}))),
    ]);

    let response = send(&app, request("GET", "/files/readme", None, Body::empty())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(by_name.last().path_params["name"], "readme");
    assert_eq!(readme.calls(), 0);

    let wrong = send(&app, request("DELETE", "/files/readme", None, Body::empty())).await;
    assert_eq!(wrong.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(wrong.header("allow"), Some("GET, OPTIONS, POST"));
}

#[tokio::test]
async fn text_reply_is_plain_text() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/hello", recorder.replying(json!({ "code": 0, "data": "hello" })))]);

    let response = send(&app, request("GET", "/hello", None, Body::empty())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), "hello");
    assert_eq!(response.header("content-type"), Some(TEXT_CONTENT_TYPE));
}

#[tokio::test]
async fn object_reply_is_compact_json() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/obj", recorder.replying(json!({ "code": 0, "data": { "x": 1 } })))]);

    let response = send(&app, request("GET", "/obj", None, Body::empty())).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text(), r#"{"x":1}"#);
    assert_eq!(response.header("content-type"), Some(JSON_CONTENT_TYPE));
}

#[tokio::test]
async fn invalid_reply_code_is_bad_request() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/bad", recorder.replying(json!({ "code": 7 })))]);

    let response = send(&app, request("GET", "/bad", None, Body::empty())).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.text().contains("invalid response code 7"));
}

#[tokio::test]
async fn handler_error_is_bad_request_with_text() {
    let failing = std::sync::Arc::new(handler_fn(|_ctx, _req| async {
        Err::<HandlerOutput, HandlerError>("quota exceeded".into())
    }));
    let app = app(vec![binding("POST", "/fail", failing)]);

    let req = Request::builder()
        .method("POST")
        .uri("/fail")
        .header("origin", "https://app.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.text(), "quota exceeded");
    assert_eq!(response.header("access-control-allow-origin"), Some("*"));
}

#[tokio::test]
async fn unknown_path_and_wrong_method() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/only-get", recorder.replying(json!({})))]);

    let missing = send(&app, request("GET", "/nope", None, Body::empty())).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.text(), "No matching route found");

    let wrong = send(&app, request("DELETE", "/only-get", None, Body::empty())).await;
    assert_eq!(wrong.status, StatusCode::METHOD_NOT_ALLOWED);
    let allow = wrong.header("allow").unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("OPTIONS"));
    assert_eq!(recorder.calls(), 0);
}

#[tokio::test]
async fn request_id_is_propagated() {
    let recorder = Recorder::default();
    let app = app(vec![binding("GET", "/id", recorder.replying(json!({})))]);

    let req = Request::builder()
        .uri("/id")
        .header("x-request-id", "fixed-id")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, req).await;
    assert_eq!(response.header("x-request-id"), Some("fixed-id"));
    assert_eq!(recorder.last().headers["x-request-id"], "fixed-id");

    let generated = send(&app, request("GET", "/id", None, Body::empty())).await;
    assert!(generated.header("x-request-id").is_some());
}

#[tokio::test]
async fn same_body_decodes_identically() {
    let recorder = Recorder::default();
    let app = app(vec![binding("POST", "/twice", recorder.replying(json!({})))]);
    let body = r#"{"nested":{"list":[1,2,3]},"flag":true}"#;

    send(&app, request("POST", "/twice", Some("application/json"), body)).await;
    send(&app, request("POST", "/twice", Some("application/json"), body)).await;

    let seen = recorder.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].content, seen[1].content);
}
