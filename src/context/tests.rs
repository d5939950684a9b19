use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;
use serde_json::json;

use super::*;
use crate::controller::Controller;
use crate::testing::{self, context_for};

struct Open(Vec<&'static str>);

impl Controller for Open {
    fn routes(&self) -> Vec<String> {
        self.0.iter().map(|r| (*r).to_owned()).collect()
    }

    fn authenticate(&self, _ctx: &Context) -> bool {
        true
    }
}

/// Refuses everyone and counts how often it was asked.
struct Closed {
    calls: Arc<AtomicUsize>,
}

impl Controller for Closed {
    fn routes(&self) -> Vec<String> {
        vec!["private".into()]
    }

    fn authenticate(&self, _ctx: &Context) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }
}

fn open(routes: &[&'static str]) -> Open {
    Open(routes.to_vec())
}

fn blank(method: Method) -> Context {
    context_for(open(&[]), testing::request(method, "/"))
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
struct Person {
    #[serde(rename = "FirstName")]
    first_name: String,
    age: i64,
    nicknames: Vec<String>,
}

impl FormModel for Person {
    fn fields() -> &'static [Field] {
        const FIELDS: &[Field] = &[
            Field::text("FirstName"),
            Field::integer("age"),
            Field::list("nicknames"),
        ];
        FIELDS
    }
}

#[test]
fn routes_and_extracts_parameters() {
    let ctx = context_for(open(&["foo/{{id}}"]), testing::request(Method::Get, "/foo/bar?x=1"));

    assert!(!ctx.has_error());
    assert_eq!(ctx.status(), StatusCode::Ok);
    assert_eq!(ctx.path(), "foo/bar");
    assert_eq!(ctx.uri(), "/foo/bar?x=1");
    assert_eq!(ctx.route().unwrap().template(), "foo/{{id}}");
    assert_eq!(ctx.uri_parameters().get("id"), Some("bar"));
    assert_eq!(ctx.query_parameters().get("x"), Some("1"));
}

#[test]
fn empty_segment_binds_an_empty_parameter() {
    let ctx = context_for(open(&["a/{{x}}/c"]), testing::request(Method::Get, "/a//c"));

    assert!(!ctx.has_error());
    assert_eq!(ctx.route().unwrap().template(), "a/{{x}}/c");
    assert_eq!(ctx.uri_parameters().get("x"), Some(""));
}

#[test]
fn root_path_skips_detemplating() {
    let ctx = blank(Method::Get);
    assert!(!ctx.has_error());
    assert_eq!(ctx.path(), "");
    assert_eq!(ctx.route().unwrap().template(), "/");
    assert!(ctx.uri_parameters().is_empty());
}

#[test]
fn unregistered_path_is_invalid_route() {
    let ctx = context_for(open(&["foo"]), testing::request(Method::Get, "/elsewhere"));

    assert_eq!(ctx.status(), StatusCode::BadRequest);
    let err = ctx.error().unwrap();
    assert_eq!(err.code, ErrorCode::InvalidRoute);
    assert!(ctx.route().is_none());
}

#[test]
fn unusable_template_is_server_error() {
    let ctx = context_for(open(&["a/{{x}}{{y}}"]), testing::request(Method::Get, "/a/1"));

    assert_eq!(ctx.status(), StatusCode::InternalServerError);
    assert_eq!(ctx.error().unwrap().code, ErrorCode::InvalidRoute);
}

#[test]
fn malformed_query_stops_the_pipeline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = Closed {
        calls: Arc::clone(&calls),
    };
    let ctx = context_for(controller, testing::request(Method::Get, "/?%zzzzz"));

    assert_eq!(ctx.status(), StatusCode::BadRequest);
    let err = ctx.error().unwrap();
    assert_eq!(err.code, ErrorCode::MalformedUrl);
    assert_eq!(err.message, "Malformed URL Parameters '/?%zzzzz'.");
    assert!(ctx.route().is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn refused_authentication_is_401() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = Closed {
        calls: Arc::clone(&calls),
    };
    let ctx = context_for(controller, testing::request(Method::Get, "/private"));

    assert_eq!(ctx.status(), StatusCode::Unauthorized);
    let err = ctx.error().unwrap();
    assert_eq!(err.code, ErrorCode::AuthenticationFailed);
    assert_eq!(err.message, "Invalid Credentials");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn options_bypasses_authentication() {
    let calls = Arc::new(AtomicUsize::new(0));
    let controller = Closed {
        calls: Arc::clone(&calls),
    };
    let ctx = context_for(controller, testing::request(Method::Options, "/private"));

    assert!(!ctx.has_error());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn set_response_refused_after_error() {
    let mut ctx = blank(Method::Get);
    ctx.set_error(RestError::new(ErrorCode::NotFound, "gone"), StatusCode::NotFound);

    assert!(!ctx.set_response("ignored", StatusCode::Ok));
    assert_eq!(ctx.status(), StatusCode::NotFound);
    assert_eq!(ctx.error().unwrap().message, "gone");
    assert!(ctx.model().is_none());
}

#[test]
fn set_error_replaces_model() {
    let mut ctx = blank(Method::Get);
    assert!(ctx.set_response(&json!({ "a": 1 }), StatusCode::Created));
    assert_eq!(ctx.status(), StatusCode::Created);

    ctx.set_error(RestError::new(ErrorCode::NotAuthorized, ""), StatusCode::Forbidden);
    assert!(ctx.model().is_none());
    assert_eq!(ctx.status(), StatusCode::Forbidden);
    assert_eq!(ctx.error().unwrap().code, ErrorCode::NotAuthorized);
}

#[test]
fn string_models_are_text() {
    let mut ctx = blank(Method::Get);
    ctx.set_response("plain", StatusCode::Ok);
    assert_eq!(ctx.model().and_then(Model::as_text), Some("plain"));
}

#[test]
fn add_error_starts_a_validation_error() {
    let mut ctx = blank(Method::Post);
    ctx.add_error(FieldError::new(ErrorCode::CannotBeBlank, "required", "name"));
    ctx.add_error(FieldError::new(ErrorCode::CannotBeBlank, "required", "email"));

    assert_eq!(ctx.status(), StatusCode::BadRequest);
    let err = ctx.error().unwrap();
    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(err.details.len(), 2);
    assert_eq!(err.details[1]["field"], "email");
}

#[test]
fn add_error_keeps_an_existing_error() {
    let mut ctx = blank(Method::Post);
    ctx.set_error(RestError::new(ErrorCode::NotFound, ""), StatusCode::NotFound);
    ctx.add_error(FieldError::new(ErrorCode::CannotBeBlank, "required", "name"));

    assert_eq!(ctx.status(), StatusCode::NotFound);
    assert_eq!(ctx.error().unwrap().code, ErrorCode::NotFound);
    assert_eq!(ctx.error().unwrap().details.len(), 1);
}

#[test]
fn read_without_content_is_an_error() {
    let request = testing::raw_request(Method::Post, "/", &[("Content-Length", "0")], b"");
    let mut ctx = context_for(open(&[]), request);
    assert!(matches!(ctx.read(), Err(ContextError::NoContent { .. })));

    let mut ctx = blank(Method::Post);
    assert!(matches!(ctx.read(), Err(ContextError::NoContent { .. })));
    assert!(!ctx.has_error());
}

#[test]
fn read_is_cached() {
    let request = testing::request_with_body(Method::Post, "/", "text/plain", b"hello");
    let mut ctx = context_for(open(&[]), request);

    assert_eq!(&ctx.read().unwrap()[..], b"hello");
    assert_eq!(&ctx.read().unwrap()[..], b"hello");
    assert_eq!(ctx.cached_body(), Some(&b"hello"[..]));
}

#[test]
fn read_truncates_to_declared_length() {
    let request =
        testing::raw_request(Method::Post, "/", &[("Content-Length", "3")], b"abcdef");
    let mut ctx = context_for(open(&[]), request);
    assert_eq!(&ctx.read().unwrap()[..], b"abc");
}

#[test]
fn short_body_is_tolerated() {
    let request =
        testing::raw_request(Method::Post, "/", &[("Content-Length", "10")], b"abc");
    let mut ctx = context_for(open(&[]), request);
    assert_eq!(&ctx.read().unwrap()[..], b"abc");
}

#[test]
fn read_object_decodes_json() {
    let request = testing::json_request(
        Method::Post,
        "/",
        &json!({ "FirstName": "Ada", "age": 36, "nicknames": ["countess"] }),
    );
    let mut ctx = context_for(open(&[]), request);

    let person: Person = ctx.read_object().unwrap();
    assert_eq!(person.first_name, "Ada");
    assert_eq!(person.age, 36);
    assert_eq!(person.nicknames, ["countess"]);
    assert!(!ctx.has_error());
}

#[test]
fn read_object_decodes_forms() {
    let form = "first_name=Ada&age=36&nicknames=C&nicknames[]=A&nicknames[]=B";
    let mut ctx = context_for(open(&[]), testing::form_request(Method::Post, "/", form));

    let person: Person = ctx.read_object().unwrap();
    assert_eq!(
        person,
        Person {
            first_name: "Ada".into(),
            age: 36,
            nicknames: vec!["C".into(), "A".into(), "B".into()],
        }
    );
}

#[test]
fn read_object_accepts_media_type_parameters() {
    let request = testing::request_with_body(
        Method::Post,
        "/",
        "application/json; charset=utf-8",
        br#"{"age":5}"#,
    );
    let mut ctx = context_for(open(&[]), request);
    let person: Person = ctx.read_object().unwrap();
    assert_eq!(person.age, 5);
}

#[test]
fn read_object_rejects_unsupported_media_type() {
    let request = testing::request_with_body(Method::Post, "/", "text/xml", b"<a/>");
    let mut ctx = context_for(open(&[]), request);

    let result = ctx.read_object::<Person>();
    assert!(matches!(result, Err(ContextError::UnsupportedMediaType { ref media_type }) if media_type == "text/xml"));
    assert_eq!(ctx.status(), StatusCode::NotAcceptable);
    assert_eq!(ctx.error().unwrap().code, ErrorCode::ValidationError);
}

#[test]
fn read_object_requires_media_type() {
    let request = testing::raw_request(Method::Post, "/", &[("Content-Length", "2")], b"{}");
    let mut ctx = context_for(open(&[]), request);

    assert!(matches!(ctx.read_object::<Person>(), Err(ContextError::MissingMediaType)));
    assert_eq!(ctx.status(), StatusCode::NotAcceptable);
}

#[test]
fn read_object_reports_bad_json() {
    let request = testing::request_with_body(Method::Post, "/", CONTENT_TYPE_JSON, b"{nope");
    let mut ctx = context_for(open(&[]), request);

    assert!(matches!(ctx.read_object::<Person>(), Err(ContextError::Json(_))));
    assert_eq!(ctx.status(), StatusCode::NotAcceptable);
}

#[test]
fn read_object_without_body_leaves_context_clean() {
    let mut ctx = blank(Method::Post);
    assert!(matches!(ctx.read_object::<Person>(), Err(ContextError::NoContent { .. })));
    assert!(!ctx.has_error());
}

#[test]
fn read_query_params_uses_field_table() {
    let ctx = context_for(
        open(&["people"]),
        testing::request(Method::Get, "/people?first_name=Ada&nicknames[]=x"),
    );

    let person: Person = ctx.read_query_params().unwrap();
    assert_eq!(person.first_name, "Ada");
    assert_eq!(person.age, 0);
    assert_eq!(person.nicknames, ["x"]);
}

#[test]
fn write_and_headers_accumulate() {
    let mut ctx = blank(Method::Get);
    ctx.set_header("Content-Type", "text/plain");
    ctx.write("a");
    ctx.write("b");

    assert_eq!(ctx.written(), b"ab");
    assert_eq!(ctx.response_headers().get("content-type"), Some("text/plain"));

    let (headers, body) = ctx.take_response();
    assert_eq!(headers.len(), 1);
    assert_eq!(body, b"ab");
    assert!(ctx.written().is_empty());
}

#[test]
fn extensions_are_type_keyed() {
    #[derive(Debug, PartialEq)]
    struct UserId(u64);

    let mut ctx = blank(Method::Get);
    ctx.extensions_mut().insert(UserId(7));
    ctx.extensions_mut().insert("token");

    assert_eq!(ctx.extensions().get::<UserId>(), Some(&UserId(7)));
    assert_eq!(ctx.extensions().get::<&str>(), Some(&"token"));
    ctx.extensions_mut().get_mut::<UserId>().unwrap().0 = 8;
    assert_eq!(ctx.extensions_mut().remove::<UserId>(), Some(UserId(8)));
    assert!(ctx.extensions().get::<UserId>().is_none());
}

#[test]
fn unrouted_context_has_no_route() {
    let ctx = Context::unrouted(testing::request(Method::Get, "/x?y=1"), None);
    assert!(ctx.route().is_none());
    assert!(ctx.query_parameters().is_empty());
    assert!(!ctx.has_error());
}
