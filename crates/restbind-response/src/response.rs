//! Success and error response builders.
//!
//! | Builder | Status | Body |
//! |---------|--------|------|
//! | [`ok`] | 200 | success document |
//! | [`created`] | 201 | success document |
//! | [`accepted`] | 202 | success document, meta `{"output": "success"}` without data |
//! | [`Success`] | any 2xx | success document, paginated and projected |
//! | [`error`] | any 4xx/5xx | error document |
//! | [`bad_request`] | 400 | `Client error: {message}` |
//! | [`not_found`] | 404 | `Client error: The requested resource does not exist.` |
//! | [`internal_server_error`] | 500 | `Server error: {type} {message} \n {trace}` |
//!
//! Every body is passed through the active version's `response_body_dict`
//! hook before [`FrameworkAdapter::make_response`] turns it into a wire
//! response.

use std::fmt;

use bytes::Bytes;
use chrono::Utc;
use http::header::RETRY_AFTER;
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use indexmap::IndexMap;
use restbind_core::{with_version_hooks, FrameworkAdapter, RestError};
use restbind_jsonapi::{to_jsonable, ErrorDocument, ErrorObject, Link, PrimaryData, Resource, SuccessDocument};
use serde_json::{Map, Value};
use tracing::error as log_error;

use crate::pagination::paginate;
use crate::{project, ErrorPolicy};

/// Query parameter selecting a sub-tree of the response.
pub const JSON_PATH_PARAM: &str = "json_path";

/// Data returned by a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// No data.
    Empty,
    /// A single resource.
    Resource(Box<Resource>),
    /// A list of resources.
    Resources(Vec<Resource>),
    /// A list of arbitrary values.
    List(Vec<Value>),
    /// Any other value. It is returned as-is, without a document envelope.
    Value(Value),
}

impl From<Resource> for Payload {
    fn from(resource: Resource) -> Self {
        Self::Resource(Box::new(resource))
    }
}

impl From<Vec<Resource>> for Payload {
    fn from(resources: Vec<Resource>) -> Self {
        Self::Resources(resources)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Array(items) => Self::List(items),
            other => Self::Value(other),
        }
    }
}

impl From<Option<Resource>> for Payload {
    fn from(resource: Option<Resource>) -> Self {
        resource.map_or(Self::Empty, Self::from)
    }
}

/// A success response under construction.
///
/// # Example
///
/// ```
/// use restbind_core::HttpAdapter;
/// use restbind_jsonapi::Resource;
/// use restbind_response::Success;
///
/// let adapter = HttpAdapter::builder().uri("/cars?page=2").build();
/// let cars: Vec<Resource> = (0..5)
///     .map(|i| Resource::new("car", &format!("car{i}")).unwrap())
///     .collect();
///
/// let response = Success::new(cars).page_size(2).into_response(&adapter);
/// assert_eq!(response.status(), http::StatusCode::OK);
/// ```
#[derive(Debug, Clone)]
pub struct Success {
    data: Payload,
    status: StatusCode,
    meta: Map<String, Value>,
    links: IndexMap<String, Link>,
    included: Vec<Resource>,
    page_size: Option<u32>,
    id_only: bool,
}

impl Success {
    /// Creates a 200 response for `data`.
    pub fn new(data: impl Into<Payload>) -> Self {
        Self {
            data: data.into(),
            status: StatusCode::OK,
            meta: Map::new(),
            links: IndexMap::new(),
            included: Vec::new(),
            page_size: None,
            id_only: false,
        }
    }

    /// Sets the status. It must be 2xx.
    pub const fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a document meta member.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    /// Adds a document link.
    pub fn link(mut self, name: impl Into<String>, link: impl Into<Link>) -> Self {
        self.links.insert(name.into(), link.into());
        self
    }

    /// Adds included resources.
    pub fn included(mut self, included: Vec<Resource>) -> Self {
        self.included = included;
        self
    }

    /// Paginates list data with this page size unless the request
    /// overrides it.
    pub const fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Collapses resources to their ids.
    pub const fn id_only(mut self, id_only: bool) -> Self {
        self.id_only = id_only;
        self
    }

    /// Builds the wire response.
    ///
    /// Invalid `page`, `page_size` or `json_path` parameters produce a 400
    /// response; a non-2xx status or `included` without data produce a 500.
    pub fn into_response(self, adapter: &dyn FrameworkAdapter) -> Response<Bytes> {
        if !self.status.is_success() {
            return internal_server_error(
                adapter,
                "InvalidStatus",
                &format!("success responses must have a 2xx status, got {}", self.status),
                "",
            );
        }
        let status = self.status;
        let mut body = match self.into_body(adapter) {
            Ok(body) => body,
            Err(err) if err.is_client_error() => return bad_request(adapter, &err),
            Err(err) => return internal_server_error(adapter, "RestError", &err.to_string(), &err.trace()),
        };

        let args = adapter.query_string_args();
        if let Some(path) = args.get(JSON_PATH_PARAM).and_then(|v| v.first()) {
            match project(&body, path) {
                Ok(projected) => match &mut body {
                    Value::Object(map) => {
                        map.insert("data".to_string(), projected);
                    }
                    other => *other = serde_json::json!({ "data": projected }),
                },
                Err(err) => return bad_request(adapter, &err),
            }
        }

        finish(adapter, body, status, HeaderMap::new())
    }

    fn into_body(self, adapter: &dyn FrameworkAdapter) -> Result<Value, RestError> {
        let Self {
            data,
            mut meta,
            mut links,
            included,
            page_size,
            id_only,
            ..
        } = self;

        let primary = match data {
            Payload::Value(value) => return Ok(to_jsonable(value)),
            Payload::Empty => None,
            Payload::Resource(resource) => Some(PrimaryData::One(resource)),
            Payload::Resources(list) => Some(PrimaryData::Many(paginate(
                adapter, list, page_size, &mut meta, &mut links,
            )?)),
            Payload::List(list) => Some(PrimaryData::Values(paginate(
                adapter, list, page_size, &mut meta, &mut links,
            )?)),
        };

        let document = SuccessDocument::new(primary)
            .with_meta(meta)
            .with_links(links)
            .with_included(included)
            .map_err(|e| RestError::internal(e.to_string()))?;
        Ok(document.to_value(id_only))
    }
}

fn finish(
    adapter: &dyn FrameworkAdapter,
    body: Value,
    status: StatusCode,
    headers: HeaderMap,
) -> Response<Bytes> {
    let body = with_version_hooks(adapter, body, |hooks, body| hooks.response_body_dict(body));
    adapter.make_response(&body, status, headers)
}

/// Starts a success response for `data`; shorthand for [`Success::new`].
pub fn success(data: impl Into<Payload>) -> Success {
    Success::new(data)
}

/// 200 with `data`.
pub fn ok(adapter: &dyn FrameworkAdapter, data: impl Into<Payload>) -> Response<Bytes> {
    Success::new(data).into_response(adapter)
}

/// 201 with `data`.
pub fn created(adapter: &dyn FrameworkAdapter, data: impl Into<Payload>) -> Response<Bytes> {
    Success::new(data)
        .status(StatusCode::CREATED)
        .into_response(adapter)
}

/// 202 with `data`, or with meta `{"output": "success"}` when there is no
/// data.
pub fn accepted(adapter: &dyn FrameworkAdapter, data: impl Into<Payload>) -> Response<Bytes> {
    let data = data.into();
    let empty = matches!(data, Payload::Empty);
    let mut response = Success::new(data).status(StatusCode::ACCEPTED);
    if empty {
        response = response.meta("output", "success");
    }
    response.into_response(adapter)
}

/// Returns the id for a new error: the inbound `header` when present, else
/// the current UNIX time with fractional seconds.
pub fn error_id(adapter: &dyn FrameworkAdapter, header: &str) -> String {
    adapter
        .headers()
        .get(header)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                let now = Utc::now();
                format!("{}.{:06}", now.timestamp(), now.timestamp_subsec_micros())
            },
            str::to_string,
        )
}

/// An error response.
///
/// `retry_after` (seconds) is sent as the `Retry-After` header.
pub fn error(
    adapter: &dyn FrameworkAdapter,
    status: StatusCode,
    title: &str,
    detail: &str,
    retry_after: Option<u64>,
) -> Response<Bytes> {
    error_with_policy(adapter, &request_policy(adapter), status, title, detail, retry_after)
}

/// [`error`], with the id header taken from `policy`.
pub fn error_with_policy(
    adapter: &dyn FrameworkAdapter,
    policy: &ErrorPolicy,
    status: StatusCode,
    title: &str,
    detail: &str,
    retry_after: Option<u64>,
) -> Response<Bytes> {
    let id = error_id(adapter, &policy.unique_id_header);
    let object = match ErrorObject::new(id, status, title, detail) {
        Ok(object) => object,
        Err(e) => {
            log_error!(error = %e, "error response built with a non-error status");
            return internal_server_error(adapter, "InvalidStatus", &e.to_string(), "");
        }
    };

    let mut headers = HeaderMap::new();
    if let Some(seconds) = retry_after {
        headers.insert(RETRY_AFTER, HeaderValue::from(seconds));
    }
    finish(adapter, ErrorDocument::new(object).to_value(), status, headers)
}

/// 400 with detail `Client error: {message}`.
pub fn bad_request(adapter: &dyn FrameworkAdapter, message: &dyn fmt::Display) -> Response<Bytes> {
    bad_request_with_policy(adapter, &request_policy(adapter), message)
}

pub(crate) fn bad_request_with_policy(
    adapter: &dyn FrameworkAdapter,
    policy: &ErrorPolicy,
    message: &dyn fmt::Display,
) -> Response<Bytes> {
    error_with_policy(
        adapter,
        policy,
        StatusCode::BAD_REQUEST,
        "Bad request",
        &format!("Client error: {message}"),
        None,
    )
}

/// 404, with optional details appended on a new line.
pub fn not_found(adapter: &dyn FrameworkAdapter, details: Option<&str>) -> Response<Bytes> {
    not_found_with_policy(adapter, &request_policy(adapter), details)
}

pub(crate) fn not_found_with_policy(
    adapter: &dyn FrameworkAdapter,
    policy: &ErrorPolicy,
    details: Option<&str>,
) -> Response<Bytes> {
    let detail = match details {
        Some(details) => format!("Client error: The requested resource does not exist.\n{details}"),
        None => "Client error: The requested resource does not exist.".to_string(),
    };
    error_with_policy(adapter, policy, StatusCode::NOT_FOUND, "Not found", &detail, None)
}

/// 500 with detail `Server error: {kind} {message} \n {trace}`, or a fixed
/// detail when the request's policy redacts internal details.
pub fn internal_server_error(
    adapter: &dyn FrameworkAdapter,
    kind: &str,
    message: &str,
    trace: &str,
) -> Response<Bytes> {
    let policy = request_policy(adapter);
    let detail = if policy.expose_internal_details {
        format!("Server error: {kind} {message} \n {trace}")
    } else {
        REDACTED_DETAIL.to_string()
    };
    error_with_policy(
        adapter,
        &policy,
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error",
        &detail,
        None,
    )
}

pub(crate) const REDACTED_DETAIL: &str = "Server error: an unexpected error occurred.";

/// The policy of the route handling the current request, or the default
/// outside of a dispatch.
fn request_policy(adapter: &dyn FrameworkAdapter) -> ErrorPolicy {
    adapter
        .request_context()
        .map(|context| context.error_policy().clone())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use restbind_core::{HttpAdapter, PageSize, RequestContext, Versioner, VersionHooks};
    use serde_json::json;

    fn body(response: &Response<Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn adapter(uri: &str) -> HttpAdapter {
        HttpAdapter::builder().uri(uri).build()
    }

    fn test_resource() -> Resource {
        Resource::new("test_type", "test_name")
            .unwrap()
            .attribute("list", json!(["1", 2, "3"]))
            .attribute(
                "dic",
                json!({
                    "entry_1": "value 1",
                    "list": [{"x": 1, "b": "2"}, {"x": 2, "b": "3"}, {"x": 3, "b": "4"}]
                }),
            )
    }

    fn numbered(n: usize) -> Vec<Resource> {
        (1..=n)
            .map(|i| Resource::new("test_type", "test_name").unwrap().with_id(i.to_string()))
            .collect()
    }

    fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_status_helpers() {
        let a = adapter("/");
        assert_eq!(ok(&a, test_resource()).status(), StatusCode::OK);
        assert_eq!(created(&a, test_resource()).status(), StatusCode::CREATED);

        let response = accepted(&a, Payload::Empty);
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body(&response), json!({"meta": {"output": "success"}}));

        let response = accepted(&a, json!([1]));
        assert_eq!(body(&response), json!({"data": [1]}));
    }

    #[test]
    fn test_plain_value_is_not_enveloped() {
        let response = ok(&adapter("/"), json!({"name": "x", "_hidden": 1}));
        assert_eq!(body(&response), json!({"name": "x"}));
    }

    #[test]
    fn test_value_list_is_enveloped() {
        let response = ok(&adapter("/"), json!([1, 2]));
        assert_eq!(body(&response), json!({"data": [1, 2]}));
    }

    #[test]
    fn test_id_only() {
        let resources = vec![
            Resource::new("type", "name1").unwrap(),
            Resource::new("type", "name2").unwrap(),
        ];
        let response = Success::new(resources).id_only(true).into_response(&adapter("/"));
        assert_eq!(body(&response)["data"], json!(["/type/name1", "/type/name2"]));
    }

    #[test]
    fn test_json_path() {
        let cases = [
            ("/data/attributes/name", json!("test_name")),
            ("/data/attributes/list", json!(["1", 2, "3"])),
            ("/data/attributes/list/1", json!(2)),
            ("/data/attributes/dic/entry_1", json!("value 1")),
            ("/data/attributes/dic/list/*/x", json!([1, 2, 3])),
            ("/data/attributes/dic/list/*:>b~=(2|3)/b", json!(["2", "3"])),
        ];
        for (path, expected) in cases {
            let a = adapter(&format!("/r?json_path={}", path.replace('>', "%3E")));
            let response = ok(&a, test_resource());
            assert_eq!(response.status(), StatusCode::OK, "{path}");
            assert_eq!(body(&response)["data"], expected, "{path}");
        }
    }

    #[test]
    fn test_invalid_json_path_is_bad_request() {
        for path in [
            "/data/attributes/list/3",
            "/data/attributes/list/a",
            "/data/attributes/a",
            "/data/attributes/list/*:sfds",
        ] {
            let response = ok(&adapter(&format!("/r?json_path={path}")), test_resource());
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        }
    }

    #[test]
    fn test_explicit_page_size() {
        let response = Success::new(numbered(5)).page_size(2).into_response(&adapter("/r"));
        let b = body(&response);
        assert_eq!(ids(&b), ["1", "2"]);
        assert_eq!(b["meta"]["total_pages"], json!(3));
        assert!(b["links"]["next"]["url"].as_str().unwrap().contains("page=2"));
        assert!(b["links"].get("last").is_none());

        let response = Success::new(numbered(5))
            .page_size(2)
            .into_response(&adapter("/r?page=2&x=3"));
        let b = body(&response);
        assert_eq!(ids(&b), ["3", "4"]);
        assert!(b["links"]["next"]["url"].as_str().unwrap().contains("page=3&x=3"));
        assert!(b["links"]["last"]["url"].as_str().unwrap().contains("page=1&x=3"));

        let response = Success::new(numbered(5))
            .page_size(2)
            .into_response(&adapter("/r?page=3"));
        let b = body(&response);
        assert_eq!(ids(&b), ["5"]);
        assert!(b["links"]["last"]["url"].as_str().unwrap().contains("page=2"));
        assert!(b["links"].get("next").is_none());
    }

    #[test]
    fn test_context_page_size() {
        let a = adapter("/r?page=2&x=3");
        a.attach_request_context(Arc::new(
            RequestContext::new().with_page_size(PageSize::lazy(|| 2)),
        ));
        let b = body(&ok(&a, numbered(5)));
        assert_eq!(ids(&b), ["3", "4"]);
    }

    #[test]
    fn test_query_page_size_wins() {
        let a = adapter("/r?page_size=2&page=2&x=3");
        let b = body(&Success::new(numbered(5)).page_size(4).into_response(&a));
        assert_eq!(ids(&b), ["3", "4"]);
        assert!(b["links"]["next"]["url"]
            .as_str()
            .unwrap()
            .contains("page_size=2&page=3&x=3"));
    }

    #[test]
    fn test_invalid_page_is_bad_request() {
        let response = Success::new(numbered(5))
            .page_size(2)
            .into_response(&adapter("/r?page=0"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_error_envelopes() {
        let a = adapter("/");
        let response = bad_request(&a, &"test exception");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let b = body(&response);
        assert_eq!(b["error"]["title"], json!("Bad request"));
        assert_eq!(b["error"]["detail"], json!("Client error: test exception"));
        assert_eq!(b["error"]["status"], json!(400));

        let b = body(&not_found(&a, Some("This is the details about the issue.")));
        assert_eq!(
            b["error"]["detail"],
            json!("Client error: The requested resource does not exist.\nThis is the details about the issue.")
        );

        let b = body(&internal_server_error(&a, "Exception", "test exception", "stack trace"));
        let detail = b["error"]["detail"].as_str().unwrap();
        assert!(detail.contains("test exception"));
        assert!(detail.contains("stack trace"));
    }

    #[test]
    fn test_error_id_and_retry_after() {
        let a = HttpAdapter::builder().header("X-Unique-ID", "abc-123").build();
        let response = error(&a, StatusCode::SERVICE_UNAVAILABLE, "Unavailable", "later", Some(30));
        assert_eq!(body(&response)["error"]["id"], json!("abc-123"));
        assert_eq!(response.headers()[RETRY_AFTER], "30");

        let generated = error_id(&adapter("/"), "X-Unique-ID");
        let (secs, micros) = generated.split_once('.').unwrap();
        assert!(secs.parse::<i64>().unwrap() > 0);
        assert_eq!(micros.len(), 6);
    }

    #[test]
    fn test_invalid_json_path_uses_context_id_header() {
        let a = HttpAdapter::builder()
            .uri("/?json_path=nope")
            .header("X-Request-Id", "req-42")
            .build();
        let policy = ErrorPolicy {
            unique_id_header: "X-Request-Id".to_string(),
            ..ErrorPolicy::default()
        };
        a.attach_request_context(Arc::new(RequestContext::new().with_error_policy(policy)));

        let response = ok(&a, json!({"x": 1}));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&response)["error"]["id"], json!("req-42"));
    }

    #[test]
    fn test_invalid_success_status_is_redacted_by_context_policy() {
        let a = adapter("/");
        a.attach_request_context(Arc::new(
            RequestContext::new().with_error_policy(ErrorPolicy::redacted()),
        ));

        let response = Success::new(json!({"x": 1}))
            .status(StatusCode::FOUND)
            .into_response(&a);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&response)["error"]["detail"], json!(REDACTED_DETAIL));

        let exposed = Success::new(json!({"x": 1}))
            .status(StatusCode::FOUND)
            .into_response(&adapter("/"));
        let exposed = body(&exposed);
        assert!(exposed["error"]["detail"].as_str().unwrap().contains("InvalidStatus"));
    }

    #[test]
    fn test_non_error_status_becomes_500() {
        let response = error(&adapter("/"), StatusCode::OK, "t", "d", None);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    struct Wrap;

    impl VersionHooks for Wrap {
        fn response_body_dict(&self, body: Value) -> Value {
            json!({ "v2": body })
        }
    }

    #[test]
    fn test_response_hook_applies_to_all_bodies() {
        let a = adapter("/");
        let version = Versioner::new().version("v2", Wrap).select(None).unwrap();
        a.attach_request_context(Arc::new(RequestContext::new().with_version(version)));

        assert_eq!(body(&ok(&a, json!({"x": 1}))), json!({"v2": {"x": 1}}));
        assert!(body(&bad_request(&a, &"no"))["v2"]["error"].is_object());
    }
}
