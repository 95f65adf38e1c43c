//! Request, response and future types shared by middleware, controllers and the server.

use bytes::Bytes;
use http::header::{self, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// The HTTP request type flowing through the middleware chain.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type flowing through the middleware chain.
pub type Response = http::Response<Full<Bytes>>;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Decoded `application/x-www-form-urlencoded` fields.
pub type FormData = HashMap<String, String>;

const HTML: &str = "text/html; charset=utf-8";
const TEXT: &str = "text/plain; charset=utf-8";
const JSON: &str = "application/json";

/// Constructors and body helpers for [`Response`].
pub trait ResponseExt: Sized {
    /// An empty `200 OK` response, the value handed to the first middleware.
    fn empty() -> Self;

    /// An HTML response.
    fn html(status: StatusCode, body: impl Into<String>) -> Self;

    /// A plain-text response.
    fn text(status: StatusCode, body: impl Into<String>) -> Self;

    /// A JSON response.
    fn json(status: StatusCode, value: &serde_json::Value) -> Self;

    /// A `302 Found` redirect.
    fn redirect(location: &str) -> Self {
        Self::redirect_with(StatusCode::FOUND, location)
    }

    /// A redirect with an explicit status.
    fn redirect_with(status: StatusCode, location: &str) -> Self;

    /// Replaces the body with HTML, keeping status and headers.
    fn with_html(self, body: impl Into<String>) -> Self;

    /// Adds every header of `from` whose name this response does not set
    /// itself. Multi-valued headers such as `set-cookie` keep all values.
    fn carry_headers(self, from: &HeaderMap) -> Self;
}

impl ResponseExt for Response {
    fn empty() -> Self {
        Self::new(Full::new(Bytes::new()))
    }

    fn html(status: StatusCode, body: impl Into<String>) -> Self {
        build(status, HTML, body.into())
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Self {
        build(status, TEXT, body.into())
    }

    fn json(status: StatusCode, value: &serde_json::Value) -> Self {
        build(status, JSON, value.to_string())
    }

    fn redirect_with(status: StatusCode, location: &str) -> Self {
        let mut response = Self::empty();
        *response.status_mut() = status;
        let location =
            HeaderValue::from_str(location).unwrap_or_else(|_| HeaderValue::from_static("/"));
        response.headers_mut().insert(header::LOCATION, location);
        response
    }

    fn with_html(self, body: impl Into<String>) -> Self {
        let (mut parts, _) = self.into_parts();
        parts
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(HTML));
        Self::from_parts(parts, Full::new(Bytes::from(body.into())))
    }

    fn carry_headers(mut self, from: &HeaderMap) -> Self {
        for name in from.keys() {
            if self.headers().contains_key(name) {
                continue;
            }
            for value in from.get_all(name) {
                self.headers_mut().append(name.clone(), value.clone());
            }
        }
        self
    }
}

fn build(status: StatusCode, content_type: &'static str, body: String) -> Response {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Request inspection helpers.
pub trait RequestExt {
    /// A query-string parameter.
    fn query_param(&self, name: &str) -> Option<String>;

    /// Whether the request was sent by `XMLHttpRequest`.
    fn is_ajax(&self) -> bool;

    /// The `Host` header, falling back to the URI authority.
    fn host(&self) -> Option<String>;
}

impl RequestExt for Request {
    fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri().query()?;
        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }

    fn is_ajax(&self) -> bool {
        self.headers()
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
    }

    fn host(&self) -> Option<String> {
        self.headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| self.uri().authority().map(|a| a.as_str().to_string()))
    }
}

/// Buffers the request body and decodes it as a URL-encoded form.
///
/// The request is rebuilt around the buffered bytes so it can keep flowing
/// down the chain. A body that is not a valid form decodes to no fields.
pub async fn read_form(request: Request) -> (Request, FormData) {
    let (parts, body) = request.into_parts();
    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    let form = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&bytes)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default();
    (Request::from_parts(parts, Full::new(bytes)), form)
}

/// Reads the whole body of a response as UTF-8 text.
pub async fn body_text(response: Response) -> String {
    let bytes = match response.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(never) => match never {},
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_response() {
        let response = Response::html(StatusCode::OK, "<h1>hi</h1>");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], HTML);
    }

    #[test]
    fn test_redirect_response() {
        let response = Response::redirect("/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn test_with_html_keeps_headers() {
        let mut response = Response::empty();
        response
            .headers_mut()
            .insert("x-frame-options", HeaderValue::from_static("SAMEORIGIN"));
        let response = response.with_html("<p>ok</p>");
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
        assert_eq!(response.headers()[header::CONTENT_TYPE], HTML);
    }

    #[test]
    fn test_carry_headers_keeps_own_values() {
        let mut earlier = HeaderMap::new();
        earlier.insert("x-pre", HeaderValue::from_static("1"));
        earlier.insert(header::CONTENT_TYPE, HeaderValue::from_static(TEXT));
        earlier.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        earlier.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let response = Response::html(StatusCode::CREATED, "<p>ok</p>").carry_headers(&earlier);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["x-pre"], "1");
        assert_eq!(response.headers()[header::CONTENT_TYPE], HTML);
        assert_eq!(response.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_query_param_and_ajax() {
        let request: Request = http::Request::builder()
            .uri("/users?page=2&sort=name")
            .header("X-Requested-With", "XMLHttpRequest")
            .body(Full::new(Bytes::new()))
            .unwrap();
        assert_eq!(request.query_param("page").as_deref(), Some("2"));
        assert_eq!(request.query_param("missing"), None);
        assert!(request.is_ajax());
    }

    #[tokio::test]
    async fn test_read_form_rebuilds_request() {
        let request: Request = http::Request::builder()
            .method("POST")
            .uri("/login")
            .body(Full::new(Bytes::from_static(b"email=a%40b.c&password=secret")))
            .unwrap();
        let (request, form) = read_form(request).await;
        assert_eq!(form.get("email").map(String::as_str), Some("a@b.c"));
        assert_eq!(form.get("password").map(String::as_str), Some("secret"));

        let (_, again) = read_form(request).await;
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn test_body_text() {
        let response = Response::text(StatusCode::OK, "hello");
        assert_eq!(body_text(response).await, "hello");
    }
}
