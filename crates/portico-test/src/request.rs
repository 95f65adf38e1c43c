//! Test request building.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, Uri};
use http_body_util::Full;
use portico_core::types::Request;
use serde::Serialize;

/// Builder for requests handed to an application.
///
/// Invalid input (a bad header, an unencodable body) is remembered and
/// reported by [`build`](Self::build).
///
/// # Example
///
/// ```rust
/// use portico_test::TestRequestBuilder;
/// use http::Method;
///
/// let request = TestRequestBuilder::new(Method::POST, "/login")
///     .form(&[("email", "ann@example.com"), ("password", "secret")])
///     .build()
///     .unwrap();
///
/// assert_eq!(request.headers()["content-type"], "application/x-www-form-urlencoded");
/// ```
#[must_use]
#[derive(Debug)]
pub struct TestRequestBuilder {
    method: Method,
    uri: String,
    headers: HeaderMap,
    body: Option<Bytes>,
    error: Option<TestError>,
}

impl TestRequestBuilder {
    /// Creates a new request builder.
    pub fn new(method: Method, uri: impl AsRef<str>) -> Self {
        Self {
            method,
            uri: uri.as_ref().to_string(),
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// The request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Sets a header, replacing any previous value.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value.as_ref()),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.fail(TestError::InvalidHeader(name.to_string())),
        }
        self
    }

    /// Whether a header has been set.
    #[must_use]
    pub fn has_header(&self, name: impl AsRef<str>) -> bool {
        self.headers.contains_key(name.as_ref())
    }

    /// Sets the Content-Type header.
    pub fn content_type(self, content_type: impl AsRef<str>) -> Self {
        self.header(header::CONTENT_TYPE.as_str(), content_type)
    }

    /// Marks the request as sent by `XMLHttpRequest`.
    pub fn ajax(self) -> Self {
        self.header("x-requested-with", "XMLHttpRequest")
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON body and the matching Content-Type.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => self.body = Some(Bytes::from(bytes)),
            Err(err) => self.fail(err.into()),
        }
        self.content_type("application/json")
    }

    /// Sets a URL-encoded form body and the matching Content-Type.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_urlencoded::to_string(value) {
            Ok(encoded) => self.body = Some(Bytes::from(encoded)),
            Err(err) => self.fail(err.into()),
        }
        self.content_type("application/x-www-form-urlencoded")
    }

    fn fail(&mut self, err: TestError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    /// Builds the request.
    pub fn build(self) -> Result<Request, TestError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let uri: Uri = self
            .uri
            .parse()
            .map_err(|e| TestError::RequestBuild(format!("Invalid URI '{}': {e}", self.uri)))?;

        let mut request = http::Request::new(Full::new(self.body.unwrap_or_default()));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portico_core::types::read_form;
    use serde_json::json;

    #[test]
    fn test_get_request() {
        let request = TestRequestBuilder::new(Method::GET, "/users?page=2")
            .build()
            .unwrap();
        assert_eq!(request.method(), Method::GET);
        assert_eq!(request.uri().path(), "/users");
        assert_eq!(request.uri().query(), Some("page=2"));
    }

    #[test]
    fn test_header() {
        let request = TestRequestBuilder::new(Method::GET, "/")
            .header("X-Test", "value")
            .ajax()
            .build()
            .unwrap();
        assert_eq!(request.headers()["x-test"], "value");
        assert_eq!(request.headers()["x-requested-with"], "XMLHttpRequest");
    }

    #[test]
    fn test_invalid_header_reported_on_build() {
        let err = TestRequestBuilder::new(Method::GET, "/")
            .header("bad header", "value")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::InvalidHeader(name) if name == "bad header"));
    }

    #[test]
    fn test_invalid_uri() {
        let err = TestRequestBuilder::new(Method::GET, "http://[::1")
            .build()
            .unwrap_err();
        assert!(matches!(err, TestError::RequestBuild(_)));
    }

    #[test]
    fn test_json_body() {
        let request = TestRequestBuilder::new(Method::POST, "/users")
            .json(&json!({"name": "Alice"}))
            .build()
            .unwrap();
        assert_eq!(request.headers()["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_form_body() {
        let request = TestRequestBuilder::new(Method::POST, "/login")
            .form(&[("email", "a@b.c"), ("note", "x & y")])
            .build()
            .unwrap();
        let (_, form) = read_form(request).await;
        assert_eq!(form["email"], "a@b.c");
        assert_eq!(form["note"], "x & y");
    }
}
