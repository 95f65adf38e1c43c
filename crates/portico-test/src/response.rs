//! Test response wrapper.

use crate::error::TestError;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use portico_core::types::Response;
use serde::de::DeserializeOwned;
use std::fmt;

/// A buffered response with helpers for assertions.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Buffers an application response.
    pub async fn from_response(response: Response) -> Result<Self, TestError> {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();
        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// Creates a test response from raw parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the status is a redirect (3xx).
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets a header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets a header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header_str(header::LOCATION.as_str())
    }

    /// The value of the `Set-Cookie` header for `name`, if one was sent.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find_map(|(key, value)| (key.trim() == name).then(|| value.trim()))
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as a string.
    pub fn text(&self) -> Result<String, TestError> {
        String::from_utf8(self.body.to_vec())
            .map_err(|e| TestError::BodyRead(format!("Invalid UTF-8: {e}")))
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The `value` of the first HTML input named `name`.
    ///
    /// Expects `name` before `value` inside the tag, as rendered by the
    /// framework's form helpers (`<input type="hidden" name="csrf_token"
    /// value="...">`).
    #[must_use]
    pub fn input_value(&self, name: &str) -> Option<String> {
        let body = std::str::from_utf8(&self.body).ok()?;
        input_value_in(body, name)
    }

    /// Like [`input_value`](Self::input_value), but only inside the form
    /// posting to `action`.
    #[must_use]
    pub fn form_input_value(&self, action: &str, name: &str) -> Option<String> {
        let body = std::str::from_utf8(&self.body).ok()?;
        let start = body.find(&format!("action=\"{action}\""))?;
        let end = body[start..].find("</form>").map_or(body.len(), |end| start + end);
        input_value_in(&body[start..end], name)
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status, expected,
            "Expected status {}, got {}",
            expected, self.status
        );
        self
    }

    /// Asserts a `302 Found` redirect to `location`.
    ///
    /// # Panics
    ///
    /// Panics if the response is not that redirect.
    pub fn assert_redirect(&self, location: &str) -> &Self {
        self.assert_status(StatusCode::FOUND);
        assert_eq!(
            self.location(),
            Some(location),
            "Expected redirect to '{location}'"
        );
        self
    }

    /// Asserts that a header exists with the expected value.
    ///
    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let actual = self
            .header_str(name)
            .unwrap_or_else(|| panic!("Header '{name}' not found"));
        assert_eq!(
            actual, expected,
            "Header '{name}': expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts that the body contains the expected substring.
    ///
    /// # Panics
    ///
    /// Panics if the body is not UTF-8 or doesn't contain the substring.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = self.text().unwrap_or_else(|e| panic!("{e}"));
        assert!(
            body.contains(expected),
            "Body should contain '{expected}', got: {body}"
        );
        self
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn input_value_in(html: &str, name: &str) -> Option<String> {
    let marker = format!("name=\"{name}\"");
    let start = html.find(&marker)? + marker.len();
    let tag_end = html[start..].find('>')? + start;
    let tag = &html[start..tag_end];
    let value_start = tag.find("value=\"")? + "value=\"".len();
    let value_len = tag[value_start..].find('"')?;
    Some(tag[value_start..value_start + value_len].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_response(status: StatusCode, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        headers.append(
            header::SET_COOKIE,
            HeaderValue::from_static("portico_session=abc123; Path=/; HttpOnly"),
        );
        headers.append(header::SET_COOKIE, HeaderValue::from_static("theme=dark"));
        TestResponse::new(status, headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_status() {
        let response = create_response(StatusCode::OK, "");
        assert_eq!(response.status_code(), 200);
        assert!(response.is_success());
        assert!(!response.is_redirect());
    }

    #[test]
    fn test_cookie() {
        let response = create_response(StatusCode::OK, "");
        assert_eq!(response.cookie("portico_session"), Some("abc123"));
        assert_eq!(response.cookie("theme"), Some("dark"));
        assert_eq!(response.cookie("missing"), None);
    }

    #[test]
    fn test_input_value() {
        let response = create_response(
            StatusCode::OK,
            r#"<form><input type="email" name="email"><input type="hidden" name="csrf_token" value="f00d"></form>"#,
        );
        assert_eq!(response.input_value("csrf_token").as_deref(), Some("f00d"));
        assert_eq!(response.input_value("email"), None);
        assert_eq!(response.input_value("password"), None);
    }

    #[test]
    fn test_form_input_value() {
        let response = create_response(
            StatusCode::OK,
            concat!(
                r#"<form action="/logout"><input name="csrf_token" value="aaaa"></form>"#,
                r#"<form action="/users"><input name="csrf_token" value="bbbb"></form>"#,
            ),
        );
        assert_eq!(response.input_value("csrf_token").as_deref(), Some("aaaa"));
        assert_eq!(
            response.form_input_value("/users", "csrf_token").as_deref(),
            Some("bbbb")
        );
        assert_eq!(response.form_input_value("/login", "csrf_token"), None);
    }

    #[test]
    fn test_assertions() {
        let response = create_response(StatusCode::OK, "<h1>Welcome</h1>");
        response
            .assert_status(StatusCode::OK)
            .assert_header("content-type", "text/html")
            .assert_body_contains("Welcome");
    }

    #[test]
    fn test_assert_redirect() {
        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, HeaderValue::from_static("/login"));
        let response = TestResponse::new(StatusCode::FOUND, headers, Bytes::new());
        response.assert_redirect("/login");
    }

    #[test]
    fn test_json() {
        let response = create_response(StatusCode::OK, r#"{"name":"Alice"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["name"], "Alice");
    }
}
