//! Test client for in-memory requests against an application.

use crate::error::TestError;
use crate::request::TestRequestBuilder;
use crate::response::TestResponse;
use bytes::Bytes;
use http::{header, HeaderMap, Method};
use parking_lot::Mutex;
use portico_server::Application;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Drives an [`Application`] without binding a port.
///
/// Requests go through [`Application::handle`], so they see the full
/// middleware chain and the error pages. Cookies set by responses are kept
/// and sent with later requests, which lets a test log in once and then
/// visit protected pages.
///
/// # Example
///
/// ```ignore
/// use portico_test::TestClient;
///
/// let client = TestClient::new(app);
/// let form = client.get("/login").send().await;
/// let token = form.input_value("csrf_token").unwrap();
///
/// client
///     .post("/login")
///     .form(&[("email", "ann@example.com"), ("password", "secret"), ("csrf_token", &token)])
///     .send()
///     .await
///     .assert_redirect("/dashboard");
/// ```
#[must_use]
pub struct TestClient {
    app: Arc<Application>,
    cookies: Mutex<BTreeMap<String, String>>,
    default_headers: Vec<(String, String)>,
}

impl TestClient {
    /// Creates a client for `app` with an empty cookie jar.
    pub fn new(app: Application) -> Self {
        Self::from_arc(Arc::new(app))
    }

    /// Creates a client sharing `app` with other clients.
    ///
    /// Clients share the application's session store and users but keep
    /// separate cookie jars, so each one acts as a separate browser.
    pub fn from_arc(app: Arc<Application>) -> Self {
        Self {
            app,
            cookies: Mutex::new(BTreeMap::new()),
            default_headers: Vec::new(),
        }
    }

    /// Adds a header sent with every request.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// The application under test.
    #[must_use]
    pub fn app(&self) -> &Application {
        &self.app
    }

    /// A cookie currently held by the client.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.lock().get(name).cloned()
    }

    /// Forgets every cookie.
    pub fn clear_cookies(&self) {
        self.cookies.lock().clear();
    }

    /// Creates a GET request builder.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a POST request builder.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Creates a PATCH request builder.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a request builder with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        TestClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    fn cookie_header(&self) -> Option<String> {
        let cookies = self.cookies.lock();
        if cookies.is_empty() {
            return None;
        }
        Some(
            cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    fn store_cookies(&self, headers: &HeaderMap) {
        let mut cookies = self.cookies.lock();
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            let mut parts = raw.split(';').map(str::trim);
            let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
                continue;
            };
            let expired = parts.any(|attr| {
                attr.split_once('=').is_some_and(|(key, age)| {
                    key.eq_ignore_ascii_case("max-age") && age.trim() == "0"
                })
            });
            if expired || value.is_empty() {
                cookies.remove(name);
            } else {
                cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    async fn send_internal(&self, builder: TestRequestBuilder) -> Result<TestResponse, TestError> {
        let builder = match self.cookie_header() {
            Some(cookie) if !builder.has_header(header::COOKIE.as_str()) => {
                builder.header(header::COOKIE.as_str(), cookie)
            }
            _ => builder,
        };
        let request = builder.build()?;
        let response = self.app.handle(request).await;
        self.store_cookies(response.headers());
        TestResponse::from_response(response).await
    }
}

impl std::fmt::Debug for TestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestClient")
            .field("cookies", &self.cookies.lock().keys().collect::<Vec<_>>())
            .field("default_headers", &self.default_headers)
            .finish_non_exhaustive()
    }
}

/// A request builder bound to a test client.
#[must_use]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl<'a> TestClientRequest<'a> {
    fn new(client: &'a TestClient, builder: TestRequestBuilder) -> Self {
        let mut builder = builder;
        for (name, value) in &client.default_headers {
            builder = builder.header(name, value);
        }
        Self { client, builder }
    }

    /// Sets a header on the request.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Marks the request as sent by `XMLHttpRequest`.
    pub fn ajax(mut self) -> Self {
        self.builder = self.builder.ajax();
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a URL-encoded form body.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(err) => panic!("test request failed: {err}"),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        self.client.send_internal(self.builder).await
    }
}
