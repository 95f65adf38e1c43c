//! Transport and form security middleware.

use http::header::HeaderValue;
use http::{Method, StatusCode};
use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::keys;
use portico_core::types::{read_form, Request, Response, ResponseExt};
use portico_core::{PorticoError, PorticoResult};
use portico_session::{Security, CSRF_FIELD, CSRF_HEADER};
use std::sync::Arc;

use crate::middleware::{BoxFuture, Middleware, Next};

/// Form name used when `verify_csrf` is given no argument.
pub const DEFAULT_CSRF_FORM: &str = "default";

/// Adds the standard security headers to every response.
///
/// Headers already set further down the chain are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityHeaders;

impl Injectable for SecurityHeaders {
    const CLASS: &'static str = "security_headers";

    fn construct(_: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Middleware for SecurityHeaders {
    fn name(&self) -> &'static str {
        "security_headers"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            let mut response = next.run(request, response).await?;
            let headers = response.headers_mut();
            for (name, value) in Security::security_headers() {
                headers.entry(name).or_insert(value);
            }
            Ok(response)
        })
    }
}

/// Redirects plain-http requests to their https URL with a 301.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceHttps;

impl Injectable for ForceHttps {
    const CLASS: &'static str = "force_https";

    fn construct(_: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Middleware for ForceHttps {
    fn name(&self) -> &'static str {
        "force_https"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            if Security::is_secure_connection(&request) {
                return next.run(request, response).await;
            }
            let location = Security::https_redirect(&request);
            tracing::debug!(location = %location, "redirecting to https");
            Ok(Response::redirect_with(
                StatusCode::MOVED_PERMANENTLY,
                &location,
            ))
        })
    }
}

/// Rejects state-changing requests without a valid CSRF token.
///
/// The token is read from the `x-csrf-token` header, then from the
/// `csrf_token` form field. The first argument names the form the token was
/// issued for (`csrf:login`).
#[derive(Debug)]
pub struct VerifyCsrf {
    security: Arc<Security>,
    form: String,
}

impl VerifyCsrf {
    fn protects(method: &Method) -> bool {
        matches!(
            *method,
            Method::POST | Method::PUT | Method::PATCH | Method::DELETE
        )
    }
}

impl Injectable for VerifyCsrf {
    const CLASS: &'static str = "verify_csrf";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        let form = resolver
            .value_or::<Vec<String>>(keys::PARAMETERS, Vec::new())
            .into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_CSRF_FORM.to_string());
        Ok(Self {
            security: resolver.dependency::<Security>("security")?,
            form,
        })
    }
}

impl Middleware for VerifyCsrf {
    fn name(&self) -> &'static str {
        "verify_csrf"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            if !Self::protects(request.method()) {
                return next.run(request, response).await;
            }

            let header_token = request
                .headers()
                .get(CSRF_HEADER)
                .and_then(|value: &HeaderValue| value.to_str().ok())
                .map(str::to_string);
            let (request, token) = match header_token {
                Some(token) => (request, Some(token)),
                None => {
                    let (request, mut form) = read_form(request).await;
                    (request, form.remove(CSRF_FIELD))
                }
            };

            let valid = token
                .as_deref()
                .is_some_and(|token| self.security.validate_csrf_token(token, &self.form));
            if !valid {
                tracing::warn!(form = %self.form, path = %request.uri().path(), "CSRF token rejected");
                return Err(PorticoError::http(
                    StatusCode::FORBIDDEN,
                    "Invalid CSRF token",
                ));
            }
            next.run(request, response).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::header::LOCATION;
    use http_body_util::Full;
    use portico_config::SessionConfig;
    use portico_session::{MemorySessionStore, Session};
    use std::time::Duration;

    fn security() -> Arc<Security> {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let session = Arc::new(Session::new(store, SessionConfig::default()));
        session.start(None);
        Arc::new(Security::new(session))
    }

    fn ok_target() -> Next {
        Next::target(|_request, _response| async {
            Ok(Response::text(StatusCode::OK, "done"))
        })
    }

    fn post(body: &str, header: Option<&str>) -> Request {
        let mut builder = http::Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header("content-type", "application/x-www-form-urlencoded");
        if let Some(token) = header {
            builder = builder.header(CSRF_HEADER, token);
        }
        builder.body(Full::new(Bytes::from(body.to_string()))).unwrap()
    }

    fn verifier(security: &Arc<Security>) -> VerifyCsrf {
        VerifyCsrf {
            security: Arc::clone(security),
            form: DEFAULT_CSRF_FORM.to_string(),
        }
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let response = SecurityHeaders
            .handle(
                http::Request::new(Full::new(Bytes::new())),
                Response::empty(),
                ok_target(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-frame-options"], "SAMEORIGIN");
        assert_eq!(response.headers()["x-content-type-options"], "nosniff");
        assert_eq!(
            response.headers()["referrer-policy"],
            "strict-origin-when-cross-origin"
        );
    }

    #[tokio::test]
    async fn test_force_https_redirects_plain_requests() {
        let request = http::Request::builder()
            .uri("/account?x=1")
            .header("host", "example.com")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = ForceHttps
            .handle(request, Response::empty(), ok_target())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[LOCATION], "https://example.com/account?x=1");

        let forwarded = http::Request::builder()
            .uri("/account")
            .header("x-forwarded-proto", "https")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let response = ForceHttps
            .handle(forwarded, Response::empty(), ok_target())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_csrf_form_field_accepted() {
        let security = security();
        let token = security.generate_csrf_token(DEFAULT_CSRF_FORM);
        let target = Next::target(|request: Request, _response| async move {
            let (_, form) = read_form(request).await;
            Ok(Response::text(StatusCode::OK, form["email"].clone()))
        });

        let response = verifier(&security)
            .handle(
                post(&format!("email=a%40b.c&csrf_token={token}"), None),
                Response::empty(),
                target,
            )
            .await
            .unwrap();
        assert_eq!(
            portico_core::types::body_text(response).await,
            "a@b.c"
        );
    }

    #[tokio::test]
    async fn test_csrf_header_accepted() {
        let security = security();
        let token = security.generate_csrf_token(DEFAULT_CSRF_FORM);
        let response = verifier(&security)
            .handle(post("", Some(&token)), Response::empty(), ok_target())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_csrf_missing_or_wrong_token_rejected() {
        let security = security();
        security.generate_csrf_token(DEFAULT_CSRF_FORM);

        let err = verifier(&security)
            .handle(post("email=x", None), Response::empty(), ok_target())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let err = verifier(&security)
            .handle(post("csrf_token=forged", None), Response::empty(), ok_target())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_csrf_skips_safe_methods() {
        let security = security();
        let response = verifier(&security)
            .handle(
                http::Request::new(Full::new(Bytes::new())),
                Response::empty(),
                ok_target(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
