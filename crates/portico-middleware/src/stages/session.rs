//! Session lifecycle middleware.

use http::header::{HeaderValue, SET_COOKIE};
use portico_core::cookie::Cookies;
use portico_core::di::{ContainerError, Injectable, Resolver};
use portico_core::types::{Request, Response};
use portico_core::PorticoResult;
use portico_session::Session;
use std::sync::Arc;

use crate::middleware::{BoxFuture, Middleware, Next};

/// Starts the request's session from its cookie and saves it once the rest
/// of the chain has produced a response.
///
/// The data is saved even when the chain fails, so a flash written before
/// the error survives; the cookie is only attached to a successful response.
#[derive(Debug)]
pub struct StartSession {
    session: Arc<Session>,
}

impl StartSession {
    /// Creates the middleware for `session`.
    pub const fn new(session: Arc<Session>) -> Self {
        Self { session }
    }
}

impl Injectable for StartSession {
    const CLASS: &'static str = "start_session";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self::new(resolver.dependency::<Session>("session")?))
    }
}

impl Middleware for StartSession {
    fn name(&self) -> &'static str {
        "start_session"
    }

    fn handle<'a>(
        &'a self,
        request: Request,
        response: Response,
        next: Next,
    ) -> BoxFuture<'a, PorticoResult<Response>> {
        Box::pin(async move {
            let cookie_id = Cookies::from_headers(request.headers())
                .get(self.session.cookie_name())
                .map(str::to_string);
            let resumed = self.session.start(cookie_id.as_deref());
            tracing::debug!(resumed, "session started");

            let result = next.run(request, response).await;
            let cookie = self.session.save();

            let mut response = result?;
            if let Some(cookie) = cookie {
                match HeaderValue::from_str(&cookie.to_header_value()) {
                    Ok(value) => {
                        response.headers_mut().append(SET_COOKIE, value);
                    }
                    Err(err) => tracing::warn!(error = %err, "session cookie is not a valid header"),
                }
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;
    use portico_config::SessionConfig;
    use portico_core::types::ResponseExt;
    use portico_session::MemorySessionStore;
    use std::time::Duration;

    fn session(store: &Arc<MemorySessionStore>) -> Arc<Session> {
        Arc::new(Session::new(store.clone(), SessionConfig::default()))
    }

    fn request(cookie: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/");
        if let Some(cookie) = cookie {
            builder = builder.header("cookie", cookie);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response.headers()[SET_COOKIE].to_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_new_session_sets_cookie() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let session = self::session(&store);
        let middleware = StartSession::new(Arc::clone(&session));

        let response = middleware
            .handle(request(None), Response::empty(), Next::passthrough())
            .await
            .unwrap();

        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("portico_session="));
        assert!(cookie.contains(&session.id().unwrap()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_data_survives_across_requests() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));

        let first = self::session(&store);
        let writer = Arc::clone(&first);
        let target = Next::target(move |_request, response| async move {
            writer.set("visits", 1);
            Ok(response)
        });
        StartSession::new(Arc::clone(&first))
            .handle(request(None), Response::empty(), target)
            .await
            .unwrap();
        let id = first.id().unwrap();

        let second = self::session(&store);
        let cookie = format!("portico_session={id}");
        StartSession::new(Arc::clone(&second))
            .handle(request(Some(&cookie)), Response::empty(), Next::passthrough())
            .await
            .unwrap();
        assert_eq!(second.id().as_deref(), Some(id.as_str()));
        assert_eq!(second.get_as::<i64>("visits"), Some(1));
    }

    #[tokio::test]
    async fn test_error_still_saves_session() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let session = self::session(&store);
        let writer = Arc::clone(&session);
        let target = Next::target(move |_request, _response| async move {
            writer.flash("error", "boom");
            Err(portico_core::PorticoError::http(StatusCode::BAD_REQUEST, "bad"))
        });

        let result = StartSession::new(Arc::clone(&session))
            .handle(request(None), Response::empty(), target)
            .await;
        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }
}
