//! CSRF tokens, password hashing, escaping and transport security.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use http::header::{self, HeaderName, HeaderValue};
use http::Request;
use portico_core::di::{ContainerError, Injectable, Resolver};
use rand::RngCore;
use std::sync::Arc;

use crate::error::SessionError;
use crate::session::Session;

/// Name of the hidden form field carrying the CSRF token.
pub const CSRF_FIELD: &str = "csrf_token";

/// Header carrying the CSRF token for scripted requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_BYTES: usize = 32;

static SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-frame-options", "SAMEORIGIN"),
    ("x-content-type-options", "nosniff"),
    ("x-xss-protection", "1; mode=block"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self'; style-src 'self'; img-src 'self' data:;",
    ),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Hex encoding of `bytes` random bytes.
pub(crate) fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0_u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Security helpers bound to the current session.
#[derive(Debug)]
pub struct Security {
    session: Arc<Session>,
}

impl Security {
    /// Creates the helper for `session`.
    pub const fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    /// HTML-escapes `& < > " '`.
    ///
    /// ```rust
    /// use portico_session::Security;
    ///
    /// assert_eq!(
    ///     Security::sanitize(r#"<a href="x">Tom & 'Jerry'</a>"#),
    ///     "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#039;Jerry&#039;&lt;/a&gt;"
    /// );
    /// ```
    #[must_use]
    pub fn sanitize(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                '\'' => out.push_str("&#039;"),
                other => out.push(other),
            }
        }
        out
    }

    /// Issues a token for `form` and stores it in the session.
    pub fn generate_csrf_token(&self, form: &str) -> String {
        let token = random_hex(CSRF_BYTES);
        self.session.set(csrf_key(form), token.clone());
        token
    }

    /// Checks `token` against the one stored for `form`.
    ///
    /// A valid token is rotated so it cannot be replayed.
    pub fn validate_csrf_token(&self, token: &str, form: &str) -> bool {
        let Some(expected) = self.session.get_as::<String>(&csrf_key(form)) else {
            return false;
        };
        if expected.is_empty() || !constant_time_eq(expected.as_bytes(), token.as_bytes()) {
            return false;
        }
        self.generate_csrf_token(form);
        true
    }

    /// The token currently stored for `form`, issuing one if there is none.
    ///
    /// Rendering the same form twice gives the same token; only a
    /// successful validation replaces it.
    pub fn csrf_token(&self, form: &str) -> String {
        match self.session.get_as::<String>(&csrf_key(form)) {
            Some(token) if !token.is_empty() => token,
            _ => self.generate_csrf_token(form),
        }
    }

    /// A hidden input carrying the token for `form`.
    pub fn csrf_field(&self, form: &str) -> String {
        format!(
            r#"<input type="hidden" name="{CSRF_FIELD}" value="{}">"#,
            self.csrf_token(form)
        )
    }

    /// Hashes a password with Argon2, returning a PHC string.
    pub fn hash_password(password: &str) -> Result<String, SessionError> {
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|e| SessionError::PasswordHash(e.to_string()))?;
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| SessionError::PasswordHash(e.to_string()))
    }

    /// Verifies a password against a PHC string. A malformed hash never
    /// verifies.
    #[must_use]
    pub fn verify_password(password: &str, hash: &str) -> bool {
        PasswordHash::new(hash).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    /// Hex string of `len / 2` random bytes.
    #[must_use]
    pub fn generate_random_string(len: usize) -> String {
        random_hex(len / 2)
    }

    /// The headers added by the `security_headers` middleware.
    pub fn security_headers() -> impl Iterator<Item = (HeaderName, HeaderValue)> {
        SECURITY_HEADERS
            .iter()
            .map(|&(name, value)| (HeaderName::from_static(name), HeaderValue::from_static(value)))
    }

    /// True for an https URI, port 443, or `X-Forwarded-Proto: https`.
    #[must_use]
    pub fn is_secure_connection<B>(request: &Request<B>) -> bool {
        let uri = request.uri();
        if uri.scheme_str() == Some("https") || uri.port_u16() == Some(443) {
            return true;
        }
        let forwarded = request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"));
        let host_port = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|host| host.ends_with(":443"));
        forwarded || host_port
    }

    /// The https URL of `request`, for a 301 redirect.
    #[must_use]
    pub fn https_redirect<B>(request: &Request<B>) -> String {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .or_else(|| request.uri().host().map(str::to_string))
            .unwrap_or_else(|| "localhost".to_string());
        let target = request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        format!("https://{host}{target}")
    }
}

impl Injectable for Security {
    const CLASS: &'static str = "security";

    fn construct(resolver: &mut Resolver<'_>) -> Result<Self, ContainerError> {
        Ok(Self::new(resolver.dependency::<Session>("session")?))
    }
}

fn csrf_key(form: &str) -> String {
    format!("csrf_{form}")
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0_u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemorySessionStore;
    use portico_config::SessionConfig;
    use std::time::Duration;

    fn security() -> Security {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        let session = Arc::new(Session::new(store, SessionConfig::default()));
        session.start(None);
        Security::new(session)
    }

    #[test]
    fn test_csrf_round() {
        let security = security();
        let token = security.generate_csrf_token("login");
        assert_eq!(token.len(), 64);
        assert!(security.validate_csrf_token(&token, "login"));
        // rotated after use
        assert!(!security.validate_csrf_token(&token, "login"));
    }

    #[test]
    fn test_csrf_is_per_form() {
        let security = security();
        let token = security.generate_csrf_token("login");
        assert!(!security.validate_csrf_token(&token, "register"));
        assert!(!security.validate_csrf_token("forged", "login"));
    }

    #[test]
    fn test_csrf_field_embeds_stored_token() {
        let security = security();
        let field = security.csrf_field("default");
        let stored = security.session.get_as::<String>("csrf_default").unwrap();
        assert!(field.contains(&format!(r#"value="{stored}""#)));
        assert!(field.contains(r#"name="csrf_token""#));
    }

    #[test]
    fn test_rendering_again_keeps_the_token() {
        let security = security();
        let first = security.csrf_token("logout");
        assert_eq!(security.csrf_token("logout"), first);
        assert!(security.csrf_field("logout").contains(&first));

        assert!(security.validate_csrf_token(&first, "logout"));
        assert_ne!(security.csrf_token("logout"), first);
    }

    #[test]
    fn test_password_hashing() {
        let hash = Security::hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(Security::verify_password("s3cret", &hash));
        assert!(!Security::verify_password("wrong", &hash));
        assert!(!Security::verify_password("s3cret", "not-a-hash"));
    }

    #[test]
    fn test_random_string_length() {
        assert_eq!(Security::generate_random_string(32).len(), 32);
        assert_eq!(Security::generate_random_string(7).len(), 6);
        assert_ne!(
            Security::generate_random_string(16),
            Security::generate_random_string(16)
        );
    }

    #[test]
    fn test_security_headers() {
        let headers: Vec<_> = Security::security_headers().collect();
        assert_eq!(headers.len(), 5);
        assert_eq!(headers[0].0, "x-frame-options");
        assert_eq!(headers[0].1, "SAMEORIGIN");
    }

    #[test]
    fn test_secure_connection_detection() {
        let plain = Request::builder().uri("/a").body(()).unwrap();
        assert!(!Security::is_secure_connection(&plain));

        let forwarded = Request::builder()
            .uri("/a")
            .header("x-forwarded-proto", "https")
            .body(())
            .unwrap();
        assert!(Security::is_secure_connection(&forwarded));

        let absolute = Request::builder().uri("https://example.com/a").body(()).unwrap();
        assert!(Security::is_secure_connection(&absolute));
    }

    #[test]
    fn test_https_redirect_target() {
        let request = Request::builder()
            .uri("/users?page=2")
            .header("host", "example.com")
            .body(())
            .unwrap();
        assert_eq!(
            Security::https_redirect(&request),
            "https://example.com/users?page=2"
        );
    }
}
