//! Cookie parsing and `Set-Cookie` building.
//!
//! # Example
//!
//! ```rust
//! use portico_core::cookie::{SameSite, SetCookie};
//!
//! let cookie = SetCookie::new("portico_session", "abc123")
//!     .path("/")
//!     .http_only(true)
//!     .same_site(SameSite::Lax)
//!     .max_age_secs(7200);
//!
//! let header = cookie.to_header_value();
//! assert!(header.starts_with("portico_session=abc123"));
//! assert!(header.contains("HttpOnly"));
//! assert!(header.contains("SameSite=Lax"));
//! ```

use http::header::{self, HeaderMap};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Cookies sent by the client.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    values: HashMap<String, String>,
}

impl Cookies {
    /// Parses every `Cookie` header in `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut values = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(raw) = value.to_str() else { continue };
            for pair in raw.split(';') {
                if let Some((name, value)) = pair.trim().split_once('=') {
                    values.insert(
                        name.trim().to_string(),
                        value.trim().trim_matches('"').to_string(),
                    );
                }
            }
        }
        Self { values }
    }

    /// A cookie value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no cookies were sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SameSite {
    /// Sent with cross-site requests.
    None,
    /// Sent with same-site requests and top-level navigations.
    #[default]
    Lax,
    /// Sent with same-site requests only.
    Strict,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "None",
            Self::Lax => "Lax",
            Self::Strict => "Strict",
        })
    }
}

/// Builder for a `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    name: String,
    value: String,
    path: Option<String>,
    max_age: Option<u64>,
    secure: bool,
    http_only: bool,
    same_site: Option<SameSite>,
}

impl SetCookie {
    /// A cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: None,
            max_age: None,
            secure: false,
            http_only: false,
            same_site: None,
        }
    }

    /// A cookie that tells the client to drop `name`.
    pub fn expired(name: impl Into<String>) -> Self {
        Self::new(name, "").path("/").max_age_secs(0)
    }

    /// Sets `Path`.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets `Max-Age` in seconds.
    pub fn max_age_secs(mut self, seconds: u64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    /// Sets `Secure`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets `HttpOnly`.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Sets `SameSite`.
    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    /// Cookie name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cookie value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Renders the header value.
    #[must_use]
    pub fn to_header_value(&self) -> String {
        let mut out = format!("{}={}", self.name, self.value);
        if let Some(path) = &self.path {
            out.push_str("; Path=");
            out.push_str(path);
        }
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            out.push_str(&format!("; SameSite={same_site}"));
        }
        out
    }
}
