//! # Portico Test
//!
//! In-memory testing for Portico applications. Requests are handed straight
//! to [`Application::handle`](portico_server::Application::handle), so they
//! run through routing, the full middleware chain and the error pages
//! without binding a port.
//!
//! [`TestClient`] keeps the cookies responses set, which makes session and
//! login flows testable end to end.
//!
//! ## Example
//!
//! ```ignore
//! use portico_test::TestClient;
//!
//! #[tokio::test]
//! async fn guests_are_sent_to_login() {
//!     let client = TestClient::new(app());
//!     client.get("/dashboard").send().await.assert_redirect("/login");
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/portico-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::TestRequestBuilder;
pub use response::TestResponse;
