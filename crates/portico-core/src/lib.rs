//! # Portico Core
//!
//! Foundation types for the Portico web framework:
//!
//! - [`di::Container`] - string-keyed dependency injection container
//! - [`PorticoError`] - the error taxonomy of request dispatch
//! - [`events::EventDispatcher`] - named, synchronous event listeners
//! - [`controller::Controller`] - the contract of route targets
//! - [`types`] - request and response aliases with helpers
//! - [`validation::Validator`] - chained form field rules
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/portico-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
pub mod controller;
pub mod cookie;
pub mod di;
mod error;
pub mod events;
pub mod keys;
pub mod types;
pub mod validation;

pub use context::RequestId;
pub use error::{ErrorCategory, PorticoError, PorticoResult};
