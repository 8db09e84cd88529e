//! In-process HTTP test client.
//!
//! Drives an application's request publisher without sockets: the browser
//! renders requests as raw HTTP text, the [`net::caller::Caller`] parses that
//! text into a CGI-style environment and publishes it on the calling thread,
//! and the [`net::connection`] lays the application's response back out as
//! socket output for the browser to parse.
//!
//! ```text
//! Browser -> HttpHandler -> PublisherConnection -> Caller -> Application
//!                                                   |
//! Browser <- Page <- WireResponse <-------------- Response
//! ```
//!
//! The [`layer`] module provides set-up / tear-down fixtures, including the
//! registration of the directive schemas functional tests rely on.

pub mod browser;
pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod layer;
pub mod net;
pub mod publisher;

pub use browser::Browser;
pub use config::HarnessConfig;
pub use error::{Error, Result};
pub use http::response::{Response, WireResponse};
pub use net::caller::Caller;
pub use publisher::{Application, PublishError, PublishRequest};
